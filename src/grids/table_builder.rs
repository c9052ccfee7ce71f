use rustc_hash::FxHashMap;

use crate::{
    algorithms::polint::AxisPolicy,
    collections::AbscissaCollection,
    errors::GridError,
    utilities::float::Ordinate,
};

use super::multi_function::{check_ndim, Entries, MultiFunction, TableNode};

/// Bit pattern of a coordinate, `-0.0` folded onto `0.0`.
#[inline]
fn key(x: f64) -> u64
{
    (x + 0.0).to_bits()
}

///
/// Collects `(coordinates, value)` rows in any order and compiles them into
/// a rectangular [`MultiFunction`]. The abscissae of every axis are the
/// distinct coordinates inserted on that axis; equidistant axes become grids.
///
#[derive(Clone, Debug)]
pub struct TableBuilder<T>
{
    axes: Vec<AxisPolicy>,
    rows: FxHashMap<Vec<u64>, T>,
}

impl<T: Ordinate> TableBuilder<T>
{
    pub fn new(axes: Vec<AxisPolicy>) -> Self
    {
        Self { axes, rows: FxHashMap::default() }
    }

    pub fn ndim(&self) -> usize
    {
        self.axes.len()
    }

    /// Number of rows inserted so far.
    pub fn len(&self) -> usize
    {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.rows.is_empty()
    }

    pub fn insert(&mut self, coordinates: &[f64], value: T) -> Result<(), GridError>
    {
        if coordinates.len() != self.ndim()
        {
            return Err(GridError::DimensionMismatch { expected: self.ndim(), actual: coordinates.len() });
        }
        if let Some((axis, &x)) = coordinates.iter().enumerate().find(|(_, x)| !x.is_finite())
        {
            return Err(GridError::NonFiniteCoordinate { axis, x });
        }
        let bits: Vec<u64> = coordinates.iter().map(|&x| key(x)).collect();
        if self.rows.contains_key(&bits)
        {
            return Err(GridError::DuplicateEntry(coordinates.to_vec()));
        }
        self.rows.insert(bits, value);
        Ok(())
    }

    ///
    /// Build the table. Fails with [`GridError::IncompleteTable`] unless every
    /// combination of the per-axis abscissae has exactly one row.
    ///
    pub fn compile(mut self) -> Result<MultiFunction<T>, GridError>
    {
        check_ndim(self.ndim())?;
        if self.rows.is_empty()
        {
            return Err(GridError::IncompleteTable("no rows inserted".to_string()));
        }
        let mut collections = Vec::with_capacity(self.ndim());
        for axis in 0..self.ndim()
        {
            let mut values: Vec<f64> = self.rows.keys().map(|bits| f64::from_bits(bits[axis])).collect();
            values.sort_by(f64::total_cmp);
            values.dedup();
            collections.push(AbscissaCollection::set(values)?.normalized());
        }
        let expected: usize = collections.iter().map(|c| c.len()).product();
        tracing::debug!(rows = self.rows.len(), expected, ndim = self.ndim(), "compiling table rows");
        if self.rows.len() != expected
        {
            return Err(GridError::IncompleteTable(format!("{} of {} grid points present", self.rows.len(), expected)));
        }
        let mut prefix = Vec::with_capacity(self.ndim());
        let root = build_node(&collections, &mut prefix, &mut self.rows)?;
        MultiFunction::new(self.axes, root)
    }
}

fn build_node<T>(collections: &[AbscissaCollection], prefix: &mut Vec<u64>, rows: &mut FxHashMap<Vec<u64>, T>) -> Result<TableNode<T>, GridError>
{
    let collection = collections[0].clone();
    let mut leaves = Vec::with_capacity(collection.len());
    let mut nodes = Vec::with_capacity(collection.len());
    for x in collection.iter()
    {
        prefix.push(key(x));
        if collections.len() == 1
        {
            let value = rows.remove(prefix.as_slice()).ok_or_else(||
                GridError::IncompleteTable(format!("missing grid point {:?}", prefix.iter().map(|&b| f64::from_bits(b)).collect::<Vec<_>>())))?;
            leaves.push(value);
        }
        else
        {
            nodes.push(build_node(&collections[1..], prefix, rows)?);
        }
        prefix.pop();
    }
    let entries = if collections.len() == 1 { Entries::Leaves(leaves) } else { Entries::Nodes(nodes) };
    Ok(TableNode::new(collection, entries))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rows_in_any_order()
    {
        let mut builder = TableBuilder::new(vec![AxisPolicy::linear(); 2]);
        for (x, y) in [(2.0, 1.0), (0.0, 0.0), (1.0, 1.0), (2.0, 0.0), (0.0, 1.0), (1.0, 0.0)]
        {
            builder.insert(&[x, y], x + 10.0 * y).unwrap();
        }
        assert_eq!(builder.len(), 6);
        let f = builder.compile().unwrap();
        assert_eq!(f.collections()[0], &AbscissaCollection::Grid { size: 3, xmin: 0.0, xmax: 2.0 });
        assert_eq!(f.evaluate(&[0.5, 0.0]).unwrap(), 0.5);
        assert_eq!(f.evaluate(&[1.0, 0.5]).unwrap(), 6.0);
        assert_eq!(f.evaluate(&[2.0, 1.0]).unwrap(), 12.0);
    }

    #[test]
    fn test_uneven_axis_becomes_set()
    {
        let mut builder = TableBuilder::new(vec![AxisPolicy::flat()]);
        for x in [0.0, 0.3, 2.0]
        {
            builder.insert(&[x], [x, -x]).unwrap();
        }
        let f = builder.compile().unwrap();
        assert!(matches!(f.collections()[0], AbscissaCollection::Set(_)));
        assert_eq!(f.evaluate(&[0.2]).unwrap(), [0.3, -0.3]);
    }

    #[test]
    fn test_missing_row()
    {
        let mut builder = TableBuilder::new(vec![AxisPolicy::linear(); 2]);
        builder.insert(&[0.0, 0.0], 1.0).unwrap();
        builder.insert(&[1.0, 0.0], 1.0).unwrap();
        builder.insert(&[0.0, 1.0], 1.0).unwrap();
        assert!(matches!(builder.compile(), Err(GridError::IncompleteTable(_))));
        assert!(matches!(TableBuilder::<f64>::new(vec![AxisPolicy::linear()]).compile(), Err(GridError::IncompleteTable(_))));
    }

    #[test]
    fn test_invalid_rows()
    {
        let mut builder = TableBuilder::new(vec![AxisPolicy::linear(); 2]);
        builder.insert(&[0.0, 0.0], 1.0).unwrap();
        assert!(matches!(builder.insert(&[-0.0, 0.0], 2.0), Err(GridError::DuplicateEntry(_))));
        assert!(matches!(builder.insert(&[0.0], 2.0), Err(GridError::DimensionMismatch { expected: 2, actual: 1 })));
        assert!(matches!(builder.insert(&[0.0, f64::NAN], 2.0), Err(GridError::NonFiniteCoordinate { axis: 1, .. })));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_rows_of_different_lengths()
    {
        let mut builder = TableBuilder::new(vec![AxisPolicy::linear()]);
        builder.insert(&[0.0], vec![1.0]).unwrap();
        builder.insert(&[1.0], vec![3.0, 5.0]).unwrap();
        assert!(matches!(builder.compile(), Err(GridError::MalformedTable(_))));

        let mut builder = TableBuilder::<f64>::new(Vec::new());
        builder.insert(&[], 1.0).unwrap();
        assert!(matches!(builder.compile(), Err(GridError::MalformedTable(_))));
    }
}
