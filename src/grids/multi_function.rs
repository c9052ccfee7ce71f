use std::path::Path;

use rayon::prelude::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    algorithms::polint::AxisPolicy,
    collections::AbscissaCollection,
    errors::GridError,
    serialization::{self, SerializationFormat},
    utilities::float::Ordinate,
};

/// Maximum number of table axes.
pub const MAX_DIMENSIONS: usize = 32;

///
/// Children of a table node: sub-tables for every axis but the last, stored
/// leaf values on the last axis. There is one child per abscissa.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Entries<T>
{
    Nodes(Vec<TableNode<T>>),
    Leaves(Vec<T>),
}

impl<T> Entries<T>
{
    pub fn len(&self) -> usize
    {
        match self
        {
            Entries::Nodes(nodes) => nodes.len(),
            Entries::Leaves(leaves) => leaves.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

///
/// One level of a composite table: the abscissae of its axis and one child
/// per abscissa.
///
#[derive(Clone, Debug, PartialEq)]
pub struct TableNode<T>
{
    collection: AbscissaCollection,
    entries: Entries<T>,
}

#[inline]
fn accumulate<T: Ordinate>(result: &mut Option<T>, weight: f64, value: &T)
{
    match result
    {
        Some(result) => result.add_scaled(weight, value),
        None => *result = Some(value.scaled(weight)),
    }
}

impl<T> TableNode<T>
{
    pub fn new(collection: AbscissaCollection, entries: Entries<T>) -> Self
    {
        Self { collection, entries }
    }

    pub fn collection(&self) -> &AbscissaCollection
    {
        &self.collection
    }

    pub fn entries(&self) -> &Entries<T>
    {
        &self.entries
    }

    ///
    /// Sort unsorted sets (moving the children along) and check the node
    /// structure below `depth`.
    ///
    fn normalize(&mut self, depth: usize, ndim: usize) -> Result<(), GridError>
    {
        if self.entries.len() != self.collection.len()
        {
            return Err(GridError::MalformedTable(format!("axis {depth} has {} abscissae but {} entries", self.collection.len(), self.entries.len())));
        }
        let last = depth + 1 == ndim;
        match (&self.entries, last)
        {
            (Entries::Leaves(_), false) => return Err(GridError::MalformedTable(format!("leaves on axis {depth} of a {ndim}-dimensional table"))),
            (Entries::Nodes(_), true) => return Err(GridError::MalformedTable(format!("sub-tables below the last axis {depth}"))),
            _ => {}
        }
        if let AbscissaCollection::Set(values) = &mut self.collection
        {
            if values.iter().any(|x| !x.is_finite())
            {
                return Err(GridError::InvalidCollection(format!("non-finite abscissa on axis {depth}")));
            }
            if values.windows(2).any(|pair| pair[0] > pair[1])
            {
                let abscissae = std::mem::take(values);
                match &mut self.entries
                {
                    Entries::Nodes(nodes) => (*values, *nodes) = sorted_by_abscissa(abscissae, std::mem::take(nodes)),
                    Entries::Leaves(leaves) => (*values, *leaves) = sorted_by_abscissa(abscissae, std::mem::take(leaves)),
                }
            }
        }
        self.collection.validate()?;
        if let Entries::Nodes(nodes) = &mut self.entries
        {
            for node in nodes.iter_mut()
            {
                node.normalize(depth + 1, ndim)?;
            }
        }
        Ok(())
    }

    /// Leaves in row order, last axis fastest.
    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a T>)
    {
        match &self.entries
        {
            Entries::Nodes(nodes) => nodes.iter().for_each(|node| node.collect_leaves(leaves)),
            Entries::Leaves(values) => leaves.extend(values),
        }
    }

    fn check_shape(&self, shape: &[&AbscissaCollection], depth: usize) -> Result<(), GridError>
    {
        if self.collection != *shape[depth]
        {
            return Err(GridError::IncompleteTable(format!("abscissae on axis {depth} differ between sub-tables: {} vs {}", self.collection, shape[depth])));
        }
        if let Entries::Nodes(nodes) = &self.entries
        {
            for node in nodes
            {
                node.check_shape(shape, depth + 1)?;
            }
        }
        Ok(())
    }
}

/// Rebuild the tree over `collections` from leaves in row order.
fn unflatten<T>(collections: &[AbscissaCollection], leaves: &mut std::vec::IntoIter<T>) -> TableNode<T>
{
    let collection = collections[0].clone();
    let entries = if collections.len() == 1
    {
        Entries::Leaves(leaves.by_ref().take(collection.len()).collect())
    }
    else
    {
        Entries::Nodes((0..collection.len()).map(|_| unflatten(&collections[1..], leaves)).collect())
    };
    TableNode { collection, entries }
}

pub(crate) fn check_ndim(ndim: usize) -> Result<(), GridError>
{
    match ndim
    {
        0 => Err(GridError::MalformedTable("table without axes".to_string())),
        ndim if ndim > MAX_DIMENSIONS => Err(GridError::MalformedTable(format!("{ndim} axes, at most {MAX_DIMENSIONS} supported"))),
        _ => Ok(()),
    }
}

fn sorted_by_abscissa<E>(abscissae: Vec<f64>, children: Vec<E>) -> (Vec<f64>, Vec<E>)
{
    let mut pairs: Vec<(f64, E)> = abscissae.into_iter().zip(children).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.into_iter().unzip()
}

impl<T: Ordinate> TableNode<T>
{
    ///
    /// Interpolate along axis `depth` over the window selected by its policy,
    /// each child being evaluated on the remaining coordinates first.
    ///
    fn evaluate(&self, axes: &[AxisPolicy], coordinates: &[f64], depth: usize) -> Result<T, GridError>
    {
        let weights = axes[depth].weights(depth, &self.collection, coordinates[depth])?;
        let mut result: Option<T> = None;
        for (index, &weight) in weights.range().zip(weights.weights())
        {
            // zero weights contribute nothing; the first child always seeds the result
            if weight == 0.0 && result.is_some()
            {
                continue;
            }
            match &self.entries
            {
                Entries::Leaves(leaves) => accumulate(&mut result, weight, &leaves[index]),
                Entries::Nodes(nodes) =>
                {
                    let value = nodes[index].evaluate(axes, coordinates, depth + 1)?;
                    accumulate(&mut result, weight, &value);
                }
            }
        }
        result.ok_or_else(|| GridError::MalformedTable(format!("empty interpolation window on axis {depth}")))
    }
}

fn tabulate_node<T, F>(collections: &[AbscissaCollection], prefix: &[f64], f: &F) -> TableNode<T>
where T: Send, F: Fn(&[f64]) -> T + Sync
{
    let collection = collections[0].clone();
    let point = |i: usize|
    {
        let mut point = Vec::with_capacity(prefix.len() + collections.len());
        point.extend_from_slice(prefix);
        point.push(collection.x(i));
        point
    };
    let entries = if collections.len() == 1
    {
        Entries::Leaves((0..collection.len()).map(|i| f(point(i).as_slice())).collect())
    }
    else
    {
        Entries::Nodes((0..collection.len()).into_par_iter().map(|i| tabulate_node(&collections[1..], &point(i), f)).collect())
    };
    TableNode { collection, entries }
}

///
/// N-dimensional composite table. Axis `i` is sampled by the collection of
/// the nodes at depth `i` and interpolated with `axes[i]`; leaves hold the
/// tabulated values. A `MultiFunction` is always compiled: every node has
/// one child per abscissa, sets are sorted and the grid is rectangular.
///
#[derive(Clone, Debug, PartialEq)]
pub struct MultiFunction<T>
{
    axes: Vec<AxisPolicy>,
    root: TableNode<T>,
}

///
/// Serialized layout of a table: the axis policies, the abscissae of every
/// axis and the leaves in row order.
///
#[derive(Serialize)]
struct FlatTableRef<'a, T>
{
    axes: &'a [AxisPolicy],
    collections: Vec<&'a AbscissaCollection>,
    leaves: Vec<&'a T>,
}

#[derive(Deserialize)]
struct FlatTable<T>
{
    axes: Vec<AxisPolicy>,
    collections: Vec<AbscissaCollection>,
    leaves: Vec<T>,
}

impl<T: Serialize> Serialize for MultiFunction<T>
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        let mut leaves = Vec::with_capacity(self.len());
        self.root.collect_leaves(&mut leaves);
        FlatTableRef { axes: &self.axes, collections: self.collections(), leaves }.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for MultiFunction<T>
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>
    {
        let table = FlatTable::<T>::deserialize(deserializer)?;
        Self::from_flat(table).map_err(serde::de::Error::custom)
    }
}

impl<T: Ordinate> MultiFunction<T>
{
    ///
    /// Assemble a table from its root node and compile it.
    ///
    pub fn new(axes: Vec<AxisPolicy>, root: TableNode<T>) -> Result<Self, GridError>
    {
        let mut function = Self { axes, root };
        function.compile()?;
        Ok(function)
    }

    ///
    /// Fill a rectangular table with `f` evaluated at every combination of
    /// abscissae. Sibling nodes are filled in parallel.
    ///
    pub fn tabulate<F>(axes: Vec<AxisPolicy>, collections: Vec<AbscissaCollection>, f: F) -> Result<Self, GridError>
    where T: Send, F: Fn(&[f64]) -> T + Sync
    {
        if axes.len() != collections.len()
        {
            return Err(GridError::DimensionMismatch { expected: axes.len(), actual: collections.len() });
        }
        check_ndim(collections.len())?;
        for collection in &collections
        {
            collection.validate()?;
        }
        Self::new(axes, tabulate_node(&collections, &[], &f))
    }

    ///
    /// Validate and normalize the table: policies must be valid, every node
    /// needs one child per abscissa, unsorted sets are sorted together with
    /// their children, all nodes at one depth must share their abscissae and
    /// all leaves must have the same number of components. Tables read from a
    /// buffer are compiled before they are returned.
    ///
    pub fn compile(&mut self) -> Result<(), GridError>
    {
        let ndim = self.axes.len();
        check_ndim(ndim)?;
        for policy in &self.axes
        {
            policy.interpolation.validate()?;
        }
        self.root.normalize(0, ndim)?;
        let shape = self.collections();
        self.root.check_shape(&shape, 0)?;
        let mut leaves = Vec::with_capacity(self.len());
        self.root.collect_leaves(&mut leaves);
        if let Some(first) = leaves.first()
        {
            let components = first.components();
            if let Some(leaf) = leaves.iter().find(|leaf| leaf.components() != components)
            {
                return Err(GridError::MalformedTable(format!("leaf with {} components in a table of {components}-component leaves", leaf.components())));
            }
        }
        tracing::debug!(ndim, leaves = self.len(), "compiled table with axes [{}]",
            shape.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("; "));
        Ok(())
    }

    ///
    /// Interpolated value at `coordinates` (one per axis).
    ///
    pub fn evaluate(&self, coordinates: &[f64]) -> Result<T, GridError>
    {
        if coordinates.len() != self.ndim()
        {
            return Err(GridError::DimensionMismatch { expected: self.ndim(), actual: coordinates.len() });
        }
        self.root.evaluate(&self.axes, coordinates, 0)
    }
}

impl<T> MultiFunction<T>
{
    ///
    /// Rebuild a table from its serialized layout. Every collection must be
    /// valid and there must be exactly one leaf per grid point.
    ///
    fn from_flat(table: FlatTable<T>) -> Result<Self, GridError>
    {
        let FlatTable { axes, collections, leaves } = table;
        check_ndim(axes.len())?;
        if collections.len() != axes.len()
        {
            return Err(GridError::MalformedTable(format!("{} axis policies but {} collections", axes.len(), collections.len())));
        }
        let mut expected = 1_usize;
        for collection in &collections
        {
            collection.validate()?;
            expected = expected.checked_mul(collection.len())
                .ok_or_else(|| GridError::MalformedTable("number of grid points overflows".to_string()))?;
        }
        if leaves.len() != expected
        {
            return Err(GridError::IncompleteTable(format!("{} of {} leaves present", leaves.len(), expected)));
        }
        let root = unflatten(&collections, &mut leaves.into_iter());
        Ok(Self { axes, root })
    }

    /// Number of axes.
    #[inline]
    pub fn ndim(&self) -> usize
    {
        self.axes.len()
    }

    pub fn axes(&self) -> &[AxisPolicy]
    {
        &self.axes
    }

    pub fn root(&self) -> &TableNode<T>
    {
        &self.root
    }

    ///
    /// Abscissae of every axis, outermost first.
    ///
    pub fn collections(&self) -> Vec<&AbscissaCollection>
    {
        let mut collections = Vec::with_capacity(self.ndim());
        let mut node = &self.root;
        loop
        {
            collections.push(&node.collection);
            match &node.entries
            {
                Entries::Nodes(nodes) if !nodes.is_empty() => node = &nodes[0],
                _ => break,
            }
        }
        collections
    }

    /// Number of stored leaf values.
    pub fn len(&self) -> usize
    {
        self.collections().iter().map(|c| c.len()).product()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

impl<T: Ordinate + Send + Sync> MultiFunction<T>
{
    ///
    /// Evaluate many points in parallel.
    ///
    pub fn evaluate_batch<P: AsRef<[f64]> + Sync>(&self, points: &[P]) -> Result<Vec<T>, GridError>
    {
        points.par_iter().map(|point| self.evaluate(point.as_ref())).collect()
    }
}

impl<T: Ordinate + Serialize + DeserializeOwned> MultiFunction<T>
{
    ///
    /// Write table to buffer with the specified serialization format.
    ///
    pub fn write_buffer(&self, format: SerializationFormat) -> Result<Vec<u8>, GridError>
    {
        serialization::serialize_framed(self, format)
    }

    ///
    /// Reads and compiles a table from buffer. The format is read from the header.
    ///
    pub fn read_buffer(buffer: &[u8]) -> Result<Self, GridError>
    {
        let mut function: Self = serialization::deserialize_framed(buffer)?;
        function.compile()?;
        Ok(function)
    }

    pub fn write<Writer: std::io::Write>(&self, writer: Writer, format: SerializationFormat) -> Result<(), GridError>
    {
        serialization::write_framed(self, writer, format)
    }

    pub fn read<Reader: std::io::Read>(reader: Reader) -> Result<Self, GridError>
    {
        let mut function: Self = serialization::read_framed(reader)?;
        function.compile()?;
        Ok(function)
    }

    ///
    /// Writes table to file with the specified serialization format.
    ///
    pub fn save<P: AsRef<Path>>(&self, path: P, format: SerializationFormat) -> Result<(), GridError>
    {
        let file = std::fs::File::create(path).map_err(GridError::FileIOError)?;
        self.write(std::io::BufWriter::new(file), format)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GridError>
    {
        let file = std::fs::File::open(path).map_err(GridError::FileIOError)?;
        Self::read(std::io::BufReader::new(file))
    }
}
