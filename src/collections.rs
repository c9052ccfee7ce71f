use std::{cmp::Ordering, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::GridError;

///
/// Ordered sample points along one axis of a table.
///
/// `Grid` stores `size` equidistant abscissae between `xmin` and `xmax`
/// (closed-form index/value mapping). `Set` stores explicit, strictly
/// increasing abscissae (lookup by binary search).
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AbscissaCollection
{
    Grid { size: usize, xmin: f64, xmax: f64 },
    Set(Vec<f64>),
}

impl AbscissaCollection
{
    ///
    /// Equidistant grid of `size` points spanning `[xmin, xmax]`.
    ///
    pub fn grid(size: usize, xmin: f64, xmax: f64) -> Result<Self, GridError>
    {
        let grid = Self::Grid { size, xmin, xmax };
        grid.validate()?;
        Ok(grid)
    }

    ///
    /// Grid holding the single abscissa `value`.
    ///
    pub fn single(value: f64) -> Self
    {
        Self::Grid { size: 1, xmin: value, xmax: value }
    }

    ///
    /// Explicit set of abscissae. Values are sorted; duplicates are rejected.
    ///
    pub fn set(mut values: Vec<f64>) -> Result<Self, GridError>
    {
        if values.iter().any(|x| !x.is_finite())
        {
            return Err(GridError::InvalidCollection("non-finite abscissa".to_string()));
        }
        values.sort_by(f64::total_cmp);
        let set = Self::Set(values);
        set.validate()?;
        Ok(set)
    }

    ///
    /// Check the invariants: at least one point, finite limits, `xmin <= xmax`
    /// for grids (equal exactly when the grid has one point) and strictly
    /// increasing values for sets.
    ///
    pub fn validate(&self) -> Result<(), GridError>
    {
        match self
        {
            Self::Grid { size, xmin, xmax } =>
            {
                if *size == 0
                {
                    return Err(GridError::InvalidCollection("grid without points".to_string()));
                }
                if !xmin.is_finite() || !xmax.is_finite() || xmin > xmax
                {
                    return Err(GridError::InvalidCollection(format!("invalid grid limits [{xmin}, {xmax}]")));
                }
                if *size > 1 && xmin == xmax
                {
                    return Err(GridError::InvalidCollection(format!("{size} grid points at the single abscissa {xmin}")));
                }
                if *size == 1 && xmin != xmax
                {
                    return Err(GridError::InvalidCollection(format!("single grid point cannot span [{xmin}, {xmax}]")));
                }
                Ok(())
            }
            Self::Set(values) =>
            {
                if values.is_empty()
                {
                    return Err(GridError::InvalidCollection("set without points".to_string()));
                }
                if let Some(pair) = values.windows(2).find(|pair| !(pair[0] < pair[1]))
                {
                    return Err(GridError::InvalidCollection(format!("abscissae not strictly increasing at {} -> {}", pair[0], pair[1])));
                }
                Ok(())
            }
        }
    }

    /// Number of abscissae.
    #[inline]
    pub fn len(&self) -> usize
    {
        match self
        {
            Self::Grid { size, .. } => *size,
            Self::Set(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    ///
    /// Abscissa at `index`. The last grid point is `xmax` exactly.
    ///
    #[inline]
    pub fn x(&self, index: usize) -> f64
    {
        match self
        {
            Self::Grid { size, xmin, xmax } =>
            {
                if index == 0
                {
                    *xmin
                }
                else if index + 1 == *size
                {
                    *xmax
                }
                else
                {
                    xmin + index as f64 * ((xmax - xmin) / (size - 1) as f64)
                }
            }
            Self::Set(values) => values[index],
        }
    }

    #[inline]
    pub fn xmin(&self) -> f64
    {
        self.x(0)
    }

    #[inline]
    pub fn xmax(&self) -> f64
    {
        self.x(self.len() - 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_
    {
        (0..self.len()).map(|i| self.x(i))
    }

    /// True if `x` lies within `[xmin, xmax]`.
    pub fn contains(&self, x: f64) -> bool
    {
        self.xmin() <= x && x <= self.xmax()
    }

    ///
    /// Index associated with `x`. For a grid this is the nearest grid index,
    /// which can be negative or `>= len()` when `x` is outside the range.
    /// For a set it is the insertion point (first abscissa `>= x`).
    ///
    pub fn index(&self, x: f64) -> isize
    {
        match self
        {
            Self::Grid { size, xmin, xmax } =>
            {
                if *size == 1
                {
                    0
                }
                else
                {
                    ((*size - 1) as f64 * (x - xmin) / (xmax - xmin)).round() as isize
                }
            }
            Self::Set(values) => values.partition_point(|&v| v < x) as isize,
        }
    }

    ///
    /// Left end of the bracketing interval: the largest `i <= len() - 2` with
    /// `x(i) <= x`, or 0 when `x` lies below the range. Intervals are closed on
    /// the left and open on the right, except for the last one which also
    /// contains `xmax`. Requires at least two abscissae.
    ///
    pub fn lower_index(&self, x: f64) -> usize
    {
        let n = self.len();
        debug_assert!(n >= 2);
        let last = n - 2;
        match self
        {
            Self::Grid { size, xmin, xmax } =>
            {
                let estimate = ((*size - 1) as f64 * (x - xmin) / (xmax - xmin)).floor();
                let mut i = if estimate <= 0.0 { 0 } else { (estimate as usize).min(last) };
                // settle rounding of the estimate against the stored abscissae
                while i > 0 && self.x(i) > x
                {
                    i -= 1;
                }
                while i < last && self.x(i + 1) <= x
                {
                    i += 1;
                }
                i
            }
            Self::Set(values) => values.partition_point(|&v| v <= x).saturating_sub(1).min(last),
        }
    }

    ///
    /// Equivalent grid if the abscissae of this collection are reproduced
    /// bit-for-bit by a grid, otherwise a clone of this collection.
    ///
    pub fn normalized(&self) -> Self
    {
        match self
        {
            Self::Grid { .. } => self.clone(),
            Self::Set(values) if values.is_empty() => self.clone(),
            Self::Set(values) =>
            {
                let grid = Self::Grid { size: values.len(), xmin: values[0], xmax: values[values.len() - 1] };
                if grid.iter().zip(values).all(|(a, &b)| a.to_bits() == b.to_bits())
                {
                    grid
                }
                else
                {
                    self.clone()
                }
            }
        }
    }
}

impl PartialEq for AbscissaCollection
{
    fn eq(&self, other: &Self) -> bool
    {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl PartialOrd for AbscissaCollection
{
    ///
    /// Ordered by `xmin`, then `xmax`, then size. Equal if all abscissae match.
    ///
    fn partial_cmp(&self, other: &Self) -> Option<Ordering>
    {
        if self == other
        {
            return Some(Ordering::Equal);
        }
        let ordering = self.xmin().partial_cmp(&other.xmin())?
            .then(self.xmax().partial_cmp(&other.xmax())?)
            .then(self.len().cmp(&other.len()));
        match ordering
        {
            // same limits and size, but different inner abscissae
            Ordering::Equal => None,
            ordering => Some(ordering),
        }
    }
}

impl Display for AbscissaCollection
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self
        {
            Self::Grid { size, xmin, xmax } => write!(f, "{size} {xmin} {xmax}"),
            Self::Set(values) =>
            {
                write!(f, "{{")?;
                for (i, x) in values.iter().enumerate()
                {
                    if i > 0
                    {
                        write!(f, " ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl FromStr for AbscissaCollection
{
    type Err = GridError;

    ///
    /// Parses `size xmin xmax` as a grid, a single number as a one-point grid
    /// and `{x0 x1 ...}` as a set.
    ///
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |token: &str| token.parse::<f64>().map_err(|_| GridError::InvalidCollection(format!("cannot parse '{token}'")));
        if let Some(inner) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
        {
            let values = inner.split_whitespace().map(parse).collect::<Result<Vec<_>, _>>()?;
            return Self::set(values);
        }
        let tokens: Vec<&str> = s.split_whitespace().collect();
        match tokens.as_slice()
        {
            [value] =>
            {
                let value = parse(value)?;
                let single = Self::single(value);
                single.validate()?;
                Ok(single)
            }
            [size, xmin, xmax] =>
            {
                let size = size.parse::<usize>().map_err(|_| GridError::InvalidCollection(format!("cannot parse grid size '{size}'")))?;
                Self::grid(size, parse(xmin)?, parse(xmax)?)
            }
            _ => Err(GridError::InvalidCollection(format!("cannot parse '{s}'"))),
        }
    }
}

#[test]
fn check_grid_abscissae()
{
    let grid = AbscissaCollection::grid(5, -1.0, 1.0).unwrap();
    assert_eq!(grid.len(), 5);
    assert_eq!(grid.x(0), -1.0);
    assert_eq!(grid.x(2), 0.0);
    assert_eq!(grid.x(4), 1.0);
    assert_eq!(grid.xmin(), -1.0);
    assert_eq!(grid.xmax(), 1.0);
    assert_eq!(grid.index(0.3), 3);
    assert_eq!(grid.index(-3.0), -4);
}

#[test]
fn check_index_round_trip()
{
    let collections = [
        AbscissaCollection::grid(11, 0.1, 7.3).unwrap(),
        AbscissaCollection::grid(101, -1.0, 1.0).unwrap(),
        AbscissaCollection::set(vec![0.5, -2.0, 1e-3, 40.0, 3.25]).unwrap(),
        AbscissaCollection::single(2.5),
    ];
    for collection in &collections
    {
        for i in 0..collection.len()
        {
            let x = collection.x(i);
            let j = collection.index(x);
            assert_eq!(j, i as isize);
            assert_eq!(collection.x(j as usize), x);
        }
    }
}

#[test]
fn check_lower_index()
{
    let set = AbscissaCollection::set(vec![0.0, 1.0, 3.0, 7.0]).unwrap();
    assert_eq!(set.lower_index(-1.0), 0);
    assert_eq!(set.lower_index(0.0), 0);
    assert_eq!(set.lower_index(0.999), 0);
    // an abscissa belongs to the interval on its right
    assert_eq!(set.lower_index(1.0), 1);
    assert_eq!(set.lower_index(3.0), 2);
    // except for the last one
    assert_eq!(set.lower_index(7.0), 2);
    assert_eq!(set.lower_index(9.0), 2);

    let grid = AbscissaCollection::grid(31, 0.0, 0.3).unwrap();
    for i in 0..30
    {
        assert_eq!(grid.lower_index(grid.x(i)), i);
    }
    assert_eq!(grid.lower_index(grid.x(30)), 29);
}

#[test]
fn check_set_invariants()
{
    let set = AbscissaCollection::set(vec![3.0, 1.0, 2.0]).unwrap();
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    assert!(AbscissaCollection::set(vec![1.0, 2.0, 1.0]).is_err());
    assert!(AbscissaCollection::set(vec![]).is_err());
    assert!(AbscissaCollection::set(vec![f64::NAN]).is_err());
    assert!(AbscissaCollection::grid(0, 0.0, 1.0).is_err());
    assert!(AbscissaCollection::grid(3, 1.0, 0.0).is_err());
    assert!(AbscissaCollection::Set(vec![2.0, 1.0]).validate().is_err());
    // a one-point grid has no extent
    assert!(AbscissaCollection::grid(1, 0.0, 5.0).is_err());
    assert!(AbscissaCollection::Grid { size: 1, xmin: 2e-3, xmax: 3e-3 }.validate().is_err());
    assert!("1 2e-3 3e-3".parse::<AbscissaCollection>().is_err());
    assert_eq!(AbscissaCollection::grid(1, 2.5, 2.5).unwrap(), AbscissaCollection::single(2.5));
}

#[test]
fn check_equality_and_ordering()
{
    let grid = AbscissaCollection::grid(3, 0.0, 2.0).unwrap();
    let set = AbscissaCollection::set(vec![0.0, 1.0, 2.0]).unwrap();
    assert_eq!(grid, set);
    assert_eq!(set.normalized(), grid);
    assert!(matches!(set.normalized(), AbscissaCollection::Grid { size: 3, .. }));
    assert!(matches!(AbscissaCollection::set(vec![0.0, 1.0, 5.0]).unwrap().normalized(), AbscissaCollection::Set(_)));

    let wider = AbscissaCollection::grid(3, 0.0, 4.0).unwrap();
    let shifted = AbscissaCollection::grid(3, -1.0, 2.0).unwrap();
    let denser = AbscissaCollection::grid(5, 0.0, 2.0).unwrap();
    assert!(shifted < grid);
    assert!(grid < wider);
    assert!(grid < denser);
    assert_eq!(grid.partial_cmp(&set), Some(Ordering::Equal));
}

#[test]
fn check_parse_and_display()
{
    let grid: AbscissaCollection = "5 0 1".parse().unwrap();
    assert_eq!(grid, AbscissaCollection::grid(5, 0.0, 1.0).unwrap());
    assert_eq!(grid.to_string(), "5 0 1");
    let single: AbscissaCollection = "0.45".parse().unwrap();
    assert_eq!(single, AbscissaCollection::single(0.45));
    let set: AbscissaCollection = "{0 0.5 2}".parse().unwrap();
    assert_eq!(set.to_string().parse::<AbscissaCollection>().unwrap(), set);
    assert!("1 2".parse::<AbscissaCollection>().is_err());
    assert!("a b c".parse::<AbscissaCollection>().is_err());
}
