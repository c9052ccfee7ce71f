//! Per-axis interpolation policies.
//!
//! Each axis of a table carries an [`AxisPolicy`]. For a query value the
//! policy selects a window of neighbouring abscissae and the weights with
//! which the values stored there are combined. Combining the weighted values
//! of every axis in turn yields the N-dimensional interpolation.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{collections::AbscissaCollection, errors::GridError};

use super::lagrange::{lagrange_coeffs, lagrange_weights};

/// Maximum number of abscissae in one interpolation window.
pub const MAX_WINDOW: usize = 16;

/// Highest supported polynomial order.
pub const MAX_ORDER: u32 = MAX_WINDOW as u32 - 1;

/// Relative tolerance (of the axis extent) by which a query may exceed the
/// bounds of an axis with [`Extrapolation::Strict`].
pub const BOUNDARY_TOLERANCE: f64 = 1e-12;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation
{
    /// Nearest abscissa, no smoothing.
    Flat,
    /// Linear interpolation between the two bracketing abscissae.
    #[default]
    Linear,
    /// Polynomial of the given order (>= 2) through `order + 1` neighbours.
    Polynomial(u32),
}

impl Interpolation
{
    pub fn from_order(order: u32) -> Result<Self, GridError>
    {
        match order
        {
            0 => Ok(Self::Flat),
            1 => Ok(Self::Linear),
            2..=MAX_ORDER => Ok(Self::Polynomial(order)),
            _ => Err(GridError::InvalidOrder(order)),
        }
    }

    pub fn order(&self) -> u32
    {
        match self
        {
            Self::Flat => 0,
            Self::Linear => 1,
            Self::Polynomial(order) => *order,
        }
    }

    pub fn validate(&self) -> Result<(), GridError>
    {
        match self
        {
            Self::Polynomial(order) if *order < 2 || *order > MAX_ORDER => Err(GridError::InvalidOrder(*order)),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extrapolation
{
    /// Queries outside the axis are evaluated at the nearest edge.
    #[default]
    Clamp,
    /// Queries outside the axis (beyond [`BOUNDARY_TOLERANCE`]) are rejected.
    Strict,
}

///
/// Interpolation strategy of one table axis.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisPolicy
{
    pub interpolation: Interpolation,
    pub extrapolation: Extrapolation,
}

///
/// Window of abscissa indices and the weight of each index in the window.
///
#[derive(Clone, Copy, Debug)]
pub struct AxisWeights
{
    start: usize,
    len: usize,
    weights: [f64; MAX_WINDOW],
}

impl AxisWeights
{
    fn unit(index: usize) -> Self
    {
        let mut weights = [0.0; MAX_WINDOW];
        weights[0] = 1.0;
        Self { start: index, len: 1, weights }
    }

    /// Indices of the abscissae in the window.
    #[inline]
    pub fn range(&self) -> Range<usize>
    {
        self.start..self.start + self.len
    }

    #[inline]
    pub fn weights(&self) -> &[f64]
    {
        &self.weights[..self.len]
    }
}

impl AxisPolicy
{
    pub fn new(interpolation: Interpolation, extrapolation: Extrapolation) -> Self
    {
        Self { interpolation, extrapolation }
    }

    pub fn flat() -> Self
    {
        Self::new(Interpolation::Flat, Extrapolation::Clamp)
    }

    pub fn linear() -> Self
    {
        Self::new(Interpolation::Linear, Extrapolation::Clamp)
    }

    pub fn polynomial(order: u32) -> Result<Self, GridError>
    {
        Ok(Self::new(Interpolation::from_order(order)?, Extrapolation::Clamp))
    }

    /// Same interpolation, rejecting queries outside the axis.
    pub fn strict(self) -> Self
    {
        Self { extrapolation: Extrapolation::Strict, ..self }
    }

    ///
    /// Select the window of `collection` used to interpolate at `x` and the
    /// weight of each abscissa in it. `axis` only labels errors.
    ///
    pub fn weights(&self, axis: usize, collection: &AbscissaCollection, x: f64) -> Result<AxisWeights, GridError>
    {
        if !x.is_finite()
        {
            return Err(GridError::NonFiniteCoordinate { axis, x });
        }
        let n = collection.len();
        let (xmin, xmax) = (collection.xmin(), collection.xmax());
        if self.extrapolation == Extrapolation::Strict
        {
            let tolerance = BOUNDARY_TOLERANCE * (xmax - xmin).max(xmin.abs()).max(xmax.abs());
            if x < xmin - tolerance || x > xmax + tolerance
            {
                return Err(GridError::OutOfDomain { axis, x, xmin, xmax });
            }
        }
        let x = x.clamp(xmin, xmax);
        if n == 1
        {
            return Ok(AxisWeights::unit(0));
        }
        let i = collection.lower_index(x);
        let (x0, x1) = (collection.x(i), collection.x(i + 1));
        match self.interpolation
        {
            Interpolation::Flat =>
            {
                // ties go to the lower abscissa
                if x1 - x < x - x0
                {
                    Ok(AxisWeights::unit(i + 1))
                }
                else
                {
                    Ok(AxisWeights::unit(i))
                }
            }
            Interpolation::Linear =>
            {
                if x == x0
                {
                    return Ok(AxisWeights::unit(i));
                }
                if x == x1
                {
                    return Ok(AxisWeights::unit(i + 1));
                }
                let a = (x1 - x) / (x1 - x0);
                let mut weights = [0.0; MAX_WINDOW];
                weights[0] = a;
                weights[1] = 1.0 - a;
                Ok(AxisWeights { start: i, len: 2, weights })
            }
            Interpolation::Polynomial(order) =>
            {
                let m = (order as usize + 1).min(n).min(MAX_WINDOW);
                // centre the window on the bracketing interval, shifted inwards at the edges
                let start = (i + 1).saturating_sub((m + 1) / 2).min(n - m);
                let mut points = [0.0; MAX_WINDOW];
                let mut coeffs = [0.0; MAX_WINDOW];
                let mut weights = [0.0; MAX_WINDOW];
                for (j, point) in points[..m].iter_mut().enumerate()
                {
                    *point = collection.x(start + j);
                }
                lagrange_coeffs(&points[..m], &mut coeffs[..m]);
                lagrange_weights(x, &coeffs[..m], &points[..m], &mut weights);
                Ok(AxisWeights { start, len: m, weights })
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn combine(weights: &AxisWeights, values: &[f64]) -> f64
    {
        weights.range().zip(weights.weights()).map(|(i, w)| w * values[i]).sum()
    }

    #[test]
    fn test_linear_weights()
    {
        let axis = AbscissaCollection::grid(3, 0.0, 2.0).unwrap();
        let w = AxisPolicy::linear().weights(0, &axis, 0.25).unwrap();
        assert_eq!(w.range(), 0..2);
        assert_eq!(w.weights(), &[0.75, 0.25]);
        let w = AxisPolicy::linear().weights(0, &axis, 1.5).unwrap();
        assert_eq!(w.range(), 1..3);
    }

    #[test]
    fn test_clamped_extrapolation()
    {
        let axis = AbscissaCollection::set(vec![1.0, 2.0, 4.0]).unwrap();
        let values = [10.0, 20.0, 40.0];
        for policy in [AxisPolicy::flat(), AxisPolicy::linear(), AxisPolicy::polynomial(2).unwrap()]
        {
            assert_eq!(combine(&policy.weights(0, &axis, -5.0).unwrap(), &values), 10.0);
            assert_eq!(combine(&policy.weights(0, &axis, 9.0).unwrap(), &values), 40.0);
        }
    }

    #[test]
    fn test_strict_bounds()
    {
        let axis = AbscissaCollection::grid(5, 0.0, 1.0).unwrap();
        let policy = AxisPolicy::linear().strict();
        assert!(policy.weights(0, &axis, 1.0 + 1e-15).is_ok());
        assert!(policy.weights(0, &axis, -1e-15).is_ok());
        assert!(matches!(policy.weights(3, &axis, 1.1), Err(GridError::OutOfDomain { axis: 3, .. })));
        assert!(matches!(policy.weights(0, &axis, -0.1), Err(GridError::OutOfDomain { .. })));

        let single = AbscissaCollection::single(7.42e-5);
        assert!(policy.weights(0, &single, 7.42e-5).is_ok());
        assert!(policy.weights(0, &single, 7.5e-5).is_err());
        // clamped single point axes accept anything
        assert!(AxisPolicy::linear().weights(0, &single, 1.0).is_ok());
    }

    #[test]
    fn test_non_finite_query()
    {
        let axis = AbscissaCollection::grid(5, 0.0, 1.0).unwrap();
        assert!(matches!(AxisPolicy::linear().weights(1, &axis, f64::NAN), Err(GridError::NonFiniteCoordinate { axis: 1, .. })));
    }

    #[test]
    fn test_flat_tie_breaking()
    {
        let axis = AbscissaCollection::grid(3, 0.0, 2.0).unwrap();
        assert_eq!(AxisPolicy::flat().weights(0, &axis, 0.5).unwrap().range(), 0..1);
        assert_eq!(AxisPolicy::flat().weights(0, &axis, 0.5000001).unwrap().range(), 1..2);
        assert_eq!(AxisPolicy::flat().weights(0, &axis, 1.4).unwrap().range(), 1..2);
    }

    #[test]
    fn test_polynomial_window()
    {
        let axis = AbscissaCollection::grid(10, 0.0, 9.0).unwrap();
        let policy = AxisPolicy::polynomial(2).unwrap();
        assert_eq!(policy.weights(0, &axis, 4.5).unwrap().range(), 3..6);
        // windows are shifted inwards at the edges
        assert_eq!(policy.weights(0, &axis, 0.2).unwrap().range(), 0..3);
        assert_eq!(policy.weights(0, &axis, 8.9).unwrap().range(), 7..10);

        let cubic = AxisPolicy::polynomial(3).unwrap();
        assert_eq!(cubic.weights(0, &axis, 4.5).unwrap().range(), 3..7);

        // polynomials up to the order are reproduced
        let values: Vec<f64> = axis.iter().map(|x| 2.0 + x - 0.5 * x * x).collect();
        let y = combine(&policy.weights(0, &axis, 4.3).unwrap(), &values);
        assert!((y - (2.0 + 4.3 - 0.5 * 4.3 * 4.3)).abs() < 1e-12);

        // order larger than the axis uses every abscissa
        let small = AbscissaCollection::grid(2, 0.0, 1.0).unwrap();
        assert_eq!(AxisPolicy::polynomial(5).unwrap().weights(0, &small, 0.5).unwrap().range(), 0..2);
    }

    #[test]
    fn test_exact_at_abscissae()
    {
        let axis = AbscissaCollection::set(vec![0.0, 0.1, 0.35, 0.5, 0.9, 1.7]).unwrap();
        let values: Vec<f64> = axis.iter().map(|x| (3.0 * x).sin()).collect();
        for order in 0..6
        {
            let policy = AxisPolicy::polynomial(order).unwrap();
            for (i, x) in axis.iter().enumerate()
            {
                assert_eq!(combine(&policy.weights(0, &axis, x).unwrap(), &values), values[i]);
            }
        }
    }

    #[test]
    fn test_invalid_order()
    {
        assert!(matches!(Interpolation::from_order(MAX_ORDER + 1), Err(GridError::InvalidOrder(_))));
        assert!(Interpolation::Polynomial(1).validate().is_err());
        assert!(Interpolation::Polynomial(3).validate().is_ok());
        assert_eq!(Interpolation::from_order(0).unwrap(), Interpolation::Flat);
        assert_eq!(Interpolation::Polynomial(4).order(), 4);
    }
}
