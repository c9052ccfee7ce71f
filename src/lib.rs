//! N-dimensional interpolation tables and neutrino oscillation probability lookup.
//!
//! A [`MultiFunction`](grids::multi_function::MultiFunction) stores values on
//! a rectangular grid of [`AbscissaCollection`](collections::AbscissaCollection)s
//! and interpolates them axis by axis, each axis with its own
//! [`AxisPolicy`](algorithms::polint::AxisPolicy). The [`oscprob`] module
//! specializes it to oscillation probabilities.

pub mod algorithms;
pub mod collections;
pub mod errors;
pub mod grids;
pub mod oscprob;
pub mod serialization;
pub mod utilities;
