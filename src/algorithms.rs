pub mod lagrange;
pub mod polint;
