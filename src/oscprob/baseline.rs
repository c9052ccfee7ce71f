use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::OscError;

///
/// Maps the cosine of the zenith angle onto the baseline [km] through a
/// spherical shell: the detector sits at depth `Lmin` below the surface of
/// a sphere of diameter `Lmax + Lmin`.
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BaselineLimits")]
pub struct BaselineCalculator
{
    lmin: f64,
    lmax: f64,
}

/// Serialized form of a [`BaselineCalculator`], checked by [`BaselineCalculator::new`].
#[derive(Deserialize)]
struct BaselineLimits
{
    lmin: f64,
    lmax: f64,
}

impl TryFrom<BaselineLimits> for BaselineCalculator
{
    type Error = OscError;

    fn try_from(limits: BaselineLimits) -> Result<Self, Self::Error>
    {
        Self::new(limits.lmin, limits.lmax)
    }
}

impl BaselineCalculator
{
    ///
    /// Requires finite `0 <= lmin < lmax`.
    ///
    pub fn new(lmin: f64, lmax: f64) -> Result<Self, OscError>
    {
        if !lmin.is_finite() || lmin < 0.0
        {
            return Err(OscError::InvalidParameterValue { name: "Lmin", value: lmin });
        }
        if !lmax.is_finite() || lmax <= lmin
        {
            return Err(OscError::InvalidParameterValue { name: "Lmax", value: lmax });
        }
        Ok(Self { lmin, lmax })
    }

    pub fn minimum_baseline(&self) -> f64
    {
        self.lmin
    }

    pub fn maximum_baseline(&self) -> f64
    {
        self.lmax
    }

    /// Distance `r` of the detector from the centre of the sphere.
    pub fn inner_radius(&self) -> f64
    {
        0.5 * (self.lmax - self.lmin)
    }

    /// Radius `R` of the sphere.
    pub fn outer_radius(&self) -> f64
    {
        0.5 * (self.lmax + self.lmin)
    }

    ///
    /// Baseline for zenith cosine `costh`, clamped to `[-1, 1]`.
    ///
    pub fn baseline(&self, costh: f64) -> f64
    {
        let (r, big_r) = (self.inner_radius(), self.outer_radius());
        let ct = costh.clamp(-1.0, 1.0);
        -r * ct + (big_r * big_r - r * r * (1.0 - ct) * (1.0 + ct)).sqrt()
    }

    ///
    /// Zenith cosine for baseline `l`, inverse of [`baseline`](Self::baseline)
    /// on `[Lmin, Lmax]`.
    ///
    pub fn costh(&self, l: f64) -> f64
    {
        let (r, big_r) = (self.inner_radius(), self.outer_radius());
        (big_r * big_r - r * r - l * l) / (2.0 * l * r)
    }
}

impl Display for BaselineCalculator
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "{} {}", self.lmin, self.lmax)
    }
}

impl FromStr for BaselineCalculator
{
    type Err = OscError;

    /// Parses `Lmin Lmax`.
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let values = s.split_whitespace()
            .map(|token| token.parse::<f64>().map_err(|_| OscError::ParseError(format!("cannot parse baseline '{token}'"))))
            .collect::<Result<Vec<_>, _>>()?;
        match values.as_slice()
        {
            [lmin, lmax] => Self::new(*lmin, *lmax),
            _ => Err(OscError::ParseError(format!("expected 'Lmin Lmax', got '{}'", s.trim()))),
        }
    }
}
