use std::{fmt::Display, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{collections::AbscissaCollection, errors::OscError};

///
/// Values an oscillation parameter can take: a number for a working point
/// or a collection of abscissae when a table is built.
///
pub trait ParameterValue: Clone + PartialEq + Display
{
    /// Parameter value holding exactly `value`.
    fn from_value(value: f64) -> Self;
    /// Smallest number represented by this value.
    fn lower_bound(&self) -> f64;
    fn parse_value(text: &str) -> Result<Self, OscError>;
}

impl ParameterValue for f64
{
    fn from_value(value: f64) -> Self
    {
        value
    }

    fn lower_bound(&self) -> f64
    {
        *self
    }

    fn parse_value(text: &str) -> Result<Self, OscError>
    {
        text.parse().map_err(|_| OscError::ParseError(format!("cannot parse '{text}' as a number")))
    }
}

impl ParameterValue for AbscissaCollection
{
    fn from_value(value: f64) -> Self
    {
        AbscissaCollection::single(value)
    }

    fn lower_bound(&self) -> f64
    {
        self.xmin()
    }

    fn parse_value(text: &str) -> Result<Self, OscError>
    {
        text.parse().map_err(|e: crate::errors::GridError| OscError::ParseError(e.to_string()))
    }
}

///
/// Parameter that may be undefined. Reading an undefined parameter is an error.
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OscParameter<T>(Option<T>);

impl<T> Default for OscParameter<T>
{
    fn default() -> Self
    {
        Self(None)
    }
}

impl<T> OscParameter<T>
{
    pub fn new(value: T) -> Self
    {
        Self(Some(value))
    }

    pub fn undefined() -> Self
    {
        Self(None)
    }

    pub fn is_defined(&self) -> bool
    {
        self.0.is_some()
    }

    pub fn value(&self) -> Result<&T, OscError>
    {
        self.0.as_ref().ok_or(OscError::UndefinedParameter)
    }

    pub fn set(&mut self, value: T)
    {
        self.0 = Some(value);
    }

    pub fn as_option(&self) -> Option<&T>
    {
        self.0.as_ref()
    }
}

impl<T> From<T> for OscParameter<T>
{
    fn from(value: T) -> Self
    {
        Self::new(value)
    }
}

/// Names of the oscillation parameters, in table axis order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OscParameterName
{
    /// Squared mass difference of the first and second mass eigenstates [eV2].
    DM21sq,
    /// Squared mass difference of the first and third mass eigenstates [eV2].
    DM31sq,
    /// PMNS phase [pi rad].
    DeltaCP,
    /// Squared sine of the mixing angle between the first and second mass eigenstates.
    SinsqTh12,
    /// Squared sine of the mixing angle between the first and third mass eigenstates.
    SinsqTh13,
    /// Squared sine of the mixing angle between the second and third mass eigenstates.
    SinsqTh23,
}

impl OscParameterName
{
    pub const ALL: [OscParameterName; 6] = [
        OscParameterName::DM21sq,
        OscParameterName::DM31sq,
        OscParameterName::DeltaCP,
        OscParameterName::SinsqTh12,
        OscParameterName::SinsqTh13,
        OscParameterName::SinsqTh23,
    ];

    pub fn as_str(&self) -> &'static str
    {
        match self
        {
            OscParameterName::DM21sq => "dM21sq",
            OscParameterName::DM31sq => "dM31sq",
            OscParameterName::DeltaCP => "deltaCP",
            OscParameterName::SinsqTh12 => "sinsqTh12",
            OscParameterName::SinsqTh13 => "sinsqTh13",
            OscParameterName::SinsqTh23 => "sinsqTh23",
        }
    }

    /// Squared sines of mixing angles cannot be negative.
    pub fn is_squared_sine(&self) -> bool
    {
        matches!(self, OscParameterName::SinsqTh12 | OscParameterName::SinsqTh13 | OscParameterName::SinsqTh23)
    }
}

impl Display for OscParameterName
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for OscParameterName
{
    type Err = OscError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        Self::ALL.into_iter().find(|name| name.as_str() == s).ok_or_else(|| OscError::InvalidParameterName(s.to_string()))
    }
}

///
/// The six oscillation parameters, each possibly undefined.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OscParameters<T>
{
    #[serde(rename = "dM21sq", default)]
    pub dm21sq: OscParameter<T>,
    #[serde(rename = "dM31sq", default)]
    pub dm31sq: OscParameter<T>,
    #[serde(rename = "deltaCP", default)]
    pub delta_cp: OscParameter<T>,
    #[serde(rename = "sinsqTh12", default)]
    pub sinsq_th12: OscParameter<T>,
    #[serde(rename = "sinsqTh13", default)]
    pub sinsq_th13: OscParameter<T>,
    #[serde(rename = "sinsqTh23", default)]
    pub sinsq_th23: OscParameter<T>,
}

/// Parameter grids spanning the first six axes of an oscillation table.
pub type OscParametersGrid = OscParameters<AbscissaCollection>;

impl<T> Default for OscParameters<T>
{
    fn default() -> Self
    {
        Self {
            dm21sq: OscParameter::undefined(),
            dm31sq: OscParameter::undefined(),
            delta_cp: OscParameter::undefined(),
            sinsq_th12: OscParameter::undefined(),
            sinsq_th13: OscParameter::undefined(),
            sinsq_th23: OscParameter::undefined(),
        }
    }
}

impl<T> OscParameters<T>
{
    pub fn get(&self, name: OscParameterName) -> &OscParameter<T>
    {
        match name
        {
            OscParameterName::DM21sq => &self.dm21sq,
            OscParameterName::DM31sq => &self.dm31sq,
            OscParameterName::DeltaCP => &self.delta_cp,
            OscParameterName::SinsqTh12 => &self.sinsq_th12,
            OscParameterName::SinsqTh13 => &self.sinsq_th13,
            OscParameterName::SinsqTh23 => &self.sinsq_th23,
        }
    }

    pub fn get_mut(&mut self, name: OscParameterName) -> &mut OscParameter<T>
    {
        match name
        {
            OscParameterName::DM21sq => &mut self.dm21sq,
            OscParameterName::DM31sq => &mut self.dm31sq,
            OscParameterName::DeltaCP => &mut self.delta_cp,
            OscParameterName::SinsqTh12 => &mut self.sinsq_th12,
            OscParameterName::SinsqTh13 => &mut self.sinsq_th13,
            OscParameterName::SinsqTh23 => &mut self.sinsq_th23,
        }
    }

    /// Parameters in axis order with their names.
    pub fn iter(&self) -> impl Iterator<Item = (OscParameterName, &OscParameter<T>)>
    {
        OscParameterName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }

    /// Number of defined parameters.
    pub fn size(&self) -> usize
    {
        self.iter().filter(|(_, parameter)| parameter.is_defined()).count()
    }

    /// True if every parameter defined in `other` is defined here too.
    pub fn contains(&self, other: &Self) -> bool
    {
        self.iter().zip(other.iter()).all(|((_, mine), (_, theirs))| mine.is_defined() || !theirs.is_defined())
    }
}

impl<T: ParameterValue> OscParameters<T>
{
    pub fn new(dm21sq: T, dm31sq: T, delta_cp: T, sinsq_th12: T, sinsq_th13: T, sinsq_th23: T) -> Result<Self, OscError>
    {
        let parameters = Self {
            dm21sq: dm21sq.into(),
            dm31sq: dm31sq.into(),
            delta_cp: delta_cp.into(),
            sinsq_th12: sinsq_th12.into(),
            sinsq_th13: sinsq_th13.into(),
            sinsq_th23: sinsq_th23.into(),
        };
        parameters.validate()?;
        Ok(parameters)
    }

    ///
    /// NuFIT 5.1 best fit for normal (`inverted = false`) or inverted mass ordering.
    ///
    pub fn best_fit(inverted: bool) -> Self
    {
        let value = |normal: f64, inverted_value: f64| OscParameter::new(T::from_value(if inverted { inverted_value } else { normal }));
        Self {
            dm21sq: value(7.42e-5, 7.42e-5),
            dm31sq: value(2.510e-3, -2.490e-3 + 7.42e-5),
            delta_cp: value(1.278, 1.544),
            sinsq_th12: value(0.304, 0.304),
            sinsq_th13: value(0.02246, 0.02241),
            sinsq_th23: value(0.450, 0.570),
        }
    }

    ///
    /// Set the parameter called `name`.
    ///
    pub fn set(&mut self, name: &str, value: T) -> Result<&mut Self, OscError>
    {
        let name: OscParameterName = name.parse()?;
        check_value(name, &value)?;
        self.get_mut(name).set(value);
        Ok(self)
    }

    ///
    /// Overwrite the parameters that are defined in `other`.
    ///
    pub fn join(&mut self, other: &Self) -> &mut Self
    {
        for name in OscParameterName::ALL
        {
            if let Some(value) = other.get(name).as_option()
            {
                self.get_mut(name).set(value.clone());
            }
        }
        self
    }

    pub fn is_valid(&self) -> bool
    {
        self.validate().is_ok()
    }

    ///
    /// Reject negative squared sines.
    ///
    pub fn validate(&self) -> Result<(), OscError>
    {
        for (name, parameter) in self.iter()
        {
            if let Some(value) = parameter.as_option()
            {
                check_value(name, value)?;
            }
        }
        Ok(())
    }

    ///
    /// Values of all six parameters in axis order.
    ///
    pub fn values(&self) -> Result<Vec<T>, OscError>
    {
        self.iter().map(|(name, parameter)| parameter.as_option().cloned().ok_or(OscError::MissingParameter(name.as_str()))).collect()
    }

    ///
    /// Read parameters in `name = value` text form from `path`.
    ///
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OscError>
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| OscError::FileOpen { path: path.display().to_string(), source })?;
        text.parse()
    }
}

fn check_value<T: ParameterValue>(name: OscParameterName, value: &T) -> Result<(), OscError>
{
    let lower_bound = value.lower_bound();
    if name.is_squared_sine() && lower_bound < 0.0
    {
        return Err(OscError::InvalidParameterValue { name: name.as_str(), value: lower_bound });
    }
    Ok(())
}

impl<T: ParameterValue> FromStr for OscParameters<T>
{
    type Err = OscError;

    ///
    /// Parse `name = value` pairs. Later definitions of a name win.
    ///
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let mut parameters = Self::default();
        for (name, value) in super::properties(s)?
        {
            parameters.set(name, T::parse_value(value)?)?;
        }
        Ok(parameters)
    }
}

impl<T: Display> Display for OscParameters<T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        for (name, parameter) in self.iter()
        {
            if let Some(value) = parameter.as_option()
            {
                writeln!(f, "{name} = {value}")?;
            }
        }
        Ok(())
    }
}
