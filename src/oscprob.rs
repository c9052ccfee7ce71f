//! Neutrino oscillation probabilities looked up from an 8-dimensional table.
//!
//! The six oscillation parameters, L/E and the cosine of the zenith angle
//! span the axes of a [`MultiFunction`](crate::grids::multi_function::MultiFunction)
//! whose leaves hold the probabilities of all [`OSC_CHANNELS`](channel::OSC_CHANNELS).

pub mod baseline;
pub mod channel;
pub mod interpolator;
pub mod parameters;

use crate::errors::OscError;

/// Characters separating `name = value` pairs in property text.
const SEPARATORS: [char; 4] = ['\n', '\r', ';', ','];

///
/// Split property text into `(name, value)` pairs. Pairs are separated by
/// newlines, carriage returns, `;` or `,`; `#` comments out the rest of a line.
///
pub(crate) fn properties(text: &str) -> Result<Vec<(&str, &str)>, OscError>
{
    let mut pairs = Vec::new();
    for line in text.lines()
    {
        let line = line.split('#').next().unwrap_or_default();
        for item in line.split(SEPARATORS).map(str::trim).filter(|item| !item.is_empty())
        {
            let (name, value) = item.split_once('=').ok_or_else(|| OscError::ParseError(format!("expected 'name = value', got '{item}'")))?;
            pairs.push((name.trim(), value.trim()));
        }
    }
    Ok(pairs)
}

#[test]
fn check_properties()
{
    let pairs = properties("in = 14, out=16 # muon to tau\r\nCparity= -1;").unwrap();
    assert_eq!(pairs, vec![("in", "14"), ("out", "16"), ("Cparity", "-1")]);
    assert!(properties("# nothing here\n\n").unwrap().is_empty());
    assert!(properties("dM21sq 7.4e-5").is_err());
}
