use std::{cmp::Ordering, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::OscError;

/// Neutrino flavours, valued by their PDG identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flavour
{
    Electron = 12,
    Muon = 14,
    Tau = 16,
    #[default]
    Undefined = 0,
}

impl Flavour
{
    ///
    /// Flavour of the neutrino with PDG identifier `pdg` (either sign).
    ///
    pub fn from_pdg(pdg: i32) -> Self
    {
        match pdg.abs()
        {
            12 => Flavour::Electron,
            14 => Flavour::Muon,
            16 => Flavour::Tau,
            _ => Flavour::Undefined,
        }
    }

    pub fn pdg(&self) -> i32
    {
        *self as i32
    }
}

/// Charge parity: +1 for neutrinos, -1 for anti-neutrinos.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChargeParity
{
    Antiparticle = -1,
    Particle = 1,
    #[default]
    Undefined = 0,
}

impl ChargeParity
{
    ///
    /// Charge parity given by the sign of the PDG identifier `pdg`.
    ///
    pub fn from_pdg(pdg: i32) -> Self
    {
        match pdg.signum()
        {
            1 => ChargeParity::Particle,
            -1 => ChargeParity::Antiparticle,
            _ => ChargeParity::Undefined,
        }
    }

    pub fn value(&self) -> i32
    {
        *self as i32
    }
}

///
/// Oscillation channel: incoming flavour, outgoing flavour and charge parity.
/// Channels are ordered by charge parity, then incoming and outgoing flavour.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OscChannel
{
    pub input: Flavour,
    pub output: Flavour,
    pub cparity: ChargeParity,
}

/// Number of oscillation channels.
pub const NUMBER_OF_OSC_CHANNELS: usize = 18;

const fn channel(input: Flavour, output: Flavour, cparity: ChargeParity) -> OscChannel
{
    OscChannel { input, output, cparity }
}

/// All oscillation channels; the position of a channel is the index of its
/// probability in the leaves of an oscillation table.
pub const OSC_CHANNELS: [OscChannel; NUMBER_OF_OSC_CHANNELS] = [
    channel(Flavour::Electron, Flavour::Electron, ChargeParity::Particle),
    channel(Flavour::Electron, Flavour::Muon, ChargeParity::Particle),
    channel(Flavour::Electron, Flavour::Tau, ChargeParity::Particle),
    channel(Flavour::Muon, Flavour::Electron, ChargeParity::Particle),
    channel(Flavour::Muon, Flavour::Muon, ChargeParity::Particle),
    channel(Flavour::Muon, Flavour::Tau, ChargeParity::Particle),
    channel(Flavour::Tau, Flavour::Electron, ChargeParity::Particle),
    channel(Flavour::Tau, Flavour::Muon, ChargeParity::Particle),
    channel(Flavour::Tau, Flavour::Tau, ChargeParity::Particle),
    channel(Flavour::Electron, Flavour::Electron, ChargeParity::Antiparticle),
    channel(Flavour::Electron, Flavour::Muon, ChargeParity::Antiparticle),
    channel(Flavour::Electron, Flavour::Tau, ChargeParity::Antiparticle),
    channel(Flavour::Muon, Flavour::Electron, ChargeParity::Antiparticle),
    channel(Flavour::Muon, Flavour::Muon, ChargeParity::Antiparticle),
    channel(Flavour::Muon, Flavour::Tau, ChargeParity::Antiparticle),
    channel(Flavour::Tau, Flavour::Electron, ChargeParity::Antiparticle),
    channel(Flavour::Tau, Flavour::Muon, ChargeParity::Antiparticle),
    channel(Flavour::Tau, Flavour::Tau, ChargeParity::Antiparticle),
];

impl OscChannel
{
    pub fn new(input: Flavour, output: Flavour, cparity: ChargeParity) -> Self
    {
        Self { input, output, cparity }
    }

    ///
    /// Channel from PDG identifiers of the incoming and outgoing neutrino and
    /// a charge parity given by its sign.
    ///
    pub fn from_pdg(input: i32, output: i32, cparity: i32) -> Self
    {
        Self::new(Flavour::from_pdg(input), Flavour::from_pdg(output), ChargeParity::from_pdg(cparity))
    }

    pub fn is_valid(&self) -> bool
    {
        self.input != Flavour::Undefined && self.output != Flavour::Undefined && self.cparity != ChargeParity::Undefined
    }

    /// Position of this channel in [`OSC_CHANNELS`].
    pub fn index(&self) -> Option<usize>
    {
        OSC_CHANNELS.iter().position(|channel| channel == self)
    }
}

impl Ord for OscChannel
{
    fn cmp(&self, other: &Self) -> Ordering
    {
        self.cparity.value().cmp(&other.cparity.value())
            .then(self.input.pdg().cmp(&other.input.pdg()))
            .then(self.output.pdg().cmp(&other.output.pdg()))
    }
}

impl PartialOrd for OscChannel
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering>
    {
        Some(self.cmp(other))
    }
}

impl Display for OscChannel
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "in={}, out={}, Cparity={}", self.input.pdg(), self.output.pdg(), self.cparity.value())
    }
}

impl FromStr for OscChannel
{
    type Err = OscError;

    ///
    /// Parse `in=<pdg>, out=<pdg>, Cparity=<sign>` in any order.
    ///
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let (mut input, mut output, mut cparity) = (None, None, None);
        for (name, value) in super::properties(s)?
        {
            let value: i32 = value.parse().map_err(|_| OscError::ParseError(format!("invalid integer '{value}' for channel property {name}")))?;
            match name
            {
                "in" => input = Some(Flavour::from_pdg(value)),
                "out" => output = Some(Flavour::from_pdg(value)),
                "Cparity" => cparity = Some(ChargeParity::from_pdg(value)),
                _ => return Err(OscError::ParseError(format!("unknown channel property '{name}'"))),
            }
        }
        match (input, output, cparity)
        {
            (Some(input), Some(output), Some(cparity)) => Ok(Self::new(input, output, cparity)),
            _ => Err(OscError::ParseError(format!("channel requires in, out and Cparity: '{}'", s.trim()))),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_catalogue()
    {
        assert_eq!(OSC_CHANNELS.len(), NUMBER_OF_OSC_CHANNELS);
        for (i, a) in OSC_CHANNELS.iter().enumerate()
        {
            assert!(a.is_valid());
            assert_eq!(a.index(), Some(i));
            for b in &OSC_CHANNELS[i + 1..]
            {
                assert_ne!(a, b);
            }
        }
        let mu_tau = OscChannel::new(Flavour::Muon, Flavour::Tau, ChargeParity::Particle);
        assert_eq!(mu_tau.index(), Some(5));
        assert_eq!(OscChannel::from_pdg(-12, -12, -1).index(), Some(9));
    }

    #[test]
    fn test_invalid_channels()
    {
        let channel = OscChannel::new(Flavour::Undefined, Flavour::Tau, ChargeParity::Particle);
        assert!(!channel.is_valid());
        assert_eq!(channel.index(), None);
        assert!(!OscChannel::default().is_valid());
        assert_eq!(OscChannel::from_pdg(13, 14, 1).input, Flavour::Undefined);
        assert_eq!(OscChannel::from_pdg(14, 14, 0).cparity, ChargeParity::Undefined);
    }

    #[test]
    fn test_ordering()
    {
        let mut channels = OSC_CHANNELS.to_vec();
        channels.sort();
        assert_eq!(channels[0], OscChannel::new(Flavour::Electron, Flavour::Electron, ChargeParity::Antiparticle));
        assert_eq!(channels[17], OscChannel::new(Flavour::Tau, Flavour::Tau, ChargeParity::Particle));
        assert!(OscChannel::from_pdg(14, 12, 1) < OscChannel::from_pdg(14, 14, 1));
        assert!(OscChannel::from_pdg(16, 16, -1) < OscChannel::from_pdg(12, 12, 1));
    }

    #[test]
    fn test_text()
    {
        let channel = OscChannel::from_pdg(14, 16, 1);
        assert_eq!(channel.to_string(), "in=14, out=16, Cparity=1");
        assert_eq!(channel.to_string().parse::<OscChannel>().unwrap(), channel);
        assert_eq!("Cparity = -1\nout = 12 # anti\nin = -14".parse::<OscChannel>().unwrap(), OscChannel::from_pdg(14, 12, -1));
        assert!("in=14, out=16".parse::<OscChannel>().is_err());
        assert!("in=14, out=16, Cparity=1, flavour=3".parse::<OscChannel>().is_err());
        assert!("in=muon, out=16, Cparity=1".parse::<OscChannel>().is_err());
    }
}
