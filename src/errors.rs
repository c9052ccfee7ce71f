use crate::oscprob::channel::OscChannel;

/// Errors raised by the table layer: abscissa collections, interpolation
/// policies, composite tables and their binary form.
#[derive(Debug, thiserror::Error)]
pub enum GridError
{
    #[error("abscissa {x} on axis {axis} out of range [{xmin}, {xmax}]")]
    OutOfDomain { axis: usize, x: f64, xmin: f64, xmax: f64 },
    #[error("non-finite coordinate {x} on axis {axis}")]
    NonFiniteCoordinate { axis: usize, x: f64 },
    #[error("expected {expected} coordinates, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid abscissa collection: {0}")]
    InvalidCollection(String),
    #[error("invalid interpolation order {0}")]
    InvalidOrder(u32),
    #[error("table is not rectangular: {0}")]
    IncompleteTable(String),
    #[error("duplicate table entry at {0:?}")]
    DuplicateEntry(Vec<f64>),
    #[error("malformed table: {0}")]
    MalformedTable(String),
    #[error("LZ4 decompression failed")]
    LZ4DecompressionFailed,
    #[error("serialization failed")]
    SerializationFailed,
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),
    #[error("{0} unread trailing bytes after payload")]
    TrailingBytes(usize),
    #[error("bad magic number")]
    BadMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),
    #[error("unknown serialization format tag {0}")]
    UnknownFormat(u8),
    #[error("failed to read buffer")]
    ReadBufferFailed(#[source] std::io::Error),
    #[error("failed to write buffer")]
    WriteBufferFailed(#[source] std::io::Error),
    #[error("file I/O error")]
    FileIOError(#[source] std::io::Error),
}

/// Errors raised by the oscillation probability layer.
///
/// Configuration errors (bad names, bad values, missing parameters) are
/// kept apart from I/O errors (`FileOpen`, `FileRead`, `FileWrite`) so that
/// callers can tell a bad deployment from bad caller input.
#[derive(Debug, thiserror::Error)]
pub enum OscError
{
    #[error("invalid oscillation parameter name '{0}'; valid options: dM21sq, dM31sq, deltaCP, sinsqTh12, sinsqTh13, sinsqTh23")]
    InvalidParameterName(String),
    #[error("invalid value {value} for oscillation parameter {name}")]
    InvalidParameterValue { name: &'static str, value: f64 },
    #[error("no value for oscillation parameter {0}")]
    MissingParameter(&'static str),
    #[error("oscillation parameter is undefined")]
    UndefinedParameter,
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("invalid oscillation channel {0}")]
    InvalidChannel(OscChannel),
    #[error("invalid neutrino energy {0} GeV")]
    InvalidEnergy(f64),
    #[error("oscillation table must have {expected} axes, got {actual}")]
    InvalidTable { expected: usize, actual: usize },
    #[error("cannot open oscillation probability table {path}")]
    FileOpen { path: String, #[source] source: std::io::Error },
    #[error("error reading oscillation probability table {path}")]
    FileRead { path: String, #[source] source: GridError },
    #[error("error writing oscillation probability table {path}")]
    FileWrite { path: String, #[source] source: GridError },
    #[error(transparent)]
    Grid(#[from] GridError),
}
