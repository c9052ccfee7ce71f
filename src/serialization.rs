/// Serialization format options for table data.
///
/// Each format has both compressed (Lz4) and uncompressed variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// Bincode format - compact binary, deterministic byte layout (default)
    #[default]
    Bincode,
    /// Bincode format with LZ4 compression
    BincodeLz4,
    /// JSON format - human readable, larger size, widest compatibility
    Json,
    /// JSON format with LZ4 compression
    JsonLz4,
}

impl SerializationFormat {
    /// Returns true if this format uses LZ4 compression
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::BincodeLz4 | SerializationFormat::JsonLz4)
    }

    /// Tag stored in the frame header.
    pub fn tag(&self) -> u8 {
        match self {
            SerializationFormat::Bincode => 0,
            SerializationFormat::BincodeLz4 => 1,
            SerializationFormat::Json => 2,
            SerializationFormat::JsonLz4 => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, GridError> {
        match tag {
            0 => Ok(SerializationFormat::Bincode),
            1 => Ok(SerializationFormat::BincodeLz4),
            2 => Ok(SerializationFormat::Json),
            3 => Ok(SerializationFormat::JsonLz4),
            _ => Err(GridError::UnknownFormat(tag)),
        }
    }
}

use crate::errors::GridError;
use serde::{de::DeserializeOwned, Serialize};

/// Leading bytes of every framed table.
pub const MAGIC: [u8; 4] = *b"OSCG";
/// Current frame version.
pub const VERSION: u16 = 1;
/// Size of the frame header (magic, version, format tag).
pub const HEADER_LEN: usize = 7;

/// Upper bound on the memory a single decode may claim.
const DECODE_LIMIT: usize = 1 << 30;

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<DECODE_LIMIT>()
}

/// Serialize data to bytes using the specified format (no compression).
fn serialize_serde<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, GridError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::to_vec(data).map_err(|_| GridError::SerializationFailed)
        }
        SerializationFormat::Bincode | SerializationFormat::BincodeLz4 => {
            bincode::serde::encode_to_vec(data, bincode_config()).map_err(|_| GridError::SerializationFailed)
        }
    }
}

/// Deserialize data from bytes using the specified format (no compression).
/// The payload must be consumed completely.
fn deserialize_serde<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, GridError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::from_slice(data).map_err(|e| GridError::DeserializationFailed(e.to_string()))
        }
        SerializationFormat::Bincode | SerializationFormat::BincodeLz4 => {
            let (value, read) = bincode::serde::decode_from_slice(data, bincode_config())
                .map_err(|e| GridError::DeserializationFailed(e.to_string()))?;
            if read != data.len() {
                return Err(GridError::TrailingBytes(data.len() - read));
            }
            Ok(value)
        }
    }
}

/// Serialize data to bytes using the specified format.
/// Applies LZ4 compression if the format variant ends with Lz4.
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, GridError> {
    let bytes = serialize_serde(data, format)?;
    if format.is_compressed() {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    } else {
        Ok(bytes)
    }
}

/// Deserialize data from bytes using the specified format.
/// Applies LZ4 decompression if the format variant ends with Lz4.
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, GridError> {
    if format.is_compressed() {
        // reject size prefixes beyond the decode limit
        let size = data.get(..4).map(|prefix| u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize)
            .ok_or(GridError::LZ4DecompressionFailed)?;
        if size > DECODE_LIMIT {
            return Err(GridError::LZ4DecompressionFailed);
        }
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|_| GridError::LZ4DecompressionFailed)?;
        deserialize_serde(&decompressed, format)
    } else {
        deserialize_serde(data, format)
    }
}

/// Serialize data behind a frame header (magic, version, format tag).
pub fn serialize_framed<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, GridError> {
    let payload = serialize(data, format)?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.push(format.tag());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize framed data. The format is taken from the header.
pub fn deserialize_framed<T: DeserializeOwned>(data: &[u8]) -> Result<T, GridError> {
    if data.len() < HEADER_LEN {
        return Err(GridError::DeserializationFailed(format!("truncated header ({} bytes)", data.len())));
    }
    if data[0..4] != MAGIC {
        return Err(GridError::BadMagic);
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != VERSION {
        return Err(GridError::UnsupportedVersion(version));
    }
    let format = SerializationFormat::from_tag(data[6])?;
    deserialize(&data[HEADER_LEN..], format)
}

/// Write framed data to `writer`.
pub fn write_framed<T: Serialize, Writer: std::io::Write>(data: &T, mut writer: Writer, format: SerializationFormat) -> Result<(), GridError> {
    let buffer = serialize_framed(data, format)?;
    writer.write_all(&buffer).map_err(GridError::WriteBufferFailed)?;
    writer.flush().map_err(GridError::WriteBufferFailed)
}

/// Read framed data from `reader` until end of stream.
pub fn read_framed<T: DeserializeOwned, Reader: std::io::Read>(mut reader: Reader) -> Result<T, GridError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(GridError::ReadBufferFailed)?;
    deserialize_framed(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct TestData {
        values: Vec<f64>,
        name: String,
    }

    fn data() -> TestData {
        TestData {
            values: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            name: "test".to_string(),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let bytes = serialize(&data(), SerializationFormat::Json).unwrap();
        let result: TestData = deserialize(&bytes, SerializationFormat::Json).unwrap();
        assert_eq!(data(), result);
    }

    #[test]
    fn test_bincode_lz4_roundtrip() {
        let bytes = serialize(&data(), SerializationFormat::BincodeLz4).unwrap();
        let result: TestData = deserialize(&bytes, SerializationFormat::BincodeLz4).unwrap();
        assert_eq!(data(), result);
    }

    #[test]
    fn test_framed_bytes_are_stable() {
        let bytes = serialize_framed(&data(), SerializationFormat::Bincode).unwrap();
        assert_eq!(&bytes[0..4], b"OSCG");
        let result: TestData = deserialize_framed(&bytes).unwrap();
        assert_eq!(serialize_framed(&result, SerializationFormat::Bincode).unwrap(), bytes);
    }

    #[test]
    fn test_framed_rejects_corrupt_input() {
        let bytes = serialize_framed(&data(), SerializationFormat::Bincode).unwrap();

        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(deserialize_framed::<TestData>(truncated), Err(GridError::DeserializationFailed(_))));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(deserialize_framed::<TestData>(&trailing), Err(GridError::TrailingBytes(1))));

        let mut magic = bytes.clone();
        magic[0] = b'X';
        assert!(matches!(deserialize_framed::<TestData>(&magic), Err(GridError::BadMagic)));

        let mut version = bytes.clone();
        version[4] = 9;
        assert!(matches!(deserialize_framed::<TestData>(&version), Err(GridError::UnsupportedVersion(9))));

        let mut tag = bytes;
        tag[6] = 42;
        assert!(matches!(deserialize_framed::<TestData>(&tag), Err(GridError::UnknownFormat(42))));

        assert!(deserialize_framed::<TestData>(b"OSC").is_err());
    }

    #[test]
    fn test_lz4_size_prefix_is_bounded() {
        let mut bytes = serialize_framed(&data(), SerializationFormat::BincodeLz4).unwrap();
        // claim a 4 GiB payload
        bytes[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(deserialize_framed::<TestData>(&bytes), Err(GridError::LZ4DecompressionFailed)));
        assert!(matches!(deserialize::<TestData>(&[1, 0], SerializationFormat::JsonLz4), Err(GridError::LZ4DecompressionFailed)));
    }

    #[test]
    fn test_framed_reader_writer() {
        let mut buffer = Vec::new();
        write_framed(&data(), &mut buffer, SerializationFormat::JsonLz4).unwrap();
        let result: TestData = read_framed(buffer.as_slice()).unwrap();
        assert_eq!(data(), result);
    }
}
