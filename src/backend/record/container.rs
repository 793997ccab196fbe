//! Record container framing.
//!
//! ```text
//! +----------------------+
//! | Magic: "RMFr"        |  4 bytes
//! +----------------------+
//! | Schema id length     |  u32 LE
//! | Schema id            |  UTF-8
//! +----------------------+
//! | Record length        |  u32 LE   (repeated until end of file)
//! | Record               |  deflate(bincode varint encoding)
//! +----------------------+
//! ```

use std::io::{Read, Write};

use bincode::Options;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::util::{Error, Result};

/// Magic bytes at the start of a record container.
pub const MAGIC: &[u8; 4] = b"RMFr";

fn options() -> impl Options {
    bincode::DefaultOptions::new()
}

/// Magic and schema id that open every container.
pub fn header(schema_id: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.write_all(MAGIC)?;
    out.write_u32::<LittleEndian>(schema_id.len() as u32)?;
    out.write_all(schema_id.as_bytes())?;
    Ok(out)
}

/// Encode one record with its length prefix.
pub fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    let encoded = options().serialize(record)?;
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&encoded)?;
    let deflated = encoder.finish()?;
    let len =
        u32::try_from(deflated.len()).map_err(|_| Error::usage("record larger than 4 GiB"))?;
    let mut out = Vec::with_capacity(4 + deflated.len());
    out.write_u32::<LittleEndian>(len)?;
    out.extend_from_slice(&deflated);
    Ok(out)
}

/// Encode records under `schema_id`.
pub fn write_container<T: Serialize>(schema_id: &str, records: &[T]) -> Result<Vec<u8>> {
    let mut out = header(schema_id)?;
    for record in records {
        out.extend_from_slice(&encode_record(record)?);
    }
    Ok(out)
}

/// Split a container into its schema id and the record section.
pub fn read_schema_id(bytes: &[u8]) -> Result<(String, &[u8])> {
    if !bytes.starts_with(MAGIC) {
        return Err(Error::InvalidMagic);
    }
    let mut r = &bytes[MAGIC.len()..];
    let len = r
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::corrupt("missing schema id"))? as usize;
    if r.len() < len {
        return Err(Error::corrupt("schema id ends early"));
    }
    let (id, rest) = r.split_at(len);
    Ok((String::from_utf8(id.to_vec())?, rest))
}

/// Split a record section into records, each with its length prefix.
pub fn split_records(mut section: &[u8]) -> Result<Vec<&[u8]>> {
    let mut records = Vec::new();
    while !section.is_empty() {
        let mut r = section;
        let len = r
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::corrupt("truncated record length"))? as usize;
        if r.len() < len {
            return Err(Error::corrupt(format!(
                "record {} claims {len} bytes, {} left",
                records.len(),
                r.len()
            )));
        }
        let (record, rest) = section.split_at(4 + len);
        records.push(record);
        section = rest;
    }
    Ok(records)
}

/// Decode one record produced by [`encode_record`].
pub fn decode_record<T: DeserializeOwned>(record: &[u8]) -> Result<T> {
    let block = record
        .get(4..)
        .ok_or_else(|| Error::corrupt("truncated record length"))?;
    let mut encoded = Vec::new();
    DeflateDecoder::new(block)
        .read_to_end(&mut encoded)
        .map_err(|e| Error::corrupt(format!("record: {e}")))?;
    Ok(options().deserialize(&encoded)?)
}

/// Decode every record, requiring the container to be written under `schema_id`.
pub fn read_records<T: DeserializeOwned>(bytes: &[u8], schema_id: &str) -> Result<Vec<T>> {
    let (found, section) = read_schema_id(bytes)?;
    if found != schema_id {
        return Err(Error::SchemaMismatch {
            expected: schema_id.to_string(),
            found,
        });
    }
    split_records(section)?
        .into_iter()
        .map(decode_record)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records() {
        let records = vec![vec!["a".to_string()], vec![], vec!["b".into(), "c".into()]];
        let bytes = write_container("test_1", &records).unwrap();
        assert!(bytes.starts_with(b"RMFr"));
        let back: Vec<Vec<String>> = read_records(&bytes, "test_1").unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_records_concatenate() {
        let mut bytes = header("test_1").unwrap();
        bytes.extend_from_slice(&encode_record(&7u32).unwrap());
        let first = bytes.len();
        bytes.extend_from_slice(&encode_record(&9u32).unwrap());

        let (_, section) = read_schema_id(&bytes).unwrap();
        let records = split_records(section).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(decode_record::<u32>(records[1]).unwrap(), 9);
        assert_eq!(&bytes[..first], &write_container("test_1", &[7u32]).unwrap()[..]);
        assert_eq!(read_records::<u32>(&bytes, "test_1").unwrap(), vec![7, 9]);
    }

    #[test]
    fn test_schema_mismatch() {
        let bytes = write_container("test_1", &[1u32, 2, 3]).unwrap();
        match read_records::<u32>(&bytes, "test_2") {
            Err(Error::SchemaMismatch { expected, found }) => {
                assert_eq!(expected, "test_2");
                assert_eq!(found, "test_1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(
            read_records::<u32>(b"RMFd....", "x"),
            Err(Error::InvalidMagic)
        ));
        let mut bytes = write_container("x", &[7u64]).unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(read_records::<u64>(&bytes, "x").unwrap_err().is_io());
    }
}
