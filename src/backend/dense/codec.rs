//! Binary encoding of table headers, cells and attributes.
//!
//! All integers and floats are little-endian. Strings and lists carry a u32
//! length prefix.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Vec3, Vec4};

use crate::backend::TableHeader;
use crate::core::Attributes;
use crate::util::{Error, Extent, Result, Value, ValueType};

// ============================================================================
// Primitive helpers
// ============================================================================

fn write_len<W: Write>(w: &mut W, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| Error::usage("list too long to store"))?;
    w.write_u32::<LittleEndian>(len)?;
    Ok(())
}

fn read_len<R: Read>(r: &mut R) -> Result<usize> {
    Ok(r.read_u32::<LittleEndian>()? as usize)
}

fn write_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    write_len(w, s.len())?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = read_len(r)?;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn write_f32s<W: Write>(w: &mut W, v: &[f32]) -> Result<()> {
    for c in v {
        w.write_f32::<LittleEndian>(*c)?;
    }
    Ok(())
}

fn read_vec3<R: Read>(r: &mut R) -> Result<Vec3> {
    let mut c = [0f32; 3];
    r.read_f32_into::<LittleEndian>(&mut c)?;
    Ok(Vec3::from_array(c))
}

fn read_vec4<R: Read>(r: &mut R) -> Result<Vec4> {
    let mut c = [0f32; 4];
    r.read_f32_into::<LittleEndian>(&mut c)?;
    Ok(Vec4::from_array(c))
}

/// Map truncation inside a block to a corrupt-container error.
fn truncated(e: Error) -> Error {
    match e {
        Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            Error::corrupt("block ends early")
        }
        other => other,
    }
}

// ============================================================================
// Cells
// ============================================================================

fn write_cell<W: Write>(w: &mut W, value: &Value) -> Result<()> {
    match value {
        Value::Int(v) | Value::Index(v) | Value::NodeId(v) => w.write_i32::<LittleEndian>(*v)?,
        Value::Float(v) => w.write_f32::<LittleEndian>(*v)?,
        Value::String(s) => write_string(w, s)?,
        Value::Ints(v) => {
            write_len(w, v.len())?;
            for x in v {
                w.write_i32::<LittleEndian>(*x)?;
            }
        }
        Value::Floats(v) => {
            write_len(w, v.len())?;
            write_f32s(w, v)?;
        }
        Value::Strings(v) => {
            write_len(w, v.len())?;
            for s in v {
                write_string(w, s)?;
            }
        }
        Value::Vector3(v) => write_f32s(w, &v.to_array())?,
        Value::Vector4(v) => write_f32s(w, &v.to_array())?,
        Value::Vector3s(v) => {
            write_len(w, v.len())?;
            for x in v {
                write_f32s(w, &x.to_array())?;
            }
        }
        Value::Vector4s(v) => {
            write_len(w, v.len())?;
            for x in v {
                write_f32s(w, &x.to_array())?;
            }
        }
    }
    Ok(())
}

fn read_cell<R: Read>(r: &mut R, value_type: ValueType) -> Result<Value> {
    Ok(match value_type {
        ValueType::Int => Value::Int(r.read_i32::<LittleEndian>()?),
        ValueType::Index => Value::Index(r.read_i32::<LittleEndian>()?),
        ValueType::NodeId => Value::NodeId(r.read_i32::<LittleEndian>()?),
        ValueType::Float => Value::Float(r.read_f32::<LittleEndian>()?),
        ValueType::String => Value::String(read_string(r)?),
        ValueType::Ints => {
            let mut v = vec![0i32; read_len(r)?];
            r.read_i32_into::<LittleEndian>(&mut v)?;
            Value::Ints(v)
        }
        ValueType::Floats => {
            let mut v = vec![0f32; read_len(r)?];
            r.read_f32_into::<LittleEndian>(&mut v)?;
            Value::Floats(v)
        }
        ValueType::Strings => {
            let n = read_len(r)?;
            Value::Strings((0..n).map(|_| read_string(r)).collect::<Result<_>>()?)
        }
        ValueType::Vector3 => Value::Vector3(read_vec3(r)?),
        ValueType::Vector4 => Value::Vector4(read_vec4(r)?),
        ValueType::Vector3s => {
            let n = read_len(r)?;
            Value::Vector3s((0..n).map(|_| read_vec3(r)).collect::<Result<_>>()?)
        }
        ValueType::Vector4s => {
            let n = read_len(r)?;
            Value::Vector4s((0..n).map(|_| read_vec4(r)).collect::<Result<_>>()?)
        }
    })
}

/// Encode cells of one table, row-major.
pub fn encode_cells(cells: &[Value]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for cell in cells {
        write_cell(&mut out, cell)?;
    }
    Ok(out)
}

/// Decode `count` cells of `value_type`.
pub fn decode_cells(bytes: &[u8], value_type: ValueType, count: usize) -> Result<Vec<Value>> {
    let mut r = bytes;
    let cells = (0..count)
        .map(|_| read_cell(&mut r, value_type))
        .collect::<Result<Vec<_>>>()
        .map_err(truncated)?;
    if !r.is_empty() {
        return Err(Error::corrupt(format!(
            "{} trailing bytes after {count} {value_type} cells",
            r.len()
        )));
    }
    Ok(cells)
}

// ============================================================================
// Table headers and attributes
// ============================================================================

/// Encode a table header: type tag, rank, extents, name.
pub fn encode_header(name: &str, header: &TableHeader) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.write_u8(header.value_type as u8)?;
    out.write_u8(header.extent.rank() as u8)?;
    for d in header.extent.sizes() {
        out.write_u64::<LittleEndian>(*d as u64)?;
    }
    write_string(&mut out, name)?;
    Ok(out)
}

fn read_header(r: &mut &[u8]) -> Result<(String, TableHeader)> {
    let tag = r.read_u8()?;
    let value_type = ValueType::from_u8(tag)
        .ok_or_else(|| Error::corrupt(format!("unknown value type tag {tag}")))?;
    let rank = r.read_u8()? as usize;
    let mut sizes = Vec::with_capacity(rank);
    for _ in 0..rank {
        sizes.push(r.read_u64::<LittleEndian>()? as usize);
    }
    let name = read_string(r)?;
    Ok((
        name,
        TableHeader {
            value_type,
            extent: Extent::from_slice(&sizes),
        },
    ))
}

/// Decode a table header.
pub fn decode_header(bytes: &[u8]) -> Result<(String, TableHeader)> {
    let mut r = bytes;
    read_header(&mut r).map_err(truncated)
}

/// Encode attributes as a count followed by key/value string pairs.
pub fn encode_attributes(attributes: &Attributes) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_len(&mut out, attributes.len())?;
    for (k, v) in attributes.iter() {
        write_string(&mut out, k)?;
        write_string(&mut out, v)?;
    }
    Ok(out)
}

fn read_attributes(r: &mut &[u8]) -> Result<Attributes> {
    let n = read_len(r)?;
    let mut attributes = Attributes::new();
    for _ in 0..n {
        let key = read_string(r)?;
        let value = read_string(r)?;
        attributes.set(key, value);
    }
    Ok(attributes)
}

pub fn decode_attributes(bytes: &[u8]) -> Result<Attributes> {
    let mut r = bytes;
    read_attributes(&mut r).map_err(truncated)
}
