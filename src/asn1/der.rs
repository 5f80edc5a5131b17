use chrono::{DateTime, Utc};

use super::{Error, Result};

pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_OID: u8 = 0x06;
pub const TAG_ENUMERATED: u8 = 0x0A;
pub const TAG_UTF8_STRING: u8 = 0x0C;
pub const TAG_GENERALIZED_TIME: u8 = 0x18;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;

/// Format of a DER GeneralizedTime value in UTC with second precision
pub const GENERALIZED_TIME_FORMAT: &str = "%Y%m%d%H%M%SZ";

/// A single DER tag-length-value element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tag: u8,
    pub data: Vec<u8>,
}

impl Tlv {
    pub fn new(tag: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            data: data.into(),
        }
    }

    /// Returns true if the tag has the constructed bit set
    pub fn is_constructed(&self) -> bool {
        self.tag & 0x20 != 0
    }

    pub fn encode(&self) -> Vec<u8> {
        let length = encode_length(self.data.len());
        let mut result = Vec::with_capacity(1 + length.len() + self.data.len());
        result.push(self.tag);
        result.extend_from_slice(&length);
        result.extend_from_slice(&self.data);
        result
    }

    /// Parses consecutive TLV elements until the input is exhausted
    pub fn parse_multiple(data: impl AsRef<[u8]>) -> Result<Vec<Self>> {
        let mut objects = Vec::new();
        let mut offset = 0;

        let data = data.as_ref();
        while offset < data.len() {
            let (tlv, next_offset) = Self::parse_at_offset(data, offset)?;
            objects.push(tlv);
            offset = next_offset;
        }
        Ok(objects)
    }

    /// Parses one element at `offset`, returning it with the offset just past it
    pub fn parse_at_offset(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (tag, length, value_start) = parse_header(data, offset)?;
        let value = data[value_start..value_start + length].to_vec();
        Ok((Self::new(tag, value), value_start + length))
    }
}

/// Parses the tag and length at `offset`.
///
/// Returns `(tag, length, value_start)`. The declared length is checked
/// against the available input.
pub fn parse_header(data: &[u8], offset: usize) -> Result<(u8, usize, usize)> {
    if offset + 2 > data.len() {
        return Err(Error::InvalidData(
            "Insufficient data for TLV header".into(),
        ));
    }

    let tag = data[offset];
    if tag & 0x1F == 0x1F {
        return Err(Error::InvalidData(format!(
            "High tag number form is not supported (tag {tag:#04x})"
        )));
    }

    let (length, value_start) = parse_length(data, offset + 1)?;
    let end = value_start
        .checked_add(length)
        .ok_or_else(|| Error::InvalidData("TLV length overflows".into()))?;
    if end > data.len() {
        return Err(Error::InvalidData(format!(
            "TLV length {length} exceeds available data",
        )));
    }
    Ok((tag, length, value_start))
}

fn parse_length(data: &[u8], offset: usize) -> Result<(usize, usize)> {
    if offset >= data.len() {
        return Err(Error::InvalidData("No length byte".into()));
    }

    let first_byte = data[offset];
    if first_byte & 0x80 == 0 {
        return Ok((first_byte as usize, offset + 1));
    }

    let length_bytes = (first_byte & 0x7F) as usize;
    if length_bytes == 0 {
        return Err(Error::InvalidData("Invalid indefinite length".into()));
    }
    if length_bytes > std::mem::size_of::<usize>() {
        return Err(Error::InvalidData(format!(
            "Length uses {length_bytes} bytes"
        )));
    }
    if offset + 1 + length_bytes > data.len() {
        return Err(Error::InvalidData(
            "Insufficient data for long length".into(),
        ));
    }

    let mut length = 0usize;
    for i in 0..length_bytes {
        length = (length << 8) | (data[offset + 1 + i] as usize);
    }
    Ok((length, offset + 1 + length_bytes))
}

/// Encodes a definite length in its shortest form
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let mut result = Vec::with_capacity(1 + bytes.len() - skip);
    result.push(0x80 | (bytes.len() - skip) as u8);
    result.extend_from_slice(&bytes[skip..]);
    result
}

fn concat<I, T>(children: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    children.into_iter().fold(Vec::new(), |mut acc, child| {
        acc.extend_from_slice(child.as_ref());
        acc
    })
}

/// SEQUENCE over the concatenation of already encoded children
pub fn sequence<I, T>(children: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    Tlv::new(TAG_SEQUENCE, concat(children)).encode()
}

/// SET over the concatenation of already encoded children.
///
/// Children are written in the given order; callers are responsible for
/// DER ordering when more than one element is present.
pub fn set<I, T>(children: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    Tlv::new(TAG_SET, concat(children)).encode()
}

pub fn integer(n: u64) -> Vec<u8> {
    unsigned_integer(&n.to_be_bytes())
}

/// INTEGER from an unsigned big-endian magnitude of any size
pub fn unsigned_integer(magnitude: &[u8]) -> Vec<u8> {
    let skip = magnitude.iter().take_while(|b| **b == 0).count();
    let significant = &magnitude[skip..];

    let mut content = Vec::with_capacity(significant.len() + 1);
    match significant.first() {
        None => content.push(0x00),
        Some(first) => {
            if first & 0x80 != 0 {
                content.push(0x00);
            }
            content.extend_from_slice(significant);
        }
    }
    Tlv::new(TAG_INTEGER, content).encode()
}

/// Decodes the content octets of a non-negative INTEGER that fits in a u64
pub fn integer_value(content: &[u8]) -> Result<u64> {
    let Some(first) = content.first() else {
        return Err(Error::InvalidData("Empty INTEGER".into()));
    };
    if first & 0x80 != 0 {
        return Err(Error::InvalidData("Negative INTEGER".into()));
    }
    if content.len() > 1 && *first == 0 && content[1] & 0x80 == 0 {
        return Err(Error::InvalidData("Non-minimal INTEGER".into()));
    }

    let magnitude = if *first == 0 { &content[1..] } else { content };
    if magnitude.len() > 8 {
        return Err(Error::InvalidData(format!(
            "INTEGER of {} bytes does not fit in 64 bits",
            magnitude.len()
        )));
    }
    Ok(magnitude
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | *byte as u64))
}

pub fn boolean(value: bool) -> Vec<u8> {
    Tlv::new(TAG_BOOLEAN, vec![if value { 0xFF } else { 0x00 }]).encode()
}

pub fn octet_string(bytes: impl AsRef<[u8]>) -> Vec<u8> {
    Tlv::new(TAG_OCTET_STRING, bytes.as_ref()).encode()
}

/// BIT STRING over byte-aligned content (zero unused bits)
pub fn bit_string(bytes: impl AsRef<[u8]>) -> Vec<u8> {
    let bytes = bytes.as_ref();
    let mut content = Vec::with_capacity(bytes.len() + 1);
    content.push(0x00);
    content.extend_from_slice(bytes);
    Tlv::new(TAG_BIT_STRING, content).encode()
}

pub fn enumerated(n: u8) -> Vec<u8> {
    Tlv::new(TAG_ENUMERATED, vec![n]).encode()
}

pub fn utf8_string(value: &str) -> Vec<u8> {
    Tlv::new(TAG_UTF8_STRING, value.as_bytes()).encode()
}

pub fn generalized_time(ts: &DateTime<Utc>) -> Vec<u8> {
    let formatted = ts.format(GENERALIZED_TIME_FORMAT).to_string();
    Tlv::new(TAG_GENERALIZED_TIME, formatted.into_bytes()).encode()
}

/// Context-specific constructed tag `[n]` wrapping already encoded content
pub fn explicit_tag(n: u8, content: impl AsRef<[u8]>) -> Vec<u8> {
    Tlv::new(0xA0 | (n & 0x1F), content.as_ref()).encode()
}

/// Context-specific primitive tag `[n]` replacing the tag of a primitive value
pub fn implicit_tag(n: u8, content: impl AsRef<[u8]>) -> Vec<u8> {
    Tlv::new(0x80 | (n & 0x1F), content.as_ref()).encode()
}

pub fn object_identifier(dotted: &str) -> Result<Vec<u8>> {
    Ok(Tlv::new(TAG_OID, oid_content(dotted)?).encode())
}

/// Content octets of an OBJECT IDENTIFIER in dotted notation
pub fn oid_content(dotted: &str) -> Result<Vec<u8>> {
    let arcs = dotted
        .split('.')
        .map(|arc| arc.trim().parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::InvalidOid(dotted.to_string()))?;

    if arcs.len() < 2 || arcs[0] > 2 || (arcs[0] < 2 && arcs[1] >= 40) {
        return Err(Error::InvalidOid(dotted.to_string()));
    }
    let first = arcs[0]
        .checked_mul(40)
        .and_then(|v| v.checked_add(arcs[1]))
        .ok_or_else(|| Error::InvalidOid(dotted.to_string()))?;

    let mut content = Vec::new();
    for arc in std::iter::once(first).chain(arcs[2..].iter().copied()) {
        push_base128(&mut content, arc);
    }
    Ok(content)
}

fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        groups.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    out.extend(groups.into_iter().rev());
}
