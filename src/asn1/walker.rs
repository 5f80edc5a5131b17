use super::der::{TAG_OCTET_STRING, parse_header};
use super::{Error, Result};

const MAX_DEPTH: usize = 32;

/// A DER element found while walking a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerNode<'a> {
    pub tag: u8,
    pub depth: usize,
    /// Absolute offset of the tag byte in the walked buffer
    pub offset: usize,
    pub header_len: usize,
    pub content: &'a [u8],
}

impl DerNode<'_> {
    /// Offset just past the end of this element
    pub fn end(&self) -> usize {
        self.offset + self.header_len + self.content.len()
    }

    pub fn is_octet_string(&self) -> bool {
        self.tag == TAG_OCTET_STRING
    }
}

/// Walks every element of a DER buffer in document order.
///
/// Constructed elements are entered. OCTET STRINGs are entered too when
/// their content is itself a complete DER encoding, which is how PKCS#8
/// wraps the inner private key structure. Anything after the last complete
/// top-level element is an error.
pub fn walk(data: &[u8]) -> Result<Vec<DerNode<'_>>> {
    let mut nodes = Vec::new();
    walk_level(data, 0, data.len(), 0, &mut nodes)?;
    Ok(nodes)
}

fn walk_level<'a>(
    data: &'a [u8],
    start: usize,
    end: usize,
    depth: usize,
    nodes: &mut Vec<DerNode<'a>>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::InvalidData(format!(
            "Nesting deeper than {MAX_DEPTH} levels"
        )));
    }

    let window = &data[..end];
    let mut offset = start;
    while offset < end {
        let (tag, length, value_start) = parse_header(window, offset)?;
        let content = &data[value_start..value_start + length];
        nodes.push(DerNode {
            tag,
            depth,
            offset,
            header_len: value_start - offset,
            content,
        });

        if tag & 0x20 != 0 {
            walk_level(data, value_start, value_start + length, depth + 1, nodes)?;
        } else if tag == TAG_OCTET_STRING && !content.is_empty() {
            // Only commit to the encapsulated reading if all of it parses
            let mut inner = Vec::new();
            if walk_level(data, value_start, value_start + length, depth + 1, &mut inner).is_ok()
            {
                nodes.append(&mut inner);
            }
        }
        offset = value_start + length;
    }
    Ok(())
}
