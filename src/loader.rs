//! The fused sparse+dense object-loading format (§6.1).
//!
//! Concrete space loaders (text-CSV vectors, Word2Vec binary, ...) are
//! explicitly out of scope — only this one on-disk contract is preserved,
//! because it is "bit-exact... used by the query server". A loader's
//! contract to the core is: emit objects with consecutive ids starting at
//! 0, report a fatal parse error with the offending line number, and let
//! the caller derive any further parameters once iteration completes.
//!
//! Header (separate text file):
//! ```text
//! queryWeights: <w1 w2 ... wC>
//! indexWeights: <w1 w2 ... wC>
//! ```
//!
//! Binary stream, little-endian:
//! ```text
//! u32 N
//! u32 C
//! repeat C: { u32 isSparseFlag; u32 dim }
//! repeat N: {
//!   u32 externIdLen; bytes externIdLen
//!   repeat C:
//!     if sparse: { u32 qty; repeat qty: { u32 index; f32 value } }
//!     else:      { repeat dim: f32 }
//! }
//! ```
//! Every field is a 4-byte unit, so each component already begins on a
//! 4-byte boundary without extra padding.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::object::ObjectBufferBuilder;

/// Describes one of the `C` components shared by every entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentDescriptor {
    pub sparse: bool,
    /// Dense dimensionality; unused (but present) for sparse components.
    pub dim: u32,
}

/// One component's value for a single entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Dense(Vec<f32>),
    Sparse(Vec<(u32, f32)>),
}

/// Per-query and per-index component weights from the header file.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    pub query: Vec<f32>,
    pub index: Vec<f32>,
}

/// A fully parsed entry: its external string id and its components, in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedRecord {
    pub extern_id: String,
    pub components: Vec<Component>,
}

/// Parse the text header file's `queryWeights:` / `indexWeights:` lines.
pub fn parse_header(text: &str) -> Result<Weights> {
    let mut query = None;
    let mut index = None;
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, rest) = line
            .split_once(':')
            .ok_or_else(|| Error::format_at_line(line_no as u64 + 1, "expected 'key: values'"))?;
        let values: Result<Vec<f32>> = rest
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f32>()
                    .map_err(|e| Error::format_at_line(line_no as u64 + 1, format!("bad weight '{tok}': {e}")))
            })
            .collect();
        match key.trim() {
            "queryWeights" => query = Some(values?),
            "indexWeights" => index = Some(values?),
            other => return Err(Error::format_at_line(line_no as u64 + 1, format!("unknown key '{other}'"))),
        }
    }
    Ok(Weights {
        query: query.ok_or_else(|| Error::format("missing queryWeights"))?,
        index: index.ok_or_else(|| Error::format("missing indexWeights"))?,
    })
}

/// Parse the binary stream into its component descriptors and entries.
pub fn parse_binary(bytes: &[u8]) -> Result<(Vec<ComponentDescriptor>, Vec<FusedRecord>)> {
    let mut cursor = Cursor::new(bytes);

    let n = read_u32(&mut cursor, 0)? as usize;
    let c = read_u32(&mut cursor, 1)? as usize;

    let mut descriptors = Vec::with_capacity(c);
    for i in 0..c {
        let sparse = read_u32(&mut cursor, i as u64 + 2)? != 0;
        let dim = read_u32(&mut cursor, i as u64 + 2)?;
        descriptors.push(ComponentDescriptor { sparse, dim });
    }

    let mut records = Vec::with_capacity(n);
    for entry_idx in 0..n {
        let line = entry_idx as u64 + 1; // 1-based entry index, used as a pseudo-line number
        let id_len = read_u32(&mut cursor, line)? as usize;
        let mut id_bytes = vec![0u8; id_len];
        cursor
            .read_exact(&mut id_bytes)
            .map_err(|e| Error::format_at_line(line, format!("reading externId: {e}")))?;
        let extern_id = String::from_utf8(id_bytes)
            .map_err(|e| Error::format_at_line(line, format!("externId not valid utf8: {e}")))?;

        let mut components = Vec::with_capacity(c);
        for descriptor in &descriptors {
            if descriptor.sparse {
                let qty = read_u32(&mut cursor, line)? as usize;
                let mut pairs = Vec::with_capacity(qty);
                let mut prev_index: Option<u32> = None;
                for _ in 0..qty {
                    let index = read_u32(&mut cursor, line)?;
                    let value = cursor
                        .read_f32::<LittleEndian>()
                        .map_err(|e| Error::format_at_line(line, format!("reading sparse value: {e}")))?;
                    if let Some(prev) = prev_index {
                        if index <= prev {
                            return Err(Error::format_at_line(line, "sparse indices must be strictly ascending"));
                        }
                    }
                    prev_index = Some(index);
                    pairs.push((index, value));
                }
                components.push(Component::Sparse(pairs));
            } else {
                let mut dense = Vec::with_capacity(descriptor.dim as usize);
                for _ in 0..descriptor.dim {
                    dense.push(
                        cursor
                            .read_f32::<LittleEndian>()
                            .map_err(|e| Error::format_at_line(line, format!("reading dense value: {e}")))?,
                    );
                }
                components.push(Component::Dense(dense));
            }
        }
        records.push(FusedRecord { extern_id, components });
    }

    Ok((descriptors, records))
}

fn read_u32(cursor: &mut Cursor<&[u8]>, line: u64) -> Result<u32> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| Error::format_at_line(line, format!("reading u32: {e}")))
}

/// Loads entries straight into an [`ObjectBufferBuilder`], storing each
/// entry's extern id as its label and a packed little-endian encoding of
/// its dense components as the object's bytes — the representation
/// [`crate::space::VectorSpace`] expects for fully-dense fused records.
/// Entries with any sparse component are rejected; this loader targets the
/// dense-only subset of the format that a `VectorSpace` can index.
pub fn load_dense_into(
    builder: &mut ObjectBufferBuilder,
    descriptors: &[ComponentDescriptor],
    records: &[FusedRecord],
) -> Result<()> {
    for (idx, record) in records.iter().enumerate() {
        let mut bytes = Vec::new();
        for (component, descriptor) in record.components.iter().zip(descriptors) {
            match component {
                Component::Dense(values) => {
                    for v in values {
                        bytes.extend_from_slice(&v.to_le_bytes());
                    }
                }
                Component::Sparse(_) => {
                    return Err(Error::format_at_line(
                        idx as u64 + 1,
                        "load_dense_into does not support sparse components",
                    ));
                }
            }
            let _ = descriptor;
        }
        builder.push(&bytes, Some(record.extern_id.clone()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn encode_entry(out: &mut Vec<u8>, extern_id: &str, components: &[Component]) {
        out.write_u32::<LittleEndian>(extern_id.len() as u32).unwrap();
        out.extend_from_slice(extern_id.as_bytes());
        for c in components {
            match c {
                Component::Dense(v) => {
                    for f in v {
                        out.extend_from_slice(&f.to_le_bytes());
                    }
                }
                Component::Sparse(pairs) => {
                    out.write_u32::<LittleEndian>(pairs.len() as u32).unwrap();
                    for (idx, val) in pairs {
                        out.write_u32::<LittleEndian>(*idx).unwrap();
                        out.extend_from_slice(&val.to_le_bytes());
                    }
                }
            }
        }
    }

    #[test]
    fn parses_header() {
        let text = "queryWeights: 1.0 2.0\nindexWeights: 0.5 0.5\n";
        let w = parse_header(text).unwrap();
        assert_eq!(w.query, vec![1.0, 2.0]);
        assert_eq!(w.index, vec![0.5, 0.5]);
    }

    #[test]
    fn header_rejects_unknown_key() {
        assert!(parse_header("bogus: 1 2\n").is_err());
    }

    #[test]
    fn round_trips_mixed_sparse_dense_entries() {
        let descriptors = vec![
            ComponentDescriptor { sparse: false, dim: 3 },
            ComponentDescriptor { sparse: true, dim: 0 },
        ];

        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(2).unwrap(); // N
        bytes.write_u32::<LittleEndian>(2).unwrap(); // C
        for d in &descriptors {
            bytes.write_u32::<LittleEndian>(d.sparse as u32).unwrap();
            bytes.write_u32::<LittleEndian>(d.dim).unwrap();
        }

        encode_entry(
            &mut bytes,
            "doc-0",
            &[Component::Dense(vec![1.0, 2.0, 3.0]), Component::Sparse(vec![(2, 0.5), (9, 1.5)])],
        );
        encode_entry(
            &mut bytes,
            "doc-1",
            &[Component::Dense(vec![4.0, 5.0, 6.0]), Component::Sparse(vec![(0, 0.1)])],
        );

        let (parsed_descriptors, records) = parse_binary(&bytes).unwrap();
        assert_eq!(parsed_descriptors, descriptors);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].extern_id, "doc-0");
        assert_eq!(
            records[1].components[0],
            Component::Dense(vec![4.0, 5.0, 6.0])
        );
    }

    #[test]
    fn rejects_non_ascending_sparse_indices() {
        let descriptors = vec![ComponentDescriptor { sparse: true, dim: 0 }];
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u32::<LittleEndian>(0).unwrap();
        encode_entry(&mut bytes, "doc-0", &[Component::Sparse(vec![(5, 1.0), (3, 1.0)])]);
        let _ = descriptors;
        assert!(parse_binary(&bytes).is_err());
    }

    #[test]
    fn loads_dense_only_entries_into_object_buffer() {
        let descriptors = vec![ComponentDescriptor { sparse: false, dim: 2 }];
        let records = vec![
            FusedRecord { extern_id: "a".into(), components: vec![Component::Dense(vec![1.0, 2.0])] },
            FusedRecord { extern_id: "b".into(), components: vec![Component::Dense(vec![3.0, 4.0])] },
        ];
        let mut builder = ObjectBufferBuilder::new();
        load_dense_into(&mut builder, &descriptors, &records).unwrap();
        let buf = builder.build();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.label(0), Some("a"));
        assert_eq!(buf.get(1).len(), 8);
    }
}
