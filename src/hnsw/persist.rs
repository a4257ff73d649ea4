//! HNSW binary persistence (§6.2).
//!
//! Manual little-endian field layout with a trailing CRC32 checksum,
//! following the teacher's `segment.rs` technique (fixed-width header read
//! via `byteorder`, magic + version check, checksum verified on load)
//! rather than a `bincode`/`serde` derive — the spec's wire format is a
//! stable, hand-specified contract, not "whatever the in-memory struct
//! happens to serialize to".
//!
//! ```text
//! header:
//!   [4]  magic: b"HNS1"
//!   [2]  version: u16
//!   [8]  n: u64
//!   [4]  m: u32
//!   [4]  m0: u32
//!   [4]  ef_construction: u32
//!   [4]  entry_point: u32       (u32::MAX if none)
//!   [1]  max_layer: u8
//! per node:
//!   [4]  id: u32
//!   [1]  top_layer: u8
//!   for l in 0..=top_layer:
//!     [4] degree: u32
//!     degree * [4] neighbor_id: u32
//! trailer:
//!   [4]  crc32 of everything preceding it
//! ```

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::config::HnswParams;
use crate::error::{Error, Result};

use super::graph::Graph;

const MAGIC: &[u8; 4] = b"HNS1";
const VERSION: u16 = 1;

pub fn save(graph: &Graph, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_bytes(graph);
    std::fs::write(path, &bytes).map_err(Error::io_err(path.to_path_buf(), "writing HNSW index"))
}

pub fn load(space_len: usize, path: impl AsRef<Path>) -> Result<Graph> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(Error::io_err(path.to_path_buf(), "reading HNSW index"))?;
    from_bytes(space_len, &bytes, path.to_path_buf())
}

/// Load by memory-mapping the index file instead of reading it into a
/// `Vec<u8>` up front — the crate's one nod to the teacher's "instant
/// recovery: memory-mapped persistence" philosophy, useful when an index
/// file is large enough that a full read would be wasteful for a
/// short-lived process. The map is dropped once parsing completes; `Graph`
/// itself never borrows from it.
pub fn load_mmap(space_len: usize, path: impl AsRef<Path>) -> Result<Graph> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(Error::io_err(path.to_path_buf(), "opening HNSW index"))?;
    // Safe: the file is not concurrently truncated by this process, and
    // parsing is purely read-only over the mapped bytes.
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .map_err(Error::io_err(path.to_path_buf(), "memory-mapping HNSW index"))?;
    from_bytes(space_len, &mmap, path.to_path_buf())
}

pub fn to_bytes(graph: &Graph) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.write_u16::<LittleEndian>(VERSION).unwrap();
    buf.write_u64::<LittleEndian>(graph.len() as u64).unwrap();
    buf.write_u32::<LittleEndian>(graph.params().m as u32).unwrap();
    buf.write_u32::<LittleEndian>(graph.params().m0 as u32).unwrap();
    buf.write_u32::<LittleEndian>(graph.params().ef_construction as u32).unwrap();
    let (entry_point, max_layer) = graph.entry_point().unwrap_or((u32::MAX, 0));
    buf.write_u32::<LittleEndian>(entry_point).unwrap();
    buf.write_u8(max_layer).unwrap();

    for id in 0..graph.len() as u32 {
        let top_layer = graph.top_layer(id);
        buf.write_u32::<LittleEndian>(id).unwrap();
        buf.write_u8(top_layer).unwrap();
        for layer in 0..=top_layer {
            let neighbors = graph.neighbors(id, layer);
            buf.write_u32::<LittleEndian>(neighbors.len() as u32).unwrap();
            for n in neighbors {
                buf.write_u32::<LittleEndian>(n).unwrap();
            }
        }
    }

    let checksum = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(checksum).unwrap();
    buf
}

pub fn from_bytes(space_len: usize, bytes: &[u8], file: PathBuf) -> Result<Graph> {
    if bytes.len() < 4 {
        return Err(Error::corrupt(file, 0, "file too short for magic"));
    }
    let (body, trailer) = bytes.split_at(bytes.len() - 4);
    let expected_checksum = crc32fast::hash(body);
    let got_checksum = (&trailer[..]).read_u32::<LittleEndian>().unwrap();
    if expected_checksum != got_checksum {
        return Err(Error::ChecksumMismatch {
            file,
            expected: expected_checksum,
            got: got_checksum,
        });
    }

    let mut cursor = Cursor::new(body);
    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|e| Error::corrupt(file.clone(), 0, format!("reading magic: {e}")))?;
    if &magic != MAGIC {
        return Err(Error::corrupt(file, 0, "bad magic"));
    }
    let version = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| Error::corrupt(file.clone(), 4, format!("reading version: {e}")))?;
    if version != VERSION {
        return Err(Error::corrupt(file, 4, format!("unsupported version {version}")));
    }

    let n = cursor
        .read_u64::<LittleEndian>()
        .map_err(|e| Error::corrupt(file.clone(), 6, format!("reading n: {e}")))? as usize;
    let m = cursor.read_u32::<LittleEndian>().unwrap() as usize;
    let m0 = cursor.read_u32::<LittleEndian>().unwrap() as usize;
    let ef_construction = cursor.read_u32::<LittleEndian>().unwrap() as usize;
    let entry_point_raw = cursor.read_u32::<LittleEndian>().unwrap();
    let max_layer = cursor.read_u8().unwrap();

    if n != space_len {
        return Err(Error::corrupt(
            file,
            0,
            format!("object count mismatch: index has {n}, space has {space_len}"),
        ));
    }

    let mut params = HnswParams::with_m(m.max(2));
    params.m0 = m0;
    params.ef_construction = ef_construction;

    let mut levels = vec![0u8; n];
    let mut adjacency: Vec<Vec<(u8, Vec<u32>)>> = vec![Vec::new(); n];

    for _ in 0..n {
        let id = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::corrupt(file.clone(), cursor.position(), format!("reading node id: {e}")))?
            as usize;
        if id >= n {
            return Err(Error::corrupt(file, cursor.position(), "node id out of range"));
        }
        let top_layer = cursor.read_u8().unwrap();
        levels[id] = top_layer;
        let mut layers = Vec::with_capacity(top_layer as usize + 1);
        for layer in 0..=top_layer {
            let degree = cursor.read_u32::<LittleEndian>().unwrap() as usize;
            let mut neighbors = Vec::with_capacity(degree);
            for _ in 0..degree {
                neighbors.push(cursor.read_u32::<LittleEndian>().unwrap());
            }
            layers.push((layer, neighbors));
        }
        adjacency[id] = layers;
    }

    let graph = Graph::with_levels(params, &levels);
    for (id, layers) in adjacency.into_iter().enumerate() {
        for (layer, neighbors) in layers {
            graph.set_neighbors(id as u32, layer, neighbors);
        }
    }
    if entry_point_raw != u32::MAX {
        graph.install_entry_point_if_absent(entry_point_raw, max_layer);
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::builder;
    use crate::object::ObjectBufferBuilder;
    use crate::space::{Metric, Space, VectorSpace};
    use std::sync::Arc;

    fn make_space(n: usize) -> Arc<dyn Space> {
        let mut b = ObjectBufferBuilder::new();
        for i in 0..n {
            let v = [i as f32, (i * 2) as f32];
            let bytes: Vec<u8> = v.iter().flat_map(|f| f.to_le_bytes()).collect();
            b.push(&bytes, None).unwrap();
        }
        Arc::new(VectorSpace::new(b.build(), 2, Metric::Euclidean).unwrap())
    }

    #[test]
    fn round_trip_preserves_structure() {
        let space = make_space(40);
        let graph = builder::build(space.clone(), HnswParams::with_m(4)).unwrap();
        let bytes = to_bytes(&graph);
        let reloaded = from_bytes(space.len(), &bytes, PathBuf::from("<mem>")).unwrap();

        assert_eq!(reloaded.len(), graph.len());
        assert_eq!(reloaded.entry_point(), graph.entry_point());
        for id in 0..graph.len() as u32 {
            assert_eq!(reloaded.top_layer(id), graph.top_layer(id));
            for layer in 0..=graph.top_layer(id) {
                assert_eq!(reloaded.neighbors(id, layer), graph.neighbors(id, layer));
            }
        }
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let space = make_space(10);
        let graph = builder::build(space.clone(), HnswParams::with_m(4)).unwrap();
        let mut bytes = to_bytes(&graph);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = from_bytes(space.len(), &bytes, PathBuf::from("<mem>")).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn object_count_mismatch_is_rejected() {
        let space = make_space(10);
        let graph = builder::build(space.clone(), HnswParams::with_m(4)).unwrap();
        let bytes = to_bytes(&graph);
        let err = from_bytes(11, &bytes, PathBuf::from("<mem>")).unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
    }
}
