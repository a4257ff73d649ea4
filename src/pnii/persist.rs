//! PNII binary persistence (§6.2).
//!
//! ```text
//! header:
//!   [4]  magic: b"PNI1"
//!   [2]  version: u16
//!   [8]  n: u64
//!   [4]  p: u32
//!   [4]  k_idx: u32
//!   p * [4] pivot_id: u32
//! per pivot (p times):
//!   [4]  length: u32
//!   length * [4] object_id: u32
//! trailer:
//!   [4]  crc32 of everything preceding it
//! ```
//!
//! Same manual-layout-plus-checksum technique as [`crate::hnsw::persist`],
//! grounded on the teacher's `segment.rs` header format.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

use super::pivots::PivotSet;
use super::postings::Postings;

const MAGIC: &[u8; 4] = b"PNI1";
const VERSION: u16 = 1;

pub fn save(n: usize, pivots: &PivotSet, postings: &Postings, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_bytes(n, pivots, postings);
    std::fs::write(path, &bytes).map_err(Error::io_err(path.to_path_buf(), "writing PNII index"))
}

pub fn load(n: usize, path: impl AsRef<Path>) -> Result<(PivotSet, Postings)> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(Error::io_err(path.to_path_buf(), "reading PNII index"))?;
    from_bytes(n, &bytes, path.to_path_buf())
}

/// Memory-mapped counterpart to [`load`], matching [`crate::hnsw::persist::load_mmap`].
pub fn load_mmap(n: usize, path: impl AsRef<Path>) -> Result<(PivotSet, Postings)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(Error::io_err(path.to_path_buf(), "opening PNII index"))?;
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .map_err(Error::io_err(path.to_path_buf(), "memory-mapping PNII index"))?;
    from_bytes(n, &mmap, path.to_path_buf())
}

pub fn to_bytes(n: usize, pivots: &PivotSet, postings: &Postings) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.write_u16::<LittleEndian>(VERSION).unwrap();
    buf.write_u64::<LittleEndian>(n as u64).unwrap();
    buf.write_u32::<LittleEndian>(pivots.len() as u32).unwrap();
    buf.write_u32::<LittleEndian>(postings.num_pivot_index() as u32).unwrap();
    for &id in pivots.ids() {
        buf.write_u32::<LittleEndian>(id).unwrap();
    }
    for pivot_idx in 0..postings.num_pivots() {
        let list = postings.list(pivot_idx);
        buf.write_u32::<LittleEndian>(list.len() as u32).unwrap();
        for &id in list {
            buf.write_u32::<LittleEndian>(id).unwrap();
        }
    }
    let checksum = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(checksum).unwrap();
    buf
}

pub fn from_bytes(n: usize, bytes: &[u8], file: PathBuf) -> Result<(PivotSet, Postings)> {
    if bytes.len() < 4 {
        return Err(Error::corrupt(file, 0, "file too short for magic"));
    }
    let (body, trailer) = bytes.split_at(bytes.len() - 4);
    let expected_checksum = crc32fast::hash(body);
    let got_checksum = (&trailer[..]).read_u32::<LittleEndian>().unwrap();
    if expected_checksum != got_checksum {
        return Err(Error::ChecksumMismatch { file, expected: expected_checksum, got: got_checksum });
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

    let n_stored = cursor
        .read_u64::<LittleEndian>()
        .map_err(|e| Error::corrupt(file.clone(), 6, format!("reading n: {e}")))? as usize;
    if n_stored != n {
        return Err(Error::corrupt(
            file,
            6,
            format!("object count mismatch: index has {n_stored}, space has {n}"),
        ));
    }
    let p = cursor.read_u32::<LittleEndian>().unwrap() as usize;
    let k_idx = cursor.read_u32::<LittleEndian>().unwrap() as usize;

    let mut pivot_ids = Vec::with_capacity(p);
    for _ in 0..p {
        let id = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::corrupt(file.clone(), cursor.position(), format!("reading pivot id: {e}")))?;
        if id as usize >= n {
            return Err(Error::corrupt(file, cursor.position(), "pivot id out of range"));
        }
        pivot_ids.push(id);
    }

    let mut lists = Vec::with_capacity(p);
    for _ in 0..p {
        let len = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::corrupt(file.clone(), cursor.position(), format!("reading posting length: {e}")))?
            as usize;
        let mut list = Vec::with_capacity(len);
        for _ in 0..len {
            let id = cursor.read_u32::<LittleEndian>().unwrap();
            if id as usize >= n {
                return Err(Error::corrupt(file, cursor.position(), "posting object id out of range"));
            }
            list.push(id);
        }
        lists.push(list);
    }

    Ok((PivotSet::from_ids(pivot_ids), Postings::from_lists(lists, k_idx)))
}
