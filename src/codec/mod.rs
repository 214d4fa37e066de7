//! Binary persistence for indexes.
//!
//! The format is versioned, little-endian, and checksummed:
//!
//! ```text
//! magic    b"MGIX"                      4 bytes
//! version  u32                          currently 1
//! kind     u8                           0 = flat, 1 = ivf
//! metric   u8                           0 = l2, 1 = inner product
//! parallel u8                           config flag
//! dim      u32
//! count    u64
//! vectors  count * dim * f32            ids are implicit: 0..count
//! --- ivf only ---
//! trained  u8
//! nlist    u32
//! nprobe   u32
//! centroids nlist * dim * f32           present when trained
//! lists    nlist * (u64 len, len * u64) present when trained
//! --- all ---
//! crc32    u32                          over every preceding byte
//! ```
//!
//! Vector components and centroids are written as raw f32 bits, so they
//! round-trip bit-exactly. [`decode`] builds a fresh index only on full
//! success; malformed input never leaves partial state anywhere.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{MagnitudeError, Result};
use crate::index::{FlatIndex, Index, IndexConfig, IvfIndex, VectorIndex};
use crate::vector::{DistanceMetric, Vector, store::VectorStore};

const MAGIC: &[u8; 4] = b"MGIX";
const FORMAT_VERSION: u32 = 1;

const KIND_FLAT: u8 = 0;
const KIND_IVF: u8 = 1;

const METRIC_L2: u8 = 0;
const METRIC_INNER_PRODUCT: u8 = 1;

/// Serialize an index to bytes.
pub fn encode(index: &Index) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.write_u32::<LittleEndian>(FORMAT_VERSION)?;

    match index {
        Index::Flat(flat) => {
            buf.write_u8(KIND_FLAT)?;
            write_config(&mut buf, flat.config())?;
            write_store(&mut buf, flat.store())?;
        }
        Index::Ivf(ivf) => {
            buf.write_u8(KIND_IVF)?;
            write_config(&mut buf, ivf.config())?;
            write_store(&mut buf, ivf.store())?;

            buf.write_u8(ivf.is_trained() as u8)?;
            buf.write_u32::<LittleEndian>(ivf.nlist() as u32)?;
            buf.write_u32::<LittleEndian>(ivf.nprobe() as u32)?;

            if ivf.is_trained() {
                for centroid in ivf.centroids() {
                    write_components(&mut buf, &centroid.data)?;
                }
                for list in ivf.inverted_lists() {
                    buf.write_u64::<LittleEndian>(list.len() as u64)?;
                    for &id in list {
                        buf.write_u64::<LittleEndian>(id)?;
                    }
                }
            }
        }
    }

    let checksum = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(checksum)?;
    Ok(buf)
}

/// Deserialize an index from bytes produced by [`encode`].
///
/// Fails with `CorruptData` for a bad magic, truncated payload, checksum
/// mismatch, or malformed fields, and with `UnsupportedVersion` when the
/// header carries a version newer than this build writes.
pub fn decode(bytes: &[u8]) -> Result<Index> {
    // magic + version + crc is the smallest well-formed prefix/suffix.
    if bytes.len() < 12 {
        return Err(MagnitudeError::corrupt("truncated payload"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(MagnitudeError::corrupt("bad magic"));
    }

    let (payload, crc_bytes) = bytes.split_at(bytes.len() - 4);
    let stored_checksum = u32::from_le_bytes(crc_bytes.try_into().unwrap());
    if crc32fast::hash(payload) != stored_checksum {
        return Err(MagnitudeError::corrupt("checksum mismatch"));
    }

    let mut cursor = Cursor::new(&payload[4..]);
    let version = read_u32(&mut cursor)?;
    if version > FORMAT_VERSION {
        return Err(MagnitudeError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }
    if version == 0 {
        return Err(MagnitudeError::corrupt("unrecognized format version 0"));
    }

    let kind = read_u8(&mut cursor)?;
    let config = read_config(&mut cursor)?;
    let store = read_store(&mut cursor, &config)?;

    let index = match kind {
        KIND_FLAT => Index::Flat(FlatIndex::from_parts(config, store)),
        KIND_IVF => {
            let trained = match read_u8(&mut cursor)? {
                0 => false,
                1 => true,
                other => {
                    return Err(MagnitudeError::corrupt(format!(
                        "invalid trained flag {other}"
                    )));
                }
            };
            let nlist = read_u32(&mut cursor)? as usize;
            let nprobe = read_u32(&mut cursor)? as usize;

            let (centroids, inverted_lists) = if trained {
                if nlist == 0 || nprobe == 0 || nprobe > nlist {
                    return Err(MagnitudeError::corrupt(format!(
                        "inconsistent ivf parameters: nlist {nlist}, nprobe {nprobe}"
                    )));
                }

                let mut centroids = Vec::with_capacity(nlist);
                for _ in 0..nlist {
                    centroids.push(Vector::new(read_components(&mut cursor, config.dimension)?));
                }

                let count = store.len() as u64;
                let mut lists = Vec::with_capacity(nlist);
                let mut assigned: u64 = 0;
                for _ in 0..nlist {
                    let len = read_u64(&mut cursor)?;
                    assigned = assigned.saturating_add(len);
                    if assigned > count {
                        return Err(MagnitudeError::corrupt(
                            "inverted lists reference more ids than stored vectors",
                        ));
                    }
                    let mut list = Vec::with_capacity(len as usize);
                    for _ in 0..len {
                        let id = read_u64(&mut cursor)?;
                        if id >= count {
                            return Err(MagnitudeError::corrupt(format!(
                                "inverted list references unknown id {id}"
                            )));
                        }
                        list.push(id);
                    }
                    lists.push(list);
                }

                (centroids, lists)
            } else {
                (Vec::new(), Vec::new())
            };

            Index::Ivf(IvfIndex::from_parts(
                config,
                store,
                centroids,
                inverted_lists,
                nprobe,
                trained,
            ))
        }
        other => {
            return Err(MagnitudeError::corrupt(format!(
                "unknown index kind {other}"
            )));
        }
    };

    if cursor.position() != (payload.len() - 4) as u64 {
        return Err(MagnitudeError::corrupt("trailing bytes after index data"));
    }

    Ok(index)
}

impl Index {
    /// Persist this index to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, encode(self)?)?;
        Ok(())
    }

    /// Load an index previously written by [`Index::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Index> {
        decode(&fs::read(path)?)
    }
}

fn write_config(buf: &mut Vec<u8>, config: &IndexConfig) -> Result<()> {
    let metric = match config.metric {
        DistanceMetric::L2 => METRIC_L2,
        DistanceMetric::InnerProduct => METRIC_INNER_PRODUCT,
    };
    buf.write_u8(metric)?;
    buf.write_u8(config.parallel as u8)?;
    buf.write_u32::<LittleEndian>(config.dimension as u32)?;
    Ok(())
}

fn write_store(buf: &mut Vec<u8>, store: &VectorStore) -> Result<()> {
    buf.write_u64::<LittleEndian>(store.len() as u64)?;
    for vector in store.vectors() {
        write_components(buf, &vector.data)?;
    }
    Ok(())
}

fn write_components(buf: &mut Vec<u8>, components: &[f32]) -> Result<()> {
    for &value in components {
        buf.write_f32::<LittleEndian>(value)?;
    }
    Ok(())
}

fn read_config(cursor: &mut Cursor<&[u8]>) -> Result<IndexConfig> {
    let metric = match read_u8(cursor)? {
        METRIC_L2 => DistanceMetric::L2,
        METRIC_INNER_PRODUCT => DistanceMetric::InnerProduct,
        other => {
            return Err(MagnitudeError::corrupt(format!(
                "unknown metric tag {other}"
            )));
        }
    };
    let parallel = match read_u8(cursor)? {
        0 => false,
        1 => true,
        other => {
            return Err(MagnitudeError::corrupt(format!(
                "invalid parallel flag {other}"
            )));
        }
    };
    let dimension = read_u32(cursor)? as usize;
    if dimension == 0 {
        return Err(MagnitudeError::corrupt("zero dimension"));
    }

    Ok(IndexConfig::new(dimension, metric).with_parallel(parallel))
}

fn read_store(cursor: &mut Cursor<&[u8]>, config: &IndexConfig) -> Result<VectorStore> {
    let count = read_u64(cursor)? as usize;

    // Reject counts the remaining payload cannot possibly hold before
    // allocating anything.
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    let needed = (count as u64)
        .checked_mul(config.dimension as u64)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| MagnitudeError::corrupt("vector count overflows payload"))?;
    if needed > remaining {
        return Err(MagnitudeError::corrupt("truncated vector data"));
    }

    let mut vectors = Vec::with_capacity(count);
    for _ in 0..count {
        vectors.push(Vector::new(read_components(cursor, config.dimension)?));
    }

    Ok(VectorStore::from_parts(config.dimension, vectors))
}

fn read_components(cursor: &mut Cursor<&[u8]>, dimension: usize) -> Result<Vec<f32>> {
    let mut components = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        components.push(read_f32(cursor)?);
    }
    Ok(components)
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    cursor
        .read_u8()
        .map_err(|_| MagnitudeError::corrupt("truncated payload"))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| MagnitudeError::corrupt("truncated payload"))
}

fn read_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    cursor
        .read_u64::<LittleEndian>()
        .map_err(|_| MagnitudeError::corrupt("truncated payload"))
}

fn read_f32(cursor: &mut Cursor<&[u8]>) -> Result<f32> {
    cursor
        .read_f32::<LittleEndian>()
        .map_err(|_| MagnitudeError::corrupt("truncated payload"))
}
