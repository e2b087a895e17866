//! Binary storage for persisted index entries.
//!
//! # Storage Format
//!
//! - Header (16 bytes): magic `ADIX`, version, dimension, entry count
//! - Entries: `u32` text length, UTF-8 text bytes, then `dimension`
//!   little-endian `f32` values
//!
//! All integers are little-endian `u32`. Floats are written bit-exact so a
//! reloaded index reproduces the original search scores.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;

use crate::vector::{VectorDimension, VectorError};

/// Current storage format version.
pub(crate) const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify index storage files.
const MAGIC_BYTES: &[u8; 4] = b"ADIX";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// File name of the entry storage inside an index directory.
pub(crate) const ENTRIES_FILE: &str = "index.vec";

/// Path of the entries file inside `dir`.
pub(crate) fn entries_path(dir: &Path) -> PathBuf {
    dir.join(ENTRIES_FILE)
}

/// Write all entries to `dir/index.vec`, replacing any previous file.
///
/// Data goes to a temporary file first and is renamed into place, so a
/// crash mid-write leaves the previous artifact intact.
pub(crate) fn write_entries(
    dir: &Path,
    dimension: VectorDimension,
    entries: &[(&str, &[f32])],
) -> Result<(), VectorError> {
    std::fs::create_dir_all(dir)?;
    let final_path = entries_path(dir);
    let tmp_path = dir.join(format!("{ENTRIES_FILE}.tmp"));

    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        writer.write_all(MAGIC_BYTES)?;
        writer.write_all(&STORAGE_VERSION.to_le_bytes())?;
        writer.write_all(&to_u32(dimension.get())?.to_le_bytes())?;
        writer.write_all(&to_u32(entries.len())?.to_le_bytes())?;

        for (text, vector) in entries {
            dimension.validate_vector(vector)?;
            writer.write_all(&to_u32(text.len())?.to_le_bytes())?;
            writer.write_all(text.as_bytes())?;
            for &value in *vector {
                writer.write_all(&value.to_le_bytes())?;
            }
        }

        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    std::fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

/// Read every entry from `dir/index.vec`.
pub(crate) fn read_entries(
    dir: &Path,
) -> Result<(VectorDimension, Vec<(String, Vec<f32>)>), VectorError> {
    let path = entries_path(dir);
    let file = File::open(&path)?;
    if file.metadata()?.len() < HEADER_SIZE as u64 {
        return Err(VectorError::Corrupted(format!(
            "{} is shorter than the header",
            path.display()
        )));
    }
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    let mut cursor = Cursor::new(&mmap);

    if cursor.take(4)? != MAGIC_BYTES {
        return Err(VectorError::Corrupted(format!(
            "{} has an unknown file signature",
            path.display()
        )));
    }
    let version = cursor.read_u32()?;
    if version != STORAGE_VERSION {
        return Err(VectorError::VersionMismatch {
            expected: STORAGE_VERSION,
            actual: version,
        });
    }
    let dimension = VectorDimension::new(cursor.read_u32()? as usize)?;
    let count = cursor.read_u32()? as usize;

    // Every entry takes at least its length prefix and its vector
    let min_entry_size = 4 + dimension.get() * BYTES_PER_F32;
    if count > cursor.remaining() / min_entry_size {
        return Err(VectorError::Corrupted(format!(
            "{} declares {count} entries but holds {} bytes of entry data",
            path.display(),
            cursor.remaining()
        )));
    }

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let text_len = cursor.read_u32()? as usize;
        let text = std::str::from_utf8(cursor.take(text_len)?)
            .map_err(|e| VectorError::Corrupted(format!("Entry text is not UTF-8: {e}")))?
            .to_string();

        let raw = cursor.take(dimension.get() * BYTES_PER_F32)?;
        let vector = raw
            .chunks_exact(BYTES_PER_F32)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        entries.push((text, vector));
    }

    if cursor.remaining() != 0 {
        return Err(VectorError::Corrupted(format!(
            "{} has {} trailing bytes",
            path.display(),
            cursor.remaining()
        )));
    }

    Ok((dimension, entries))
}

fn to_u32(value: usize) -> Result<u32, VectorError> {
    u32::try_from(value)
        .map_err(|_| VectorError::Serialization(format!("{value} does not fit in a u32 field")))
}

/// Bounds-checked reader over the mapped file.
struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], VectorError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                VectorError::Corrupted(format!(
                    "Unexpected end of data at offset {} (wanted {len} bytes)",
                    self.offset
                ))
            })?;
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, VectorError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}
