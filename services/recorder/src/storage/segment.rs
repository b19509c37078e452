//! Segment file format
//!
//! `[magic u32][version u32][token u32][schema u32]` header, then
//! `[len u32][crc32 u32][bincode row]` records. Every append is flushed
//! so a killed process loses at most the record being written; readers
//! stop cleanly at a truncated tail.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;
use recorder_common::{ExchangeSegment, StorageError, TickRow};
use tracing::trace;

const SEGMENT_MAGIC: u32 = 0x544B_5347; // "TKSG"
const SEGMENT_VERSION: u32 = 1;

// Rows are a few dozen bytes; a length beyond this is a torn or
// corrupted record header, not a real record.
const MAX_RECORD_LEN: usize = 4096;

const fn schema_code(segment: ExchangeSegment) -> u32 {
    match segment {
        ExchangeSegment::Cash => 1,
        ExchangeSegment::Derivatives => 2,
        ExchangeSegment::Index => 3,
    }
}

/// Append handle for one instrument's segment file
pub struct SegmentWriter {
    path: PathBuf,
    file: BufWriter<File>,
    rows: u64,
}

impl SegmentWriter {
    /// Create a fresh segment file with its header
    pub fn create(path: &Path, token: u32, segment: ExchangeSegment) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        writer.write_u32::<LittleEndian>(SEGMENT_MAGIC)?;
        writer.write_u32::<LittleEndian>(SEGMENT_VERSION)?;
        writer.write_u32::<LittleEndian>(token)?;
        writer.write_u32::<LittleEndian>(schema_code(segment))?;
        writer.flush()?;

        Ok(Self {
            path: path.to_path_buf(),
            file: writer,
            rows: 0,
        })
    }

    /// Open an existing segment for appending, validating its header
    pub fn open_for_append(
        path: &Path,
        token: u32,
        segment: ExchangeSegment,
    ) -> Result<Self, StorageError> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        validate_header(&mut file, path, token, segment)?;
        file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::with_capacity(64 * 1024, file),
            rows: 0,
        })
    }

    /// Append one row and flush it to the OS
    pub fn append(&mut self, row: &TickRow) -> Result<(), StorageError> {
        let data = bincode::serialize(row)?;

        let mut hasher = Hasher::new();
        hasher.update(&data);
        let crc = hasher.finalize();

        self.file.write_u32::<LittleEndian>(data.len() as u32)?;
        self.file.write_u32::<LittleEndian>(crc)?;
        self.file.write_all(&data)?;
        self.file.flush()?;

        self.rows += 1;
        trace!(path = %self.path.display(), ts = row.timestamp(), "row appended");
        Ok(())
    }

    /// Rows appended through this handle
    #[must_use]
    pub const fn rows_written(&self) -> u64 {
        self.rows
    }
}

/// Sequential reader over a segment file
pub struct SegmentReader {
    path: PathBuf,
    reader: BufReader<File>,
}

impl SegmentReader {
    /// Open a segment for reading, validating its header
    pub fn open(path: &Path, token: u32, segment: ExchangeSegment) -> Result<Self, StorageError> {
        let mut file = File::open(path)?;
        validate_header(&mut file, path, token, segment)?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(64 * 1024, file),
        })
    }

    /// Read the next row; `None` at end of file. A clean EOF inside a
    /// record header is treated as a truncated tail and also ends the
    /// stream; a CRC mismatch is corruption.
    pub fn read_next(&mut self) -> Result<Option<TickRow>, StorageError> {
        let length = match self.reader.read_u32::<LittleEndian>() {
            Ok(length) => length as usize,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // validate before allocating; the CRC only runs after the read
        if length > MAX_RECORD_LEN {
            return Err(StorageError::Corrupt {
                path: self.path.clone(),
                reason: format!("record length {length} exceeds {MAX_RECORD_LEN}"),
            });
        }

        let expected_crc = match self.reader.read_u32::<LittleEndian>() {
            Ok(crc) => crc,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut data = vec![0u8; length];
        match self.reader.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let mut hasher = Hasher::new();
        hasher.update(&data);
        if hasher.finalize() != expected_crc {
            return Err(StorageError::Corrupt {
                path: self.path.clone(),
                reason: "record CRC mismatch".to_string(),
            });
        }

        Ok(Some(bincode::deserialize(&data)?))
    }

    /// Collect every remaining row
    pub fn read_all(&mut self) -> Result<Vec<TickRow>, StorageError> {
        let mut rows = Vec::new();
        while let Some(row) = self.read_next()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

fn validate_header(
    file: &mut File,
    path: &Path,
    token: u32,
    segment: ExchangeSegment,
) -> Result<(), StorageError> {
    let corrupt = |reason: &str| StorageError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let magic = file.read_u32::<LittleEndian>()?;
    if magic != SEGMENT_MAGIC {
        return Err(corrupt("bad magic"));
    }

    let version = file.read_u32::<LittleEndian>()?;
    if version != SEGMENT_VERSION {
        return Err(corrupt("unsupported version"));
    }

    let header_token = file.read_u32::<LittleEndian>()?;
    if header_token != token {
        return Err(corrupt("token mismatch"));
    }

    let schema = file.read_u32::<LittleEndian>()?;
    if schema != schema_code(segment) {
        return Err(corrupt("schema mismatch"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn index_row(ts: i64) -> TickRow {
        TickRow::Index { ts, price: 21_500.5 }
    }

    #[test]
    fn write_read_round_trip() -> Result<(), StorageError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("token_256265.tks");

        {
            let mut writer = SegmentWriter::create(&path, 256265, ExchangeSegment::Index)?;
            for ts in 0..5 {
                writer.append(&index_row(ts))?;
            }
            assert_eq!(writer.rows_written(), 5);
        }

        let mut reader = SegmentReader::open(&path, 256265, ExchangeSegment::Index)?;
        let rows = reader.read_all()?;
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4].timestamp(), 4);
        Ok(())
    }

    #[test]
    fn append_after_reopen() -> Result<(), StorageError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("token_1.tks");

        {
            let mut writer = SegmentWriter::create(&path, 1, ExchangeSegment::Index)?;
            writer.append(&index_row(10))?;
        }
        {
            let mut writer = SegmentWriter::open_for_append(&path, 1, ExchangeSegment::Index)?;
            writer.append(&index_row(11))?;
        }

        let rows = SegmentReader::open(&path, 1, ExchangeSegment::Index)?.read_all()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].timestamp(), 11);
        Ok(())
    }

    #[test]
    fn wrong_token_is_corruption() -> Result<(), StorageError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("token_1.tks");
        SegmentWriter::create(&path, 1, ExchangeSegment::Index)?;

        let result = SegmentReader::open(&path, 2, ExchangeSegment::Index);
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
        Ok(())
    }

    #[test]
    fn implausible_record_length_is_corruption() -> Result<(), StorageError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("token_1.tks");

        {
            let mut writer = SegmentWriter::create(&path, 1, ExchangeSegment::Index)?;
            writer.append(&index_row(10))?;
        }

        // overwrite the record length field with a huge value
        {
            let mut file = OpenOptions::new().write(true).open(&path)?;
            file.seek(SeekFrom::Start(16))?;
            file.write_all(&u32::MAX.to_le_bytes())?;
        }

        let mut reader = SegmentReader::open(&path, 1, ExchangeSegment::Index)?;
        assert!(matches!(
            reader.read_next(),
            Err(StorageError::Corrupt { .. })
        ));
        Ok(())
    }

    #[test]
    fn crc_mismatch_detected() -> Result<(), StorageError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("token_1.tks");

        {
            let mut writer = SegmentWriter::create(&path, 1, ExchangeSegment::Index)?;
            writer.append(&index_row(10))?;
        }

        // flip a payload byte past the header and record framing
        {
            let mut file = OpenOptions::new().write(true).open(&path)?;
            file.seek(SeekFrom::Start(16 + 8 + 2))?;
            file.write_all(&[0xFF])?;
        }

        let mut reader = SegmentReader::open(&path, 1, ExchangeSegment::Index)?;
        assert!(matches!(
            reader.read_next(),
            Err(StorageError::Corrupt { .. })
        ));
        Ok(())
    }
}
