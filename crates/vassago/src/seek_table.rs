//! Seek-table serialization and parsing.
//!
//! The seek table travels in a Zstd skippable frame appended after the last
//! data frame, so plain decompressors ignore it.
//!
//! ## Layout
//!
//! ```text
//! +--------------------+----------------------+
//! | Skippable_Magic    | 4 bytes LE 0x184D2A5E|
//! | Frame_Size         | 4 bytes LE           |  entries + footer, in bytes
//! +--------------------+----------------------+
//! | Entry 0            | 8 or 12 bytes        |  compressed size,
//! | ...                |                      |  decompressed size,
//! | Entry N-1          |                      |  [checksum]
//! +--------------------+----------------------+
//! | Number_Of_Frames   | 4 bytes LE           |
//! | Descriptor         | 1 byte               |  bit 7 = checksum flag
//! | Seekable_Magic     | 4 bytes LE 0x8F92EAB1|
//! +--------------------+----------------------+
//! ```
//!
//! All integers are little-endian. The descriptor's seven remaining bits are
//! reserved and must be zero.

use vassago_core::{Error, RandomAccessSource, Result};

use crate::{SEEKABLE_MAGIC, SEEK_TABLE_FOOTER_SIZE, SKIPPABLE_HEADER_SIZE, SKIPPABLE_MAGIC};

/// Descriptor bit marking 12-byte entries that carry a checksum.
const CHECKSUM_FLAG: u8 = 0x80;

/// Read a little-endian u32 at `at`. Callers guarantee bounds.
#[inline]
fn read_le32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// One seek-table record describing a single data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekTableEntry {
    /// Bytes the frame occupies on disk.
    pub compressed_size: u32,
    /// Bytes the frame decodes to. Zero is permitted.
    pub decompressed_size: u32,
    /// Low 32 bits of XXH64 over the decompressed content, when the stream
    /// carries checksums.
    pub checksum: Option<u32>,
}

/// The parsed (or to-be-written) seek table of one stream.
#[derive(Debug, Clone)]
pub struct SeekTable {
    entries: Vec<SeekTableEntry>,
    with_checksum: bool,
}

impl SeekTable {
    /// Build a seek table from frame entries.
    ///
    /// `with_checksum` selects the 12-byte entry stride; every entry must
    /// then carry a checksum.
    pub fn new(entries: Vec<SeekTableEntry>, with_checksum: bool) -> Self {
        Self {
            entries,
            with_checksum,
        }
    }

    /// Create an empty table, ready to record frames as a writer emits them.
    pub fn empty(with_checksum: bool) -> Self {
        Self {
            entries: Vec::new(),
            with_checksum,
        }
    }

    /// Record one frame entry, in stream order.
    pub fn push(&mut self, entry: SeekTableEntry) {
        self.entries.push(entry);
    }

    /// The frame entries, in stream order.
    pub fn entries(&self) -> &[SeekTableEntry] {
        &self.entries
    }

    /// Number of data frames the table describes.
    pub fn frame_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether entries carry a per-frame checksum.
    pub fn with_checksum(&self) -> bool {
        self.with_checksum
    }

    /// On-disk size of one entry.
    pub fn entry_stride(&self) -> usize {
        if self.with_checksum {
            12
        } else {
            8
        }
    }

    /// Total on-disk size of the skippable frame holding this table.
    pub fn serialized_size(&self) -> usize {
        SKIPPABLE_HEADER_SIZE + self.entries.len() * self.entry_stride() + SEEK_TABLE_FOOTER_SIZE
    }

    /// Serialize the table into the skippable-frame byte block appended at
    /// stream close.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let num_frames = u32::try_from(self.entries.len())
            .map_err(|_| Error::invalid_config("frame count exceeds the seek-table limit"))?;
        let user_data = self.entries.len() as u64 * self.entry_stride() as u64
            + SEEK_TABLE_FOOTER_SIZE as u64;
        let user_data = u32::try_from(user_data)
            .map_err(|_| Error::invalid_config("seek table exceeds the skippable frame limit"))?;

        let mut out = Vec::with_capacity(self.serialized_size());
        out.extend_from_slice(&SKIPPABLE_MAGIC.to_le_bytes());
        out.extend_from_slice(&user_data.to_le_bytes());

        for entry in &self.entries {
            out.extend_from_slice(&entry.compressed_size.to_le_bytes());
            out.extend_from_slice(&entry.decompressed_size.to_le_bytes());
            if self.with_checksum {
                let checksum = entry.checksum.ok_or_else(|| {
                    Error::invalid_config("checksummed seek table with a checksum-less entry")
                })?;
                out.extend_from_slice(&checksum.to_le_bytes());
            }
        }

        out.extend_from_slice(&num_frames.to_le_bytes());
        out.push(if self.with_checksum { CHECKSUM_FLAG } else { 0 });
        out.extend_from_slice(&SEEKABLE_MAGIC.to_le_bytes());
        Ok(out)
    }

    /// Parse the seek table from the tail of a stream.
    ///
    /// Reads the 9-byte footer first, derives the table extent from it, then
    /// validates the skippable header against that extent.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptedData`] on any structural violation: stream shorter
    /// than a footer, magic mismatches, reserved descriptor bits, or a
    /// declared length that disagrees with the stream.
    pub fn read_from<S: RandomAccessSource + ?Sized>(source: &S) -> Result<Self> {
        let total = source.size()?;
        if total < SEEK_TABLE_FOOTER_SIZE as u64 {
            return Err(Error::corrupted(format!(
                "stream of {total} bytes cannot hold a seek-table footer"
            )));
        }

        let footer_offset = total - SEEK_TABLE_FOOTER_SIZE as u64;
        let footer = source.read_at(footer_offset, SEEK_TABLE_FOOTER_SIZE)?;
        if footer.len() < SEEK_TABLE_FOOTER_SIZE {
            return Err(Error::corrupted_at("short read of seek-table footer", footer_offset));
        }

        let magic = read_le32(&footer, 5);
        if magic != SEEKABLE_MAGIC {
            return Err(Error::corrupted(format!(
                "bad seekable magic 0x{magic:08x}"
            )));
        }
        let descriptor = footer[4];
        if descriptor & !CHECKSUM_FLAG != 0 {
            return Err(Error::corrupted(format!(
                "reserved bits set in seek-table descriptor 0x{descriptor:02x}"
            )));
        }
        let with_checksum = descriptor & CHECKSUM_FLAG != 0;
        let num_frames = read_le32(&footer, 0);

        let stride: u64 = if with_checksum { 12 } else { 8 };
        let entries_size = num_frames as u64 * stride;
        let frame_size =
            SKIPPABLE_HEADER_SIZE as u64 + entries_size + SEEK_TABLE_FOOTER_SIZE as u64;
        if frame_size > total {
            return Err(Error::corrupted(format!(
                "seek table of {frame_size} bytes declared in a stream of {total} bytes"
            )));
        }
        let table_offset = total - frame_size;
        let block_len = usize::try_from(frame_size)
            .map_err(|_| Error::corrupted("seek table too large for this platform"))?;

        let block = source.read_at(table_offset, block_len)?;
        if block.len() != block_len {
            return Err(Error::corrupted_at("short read of seek table", table_offset));
        }

        let magic = read_le32(&block, 0);
        if magic != SKIPPABLE_MAGIC {
            return Err(Error::corrupted(format!(
                "bad skippable magic 0x{magic:08x}"
            )));
        }
        let declared = read_le32(&block, 4) as u64;
        if declared != entries_size + SEEK_TABLE_FOOTER_SIZE as u64 {
            return Err(Error::corrupted(format!(
                "skippable frame declares {declared} bytes of user data, footer implies {}",
                entries_size + SEEK_TABLE_FOOTER_SIZE as u64
            )));
        }

        let entry_bytes =
            &block[SKIPPABLE_HEADER_SIZE..SKIPPABLE_HEADER_SIZE + entries_size as usize];
        let mut entries = Vec::with_capacity(num_frames as usize);
        for chunk in entry_bytes.chunks_exact(stride as usize) {
            entries.push(SeekTableEntry {
                compressed_size: read_le32(chunk, 0),
                decompressed_size: read_le32(chunk, 4),
                checksum: with_checksum.then(|| read_le32(chunk, 8)),
            });
        }

        Ok(Self {
            entries,
            with_checksum,
        })
    }
}
