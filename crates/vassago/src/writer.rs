//! Writer core: one Zstd frame per write, seek table on close.

use rayon::prelude::*;
use tracing::{debug, trace};
use vassago_core::{BlockSink, Error, FrameEncoder, Result};

use crate::frame::encode_frame;
use crate::seek_table::{SeekTable, SeekTableEntry};

/// Writer configuration.
#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    /// Record a per-frame checksum of the decompressed content.
    pub checksums: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self { checksums: true }
    }
}

/// Options for [`SeekableWriter::write_many`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteManyOptions {
    /// Frames encoded in parallel per batch. `0` picks the rayon pool width;
    /// `1` encodes sequentially.
    pub concurrency: usize,
}

impl WriteManyOptions {
    /// Set the encode concurrency.
    pub fn concurrency(concurrency: usize) -> Self {
        Self { concurrency }
    }
}

/// Writes an indexed stream of independent Zstd frames.
///
/// Every [`write`](Self::write) call becomes exactly one frame - no
/// coalescing, no splitting - and appends an entry to the in-memory seek
/// table. [`close`](Self::close) appends the table as a skippable frame.
/// The underlying sink stays open; closing it remains the caller's job.
///
/// Writes are single-producer. The only concurrency inside the writer is
/// the parallel-encode batch of [`write_many`](Self::write_many), which
/// still commits frames to the sink in submission order.
pub struct SeekableWriter<E, S> {
    encoder: E,
    sink: S,
    table: SeekTable,
    closed: bool,
}

impl<E: FrameEncoder, S: BlockSink> SeekableWriter<E, S> {
    /// Create a writer with default options (checksums on).
    pub fn new(sink: S, encoder: E) -> Self {
        Self::with_options(sink, encoder, WriterOptions::default())
    }

    /// Create a writer with explicit options.
    pub fn with_options(sink: S, encoder: E, options: WriterOptions) -> Self {
        Self {
            encoder,
            sink,
            table: SeekTable::empty(options.checksums),
            closed: false,
        }
    }

    /// Write one chunk of data as one frame.
    ///
    /// Zero-length chunks are permitted and become zero-length frames,
    /// invisible to readers.
    ///
    /// # Returns
    /// `src.len()` on success.
    ///
    /// # Errors
    /// [`Error::WriterClosed`] after [`close`](Self::close);
    /// [`Error::FrameTooLarge`] for chunks the 32-bit per-frame sizes cannot
    /// describe; [`Error::ShortWrite`] when the sink accepts fewer bytes than
    /// offered.
    pub fn write(&mut self, src: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::WriterClosed);
        }
        let (compressed, entry) = encode_frame(&self.encoder, src, self.table.with_checksum())?;
        self.commit(&compressed, entry)?;
        Ok(src.len())
    }

    /// Write every frame yielded by `frames`, preserving its order on disk.
    ///
    /// With concurrency above 1, payloads are pulled in bounded batches and
    /// encoded in parallel; the commit to the sink still happens in yield
    /// order, so the stream is byte-identical to the sequential one. Memory
    /// stays proportional to the batch size.
    pub fn write_many<I>(&mut self, frames: I, options: WriteManyOptions) -> Result<()>
    where
        I: IntoIterator<Item = Result<Vec<u8>>>,
        E: Sync,
    {
        if self.closed {
            return Err(Error::WriterClosed);
        }
        let concurrency = match options.concurrency {
            0 => rayon::current_num_threads(),
            n => n,
        };
        let mut frames = frames.into_iter();

        if concurrency <= 1 {
            for frame in frames {
                self.write(&frame?)?;
            }
            return Ok(());
        }

        loop {
            let mut batch = Vec::with_capacity(concurrency);
            for frame in frames.by_ref().take(concurrency) {
                batch.push(frame?);
            }
            if batch.is_empty() {
                return Ok(());
            }

            let encoder = &self.encoder;
            let with_checksum = self.table.with_checksum();
            let encoded = batch
                .par_iter()
                .map(|src| encode_frame(encoder, src, with_checksum))
                .collect::<Result<Vec<_>>>()?;

            for (compressed, entry) in &encoded {
                self.commit(compressed, *entry)?;
            }
        }
    }

    /// Append the seek table. Idempotent: only the first call writes;
    /// later calls are no-ops returning `Ok`.
    ///
    /// Does not close the underlying sink.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let bytes = self.table.serialize()?;
        let written = self.sink.append(&bytes)?;
        if written != bytes.len() {
            return Err(Error::short_write(written, bytes.len()));
        }
        debug!(
            frames = self.table.frame_count(),
            table_bytes = bytes.len(),
            "wrote seek table"
        );
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frame_count(&self) -> usize {
        self.table.frame_count()
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get a reference to the sink.
    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Get a mutable reference to the sink.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the writer and return the sink.
    pub fn into_inner(self) -> S {
        self.sink
    }

    fn commit(&mut self, compressed: &[u8], entry: SeekTableEntry) -> Result<()> {
        let written = self.sink.append(compressed)?;
        if written != compressed.len() {
            return Err(Error::short_write(written, compressed.len()));
        }
        trace!(
            frame = self.table.frame_count(),
            decompressed = entry.decompressed_size,
            compressed = entry.compressed_size,
            "wrote frame"
        );
        self.table.push(entry);
        Ok(())
    }
}
