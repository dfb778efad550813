//! # Vassago Core
//!
//! Core traits and error types for the Vassago seekable compression library.
//!
//! Vassago is named after the third demon of the Ars Goetia, who discovers
//! all things hidden or lost - just as a seek table lets a reader find any
//! byte inside a compressed stream without scanning from the start.
//!
//! ## Design Philosophy
//!
//! - **Injection over globals**: The Zstd codec and the byte source/sink are
//!   passed in at construction; the format layer never picks a compression
//!   library for you.
//! - **Seams are traits**: [`FrameEncoder`], [`FrameDecoder`], [`BlockSink`],
//!   and [`RandomAccessSource`] are the only contact points between the
//!   seekable format and the outside world.
//! - **Errors carry structure**: every failure is a typed [`Error`] variant,
//!   never a stringly `io::Error` in disguise.
//!
//! ## Core Traits
//!
//! - [`FrameEncoder`] - one-shot compression of a frame payload
//! - [`FrameDecoder`] - one-shot decompression of a frame
//! - [`BlockSink`] - append-only byte sink the writer emits into
//! - [`RandomAccessSource`] - positioned-read byte source the reader pulls from

pub mod error;
pub mod traits;

pub use error::{Error, Result};
pub use traits::{BlockSink, FrameDecoder, FrameEncoder, IoSink, RandomAccessSource};
