//! Command output handling.
//!
//! This module provides:
//! - Output fragments tagged by stream
//! - Incremental UTF-8 decoding
//! - Merging of both streams with optional live streaming

mod decoder;
mod fragment;
mod multiplexer;

pub use decoder::Utf8StreamDecoder;
pub use fragment::{OutputFragment, OutputStream};
pub use multiplexer::{OutputCallback, OutputMultiplexer};
