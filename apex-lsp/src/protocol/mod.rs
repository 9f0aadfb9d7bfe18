//! LSP wire plumbing: framing codec, message classification, async I/O.

pub mod codec;
pub mod io;
pub mod message;
