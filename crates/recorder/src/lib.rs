//! # Recorder
//!
//! Write side of the binary chat log.
//!
//! Responsibilities:
//! - Split a raw byte stream into line segments ([`Framer`])
//! - Persist segments and per-line timestamps ([`BinaryLogFile`])
//! - Open one fresh file per connection ([`BinaryLogFactory`])
//!
//! ## File layout
//!
//! ```text
//! file        := open_marker line_record*
//! open_marker := u64 LE nanos
//! line_record := raw_line_bytes u64 LE nanos
//! ```
//!
//! Unterminated tails are written as soon as they are read, so one logical
//! line may span several writes; exactly one timestamp follows each 0x0A.

mod clock;
mod file;
pub mod format;
mod framer;
mod memory;

pub use clock::{ManualClock, SystemClock};
pub use file::{BinaryLogConfig, BinaryLogFactory, BinaryLogFile};
pub use framer::{record_chunk, ChunkStats, Framer, Segment, LINE_TERMINATOR};
pub use memory::{MemoryLog, MemorySink, MemorySinkFactory};
