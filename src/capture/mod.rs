//! Capture machinery
//!
//! [`stream`] adapts provider chunk streams for transparent buffering;
//! [`pipeline`] turns buffered exchanges into best-effort POSTs to the
//! remote service.

pub mod pipeline;
pub mod stream;

pub use pipeline::{
    persist_turn, persist_turn_blocking, persist_with_config, persist_with_config_blocking,
    stats, BlockingPipelineSink, CaptureSink, CaptureStats, CaptureStatsSnapshot, PipelineSink,
};
pub use stream::{CaptureIter, CaptureStream, ChunkCallback};
