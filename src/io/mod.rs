//! Collaborators at the edge of the auditor: JSON files on disk, chunked
//! entry collections, the write confirmation prompt and progress reporting.

pub mod chunk;
pub mod confirm;
pub mod progress;
pub mod store;

pub use chunk::{Chunk, ChunkSource, FsChunkReader};
pub use confirm::{AutoConfirm, Confirm, StdinConfirm, WriteGate};
pub use progress::{LogProgress, NoProgress, Progress};
pub use store::{read_json, read_optional, write_json, Collection};
