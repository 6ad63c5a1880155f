//! Chunked entry collections
//!
//! Large collections are exported as a directory holding `index.json`, which
//! maps ordinals to chunk file names, plus the chunk files themselves. Each
//! chunk is a uid-keyed map. Chunks are read one at a time so that only one is
//! held in memory.

use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::store::{read_json, write_json};
use crate::config::OutputFormat;
use crate::error::Result;

/// Name of the chunk index file
pub const INDEX_FILE: &str = "index.json";

/// One chunk of entries and the file it came from
#[derive(Debug, Clone)]
pub struct Chunk {
    pub path: PathBuf,
    pub entries: Map<String, Value>,
}

impl Chunk {
    /// Persist the chunk back to its own file
    pub fn write(&self, format: OutputFormat) -> Result<()> {
        write_json(&self.path, &self.entries, format)
    }
}

/// Source of entry chunks
pub trait ChunkSource {
    /// The next chunk, or `None` once all chunks have been read
    fn next_chunk(&mut self) -> Result<Option<Chunk>>;
}

/// Reads chunks listed in `<dir>/index.json`
#[derive(Debug)]
pub struct FsChunkReader {
    pending: VecDeque<PathBuf>,
}

impl FsChunkReader {
    /// Open a chunked directory. `None` when the directory has no index.
    pub fn open(dir: &Path) -> Result<Option<Self>> {
        let index_path = dir.join(INDEX_FILE);
        if !index_path.is_file() {
            return Ok(None);
        }
        let index: Map<String, Value> = read_json(&index_path)?;

        let mut files: Vec<(String, String)> = index
            .into_iter()
            .filter_map(|(key, file)| file.as_str().map(|f| (key, f.to_string())))
            .collect();
        files.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => a.cmp(b),
        });

        Ok(Some(Self {
            pending: files.into_iter().map(|(_, file)| dir.join(file)).collect(),
        }))
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl ChunkSource for FsChunkReader {
    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let entries: Map<String, Value> = read_json(&path)?;
        Ok(Some(Chunk { path, entries }))
    }
}
