//! engine::plan
//!
//! Partitioning of the ordered file list into chunks.
//!
//! A [`Plan`] is computed once per run, before the repository is touched,
//! and is fully determined by the file list and the chunk size. Chunks are
//! contiguous, keep the listing order, and all but the last hold exactly
//! `chunk_size` paths.
//!
//! # Example
//!
//! ```
//! use bulkpush::core::types::ChunkSize;
//! use bulkpush::engine::plan::Plan;
//! use std::path::PathBuf;
//!
//! let files: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("/src/{i}"))).collect();
//! let plan = Plan::build(files, ChunkSize::new(2).unwrap());
//!
//! let sizes: Vec<usize> = plan.chunks().iter().map(|c| c.len()).collect();
//! assert_eq!(sizes, vec![2, 2, 1]);
//! assert_eq!(
//!     plan.chunks()[2].commit_message("tiles"),
//!     "Add files from chunk 3/3 (Source: tiles)"
//! );
//! ```

use std::path::PathBuf;

use serde::Serialize;

use crate::core::types::ChunkSize;

/// One batch of files published by a single stage/commit/push cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    index: usize,
    total: usize,
    paths: Vec<PathBuf>,
}

impl Chunk {
    /// 1-based position in the plan.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of chunks in the plan.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false for chunks produced by [`Plan::build`].
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Commit message recorded for this chunk.
    pub fn commit_message(&self, source_label: &str) -> String {
        commit_message(self.index, self.total, source_label)
    }
}

/// Summary line of a chunk for previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkPreview {
    pub index: usize,
    pub total: usize,
    pub files: usize,
    pub first: PathBuf,
    pub last: PathBuf,
}

/// The ordered chunks of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    chunk_size: ChunkSize,
    file_count: usize,
    chunks: Vec<Chunk>,
}

impl Plan {
    /// Split `paths` into contiguous chunks of at most `chunk_size` paths.
    ///
    /// An empty list yields an empty plan.
    pub fn build(paths: Vec<PathBuf>, chunk_size: ChunkSize) -> Self {
        let file_count = paths.len();
        let size = chunk_size.get();
        let total = file_count.div_ceil(size);

        let mut chunks = Vec::with_capacity(total);
        let mut rest = paths.into_iter();
        for index in 1..=total {
            let paths: Vec<PathBuf> = rest.by_ref().take(size).collect();
            chunks.push(Chunk {
                index,
                total,
                paths,
            });
        }

        Self {
            chunk_size,
            file_count,
            chunks,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// One [`ChunkPreview`] per chunk, in order.
    pub fn preview(&self) -> Vec<ChunkPreview> {
        self.chunks
            .iter()
            .filter_map(|chunk| {
                Some(ChunkPreview {
                    index: chunk.index,
                    total: chunk.total,
                    files: chunk.len(),
                    first: chunk.paths.first()?.clone(),
                    last: chunk.paths.last()?.clone(),
                })
            })
            .collect()
    }
}

/// `"Add files from chunk {index}/{total} (Source: {label})"`.
pub fn commit_message(index: usize, total: usize, source_label: &str) -> String {
    format!("Add files from chunk {index}/{total} (Source: {source_label})")
}
