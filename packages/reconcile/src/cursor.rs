//! Caller-side cursor over consecutive chunks.

use inventory_sync_catalog_models::SyncProgress;

use crate::orchestrator::ChunkRequest;

/// Yields the next [`ChunkRequest`] from the previous chunk's
/// [`SyncProgress`].
///
/// The cursor holds no connection state, so a run can be resumed from any
/// offset a previous run reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCursor {
    offset: u64,
    limit: u64,
    finished: bool,
}

impl ChunkCursor {
    /// Starts at offset zero.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self::resume(0, limit)
    }

    /// Starts at `offset`.
    #[must_use]
    pub const fn resume(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            finished: false,
        }
    }

    /// Request for the next chunk, or `None` once the catalog is covered.
    #[must_use]
    pub fn next_request(&self) -> Option<ChunkRequest> {
        if self.finished {
            return None;
        }
        Some(ChunkRequest::new(
            i64::try_from(self.offset).unwrap_or(i64::MAX),
            i64::try_from(self.limit).unwrap_or(i64::MAX),
        ))
    }

    /// Moves past a finished chunk.
    pub const fn advance(&mut self, progress: &SyncProgress) {
        match progress.next_offset {
            Some(next) if !progress.is_complete => self.offset = next,
            _ => self.finished = true,
        }
    }

    /// Offset of the next chunk.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }
}
