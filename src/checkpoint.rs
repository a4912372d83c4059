use tracing::info;

use crate::cache::EnrichmentCache;
use crate::error::GlycoError;
use crate::table::{OutputWriter, Row};

/// Decides when durable state is committed and commits it.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    interval: usize,
    taken: usize,
}

impl Checkpointer {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            taken: 0,
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn taken(&self) -> usize {
        self.taken
    }

    pub fn is_due(&self, processed: usize) -> bool {
        processed > 0 && processed % self.interval == 0
    }

    /// Flushes the cache, then publishes the output table with `tail` appended.
    /// Callers must have drained every outstanding assembly first.
    pub fn commit(
        &mut self,
        cache: &mut EnrichmentCache,
        writer: &mut OutputWriter,
        tail: &[Row],
        processed: usize,
    ) -> Result<(), GlycoError> {
        cache.flush()?;
        writer.commit(tail)?;
        self.taken += 1;
        info!(
            processed,
            written = writer.rows_written(),
            cached = cache.len(),
            "checkpoint committed"
        );
        Ok(())
    }
}
