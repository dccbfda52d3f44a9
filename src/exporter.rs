use tracing::{debug, error};

use crate::{
    batch::Batch, client::BatchWriter, registry::Registry, translate::collect, Time, WriteError,
};

/// One registry, one store, one database.
#[derive(Debug)]
pub struct Exporter<R, W> {
    registry: R,
    writer: W,
    database: String,
    clock: fn() -> Time,
}
impl<R, W> Exporter<R, W>
where
    R: Registry,
    W: BatchWriter,
{
    pub fn new(registry: R, writer: W, database: String) -> Self {
        Self {
            registry,
            writer,
            database,
            clock: crate::now,
        }
    }
    pub fn with_clock(mut self, clock: fn() -> Time) -> Self {
        self.clock = clock;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Samples the registry into a fresh batch.
    pub fn batch(&self) -> Batch {
        let points = collect(&self.registry, self.clock);
        Batch::new(self.database.clone(), points)
    }

    /// Samples and writes one batch, returning how many points were sent.
    pub fn export(&self) -> Result<usize, WriteError> {
        let batch = self.batch();
        self.writer.write(&batch)?;
        Ok(batch.points.len())
    }

    /// Runs [`Self::export`] and reports the outcome instead of returning it.
    /// The batch is dropped either way.
    pub fn run_cycle(&self) {
        match self.export() {
            Ok(points) => debug!(points, database = %self.database, "exported metrics"),
            Err(e) => error!(
                error = %e,
                database = %self.database,
                "failed to write metrics batch"
            ),
        }
    }
}
