//! The persistence boundary of the geometry store.
//!
//! Reads happen inline on a cache miss. Writes never block the query path: they are handed to
//! a [`WriteBehind`] worker thread over a channel and applied in order.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{debug, error};

use super::geometry::ChunkGeometry;
use crate::error::{RingError, Result};
use crate::ring::ChunkKey;

/// Somewhere chunk geometry can be kept between runs
pub trait GeometryPersistence: Send + Sync {
    /// The stored record for a key, `None` if there is none
    fn load(&self, key: ChunkKey) -> Result<Option<ChunkGeometry>>;
    /// Stores a record, replacing any previous one for the same key
    fn store(&self, record: &ChunkGeometry) -> Result<()>;
}

/// Keeps JSON-encoded records in memory, keyed by chunk key
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    /// Encoded records
    records: Mutex<HashMap<ChunkKey, Vec<u8>>>,
}

impl InMemoryPersistence {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }
    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }
    /// Whether nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
    /// Whether a key has a stored record
    pub fn contains(&self, key: ChunkKey) -> bool {
        self.records.lock().contains_key(&key)
    }
    /// Puts raw bytes under a key, bypassing encoding
    pub fn insert_raw(&self, key: ChunkKey, bytes: Vec<u8>) {
        self.records.lock().insert(key, bytes);
    }
}

impl GeometryPersistence for InMemoryPersistence {
    fn load(&self, key: ChunkKey) -> Result<Option<ChunkGeometry>> {
        let records = self.records.lock();
        let Some(bytes) = records.get(&key) else {
            return Ok(None);
        };
        serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|e| RingError::Persistence(format!("decoding {}: {}", key, e)))
    }

    fn store(&self, record: &ChunkGeometry) -> Result<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| RingError::Persistence(format!("encoding {}: {}", record.key(), e)))?;
        self.records.lock().insert(record.key(), bytes);
        Ok(())
    }
}

/* =========================================
 *           Write Behind
 * ========================================= */

/// What the worker can be asked to do
enum Command {
    /// Persist a record
    Store(Arc<ChunkGeometry>),
    /// Reply once everything queued before this has been applied
    Flush(mpsc::Sender<()>),
}

/// A background thread that applies writes to a [`GeometryPersistence`] in order.
/// Dropping the handle drains the queue and joins the thread.
pub struct WriteBehind {
    /// Feeds the worker, `None` once shutting down
    sender: Option<mpsc::Sender<Command>>,
    /// The worker thread
    worker: Option<thread::JoinHandle<()>>,
}

impl WriteBehind {
    /// Starts the worker thread
    pub fn spawn(persistence: Arc<dyn GeometryPersistence>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let worker = thread::Builder::new()
            .name("geometry-write-behind".into())
            .spawn(move || {
                for command in receiver {
                    match command {
                        Command::Store(record) => match persistence.store(&record) {
                            Ok(()) => debug!(key = %record.key(), "geometry persisted"),
                            Err(e) => error!(key = %record.key(), error = %e, "geometry write failed"),
                        },
                        Command::Flush(reply) => {
                            let _ = reply.send(());
                        }
                    }
                }
                debug!("write-behind worker drained");
            })
            .map_err(|e| RingError::Persistence(format!("spawning write-behind worker: {}", e)))?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queues a record for writing and returns immediately
    pub fn submit(&self, record: Arc<ChunkGeometry>) {
        let key = record.key();
        let sent = self
            .sender
            .as_ref()
            .map(|sender| sender.send(Command::Store(record)).is_ok())
            .unwrap_or(false);
        if !sent {
            error!(key = %key, "write-behind worker is gone, dropping write");
        }
    }

    /// Blocks until every write queued so far has been applied
    pub fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        let (reply, done) = mpsc::channel();
        if sender.send(Command::Flush(reply)).is_ok() {
            let _ = done.recv();
        }
    }
}

impl Drop for WriteBehind {
    fn drop(&mut self) {
        // Closing the channel ends the worker's loop once the queue is empty
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("write-behind worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for WriteBehind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBehind")
            .field("running", &self.sender.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::{ChunkIndex, Floor, RingPosition};
    use crate::stations::FlareProfile;

    fn record(index: u32) -> ChunkGeometry {
        let profile = FlareProfile {
            position: RingPosition::ZERO,
            half_width: 200.0,
            levels: 5.0,
            hub: None,
            distance_from_hub: None,
        };
        ChunkGeometry::from_profiles(
            ChunkKey::new(ChunkIndex::new_unchecked(index), Floor(0)),
            1_000.0,
            &profile,
            &profile,
            &profile,
        )
    }

    /// Refuses every write
    struct Broken;

    impl GeometryPersistence for Broken {
        fn load(&self, _key: ChunkKey) -> Result<Option<ChunkGeometry>> {
            Ok(None)
        }
        fn store(&self, _record: &ChunkGeometry) -> Result<()> {
            Err(RingError::Persistence("disk on fire".into()))
        }
    }

    #[test]
    fn test_in_memory_store_and_load() {
        let store = InMemoryPersistence::new();
        let geometry = record(4);
        assert_eq!(store.load(geometry.key()).unwrap(), None);
        store.store(&geometry).unwrap();
        assert_eq!(store.load(geometry.key()).unwrap(), Some(geometry));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_corrupt_bytes_are_a_persistence_error() {
        let store = InMemoryPersistence::new();
        let key = record(1).key();
        store.insert_raw(key, b"not json".to_vec());
        assert!(matches!(store.load(key), Err(RingError::Persistence(_))));
    }

    #[test]
    fn test_write_behind_flush() {
        let store = Arc::new(InMemoryPersistence::new());
        let writer = WriteBehind::spawn(store.clone()).unwrap();
        for i in 0..50 {
            writer.submit(Arc::new(record(i)));
        }
        writer.flush();
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn test_write_behind_drains_on_drop() {
        let store = Arc::new(InMemoryPersistence::new());
        {
            let writer = WriteBehind::spawn(store.clone()).unwrap();
            writer.submit(Arc::new(record(7)));
        }
        assert!(store.contains(record(7).key()));
    }

    #[test]
    fn test_write_failures_do_not_stop_the_worker() {
        let writer = WriteBehind::spawn(Arc::new(Broken)).unwrap();
        writer.submit(Arc::new(record(0)));
        writer.submit(Arc::new(record(1)));
        writer.flush();
    }
}
