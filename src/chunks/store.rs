//! The lazily filled, thread-safe chunk geometry cache.
//!
//! Each `(chunk, floor)` slot moves through a small state machine:
//!
//! ```text
//! Uncomputed --compute/load--> Cached --invalidate--> Dirty --recompute--> Cached
//! ```
//!
//! Slots live in lock shards. A cached read only takes a shared shard lock. The first access
//! to a slot takes that slot's gate, so concurrent first readers wait for one computation
//! instead of racing their own.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use super::geometry::ChunkGeometry;
use super::persistence::{GeometryPersistence, WriteBehind};
use crate::config::RingConfig;
use crate::error::{RingError, Result};
use crate::ring::{ChunkIndex, ChunkKey, ChunkRange, ChunkSpan, Floor, RingSpace};
use crate::stations::{FlareModel, HubCatalog};

/// Where a slot is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Never computed, or computed but rejected
    Uncomputed,
    /// Holds a record that passed its seam checks
    Cached,
    /// Held a record that is now stale, it is recomputed on next access
    Dirty,
}

/// What a slot holds
#[derive(Debug)]
enum Entry {
    /// Nothing yet
    Uncomputed,
    /// A live record
    Cached(Arc<ChunkGeometry>),
    /// A stale record was dropped
    Dirty,
}

/// One cache slot
#[derive(Debug)]
struct Slot {
    /// Current contents
    entry: Entry,
    /// Held while the slot is being filled
    gate: Arc<Mutex<()>>,
}

impl Slot {
    /// An empty slot with a fresh gate
    fn new() -> Self {
        Self {
            entry: Entry::Uncomputed,
            gate: Arc::new(Mutex::new(())),
        }
    }
}

/// One lock shard of the cache
type Shard = RwLock<HashMap<ChunkKey, Slot>>;

/// How a record was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// It was already cached
    Cache,
    /// It was read back from persistence
    Persistence,
    /// The flare law was evaluated
    Computed,
}

/// The outcome of a bulk generation pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationReport {
    /// Floor the pass ran on
    pub floor: Floor,
    /// Chunks in the range
    pub requested: usize,
    /// Records computed from the flare law
    pub computed: usize,
    /// Records read back from persistence
    pub loaded: usize,
    /// Records that were already cached
    pub cached: usize,
    /// Every seam that failed, either while caching a record or in the final sweep
    pub seam_errors: Vec<RingError>,
}

impl GenerationReport {
    /// Whether every seam in the range held
    pub fn is_clean(&self) -> bool {
        self.seam_errors.is_empty()
    }
}

/// Serves chunk geometry, computing it from the flare law on first use
pub struct ChunkGeometryStore {
    /// The ring
    space: RingSpace,
    /// The flare law, swapped whole when the catalog is replaced
    flare: RwLock<Arc<FlareModel>>,
    /// Width tolerance at seams
    seam_tolerance: f64,
    /// The cache
    shards: Vec<Shard>,
    /// Read side of persistence
    persistence: Option<Arc<dyn GeometryPersistence>>,
    /// Write side of persistence
    writer: Option<WriteBehind>,
    /// Number of flare evaluations so far
    computations: AtomicUsize,
}

/* =========================================
 *           Builder
 * ========================================= */

/// Builds a [`ChunkGeometryStore`]
pub struct ChunkGeometryStoreBuilder {
    /// Ring constants
    config: RingConfig,
    /// Hubs, empty unless set
    catalog: Arc<HubCatalog>,
    /// Optional persistence collaborator
    persistence: Option<Arc<dyn GeometryPersistence>>,
}

impl ChunkGeometryStoreBuilder {
    /// Start here
    pub fn new(config: RingConfig) -> Self {
        Self {
            config,
            catalog: Arc::new(HubCatalog::empty()),
            persistence: None,
        }
    }
    /// The hub catalog to evaluate the flare law against
    pub fn catalog(mut self, catalog: Arc<HubCatalog>) -> Self {
        self.catalog = catalog;
        self
    }
    /// Reads misses from, and writes new records behind to, this collaborator
    pub fn persistence(mut self, persistence: Arc<dyn GeometryPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }
    /// Validates the config and starts the write-behind worker if there is persistence
    pub fn build(self) -> Result<ChunkGeometryStore> {
        self.config.validate()?;
        let space = RingSpace::from_config(&self.config)?;
        let flare = FlareModel::from_config(&self.config, self.catalog)?;
        let writer = self
            .persistence
            .as_ref()
            .map(|persistence| WriteBehind::spawn(persistence.clone()))
            .transpose()?;
        let shards = (0..self.config.cache_shards)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        debug!(
            chunks = space.chunk_count(),
            shards = self.config.cache_shards,
            persistent = writer.is_some(),
            "chunk geometry store ready"
        );
        Ok(ChunkGeometryStore {
            space,
            flare: RwLock::new(Arc::new(flare)),
            seam_tolerance: self.config.seam_tolerance,
            shards,
            persistence: self.persistence,
            writer,
            computations: AtomicUsize::new(0),
        })
    }
}

impl ChunkGeometryStore {
    /// A store without persistence
    pub fn new(config: RingConfig, catalog: Arc<HubCatalog>) -> Result<Self> {
        ChunkGeometryStoreBuilder::new(config).catalog(catalog).build()
    }
}

/* =========================================
 *           Simple Getters
 * ========================================= */
impl ChunkGeometryStore {
    /// The ring
    pub fn space(&self) -> &RingSpace {
        &self.space
    }
    /// The flare model currently in use
    pub fn flare_model(&self) -> Arc<FlareModel> {
        self.flare.read().clone()
    }
    /// Width tolerance at seams
    pub fn seam_tolerance(&self) -> f64 {
        self.seam_tolerance
    }
    /// How many times the flare law has been evaluated for a record
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }
    /// Number of cached records
    pub fn cached_len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .values()
                    .filter(|slot| matches!(slot.entry, Entry::Cached(_)))
                    .count()
            })
            .sum()
    }
}

/* =========================================
 *           Slots
 * ========================================= */
impl ChunkGeometryStore {
    /// The shard a key lives in. Neighbouring chunks land in different shards.
    fn shard(&self, key: ChunkKey) -> &Shard {
        let n = self.shards.len();
        let i = (key.index.get() as usize).wrapping_add(key.floor.0 as usize) % n;
        &self.shards[i]
    }

    /// The gate of a slot, creating the slot if needed
    fn gate(&self, key: ChunkKey) -> Arc<Mutex<()>> {
        self.shard(key)
            .write()
            .entry(key)
            .or_insert_with(Slot::new)
            .gate
            .clone()
    }

    /// The record of a key if it is cached, without computing anything
    pub fn peek(&self, key: ChunkKey) -> Option<Arc<ChunkGeometry>> {
        let shard = self.shard(key).read();
        match shard.get(&key).map(|slot| &slot.entry) {
            Some(Entry::Cached(record)) => Some(record.clone()),
            _ => None,
        }
    }

    /// Where a slot is in its lifecycle
    pub fn slot_state(&self, key: ChunkKey) -> SlotState {
        let shard = self.shard(key).read();
        match shard.get(&key).map(|slot| &slot.entry) {
            Some(Entry::Cached(_)) => SlotState::Cached,
            Some(Entry::Dirty) => SlotState::Dirty,
            Some(Entry::Uncomputed) | None => SlotState::Uncomputed,
        }
    }

    /// The cached record for a key, filling the slot if needed
    fn fetch(&self, key: ChunkKey) -> Result<(Arc<ChunkGeometry>, Origin)> {
        if let Some(record) = self.peek(key) {
            return Ok((record, Origin::Cache));
        }
        let gate = self.gate(key);
        let _filling = gate.lock();

        // Someone else may have filled it while we waited on the gate
        let dirty = match self.shard(key).read().get(&key).map(|slot| &slot.entry) {
            Some(Entry::Cached(record)) => return Ok((record.clone(), Origin::Cache)),
            Some(Entry::Dirty) => true,
            _ => false,
        };

        // Persisted copies of dirty records are stale
        let loaded = if dirty { None } else { self.load_persisted(key) };
        let (record, origin) = match loaded {
            Some(record) => (record, Origin::Persistence),
            None => (self.compute(key), Origin::Computed),
        };
        self.check_cached_neighbours(&record)?;

        let record = Arc::new(record);
        if let Some(slot) = self.shard(key).write().get_mut(&key) {
            slot.entry = Entry::Cached(record.clone());
        }
        // Neighbours filled concurrently missed each other above, one of them sees the seam here
        if let Err(e) = self.check_cached_neighbours(&record) {
            self.retract(key, &record);
            return Err(e);
        }
        if origin == Origin::Computed {
            if let Some(writer) = &self.writer {
                writer.submit(record.clone());
            }
        }
        Ok((record, origin))
    }

    /// Takes a published record back out of its slot, unless something replaced it already
    fn retract(&self, key: ChunkKey, record: &Arc<ChunkGeometry>) {
        if let Some(slot) = self.shard(key).write().get_mut(&key) {
            if matches!(&slot.entry, Entry::Cached(cached) if Arc::ptr_eq(cached, record)) {
                slot.entry = Entry::Uncomputed;
            }
        }
    }

    /// Reads a record back from persistence. Failures count as a miss.
    /// Records computed under another catalog or base profile are stale and count as a miss.
    fn load_persisted(&self, key: ChunkKey) -> Option<ChunkGeometry> {
        let persistence = self.persistence.as_ref()?;
        let fingerprint = self.flare_model().fingerprint();
        match persistence.load(key) {
            Ok(Some(record))
                if record.key() != key || record.chunk_length() != self.space.chunk_length() =>
            {
                warn!(
                    key = %key,
                    stored_key = %record.key(),
                    "persisted geometry does not match its key, recomputing"
                );
                None
            }
            Ok(Some(record)) if record.fingerprint() != fingerprint => {
                warn!(
                    key = %key,
                    stored = record.fingerprint(),
                    current = fingerprint,
                    "persisted geometry was computed from other hub definitions, recomputing"
                );
                None
            }
            Ok(Some(record)) => {
                debug!(key = %key, "chunk geometry loaded from persistence");
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                error!(key = %key, error = %e, "reading persisted geometry failed, recomputing");
                None
            }
        }
    }

    /// Evaluates the flare law at the chunk's start, center and end
    fn compute(&self, key: ChunkKey) -> ChunkGeometry {
        let flare = self.flare_model();
        let start = flare.profile(self.space.chunk_start(key.index));
        let center = flare.profile(self.space.chunk_center(key.index));
        let end = flare.profile(self.space.chunk_end(key.index));
        self.computations.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, hub = ?center.hub, "chunk geometry computed");
        ChunkGeometry::from_profiles(key, self.space.chunk_length(), &start, &center, &end)
            .with_fingerprint(flare.fingerprint())
    }

    /// Checks a record's seams against whichever neighbours are already cached.
    /// Uncached neighbours are not computed, they check this record when they get cached.
    /// Runs once before a record is published and once after.
    fn check_cached_neighbours(&self, record: &ChunkGeometry) -> Result<()> {
        let key = record.key();
        let previous = ChunkKey::new(self.space.previous_chunk(key.index), key.floor);
        let next = ChunkKey::new(self.space.next_chunk(key.index), key.floor);
        let result = self
            .peek(previous)
            .map_or(Ok(()), |before| before.check_seam(record, self.seam_tolerance))
            .and_then(|()| {
                self.peek(next)
                    .map_or(Ok(()), |after| record.check_seam(&after, self.seam_tolerance))
            });
        if let Err(e) = &result {
            error!(key = %key, error = %e, "seam mismatch, record not cached");
        }
        result
    }
}

/* =========================================
 *           Queries
 * ========================================= */
impl ChunkGeometryStore {
    /// The geometry of a chunk. Raw indices are wrapped, `-1` is the last chunk.
    pub fn get_geometry(&self, chunk_index: i64, floor: Floor) -> Result<Arc<ChunkGeometry>> {
        self.geometry(ChunkKey::new(self.space.wrap_chunk_index(chunk_index), floor))
    }

    /// The geometry of a chunk key
    pub fn geometry(&self, key: ChunkKey) -> Result<Arc<ChunkGeometry>> {
        self.fetch(key).map(|(record, _)| record)
    }

    /// Full width at an offset into a chunk
    pub fn width_at(&self, chunk_index: i64, floor: Floor, offset: f64) -> Result<f64> {
        self.get_geometry(chunk_index, floor)?.width_at(offset)
    }

    /// Level count at an offset into a chunk
    pub fn levels_at(&self, chunk_index: i64, floor: Floor, offset: f64) -> Result<u32> {
        self.get_geometry(chunk_index, floor)?.levels_at(offset)
    }

    /// The geometry of the chunk owning a raw position
    pub fn geometry_at_position(&self, position: f64, floor: Floor) -> Result<Arc<ChunkGeometry>> {
        let (index, _) = self.space.locate(position)?;
        self.geometry(ChunkKey::new(index, floor))
    }

    /// Full width at a raw position, read from the owning chunk's record
    pub fn width_at_position(&self, position: f64, floor: Floor) -> Result<f64> {
        let (index, offset) = self.space.locate(position)?;
        self.geometry(ChunkKey::new(index, floor))?.width_at(offset)
    }

    /// Level count at a raw position, read from the owning chunk's record
    pub fn levels_at_position(&self, position: f64, floor: Floor) -> Result<u32> {
        let (index, offset) = self.space.locate(position)?;
        self.geometry(ChunkKey::new(index, floor))?.levels_at(offset)
    }

    /// Checks the seam between a chunk and the one after it, computing both if needed
    pub fn validate_seam(&self, chunk_index: i64, floor: Floor) -> Result<()> {
        let index = self.space.wrap_chunk_index(chunk_index);
        let here = self.geometry(ChunkKey::new(index, floor))?;
        let next = self.geometry(ChunkKey::new(self.space.next_chunk(index), floor))?;
        here.check_seam(&next, self.seam_tolerance)
    }
}

/* =========================================
 *           Invalidation
 * ========================================= */
impl ChunkGeometryStore {
    /// Marks one cached record stale
    pub fn invalidate(&self, chunk_index: i64, floor: Floor) {
        let key = ChunkKey::new(self.space.wrap_chunk_index(chunk_index), floor);
        if let Some(slot) = self.shard(key).write().get_mut(&key) {
            if matches!(slot.entry, Entry::Cached(_)) {
                slot.entry = Entry::Dirty;
                debug!(key = %key, "chunk geometry invalidated");
            }
        }
    }

    /// Marks every cached record stale
    pub fn invalidate_all(&self) {
        let mut invalidated = 0;
        for shard in &self.shards {
            for slot in shard.write().values_mut() {
                if matches!(slot.entry, Entry::Cached(_)) {
                    slot.entry = Entry::Dirty;
                    invalidated += 1;
                }
            }
        }
        debug!(invalidated, "chunk geometry cache invalidated");
    }

    /// Swaps the hub catalog and marks everything stale so it is recomputed against it
    pub fn replace_catalog(&self, catalog: Arc<HubCatalog>) {
        let hubs = catalog.len();
        {
            let mut flare = self.flare.write();
            *flare = Arc::new(flare.with_catalog(catalog));
        }
        self.invalidate_all();
        info!(hubs, "hub catalog replaced");
    }

    /// Blocks until queued persistence writes have been applied
    pub fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush();
        }
    }
}

/* =========================================
 *           Bulk
 * ========================================= */
impl ChunkGeometryStore {
    /// Fills every record of a range in parallel, then checks every seam inside it.
    /// Seam failures are collected in the report, anything else aborts the pass.
    pub fn generate(&self, range: &ChunkRange) -> Result<GenerationReport> {
        let keys: Vec<ChunkKey> = range.keys().collect();
        let outcomes: Vec<Result<Origin>> = keys
            .par_iter()
            .map(|&key| self.fetch(key).map(|(_, origin)| origin))
            .collect();

        let mut report = GenerationReport {
            floor: range.floor(),
            requested: keys.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(Origin::Cache) => report.cached += 1,
                Ok(Origin::Persistence) => report.loaded += 1,
                Ok(Origin::Computed) => report.computed += 1,
                Err(e @ RingError::SeamMismatch { .. }) => report.seam_errors.push(e),
                Err(e) => return Err(e),
            }
        }

        // Rejected records are not cached, so this sweep never reports a seam twice
        let sweep: Vec<RingError> = keys
            .par_iter()
            .filter_map(|&key| {
                let next = ChunkKey::new(self.space.next_chunk(key.index), key.floor);
                if !range.contains(next.index) {
                    return None;
                }
                let (here, after) = (self.peek(key)?, self.peek(next)?);
                here.check_seam(&after, self.seam_tolerance).err()
            })
            .collect();
        report.seam_errors.extend(sweep);

        if report.is_clean() {
            info!(
                floor = %report.floor,
                requested = report.requested,
                computed = report.computed,
                loaded = report.loaded,
                "generation pass complete"
            );
        } else {
            error!(
                floor = %report.floor,
                seam_errors = report.seam_errors.len(),
                "generation pass found seam mismatches"
            );
        }
        Ok(report)
    }

    /// Fills and checks all `N` seams of one floor
    pub fn validate_ring(&self, floor: Floor) -> Result<GenerationReport> {
        self.generate(&ChunkRange::full(&self.space, ChunkIndex::ZERO, floor))
    }

    /// Every record of a range, in the range's iteration order.
    /// The two halves of a range that crosses the seam are fetched concurrently.
    pub fn geometries_in_range(&self, range: &ChunkRange) -> Result<Vec<Arc<ChunkGeometry>>> {
        let floor = range.floor();
        let fetch_span = |span: &ChunkSpan| -> Result<Vec<Arc<ChunkGeometry>>> {
            span.iter()
                .map(|index| self.geometry(ChunkKey::new(index, floor)))
                .collect()
        };
        let spans = range.spans();
        let fetched: Vec<(ChunkSpan, Vec<Arc<ChunkGeometry>>)> = match spans.as_slice() {
            [low, high] => {
                let (low_records, high_records) =
                    rayon::join(|| fetch_span(low), || fetch_span(high));
                vec![(*low, low_records?), (*high, high_records?)]
            }
            _ => spans
                .iter()
                .map(|span| Ok((*span, fetch_span(span)?)))
                .collect::<Result<_>>()?,
        };
        range
            .iter()
            .map(|index| {
                fetched
                    .iter()
                    .find(|(span, _)| span.contains(index))
                    .map(|(span, records)| {
                        records[(index.get() - span.start.get()) as usize].clone()
                    })
                    .ok_or_else(|| {
                        RingError::invalid_argument(
                            "range",
                            format!("chunk {} is not covered by its own spans", index),
                        )
                    })
            })
            .collect()
    }
}

impl std::fmt::Debug for ChunkGeometryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkGeometryStore")
            .field("space", &self.space)
            .field("shards", &self.shards.len())
            .field("cached", &self.cached_len())
            .field("computations", &self.computations())
            .field("writer", &self.writer)
            .finish()
    }
}
