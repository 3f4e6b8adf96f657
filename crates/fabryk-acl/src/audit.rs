//! Bounded audit history of ACL changes.
//!
//! [`AppendStack`] is an append-only stack split into fixed-size layers.
//! Items go onto the newest layer until it is full, then a new layer with
//! the next generation number is started. Once more than `max_layers`
//! layers exist the oldest ones are pruned. Every item is addressed by an
//! [`AuditId`] `(generation, index)` that increases monotonically.
//!
//! [`AuditLog`] wraps a stack of [`AuditEntry`] values behind a mutex and
//! answers "what changed after cursor X" queries. It is a history view;
//! live subscribers are not replayed from it.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use fabryk_core::ResourceId;
use serde::{Deserialize, Serialize};

/// Default number of layers retained.
pub const DEFAULT_MAX_LAYERS: usize = 10;

/// Default entries per layer.
pub const DEFAULT_LAYER_SIZE: usize = 100;

/// Position of an item in an [`AppendStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditId {
    /// Layer generation.
    pub generation: u64,
    /// Index within the layer.
    pub index: usize,
}

impl AuditId {
    /// Creates an id.
    pub fn new(generation: u64, index: usize) -> Self {
        Self { generation, index }
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.generation, self.index)
    }
}

impl FromStr for AuditId {
    type Err = crate::Error;

    /// Parses the `generation-index` form used as the live-update event id.
    fn from_str(s: &str) -> crate::Result<Self> {
        let (generation, index) = s
            .split_once('-')
            .ok_or_else(|| crate::Error::bad_request(format!("malformed audit id '{s}'")))?;
        let generation = generation
            .parse()
            .map_err(|_| crate::Error::bad_request(format!("malformed audit id '{s}'")))?;
        let index = index
            .parse()
            .map_err(|_| crate::Error::bad_request(format!("malformed audit id '{s}'")))?;
        Ok(Self { generation, index })
    }
}

#[derive(Debug, Clone)]
struct Layer<T> {
    generation: u64,
    items: Vec<T>,
}

/// Layered append-only stack with pruning of the oldest layers.
#[derive(Debug, Clone)]
pub struct AppendStack<T> {
    max_layers: usize,
    layer_size: usize,
    // Newest layer first.
    layers: VecDeque<Layer<T>>,
}

impl<T> AppendStack<T> {
    /// Creates a stack; zero limits are raised to 1.
    pub fn new(max_layers: usize, layer_size: usize) -> Self {
        let mut layers = VecDeque::new();
        layers.push_front(Layer {
            generation: 0,
            items: Vec::new(),
        });
        Self {
            max_layers: max_layers.max(1),
            layer_size: layer_size.max(1),
            layers,
        }
    }

    /// Appends `item` and returns its id plus any pruned layers as
    /// `(generation, items)`.
    pub fn push(&mut self, item: T) -> (AuditId, Vec<(u64, Vec<T>)>) {
        let newest_full = self
            .layers
            .front()
            .map(|layer| layer.items.len() >= self.layer_size)
            .unwrap_or(true);
        if newest_full {
            let generation = self.layers.front().map(|l| l.generation + 1).unwrap_or(0);
            self.layers.push_front(Layer {
                generation,
                items: Vec::new(),
            });
        }

        let mut id = AuditId::new(0, 0);
        if let Some(newest) = self.layers.front_mut() {
            id = AuditId::new(newest.generation, newest.items.len());
            newest.items.push(item);
        }

        let mut pruned = Vec::new();
        while self.layers.len() > self.max_layers {
            if let Some(old) = self.layers.pop_back() {
                pruned.push((old.generation, old.items));
            }
        }
        (id, pruned)
    }

    /// Items newest first, with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (AuditId, &T)> {
        self.layers.iter().flat_map(|layer| {
            layer
                .items
                .iter()
                .enumerate()
                .rev()
                .map(move |(index, item)| (AuditId::new(layer.generation, index), item))
        })
    }

    /// Items strictly after `cursor`, newest first.
    pub fn newer(&self, cursor: AuditId) -> impl Iterator<Item = (AuditId, &T)> {
        self.iter().take_while(move |(id, _)| *id > cursor)
    }

    /// Id of the most recent item, if any.
    pub fn latest_id(&self) -> Option<AuditId> {
        self.iter().next().map(|(id, _)| id)
    }

    /// Oldest generation still retained.
    pub fn oldest_generation(&self) -> u64 {
        self.layers.back().map(|l| l.generation).unwrap_or(0)
    }

    /// Total retained items.
    pub fn len(&self) -> usize {
        self.layers.iter().map(|l| l.items.len()).sum()
    }

    /// Returns `true` if no items are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One recorded change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Event name, e.g. `ACLModified`.
    pub name: String,
    /// Resource the change applied to.
    pub oid: ResourceId,
    /// Operation details.
    pub payload: serde_json::Value,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
}

/// Callback receiving `(generation, entries)` of each pruned layer.
pub type Pruner = Box<dyn Fn(u64, Vec<AuditEntry>) + Send + Sync>;

/// Thread-safe audit log of ACL changes.
pub struct AuditLog {
    entries: Mutex<AppendStack<AuditEntry>>,
    pruner: Option<Pruner>,
}

impl AuditLog {
    /// Creates a log retaining `max_layers` layers of `layer_size` entries.
    pub fn new(max_layers: usize, layer_size: usize) -> Self {
        Self {
            entries: Mutex::new(AppendStack::new(max_layers, layer_size)),
            pruner: None,
        }
    }

    /// Installs a callback invoked with every pruned layer.
    pub fn with_pruner(mut self, pruner: Pruner) -> Self {
        self.pruner = Some(pruner);
        self
    }

    /// Records an entry stamped with the current time.
    pub fn add(
        &self,
        name: impl Into<String>,
        oid: ResourceId,
        payload: serde_json::Value,
    ) -> AuditId {
        let entry = AuditEntry {
            name: name.into(),
            oid,
            payload,
            timestamp: Utc::now(),
        };
        let (id, pruned) = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        if let Some(pruner) = &self.pruner {
            for (generation, items) in pruned {
                log::debug!("Pruning audit generation {generation} ({} entries)", items.len());
                pruner(generation, items);
            }
        }
        id
    }

    /// Entries after `cursor` (all retained entries when `None`), newest
    /// first, optionally restricted to `oids`.
    pub fn newer(&self, cursor: Option<AuditId>, oids: &[ResourceId]) -> Vec<(AuditId, AuditEntry)> {
        let stack = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let wanted = |entry: &AuditEntry| oids.is_empty() || oids.contains(&entry.oid);
        match cursor {
            Some(cursor) => stack
                .newer(cursor)
                .filter(|(_, e)| wanted(e))
                .map(|(id, e)| (id, e.clone()))
                .collect(),
            None => stack
                .iter()
                .filter(|(_, e)| wanted(e))
                .map(|(id, e)| (id, e.clone()))
                .collect(),
        }
    }

    /// Id of the most recent entry.
    pub fn latest_id(&self) -> Option<AuditId> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest_id()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LAYERS, DEFAULT_LAYER_SIZE)
    }
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog")
            .field("latest_id", &self.latest_id())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
