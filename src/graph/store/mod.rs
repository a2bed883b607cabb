//! Route graph store: petgraph in memory, write-through to a key-value backend
//!
//! Every public operation holds the store's single mutex for its whole
//! duration, backend calls included, so operations are fully serialized.
//!
//! Mutations validate first, commit their writes to the backend as one
//! atomic batch, and only then touch memory. A backend failure leaves both
//! sides exactly as they were.
//!
//! Routes may name destinations that do not exist yet. Those edges are
//! persisted like any other but stay out of the graph ("pending") until the
//! destination location is created.

mod restore;

use super::paths::{all_shortest_routes, RouteGraph};
use super::store_models::{encode_weight, is_valid_weight, Route, RouteMap, LOCATIONS_KEY};
use super::{StoreError, StoreResult};
use crate::backend::{KvBackend, MemoryBackend, RedbBackend, WriteBatch};
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Persistent route graph
pub struct GraphStore {
    inner: Mutex<Inner>,
}

/// Everything the lock protects
struct Inner {
    graph: RouteGraph,
    /// Node lookup by location name
    index: HashMap<String, NodeIndex>,
    /// Edges to locations that don't exist yet: destination -> (source -> weight)
    pending: HashMap<String, BTreeMap<String, f64>>,
    backend: Box<dyn KvBackend>,
}

impl GraphStore {
    /// Open a store over `backend`, rebuilding the graph from its contents
    ///
    /// Fails if the persisted data can't be read or is corrupt; no partially
    /// restored store is ever returned.
    pub fn open(backend: Box<dyn KvBackend>) -> StoreResult<Self> {
        let mut inner = Inner::new(backend);
        restore::restore(&mut inner)?;

        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Open (or create) a redb-backed store at `db_file`
    pub fn open_path(db_file: &Path) -> StoreResult<Self> {
        let backend = RedbBackend::open(db_file)?;
        info!("Opening route store at {}", db_file.display());
        Self::open(Box::new(backend))
    }

    /// Create an empty store persisting to process memory only
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner::new(Box::new(MemoryBackend::new()))),
        }
    }

    // ==================== Lock Helper ====================
    //
    // Poisoning means a thread panicked mid-operation; graph and backend may
    // disagree at that point, so there is nothing sensible to recover.

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .expect("store lock poisoned: a thread panicked while holding it")
    }

    // ==================== Locations ====================

    /// Create a location, optionally with outbound routes
    pub fn add_location(&self, name: &str, routes_to: &RouteMap) -> StoreResult<()> {
        let mut inner = self.lock();

        if name.is_empty() {
            return Err(StoreError::InvalidInput(
                "location name must not be empty".to_string(),
            ));
        }
        if inner.index.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        let routes = checked_routes(name, routes_to)?;

        let mut batch = WriteBatch::new();
        batch.set_add(LOCATIONS_KEY, name);
        for (to, weight) in &routes {
            batch.hash_set(name, to, &encode_weight(*weight));
        }
        inner.commit(batch)?;

        let route_count = routes.len();
        let idx = inner.add_node(name);
        for (to, weight) in routes {
            inner.insert_route(idx, name, &to, weight);
        }

        debug!("Added location {} with {} route(s)", name, route_count);
        Ok(())
    }

    /// All location names, sorted
    pub fn locations(&self) -> Vec<String> {
        let inner = self.lock();
        let mut names: Vec<String> = inner.index.keys().cloned().collect();
        names.sort();
        names
    }

    /// Delete a location and every edge into or out of it
    pub fn delete_location(&self, name: &str) -> StoreResult<()> {
        let mut inner = self.lock();
        let idx = inner.node(name)?;

        let mut batch = WriteBatch::new();
        batch.set_remove(LOCATIONS_KEY, name);
        for source in inner.neighbor_names(idx, Direction::Incoming) {
            batch.hash_delete(&source, name);
        }
        batch.hash_clear(name);
        inner.commit(batch)?;

        inner.graph.remove_node(idx);
        inner.index.remove(name);
        inner.pending.retain(|_, sources| {
            sources.remove(name);
            !sources.is_empty()
        });

        debug!("Deleted location {}", name);
        Ok(())
    }

    // ==================== Routes ====================

    /// Names directly reachable from `name`, sorted
    pub fn routes_from(&self, name: &str) -> StoreResult<Vec<String>> {
        let inner = self.lock();
        let idx = inner.node(name)?;

        let mut names = inner.neighbor_names(idx, Direction::Outgoing);
        names.sort();
        Ok(names)
    }

    /// Add or overwrite outbound routes; unmentioned routes are kept
    pub fn add_routes(&self, name: &str, routes_to: &RouteMap) -> StoreResult<()> {
        let mut inner = self.lock();
        let idx = inner.node(name)?;
        let routes = checked_routes(name, routes_to)?;

        let mut batch = WriteBatch::new();
        for (to, weight) in &routes {
            batch.hash_set(name, to, &encode_weight(*weight));
        }
        inner.commit(batch)?;

        let route_count = routes.len();
        for (to, weight) in routes {
            inner.insert_route(idx, name, &to, weight);
        }

        debug!("Added {} route(s) from {}", route_count, name);
        Ok(())
    }

    /// Remove outbound routes; routes that don't exist are ignored
    pub fn remove_routes<S: AsRef<str>>(&self, name: &str, to_list: &[S]) -> StoreResult<()> {
        let mut inner = self.lock();
        let idx = inner.node(name)?;

        let mut targets: Vec<&str> = to_list
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|to| *to != name && inner.has_route(idx, name, to))
            .collect();
        targets.sort_unstable();
        targets.dedup();

        let mut batch = WriteBatch::new();
        for to in &targets {
            batch.hash_delete(name, to);
        }
        inner.commit(batch)?;

        for to in &targets {
            inner.remove_route(idx, name, to);
        }

        debug!("Removed {} route(s) from {}", targets.len(), name);
        Ok(())
    }

    /// Every minimal-weight route between two locations
    pub fn routes_between(&self, from: &str, to: &str) -> StoreResult<Vec<Route>> {
        let inner = self.lock();
        let from_idx = inner.node(from)?;
        let to_idx = inner.node(to)?;

        Ok(all_shortest_routes(&inner.graph, from_idx, to_idx))
    }

    // ==================== Inspection ====================

    /// Weight of the live edge `from -> to`, if any
    pub fn weight(&self, from: &str, to: &str) -> Option<f64> {
        let inner = self.lock();
        let (&a, &b) = (inner.index.get(from)?, inner.index.get(to)?);
        inner.graph.find_edge(a, b).map(|e| inner.graph[e])
    }

    pub fn node_count(&self) -> usize {
        self.lock().graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.lock().graph.edge_count()
    }

    /// Routes waiting for their destination to be created
    pub fn pending_count(&self) -> usize {
        self.lock().pending.values().map(BTreeMap::len).sum()
    }

    /// Run `f` against the backend while holding the store lock
    pub fn with_backend<R>(&self, f: impl FnOnce(&dyn KvBackend) -> R) -> R {
        let inner = self.lock();
        f(inner.backend.as_ref())
    }
}

/// Drop self-routes and reject weights the path search can't handle
fn checked_routes(name: &str, routes_to: &RouteMap) -> StoreResult<Vec<(String, f64)>> {
    let mut routes = Vec::with_capacity(routes_to.len());
    for (to, &weight) in routes_to {
        if to == name {
            continue;
        }
        if to.is_empty() {
            return Err(StoreError::InvalidInput(format!(
                "route from {} has an empty destination",
                name
            )));
        }
        if !is_valid_weight(weight) {
            return Err(StoreError::InvalidInput(format!(
                "weight {} for route {} -> {} must be finite and non-negative",
                weight, name, to
            )));
        }
        routes.push((to.clone(), weight));
    }
    Ok(routes)
}

impl Inner {
    fn new(backend: Box<dyn KvBackend>) -> Self {
        Self {
            graph: RouteGraph::default(),
            index: HashMap::new(),
            pending: HashMap::new(),
            backend,
        }
    }

    fn node(&self, name: &str) -> StoreResult<NodeIndex> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Write a batch through to the backend; empty batches skip the backend
    fn commit(&mut self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.backend.apply(batch)?;
        Ok(())
    }

    /// Add a node and activate any routes that were waiting for it
    fn add_node(&mut self, name: &str) -> NodeIndex {
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);

        if let Some(sources) = self.pending.remove(name) {
            for (source, weight) in sources {
                if let Some(&src) = self.index.get(&source) {
                    self.graph.update_edge(src, idx, weight);
                }
            }
        }
        idx
    }

    /// Create or overwrite `from -> to` in memory
    fn insert_route(&mut self, from_idx: NodeIndex, from: &str, to: &str, weight: f64) {
        match self.index.get(to) {
            Some(&to_idx) => {
                self.graph.update_edge(from_idx, to_idx, weight);
            }
            None => {
                self.pending
                    .entry(to.to_string())
                    .or_default()
                    .insert(from.to_string(), weight);
            }
        }
    }

    fn has_route(&self, from_idx: NodeIndex, from: &str, to: &str) -> bool {
        match self.index.get(to) {
            Some(&to_idx) => self.graph.find_edge(from_idx, to_idx).is_some(),
            None => self
                .pending
                .get(to)
                .is_some_and(|sources| sources.contains_key(from)),
        }
    }

    fn remove_route(&mut self, from_idx: NodeIndex, from: &str, to: &str) {
        match self.index.get(to) {
            Some(&to_idx) => {
                if let Some(edge) = self.graph.find_edge(from_idx, to_idx) {
                    self.graph.remove_edge(edge);
                }
            }
            None => {
                if let Some(sources) = self.pending.get_mut(to) {
                    sources.remove(from);
                    if sources.is_empty() {
                        self.pending.remove(to);
                    }
                }
            }
        }
    }

    /// Names on the other end of `idx`'s edges in `dir`
    fn neighbor_names(&self, idx: NodeIndex, dir: Direction) -> Vec<String> {
        self.graph
            .edges_directed(idx, dir)
            .filter_map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.graph.node_weight(other).cloned()
            })
            .collect()
    }
}
