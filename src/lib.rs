//! waymap - persistent route graph
//!
//! A directed, weighted graph of named locations kept in memory and mirrored
//! write-through to a key-value backend, with all-shortest-route queries.
//!
//! ```no_run
//! use waymap::graph::{GraphStore, RouteMap};
//!
//! let store = GraphStore::open_path("routes.redb".as_ref())?;
//! store.add_location("A", &RouteMap::from([("B".to_string(), 1.0)]))?;
//! store.add_location("B", &RouteMap::new())?;
//! let routes = store.routes_between("A", "B")?;
//! assert_eq!(routes[0].weight, 1.0);
//! # Ok::<(), waymap::graph::StoreError>(())
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod graph;
