//! Startup reconstruction of the in-memory graph from the backend
//!
//! Reads everything first, then builds: all nodes, then all routes, so a
//! route never refers to a location that hasn't been created yet. Any read
//! error or bad weight aborts the whole restore.

use super::Inner;
use crate::backend::PersistenceError;
use crate::graph::store_models::{decode_weight, is_valid_weight, RouteMap, LOCATIONS_KEY};
use crate::graph::StoreResult;
use std::collections::BTreeMap;
use tracing::info;

/// Rebuild `inner` (which must be empty) from its backend
pub(super) fn restore(inner: &mut Inner) -> StoreResult<()> {
    let locations = inner.backend.set_members(LOCATIONS_KEY)?;
    if locations.is_empty() {
        info!("No persisted locations in {} backend, starting fresh", inner.backend.name());
        return Ok(());
    }

    let mut routes: BTreeMap<String, RouteMap> = BTreeMap::new();
    for name in &locations {
        let raw = inner.backend.hash_get_all(name)?;
        routes.insert(name.clone(), parse_routes(name, raw)?);
    }

    for name in &locations {
        inner.add_node(name);
    }
    for (from, routes_to) in &routes {
        let from_idx = inner.node(from)?;
        for (to, &weight) in routes_to {
            if to != from {
                inner.insert_route(from_idx, from, to, weight);
            }
        }
    }

    info!(
        "Restored {} location(s) and {} route(s) from {} backend",
        inner.graph.node_count(),
        inner.graph.edge_count(),
        inner.backend.name()
    );
    Ok(())
}

/// Parse one location's edge hash (destination -> decimal weight)
fn parse_routes(name: &str, raw: BTreeMap<String, String>) -> Result<RouteMap, PersistenceError> {
    raw.into_iter()
        .map(|(to, value)| match decode_weight(&value) {
            Some(weight) if is_valid_weight(weight) => Ok((to, weight)),
            Some(_) => Err(PersistenceError::Corrupt {
                key: name.to_string(),
                field: to,
                reason: format!("weight {} is negative or not finite", value),
            }),
            None => Err(PersistenceError::Corrupt {
                key: name.to_string(),
                field: to,
                reason: format!("'{}' is not a number", value),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_routes_accepts_decimal_strings() {
        let routes = parse_routes("A", raw(&[("B", "1"), ("C", "4.25")])).unwrap();
        assert_eq!(routes["B"], 1.0);
        assert_eq!(routes["C"], 4.25);
    }

    #[test]
    fn test_parse_routes_rejects_garbage() {
        let err = parse_routes("A", raw(&[("B", "far")])).unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { ref field, .. } if field == "B"));
    }

    #[test]
    fn test_parse_routes_rejects_negative() {
        assert!(parse_routes("A", raw(&[("B", "-3")])).is_err());
        assert!(parse_routes("A", raw(&[("B", "NaN")])).is_err());
    }
}
