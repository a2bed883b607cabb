use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Destination name -> edge weight, as supplied by callers
pub type RouteMap = BTreeMap<String, f64>;

/// Set key holding every known location name
pub const LOCATIONS_KEY: &str = "waymap:locations";

/// A path through the graph, as returned by shortest-route queries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub route: Vec<String>,
    pub weight: f64,
}

impl Route {
    pub fn new(route: Vec<String>, weight: f64) -> Self {
        Self { route, weight }
    }

    /// Number of edges traversed
    pub fn hops(&self) -> usize {
        self.route.len().saturating_sub(1)
    }
}

/// Encode a weight for the backend. `f64`'s `Display` output parses back to
/// the identical value.
pub fn encode_weight(weight: f64) -> String {
    weight.to_string()
}

pub fn decode_weight(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Weights must be finite and non-negative for shortest paths to be sound
pub fn is_valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight >= 0.0
}
