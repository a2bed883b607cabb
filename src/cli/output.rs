//! Rendering of command results as styled text or JSON

use crate::graph::Route;
use anyhow::{bail, Result};
use console::style;
use serde_json::json;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

impl Output {
    pub fn from_format(format: &str) -> Result<Self> {
        match format {
            "text" => Ok(Output::Text),
            "json" => Ok(Output::Json),
            other => bail!("Unknown output format '{}' (expected text or json)", other),
        }
    }

    /// Confirmation for a successful mutation. JSON mode stays silent, so
    /// scripts only ever parse query results.
    pub fn done(&self, message: &str) {
        if *self == Output::Text {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    pub fn names(&self, title: &str, names: &[String]) -> Result<()> {
        match self {
            Output::Json => println!("{}", serde_json::to_string(names)?),
            Output::Text => {
                println!("{} ({})", style(title).bold(), names.len());
                for name in names {
                    println!("  {}", style(name).cyan());
                }
            }
        }
        Ok(())
    }

    pub fn routes(&self, from: &str, to: &str, routes: &[Route]) -> Result<()> {
        match self {
            Output::Json => println!("{}", serde_json::to_string(routes)?),
            Output::Text => {
                if routes.is_empty() {
                    println!(
                        "No route from {} to {}",
                        style(from).cyan(),
                        style(to).cyan()
                    );
                    return Ok(());
                }
                println!(
                    "{} shortest route(s) from {} to {}, weight {}",
                    style(routes.len()).bold(),
                    style(from).cyan(),
                    style(to).cyan(),
                    style(routes[0].weight).yellow()
                );
                for route in routes {
                    let hops: Vec<String> = route
                        .route
                        .iter()
                        .map(|n| style(n).cyan().to_string())
                        .collect();
                    println!("  {}  ({} hop(s))", hops.join(" -> "), route.hops());
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self, locations: usize, routes: usize, pending: usize, db: &Path) -> Result<()> {
        match self {
            Output::Json => println!(
                "{}",
                json!({
                    "locations": locations,
                    "routes": routes,
                    "pending_routes": pending,
                    "database": db.display().to_string(),
                })
            ),
            Output::Text => {
                println!("  Database: {}", style(db.display()).dim());
                println!("  Locations: {}", style(locations).cyan());
                println!("  Routes: {}", style(routes).cyan());
                if pending > 0 {
                    println!(
                        "  Pending routes: {} (destination not created yet)",
                        style(pending).yellow()
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_format() {
        assert_eq!(Output::from_format("text").unwrap(), Output::Text);
        assert_eq!(Output::from_format("json").unwrap(), Output::Json);
        assert!(Output::from_format("yaml").is_err());
    }
}
