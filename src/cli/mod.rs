//! CLI command definitions and handlers

mod output;

use crate::config::UserConfig;
use crate::graph::{GraphStore, RouteMap};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::Output;
use std::path::{Path, PathBuf};

/// Parse a `DEST=WEIGHT` route argument
fn parse_route(s: &str) -> Result<(String, f64), String> {
    let (dest, weight) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("'{}' is not DEST=WEIGHT", s))?;
    if dest.is_empty() {
        return Err(format!("'{}' has an empty destination", s));
    }
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a valid weight", weight))?;
    if !weight.is_finite() || weight < 0.0 {
        return Err(format!("weight {} must be finite and non-negative", weight));
    }
    Ok((dest.to_string(), weight))
}

/// waymap - persistent route graph
#[derive(Parser, Debug)]
#[command(name = "waymap")]
#[command(
    version,
    about = "Persistent directed route graph with all-shortest-route queries",
    after_help = "\
Examples:
  waymap add A --route B=1 --route C=4   Create A with routes to B and C
  waymap add B --route C=1               Create B
  waymap add C                           Create C
  waymap between A C                     Shortest routes A -> C
  waymap from A                          Direct successors of A
  waymap disconnect A C                  Remove route A -> C
  waymap delete B                        Delete B and every route touching it"
)]
pub struct Cli {
    /// Database file (default: config file, $WAYMAP_DB, or the user data dir)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_parser = ["text", "json"])]
    pub format: Option<String>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example config file to the user config directory
    Init,

    /// Create a location, optionally with outbound routes
    Add {
        name: String,

        /// Outbound route as DEST=WEIGHT (repeatable)
        #[arg(long = "route", short = 'r', value_parser = parse_route)]
        routes: Vec<(String, f64)>,
    },

    /// List every location
    List,

    /// List the locations directly reachable from a location
    From { name: String },

    /// Find every shortest route between two locations
    Between { from: String, to: String },

    /// Add or overwrite outbound routes of a location
    Connect {
        name: String,

        /// Outbound route as DEST=WEIGHT (repeatable)
        #[arg(long = "route", short = 'r', value_parser = parse_route, required = true)]
        routes: Vec<(String, f64)>,
    },

    /// Remove outbound routes of a location
    Disconnect {
        name: String,

        /// Destinations whose routes should be removed
        #[arg(required = true)]
        to: Vec<String>,
    },

    /// Delete a location and every route into or out of it
    Delete { name: String },

    /// Show location and route counts
    Stats,
}

/// Resolve settings: CLI flag > environment > config file > default
pub fn effective_log_level(cli: &Cli, config: &UserConfig) -> String {
    cli.log_level
        .clone()
        .unwrap_or_else(|| config.log_level().to_string())
}

pub fn run(cli: Cli, config: UserConfig) -> Result<()> {
    let format = cli.format.as_deref().unwrap_or_else(|| config.format());
    let out = Output::from_format(format)?;
    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path());

    match cli.command {
        Commands::Init => {
            let path = UserConfig::init_user_config()?;
            out.done(&format!("Config file: {}", path.display()));
            Ok(())
        }
        command => {
            let store = GraphStore::open_path(&db_path).with_context(|| {
                format!("Failed to restore route store from {}", db_path.display())
            })?;
            run_store_command(command, &store, &out, &db_path)
        }
    }
}

fn run_store_command(
    command: Commands,
    store: &GraphStore,
    out: &Output,
    db_path: &Path,
) -> Result<()> {
    match command {
        Commands::Add { name, routes } => {
            store.add_location(&name, &to_route_map(routes))?;
            out.done(&format!("Added location {}", name));
        }

        Commands::List => out.names("Locations", &store.locations())?,

        Commands::From { name } => {
            let names = store.routes_from(&name)?;
            out.names(&format!("Routes from {}", name), &names)?;
        }

        Commands::Between { from, to } => {
            let routes = store.routes_between(&from, &to)?;
            out.routes(&from, &to, &routes)?;
        }

        Commands::Connect { name, routes } => {
            let count = routes.len();
            store.add_routes(&name, &to_route_map(routes))?;
            out.done(&format!("Set {} route(s) from {}", count, name));
        }

        Commands::Disconnect { name, to } => {
            store.remove_routes(&name, &to)?;
            out.done(&format!("Removed route(s) from {}", name));
        }

        Commands::Delete { name } => {
            store.delete_location(&name)?;
            out.done(&format!("Deleted location {}", name));
        }

        Commands::Stats => out.stats(
            store.node_count(),
            store.edge_count(),
            store.pending_count(),
            db_path,
        )?,

        // Handled by `run` without opening the store
        Commands::Init => {}
    }

    Ok(())
}

/// Later duplicates of a destination win, as with repeated JSON keys
fn to_route_map(routes: Vec<(String, f64)>) -> RouteMap {
    routes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        assert_eq!(parse_route("B=1"), Ok(("B".to_string(), 1.0)));
        assert_eq!(parse_route("B=2.5"), Ok(("B".to_string(), 2.5)));
        // Only the last '=' separates the weight
        assert_eq!(parse_route("a=b=3"), Ok(("a=b".to_string(), 3.0)));

        assert!(parse_route("B").is_err());
        assert!(parse_route("=1").is_err());
        assert!(parse_route("B=x").is_err());
        assert!(parse_route("B=-1").is_err());
        assert!(parse_route("B=inf").is_err());
    }

    #[test]
    fn test_cli_parses_add_with_routes() {
        let cli = Cli::try_parse_from(["waymap", "add", "A", "-r", "B=1", "--route", "C=4"])
            .expect("parse add");
        match cli.command {
            Commands::Add { name, routes } => {
                assert_eq!(name, "A");
                assert_eq!(routes.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_targets() {
        assert!(Cli::try_parse_from(["waymap", "disconnect", "A"]).is_err());
        assert!(Cli::try_parse_from(["waymap", "connect", "A"]).is_err());
        assert!(Cli::try_parse_from(["waymap", "list", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_flag_beats_config_log_level() {
        let cli = Cli::try_parse_from(["waymap", "--log-level", "debug", "list"]).unwrap();
        let mut config = UserConfig::default();
        config.log.level = Some("error".into());
        assert_eq!(effective_log_level(&cli, &config), "debug");

        let cli = Cli::try_parse_from(["waymap", "list"]).unwrap();
        assert_eq!(effective_log_level(&cli, &config), "error");
    }

    #[test]
    fn test_route_map_last_duplicate_wins() {
        let map = to_route_map(vec![("B".into(), 1.0), ("B".into(), 3.0)]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["B"], 3.0);
    }
}
