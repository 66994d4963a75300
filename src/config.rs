// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Catalog snapshot (cards, items, archetypes) in JSON.
    pub catalog_path: PathBuf,
    /// Optional JSON file of user-defined card packs.
    pub packs_path: Option<PathBuf>,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Wall-clock limit for one optimize request.
    pub optimize_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `CATALOG_PATH` - Catalog snapshot (default: `data/catalog.json`)
    /// - `PACKS_PATH` - User card packs JSON (optional)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `OPTIMIZE_TIMEOUT_SECS` - Per-request optimizer limit (default: 30)
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--timeout <SECS>` - Override the optimizer limit
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from CLI args and an environment lookup.
    /// CLI flags take precedence, then the environment, then defaults.
    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let catalog_path = env("CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/catalog.json"));

        let packs_path = env("PACKS_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(3000);

        let timeout_secs: u64 = Self::parse_cli_value(args, "--timeout")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("OPTIMIZE_TIMEOUT_SECS").and_then(|v| v.parse().ok()))
            .unwrap_or(30);

        Config {
            catalog_path,
            packs_path,
            port,
            optimize_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}
