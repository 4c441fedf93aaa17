//! Command-line and file configuration.
//!
//! A ring is described by a hash function, a default replica count and a
//! member list. Each may come from a JSON file (`--config`) and be
//! overridden on the command line.
//!
//! ```json
//! {
//!   "hash": "xxh3",
//!   "vnodes": 160,
//!   "nodes": ["10.0.0.1:11211", {"id": "10.0.0.2:11211", "vnodes": 320}]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use corelib::partitioner::Partitioner;
use corelib::ring::{HashRing, RingBuilder, DEFAULT_VNODES};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::Command;

#[derive(Parser, Debug)]
#[command(
    name = "ringctl",
    version,
    about = "Inspect consistent hash rings and simulate membership changes"
)]
pub struct CliConfig {
    /// Path to a JSON ring description.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Hash function placing nodes and keys on the ring.
    #[arg(long, value_enum, global = true)]
    pub hash: Option<HashKind>,

    /// Replica count for nodes without an explicit one.
    #[arg(long, global = true)]
    pub vnodes: Option<usize>,

    /// Ring member. Can be specified multiple times; replaces the file's list.
    #[arg(short = 'n', long = "node", global = true)]
    pub nodes: Vec<String>,

    /// Print reports as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Hash function selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    /// 32-bit IEEE CRC.
    #[default]
    Crc32,
    /// 64-bit XXH3.
    Xxh3,
    /// 64-bit SipHash-1-3.
    Sip,
    /// 64-bit truncated BLAKE3.
    Blake3,
}

/// JSON ring description.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RingFile {
    #[serde(default)]
    pub hash: Option<HashKind>,
    #[serde(default)]
    pub vnodes: Option<usize>,
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
}

/// A member in the ring file: a bare id or an id with its own replica count.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NodeEntry {
    Id(String),
    Weighted { id: String, vnodes: usize },
}

impl RingFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading ring file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing ring file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Fully resolved ring configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingSettings {
    pub hash: HashKind,
    pub vnodes: usize,
    /// Members with their replica count override, if any.
    pub nodes: Vec<(String, Option<usize>)>,
}

impl RingSettings {
    /// Merges the optional file with command-line overrides.
    pub fn resolve(file: RingFile, cli: &CliConfig) -> Self {
        let nodes = if cli.nodes.is_empty() {
            file.nodes
                .into_iter()
                .map(|entry| match entry {
                    NodeEntry::Id(id) => (id, None),
                    NodeEntry::Weighted { id, vnodes } => (id, Some(vnodes)),
                })
                .collect()
        } else {
            cli.nodes.iter().map(|id| (id.clone(), None)).collect()
        };

        Self {
            hash: cli.hash.or(file.hash).unwrap_or_default(),
            vnodes: cli.vnodes.or(file.vnodes).unwrap_or(DEFAULT_VNODES),
            nodes,
        }
    }

    /// Builds the ring described by these settings.
    pub fn build<P: Partitioner>(&self, partitioner: P) -> Result<HashRing<P>> {
        let builder = self.nodes.iter().fold(
            RingBuilder::new()
                .with_partitioner(partitioner)
                .with_vnodes(self.vnodes),
            |builder, (id, vnodes)| match vnodes {
                Some(vnodes) => builder.add_node_with_vnodes(id.as_str(), *vnodes),
                None => builder.add_node(id.as_str()),
            },
        );
        let ring = builder.build().context("building ring")?;
        debug!(
            hash = ?self.hash,
            nodes = ring.node_count(),
            tokens = ring.token_count(),
            "ring ready"
        );
        Ok(ring)
    }
}

impl CliConfig {
    /// Resolves the ring settings from `--config` and the override flags.
    pub fn settings(&self) -> Result<RingSettings> {
        let file = match &self.config {
            Some(path) => RingFile::load(path)?,
            None => RingFile::default(),
        };
        Ok(RingSettings::resolve(file, self))
    }

    pub fn run(self) -> Result<()> {
        setup_tracing(&self.log_level);

        let settings = self.settings()?;
        let report = self.command.execute(&settings)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{report}");
        }
        Ok(())
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses `level`. Logs go to
/// stderr so reports on stdout stay machine-readable.
pub fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed (tests, embedding).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        CliConfig::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn ring_file_forms() {
        let file = RingFile::parse(
            r#"{"hash": "xxh3", "vnodes": 50, "nodes": ["a", {"id": "b", "vnodes": 7}]}"#,
        )
        .unwrap();
        assert_eq!(file.hash, Some(HashKind::Xxh3));
        assert_eq!(file.vnodes, Some(50));
        assert_eq!(
            file.nodes,
            vec![
                NodeEntry::Id("a".into()),
                NodeEntry::Weighted { id: "b".into(), vnodes: 7 }
            ]
        );

        assert!(RingFile::parse(r#"{"hash": "md5"}"#).is_err());
        assert!(RingFile::parse(r#"{"replicas": 3}"#).is_err());
    }

    #[test]
    fn defaults_without_file() {
        let cli = parse(&["ringctl", "members"]);
        let settings = RingSettings::resolve(RingFile::default(), &cli);
        assert_eq!(settings.hash, HashKind::Crc32);
        assert_eq!(settings.vnodes, DEFAULT_VNODES);
        assert!(settings.nodes.is_empty());
    }

    #[test]
    fn flags_override_file() {
        let file = RingFile::parse(
            r#"{"hash": "sip", "vnodes": 10, "nodes": ["a", {"id": "b", "vnodes": 3}]}"#,
        )
        .unwrap();
        let cli = parse(&["ringctl", "--vnodes", "20", "members"]);
        let settings = RingSettings::resolve(file, &cli);
        assert_eq!(settings.hash, HashKind::Sip);
        assert_eq!(settings.vnodes, 20);
        assert_eq!(
            settings.nodes,
            vec![("a".to_string(), None), ("b".to_string(), Some(3))]
        );

        let file = RingFile::parse(r#"{"nodes": ["a", "b"]}"#).unwrap();
        let cli = parse(&["ringctl", "members", "--hash", "blake3", "-n", "x", "-n", "y"]);
        let settings = RingSettings::resolve(file, &cli);
        assert_eq!(settings.hash, HashKind::Blake3);
        assert_eq!(
            settings.nodes,
            vec![("x".to_string(), None), ("y".to_string(), None)]
        );
    }

    #[test]
    fn load_reports_path() {
        let path = std::env::temp_dir().join("ringctl-missing-ring-file.json");
        let err = RingFile::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("ringctl-missing-ring-file.json"));
    }

    #[test]
    fn build_applies_overrides() {
        let settings = RingSettings {
            hash: HashKind::Crc32,
            vnodes: 5,
            nodes: vec![("a".into(), None), ("b".into(), Some(2))],
        };
        let ring = settings.build(corelib::partitioner::Crc32Partitioner).unwrap();
        assert_eq!(ring.vnodes_of("a"), Some(5));
        assert_eq!(ring.vnodes_of("b"), Some(2));

        let bad = RingSettings {
            nodes: vec![(String::new(), None)],
            ..settings
        };
        assert!(bad.build(corelib::partitioner::Crc32Partitioner).is_err());
    }
}
