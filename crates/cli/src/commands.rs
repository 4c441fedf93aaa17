//! Subcommands and their reports.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{bail, Context};
use clap::Subcommand;
use corelib::partitioner::{
    Blake3Partitioner, Crc32Partitioner, Partitioner, SipPartitioner, Xxh3Partitioner,
};
use corelib::topology::{Ownership, Topology};
use corelib::{HashRing, NodeId, Token};
use serde::Serialize;
use tracing::info;

use crate::config::{HashKind, RingSettings};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve keys to the node owning them.
    Lookup {
        /// Keys to resolve.
        #[arg(required = true)]
        keys: Vec<String>,

        /// Number of distinct nodes to list per key, walking clockwise.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// List ring members and their replica counts.
    Members,

    /// Show the share of the hash space each node owns.
    Ownership,

    /// Resolve synthetic keys before and after one membership change.
    Simulate {
        /// Number of synthetic keys.
        #[arg(short, long, default_value_t = 100_000)]
        keys: usize,

        /// Node to remove (e.g. a failed server).
        #[arg(long, conflicts_with = "add", required_unless_present = "add")]
        remove: Option<String>,

        /// Node to add with the default replica count.
        #[arg(long)]
        add: Option<String>,
    },
}

pub type CommandResult = anyhow::Result<Report>;

impl Command {
    /// Builds the configured ring and runs the command against it.
    pub fn execute(&self, settings: &RingSettings) -> CommandResult {
        match settings.hash {
            HashKind::Crc32 => self.execute_with(Crc32Partitioner, settings),
            HashKind::Xxh3 => self.execute_with(Xxh3Partitioner::new(), settings),
            HashKind::Sip => self.execute_with(SipPartitioner::new(), settings),
            HashKind::Blake3 => self.execute_with(Blake3Partitioner, settings),
        }
    }

    fn execute_with<P: Partitioner>(&self, partitioner: P, settings: &RingSettings) -> CommandResult {
        let ring = settings.build(partitioner)?;
        match self {
            Command::Lookup { keys, count } => lookup(&ring, keys, *count),
            Command::Members => Ok(members(&ring)),
            Command::Ownership => Ok(Report::Ownership(
                Topology::of(&ring.snapshot()).ownership(),
            )),
            Command::Simulate { keys, remove, add } => {
                let change = match (remove, add) {
                    (Some(node), None) => Change::Remove(node.clone()),
                    (None, Some(node)) => Change::Add(node.clone()),
                    _ => bail!("simulate needs exactly one of --remove or --add"),
                };
                simulate(&ring, *keys, change).map(Report::Simulation)
            }
        }
    }
}

/// Output of a command, printable as text or JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "report", content = "data", rename_all = "snake_case")]
pub enum Report {
    Lookup(Vec<Resolution>),
    Members(Vec<Member>),
    Ownership(Vec<Ownership>),
    Simulation(Simulation),
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub key: String,
    pub token: String,
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub node: NodeId,
    pub vnodes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum Change {
    Remove(String),
    Add(String),
}

impl Change {
    fn node(&self) -> &str {
        match self {
            Change::Remove(node) | Change::Add(node) => node,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Remove(node) => write!(f, "remove {node}"),
            Change::Add(node) => write!(f, "add {node}"),
        }
    }
}

/// Keys held by one node after the change.
#[derive(Debug, Clone, Serialize)]
pub struct NodeLoad {
    pub node: NodeId,
    pub keys: usize,
    /// `keys` relative to a perfectly even split.
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Simulation {
    pub change: Change,
    pub keys: usize,
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub moved: usize,
    pub moved_fraction: f64,
    /// `1 / N` for the larger of the two memberships.
    pub ideal_fraction: f64,
    /// Every moved key left the removed node, or went to the added one.
    pub confined: bool,
    /// Fraction a `hash(key) mod N` placement would have moved.
    pub modulo_moved_fraction: f64,
    pub load: Vec<NodeLoad>,
}

fn lookup<P: Partitioner>(ring: &HashRing<P>, keys: &[String], count: usize) -> CommandResult {
    let snapshot = ring.snapshot();
    let resolutions = keys
        .iter()
        .map(|key| -> anyhow::Result<Resolution> {
            let nodes = snapshot
                .lookup_n(key, count)
                .with_context(|| format!("resolving {key}"))?;
            Ok(Resolution {
                key: key.clone(),
                token: snapshot.position(key).to_string(),
                nodes,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Report::Lookup(resolutions))
}

fn members<P: Partitioner>(ring: &HashRing<P>) -> Report {
    let snapshot = ring.snapshot();
    Report::Members(
        snapshot
            .members()
            .into_iter()
            .map(|node| {
                let vnodes = snapshot.vnodes_of(node.as_str()).unwrap_or_default();
                Member { node, vnodes }
            })
            .collect(),
    )
}

/// Applies `change` to `ring` and measures how many keys moved.
pub fn simulate<P: Partitioner>(
    ring: &HashRing<P>,
    keys: usize,
    change: Change,
) -> anyhow::Result<Simulation> {
    if keys == 0 {
        bail!("simulation needs at least one key");
    }
    let before = ring.snapshot();
    if before.is_empty() {
        bail!("ring has no nodes; pass --node or --config");
    }

    let keys: Vec<String> = (0..keys).map(|i| format!("key-{i}")).collect();
    let baseline = keys
        .iter()
        .map(|k| before.lookup(k))
        .collect::<corelib::Result<Vec<_>>>()?;

    match &change {
        Change::Remove(node) => ring
            .remove_node(node)
            .with_context(|| format!("removing {node}"))?,
        Change::Add(node) => {
            if ring.contains(node) {
                bail!("{node} is already a member");
            }
            ring.add(node).with_context(|| format!("adding {node}"))?
        }
    }

    let after = ring.snapshot();
    if after.is_empty() {
        bail!("removing {} leaves the ring empty", change.node());
    }
    let current = keys
        .iter()
        .map(|k| after.lookup(k))
        .collect::<corelib::Result<Vec<_>>>()?;

    let changed = change.node();
    let mut moved = 0;
    let mut confined = true;
    for (old, new) in baseline.iter().zip(&current) {
        if old != new {
            moved += 1;
            confined &= match change {
                Change::Remove(_) => old.as_str() == changed,
                Change::Add(_) => new.as_str() == changed,
            };
        }
    }

    // Naive placement for contrast: index into the sorted member list.
    let members_before = before.members();
    let members_after = after.members();
    let modulo_moved = keys
        .iter()
        .filter(|k| {
            let h = before.position(k).as_u64();
            members_before[(h % members_before.len() as u64) as usize]
                != members_after[(h % members_after.len() as u64) as usize]
        })
        .count();

    let mut counts: BTreeMap<NodeId, usize> =
        members_after.iter().map(|node| (node.clone(), 0)).collect();
    for owner in current {
        *counts.entry(owner).or_default() += 1;
    }
    let ideal = keys.len() as f64 / members_after.len() as f64;
    let load = counts
        .into_iter()
        .map(|(node, keys)| NodeLoad {
            node,
            keys,
            ratio: keys as f64 / ideal,
        })
        .collect();

    let simulation = Simulation {
        keys: keys.len(),
        nodes_before: members_before.len(),
        nodes_after: members_after.len(),
        moved,
        moved_fraction: moved as f64 / keys.len() as f64,
        ideal_fraction: 1.0 / members_before.len().max(members_after.len()) as f64,
        confined,
        modulo_moved_fraction: modulo_moved as f64 / keys.len() as f64,
        load,
        change,
    };
    info!(
        change = %simulation.change,
        moved = simulation.moved,
        confined = simulation.confined,
        "simulation finished"
    );
    Ok(simulation)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Lookup(resolutions) => {
                for r in resolutions {
                    let nodes: Vec<&str> = r.nodes.iter().map(NodeId::as_str).collect();
                    writeln!(f, "{}\t{}\t{}", r.key, r.token, nodes.join(","))?;
                }
            }
            Report::Members(members) => {
                for m in members {
                    writeln!(f, "{}\t{}", m.node, m.vnodes)?;
                }
            }
            Report::Ownership(ownership) => {
                for o in ownership {
                    writeln!(f, "{}\t{}\t{:.2}%", o.node, o.vnodes, o.share * 100.0)?;
                }
            }
            Report::Simulation(s) => {
                writeln!(f, "change:        {}", s.change)?;
                writeln!(f, "nodes:         {} -> {}", s.nodes_before, s.nodes_after)?;
                writeln!(
                    f,
                    "moved keys:    {} of {} ({:.2}%, ideal {:.2}%)",
                    s.moved,
                    s.keys,
                    s.moved_fraction * 100.0,
                    s.ideal_fraction * 100.0
                )?;
                writeln!(f, "confined:      {}", s.confined)?;
                writeln!(
                    f,
                    "mod-N moved:   {:.2}%",
                    s.modulo_moved_fraction * 100.0
                )?;
                for l in &s.load {
                    writeln!(f, "  {}\t{}\t{:.2}x", l.node, l.keys, l.ratio)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::ring::RingBuilder;

    fn ring(nodes: &[&str], vnodes: usize) -> HashRing {
        RingBuilder::new()
            .with_vnodes(vnodes)
            .add_nodes(nodes.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn removal_is_confined() {
        let ring = ring(&["a", "b", "c", "d"], 100);
        let sim = simulate(&ring, 20_000, Change::Remove("d".into())).unwrap();

        assert!(sim.confined);
        assert_eq!((sim.nodes_before, sim.nodes_after), (4, 3));
        assert!(sim.moved > 0);
        assert!(sim.moved_fraction < 0.5, "moved {}", sim.moved_fraction);
        assert_eq!(sim.load.len(), 3);
        assert_eq!(sim.load.iter().map(|l| l.keys).sum::<usize>(), 20_000);
        assert!(!ring.contains("d"));
    }

    #[test]
    fn addition_is_confined() {
        let ring = ring(&["a", "b", "c"], 100);
        let sim = simulate(&ring, 20_000, Change::Add("e".into())).unwrap();

        assert!(sim.confined);
        assert_eq!(sim.nodes_after, 4);
        assert_eq!(sim.ideal_fraction, 0.25);
        let gained = sim.load.iter().find(|l| l.node == "e").unwrap().keys;
        assert_eq!(gained, sim.moved);
    }

    #[test]
    fn simulate_rejects_bad_changes() {
        let r = ring(&["a"], 4);
        assert!(simulate(&r, 10, Change::Add("a".into())).is_err());
        assert!(simulate(&r, 10, Change::Remove("zzz".into())).is_err());
        assert!(simulate(&r, 10, Change::Remove("a".into())).is_err());
        assert!(simulate(&ring(&[], 4), 10, Change::Add("a".into())).is_err());
    }

    #[test]
    fn execute_lookup_and_json() {
        let settings = RingSettings {
            hash: HashKind::Xxh3,
            vnodes: 16,
            nodes: vec![("a".into(), None), ("b".into(), None), ("c".into(), None)],
        };
        let command = Command::Lookup {
            keys: vec!["user:1".into(), "user:2".into()],
            count: 2,
        };
        let report = command.execute(&settings).unwrap();
        match &report {
            Report::Lookup(resolutions) => {
                assert_eq!(resolutions.len(), 2);
                assert!(resolutions.iter().all(|r| r.nodes.len() == 2));
                assert!(resolutions.iter().all(|r| r.token.len() == 16));
            }
            other => panic!("unexpected report {other:?}"),
        }

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["report"], "lookup");
        assert_eq!(json["data"][0]["key"], "user:1");
    }

    #[test]
    fn execute_on_empty_ring_fails() {
        let settings = RingSettings {
            hash: HashKind::Crc32,
            vnodes: 16,
            nodes: Vec::new(),
        };
        let command = Command::Lookup {
            keys: vec!["k".into()],
            count: 1,
        };
        let err = command.execute(&settings).unwrap_err();
        assert!(format!("{err:#}").contains("no nodes"));
    }

    #[test]
    fn ownership_report_renders() {
        let settings = RingSettings {
            hash: HashKind::Blake3,
            vnodes: 32,
            nodes: vec![("a".into(), None), ("b".into(), Some(64))],
        };
        let report = Command::Ownership.execute(&settings).unwrap();
        let text = report.to_string();
        assert!(text.starts_with("a\t32\t"));
        assert!(text.contains("b\t64\t"));
    }
}
