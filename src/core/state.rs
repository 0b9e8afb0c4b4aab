//! Resource state: per-agent item counts and remaining time.
//!
//! One map from item name to per-agent counts, plus a per-agent time budget.
//! The search clones the state before each operator application, so nothing
//! here needs undo support.

use super::types::Domain;
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use serde::Serialize;
use std::hash::{Hash, Hasher};

/// Held items and remaining time for every agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceState {
    time: IndexMap<String, i64>,
    counts: IndexMap<String, IndexMap<String, u32>>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial state of `domain`'s problem for one agent.
    ///
    /// Every name mentioned anywhere in the domain gets an entry, zero unless
    /// the initial inventory says otherwise.
    pub fn from_domain(domain: &Domain, agent: &str) -> Self {
        let mut state = Self::new();
        state.set_time(agent, domain.problem.time);

        let declared = domain.items.iter().chain(&domain.tools);
        let from_recipes = domain.recipes.values().flat_map(|r| {
            r.produces
                .keys()
                .chain(r.requires.keys())
                .chain(r.consumes.keys())
        });
        let from_problem = domain
            .problem
            .initial
            .keys()
            .chain(domain.problem.goal.keys());
        for item in declared.chain(from_recipes).chain(from_problem) {
            state.register(item, agent);
        }

        for (item, &n) in &domain.problem.initial {
            state.set_count(item, agent, n);
        }
        state
    }

    /// Remaining time for `agent` (0 if unknown).
    pub fn time(&self, agent: &str) -> i64 {
        self.time.get(agent).copied().unwrap_or(0)
    }

    pub fn set_time(&mut self, agent: &str, time: i64) {
        self.time.insert(agent.to_string(), time);
    }

    /// Held count of `item` for `agent` (0 if unknown).
    pub fn count(&self, item: &str, agent: &str) -> u32 {
        self.counts
            .get(item)
            .and_then(|per_agent| per_agent.get(agent))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_count(&mut self, item: &str, agent: &str, n: u32) {
        self.counts
            .entry(item.to_string())
            .or_default()
            .insert(agent.to_string(), n);
    }

    /// Ensure `item` has an entry for `agent`, leaving existing counts alone.
    pub fn register(&mut self, item: &str, agent: &str) {
        self.counts
            .entry(item.to_string())
            .or_default()
            .entry(agent.to_string())
            .or_insert(0);
    }

    pub fn holds_at_least(&self, item: &str, agent: &str, n: u32) -> bool {
        self.count(item, agent) >= n
    }

    /// Non-zero holdings of `agent`, in registration order.
    pub fn holdings<'a>(&'a self, agent: &'a str) -> impl Iterator<Item = (&'a str, u32)> + 'a {
        self.counts.iter().filter_map(move |(item, per_agent)| {
            per_agent
                .get(agent)
                .copied()
                .filter(|&n| n > 0)
                .map(|n| (item.as_str(), n))
        })
    }
}

// IndexMap equality ignores insertion order, so the hash must too: entries
// are hashed one by one and summed.
impl Hash for ResourceState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut acc = 0u64;
        for (agent, time) in &self.time {
            acc = acc.wrapping_add(entry_hash((0u8, agent, time)));
        }
        for (item, per_agent) in &self.counts {
            for (agent, n) in per_agent {
                acc = acc.wrapping_add(entry_hash((1u8, item, agent, n)));
            }
        }
        state.write_u64(acc);
    }
}

fn entry_hash(entry: impl Hash) -> u64 {
    let mut h = FxHasher::default();
    entry.hash(&mut h);
    h.finish()
}
