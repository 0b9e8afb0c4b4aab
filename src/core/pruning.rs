//! Branch pruning: time, depth, and bounded task repetition.
//!
//! The grammar is cyclic (an ingredient may need the item being produced),
//! so the search relies on this check to stop branches that recurse without
//! making progress. A have-enough or ensure-production task may reappear
//! on its own calling stack up to `max(RepeatFactor × quantity,
//! RepeatFloor)` times while the agent still holds too little.
//!
//! Time is checked against the whole agenda, not just the spent budget:
//! every pending action costs its recipe time, and every item still short
//! costs at least its cheapest producer's share. A branch whose agenda
//! cannot fit in the remaining time is abandoned before any more actions
//! are tried.

use super::recipe::Recipe;
use super::state::ResourceState;
use super::types::{Policy, Task};
use indexmap::{IndexMap, IndexSet};

/// Why a branch was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneReason {
    OutOfTime { remaining: i64 },
    OverBudget { needed: i64, remaining: i64 },
    Unobtainable { item: String },
    TooDeep { depth: usize },
    Repeated { occurrences: usize, limit: u32 },
}

impl PruneReason {
    /// True when the reason depends on the branch's calling stack or depth
    /// rather than only on the state and the pending tasks.
    pub fn is_contextual(&self) -> bool {
        matches!(self, Self::TooDeep { .. } | Self::Repeated { .. })
    }
}

/// Lower bound on the time an agenda still needs.
#[derive(Debug, Clone, Default)]
pub struct TimeBound {
    /// Cheapest producer time per item, split across the items it yields
    item_share: IndexMap<String, i64>,
    /// Recipe time and yielded items, by recipe name
    actions: IndexMap<String, (i64, Vec<String>)>,
}

impl TimeBound {
    pub fn new(recipes: &[Recipe]) -> Self {
        let mut item_share: IndexMap<String, i64> = IndexMap::new();
        let mut actions = IndexMap::new();
        for recipe in recipes {
            let time = recipe.time.max(0);
            let share = time / recipe.produces.len().max(1) as i64;
            for item in recipe.produces.keys() {
                item_share
                    .entry(item.clone())
                    .and_modify(|s| *s = (*s).min(share))
                    .or_insert(share);
            }
            actions.insert(recipe.name.clone(), (time, recipe.produces.keys().cloned().collect()));
        }
        Self {
            item_share,
            actions,
        }
    }

    /// Minimum time `agent` must still spend to finish `agenda` from
    /// `state`.
    ///
    /// Pending actions count in full. An item some have-enough or
    /// ensure-production task is short of counts once, unless a pending
    /// action already yields it. `Err` names a short item nothing produces.
    pub fn estimate<'t>(
        &self,
        state: &ResourceState,
        agent: &str,
        agenda: impl IntoIterator<Item = &'t Task>,
    ) -> Result<i64, String> {
        let mut needed = 0i64;
        let mut covered: IndexSet<&str> = IndexSet::new();
        let mut short: IndexSet<&str> = IndexSet::new();

        for task in agenda {
            if task.agent() != agent {
                continue;
            }
            if let Task::Action { recipe, .. } = task {
                if let Some((time, yields)) = self.actions.get(recipe) {
                    needed = needed.saturating_add(*time);
                    covered.extend(yields.iter().map(String::as_str));
                }
            } else if let Some((item, quantity)) = task.requested() {
                if !state.holds_at_least(item, agent, quantity) {
                    short.insert(item);
                }
            }
        }

        for item in short.into_iter().filter(|item| !covered.contains(*item)) {
            let Some(share) = self.item_share.get(item) else {
                return Err(item.to_string());
            };
            needed = needed.saturating_add(*share);
        }
        Ok(needed)
    }
}

/// Pruning check configured from a [`Policy`] and the compiled recipes.
#[derive(Debug, Clone)]
pub struct Pruning {
    policy: Policy,
    bound: TimeBound,
}

impl Pruning {
    pub fn new(policy: &Policy, recipes: &[Recipe]) -> Self {
        Self {
            policy: policy.clone(),
            bound: TimeBound::new(recipes),
        }
    }

    /// Decide whether to abandon the branch before expanding `task`, with
    /// `pending` queued behind it.
    pub fn check<'t>(
        &self,
        state: &ResourceState,
        task: &'t Task,
        pending: impl IntoIterator<Item = &'t Task>,
        depth: usize,
        calling_stack: &[Task],
    ) -> Option<PruneReason> {
        let agent = task.agent();
        let remaining = state.time(agent);
        if remaining < 0 {
            return Some(PruneReason::OutOfTime { remaining });
        }
        match self
            .bound
            .estimate(state, agent, std::iter::once(task).chain(pending))
        {
            Err(item) => return Some(PruneReason::Unobtainable { item }),
            Ok(needed) if needed > remaining => {
                return Some(PruneReason::OverBudget { needed, remaining })
            }
            Ok(_) => {}
        }
        if depth > self.policy.max_depth {
            return Some(PruneReason::TooDeep { depth });
        }

        let (item, quantity) = task.requested()?;
        if state.holds_at_least(item, agent, quantity) {
            return None;
        }
        let occurrences = calling_stack.iter().filter(|t| *t == task).count();
        if occurrences == 0 {
            return None;
        }
        let limit = self.policy.repeat_limit(quantity);
        if occurrences > limit as usize {
            return Some(PruneReason::Repeated { occurrences, limit });
        }
        None
    }
}
