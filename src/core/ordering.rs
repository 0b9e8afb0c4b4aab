//! Method ordering: try recipes whose prerequisites are already held first.
//!
//! This only reorders; every candidate stays in the list so backtracking
//! remains complete.

use super::state::ResourceState;
use super::types::{OrderingStrategy, Task};
use crate::engine::Method;

/// Readiness of one candidate method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Readiness {
    /// Every have-enough subtask is already satisfied
    Ready,
    /// Some have-enough subtask is not satisfied yet
    NotReady,
    /// The method does not apply to the task
    Inapplicable,
}

/// Classify `method` for `task` by previewing its subtasks.
pub fn readiness(method: &Method<ResourceState, Task>, state: &ResourceState, task: &Task) -> Readiness {
    let Some(subtasks) = method.preview(state, task) else {
        return Readiness::Inapplicable;
    };
    let ready = subtasks.iter().all(|subtask| match subtask {
        Task::HaveEnough {
            agent,
            item,
            quantity,
        } => state.holds_at_least(item, agent, *quantity),
        _ => true,
    });
    if ready {
        Readiness::Ready
    } else {
        Readiness::NotReady
    }
}

/// Orders alternative methods according to an [`OrderingStrategy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Ordering {
    strategy: OrderingStrategy,
}

impl Ordering {
    pub fn new(strategy: OrderingStrategy) -> Self {
        Self { strategy }
    }

    /// Ready methods, then not-ready, then inapplicable; stable within each
    /// group.
    pub fn order<'m>(
        &self,
        state: &ResourceState,
        task: &Task,
        methods: Vec<&'m Method<ResourceState, Task>>,
    ) -> Vec<&'m Method<ResourceState, Task>> {
        if self.strategy == OrderingStrategy::Declared || methods.len() <= 1 {
            return methods;
        }
        let mut ranked: Vec<_> = methods
            .into_iter()
            .map(|m| (readiness(m, state, task), m))
            .collect();
        ranked.sort_by_key(|(r, _)| *r);
        ranked.into_iter().map(|(_, m)| m).collect()
    }
}
