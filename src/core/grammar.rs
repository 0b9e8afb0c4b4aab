//! Fixed decomposition rules between goals and production.
//!
//! `have_enough(item, n)` either holds already or goes through
//! `ensure_production(item, n)`, which runs one production and then checks
//! `have_enough(item, n)` again. A production step always sits between two
//! checks of the same quantity, so every round trip changes held counts.

use super::state::ResourceState;
use super::types::{Domain, Task};
use crate::engine::{Method, Registry};

/// Register the have-enough and ensure-production methods.
pub fn declare(registry: &mut Registry<ResourceState, Task>) {
    registry.declare_methods(
        "have_enough",
        vec![
            Method::new("check_enough", check_enough),
            Method::new("produce_enough", produce_enough),
        ],
    );
    registry.declare_methods(
        "ensure_production",
        vec![Method::new("ensure_production", ensure_production)],
    );
}

/// Succeeds with no work when the agent already holds enough.
fn check_enough(state: &ResourceState, task: &Task) -> Option<Vec<Task>> {
    match task {
        Task::HaveEnough {
            agent,
            item,
            quantity,
        } if state.holds_at_least(item, agent, *quantity) => Some(Vec::new()),
        _ => None,
    }
}

fn produce_enough(_state: &ResourceState, task: &Task) -> Option<Vec<Task>> {
    match task {
        Task::HaveEnough {
            agent,
            item,
            quantity,
        } => Some(vec![Task::ensure_production(agent, item, *quantity)]),
        _ => None,
    }
}

fn ensure_production(_state: &ResourceState, task: &Task) -> Option<Vec<Task>> {
    match task {
        Task::EnsureProduction {
            agent,
            item,
            quantity,
        } => Some(vec![
            Task::produce(agent, item),
            Task::have_enough(agent, item, *quantity),
        ]),
        _ => None,
    }
}

/// One have-enough task per goal entry, in document order.
pub fn goals(domain: &Domain, agent: &str) -> Vec<Task> {
    domain
        .problem
        .goal
        .iter()
        .map(|(item, &n)| Task::have_enough(agent, item, n))
        .collect()
}
