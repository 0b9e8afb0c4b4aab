//! Autocraft: hierarchical task network planning for crafting domains.
//!
//! A domain declares items, tools, and timed recipes. The planner
//! decomposes "have enough of X" goals into recipe actions with
//! backtracking search, bounded by the agent's time budget.

pub mod cli;
pub mod core;
pub mod engine;
