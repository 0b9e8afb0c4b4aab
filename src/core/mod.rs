//! Crafting domain logic: types, parsing, recipes, grammar, search policy.

pub mod error;
pub mod grammar;
pub mod ordering;
pub mod parser;
pub mod planner;
pub mod pruning;
pub mod recipe;
pub mod state;
pub mod types;
