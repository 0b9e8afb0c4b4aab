//! Recipe compilation: one operator per recipe, one production method per
//! recipe registered under the produce task of every item it yields.
//!
//! Competing recipes for the same item are registered cheapest first
//! (ascending declared time, declaration order on ties).

use super::error::Infeasible;
use super::state::ResourceState;
use super::types::{action_key, produce_key, Domain, RecipeDecl, Task};
use crate::engine::{Method, Operator, Registry};
use indexmap::{IndexMap, IndexSet};
use std::rc::Rc;

/// A compiled production rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub name: String,
    pub produces: IndexMap<String, u32>,
    pub requires: IndexMap<String, u32>,
    pub consumes: IndexMap<String, u32>,
    pub time: i64,
}

impl Recipe {
    pub fn from_decl(name: &str, decl: &RecipeDecl) -> Self {
        Self {
            name: name.to_string(),
            produces: decl.produces.clone(),
            requires: decl.requires.clone(),
            consumes: decl.consumes.clone(),
            time: decl.time,
        }
    }

    /// Registry key of this recipe's operator.
    pub fn action_name(&self) -> String {
        action_key(&self.name)
    }

    /// Check every precondition, then consume, produce and spend time.
    ///
    /// On `Err` the state is untouched.
    pub fn apply(&self, state: &mut ResourceState, agent: &str) -> Result<(), Infeasible> {
        let remaining = state.time(agent);
        if remaining < self.time {
            return Err(Infeasible::NotEnoughTime {
                needed: self.time,
                remaining,
            });
        }
        for (item, &needed) in &self.requires {
            let held = state.count(item, agent);
            if held < needed {
                return Err(Infeasible::MissingTool {
                    item: item.clone(),
                    needed,
                    held,
                });
            }
        }
        for (item, &needed) in &self.consumes {
            let held = state.count(item, agent);
            if held < needed {
                return Err(Infeasible::MissingIngredient {
                    item: item.clone(),
                    needed,
                    held,
                });
            }
        }

        for (item, &n) in &self.consumes {
            let held = state.count(item, agent);
            state.set_count(item, agent, held - n);
        }
        for (item, &n) in &self.produces {
            let held = state.count(item, agent);
            state.set_count(item, agent, held.saturating_add(n));
        }
        state.set_time(agent, remaining - self.time);
        Ok(())
    }

    /// Subtasks of this recipe's production method.
    ///
    /// Empty when the recipe yields a durable good the agent already owns.
    /// Otherwise: a have-enough check per required tool, then per consumed
    /// ingredient, then the action itself.
    pub fn subtasks(&self, state: &ResourceState, agent: &str, durable: &IndexSet<String>) -> Vec<Task> {
        let owns_durable = self
            .produces
            .keys()
            .any(|item| durable.contains(item) && state.count(item, agent) > 0);
        if owns_durable {
            return Vec::new();
        }

        let mut subtasks: Vec<Task> = self
            .requires
            .iter()
            .chain(&self.consumes)
            .map(|(item, &n)| Task::have_enough(agent, item, n))
            .collect();
        subtasks.push(Task::action(agent, &self.name));
        subtasks
    }
}

/// Compile every recipe in `domain`, in declaration order.
pub fn load_recipes(domain: &Domain) -> Vec<Recipe> {
    domain
        .recipes
        .iter()
        .map(|(name, decl)| Recipe::from_decl(name, decl))
        .collect()
}

/// Map each producible item to the recipes yielding it, cheapest first.
pub fn production_map(recipes: &[Recipe]) -> IndexMap<String, Vec<&Recipe>> {
    let mut map: IndexMap<String, Vec<&Recipe>> = IndexMap::new();
    for recipe in recipes {
        for item in recipe.produces.keys() {
            map.entry(item.clone()).or_default().push(recipe);
        }
    }
    for candidates in map.values_mut() {
        candidates.sort_by_key(|r| r.time);
    }
    map
}

/// Register one operator per recipe.
pub fn declare_operators(registry: &mut Registry<ResourceState, Task>, recipes: &[Recipe]) {
    let operators = recipes
        .iter()
        .map(|recipe| {
            let recipe = recipe.clone();
            Operator::new(recipe.action_name(), move |state: &mut ResourceState, task: &Task| {
                recipe.apply(state, task.agent())?;
                Ok(())
            })
        })
        .collect();
    registry.declare_operators(operators);
}

/// Register the production methods of every producible item.
pub fn declare_methods(
    registry: &mut Registry<ResourceState, Task>,
    recipes: &[Recipe],
    durable: Rc<IndexSet<String>>,
) {
    for (item, candidates) in production_map(recipes) {
        let methods = candidates
            .into_iter()
            .map(|recipe| production_method(recipe.clone(), Rc::clone(&durable)))
            .collect();
        registry.declare_methods(produce_key(&item), methods);
    }
}

fn production_method(recipe: Recipe, durable: Rc<IndexSet<String>>) -> Method<ResourceState, Task> {
    let name = format!("produce_method_{}", recipe.name.replace(' ', "_"));
    Method::new(name, move |state: &ResourceState, task: &Task| match task {
        Task::Produce { agent, .. } => Some(recipe.subtasks(state, agent, &durable)),
        _ => None,
    })
}
