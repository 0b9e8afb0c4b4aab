//! Domain document types, search policy, and the task descriptor.
//!
//! The domain document declares items, tools, recipes and one planning
//! problem. All document types derive Serialize/Deserialize and keep
//! declaration order, so recipe tie-breaking and goal order follow the file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Domain document
// ============================================================================

/// Root of a crafting domain file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Domain {
    /// Consumable item identifiers
    #[serde(default)]
    pub items: Vec<String>,

    /// Durable identifiers (tools, benches, furnaces)
    #[serde(default)]
    pub tools: Vec<String>,

    /// Named production rules (order-preserving)
    pub recipes: IndexMap<String, RecipeDecl>,

    /// The planning problem
    pub problem: Problem,

    /// Search policy
    #[serde(default)]
    pub policy: Policy,
}

/// A production rule as written in the domain file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecipeDecl {
    /// Time cost deducted from the agent's budget
    pub time: i64,

    /// Items yielded
    pub produces: IndexMap<String, u32>,

    /// Items that must be held, not consumed
    #[serde(default)]
    pub requires: IndexMap<String, u32>,

    /// Items that must be held and are deducted
    #[serde(default)]
    pub consumes: IndexMap<String, u32>,
}

/// Initial inventory, time budget and goal quantities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Problem {
    #[serde(default)]
    pub initial: IndexMap<String, u32>,

    pub time: i64,

    pub goal: IndexMap<String, u32>,
}

// ============================================================================
// Policy
// ============================================================================

/// Search policy: pruning thresholds and method ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    /// Decomposition depth beyond which a branch is abandoned
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Repeats allowed per unit of requested quantity
    #[serde(default = "default_repeat_factor")]
    pub repeat_factor: u32,

    /// Minimum repeats allowed regardless of quantity
    #[serde(default = "default_repeat_floor")]
    pub repeat_floor: u32,

    /// How alternative methods are ordered at runtime
    #[serde(default)]
    pub ordering: OrderingStrategy,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            repeat_factor: default_repeat_factor(),
            repeat_floor: default_repeat_floor(),
            ordering: OrderingStrategy::default(),
        }
    }
}

impl Policy {
    /// Number of times a task may repeat on the calling stack before the
    /// branch is pruned.
    pub fn repeat_limit(&self, quantity: u32) -> u32 {
        self.repeat_factor
            .saturating_mul(quantity)
            .max(self.repeat_floor)
    }
}

fn default_max_depth() -> usize {
    400
}

fn default_repeat_factor() -> u32 {
    3
}

fn default_repeat_floor() -> u32 {
    10
}

/// Runtime method ordering strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingStrategy {
    /// Methods whose prerequisites are already held go first
    #[default]
    ReadyFirst,
    /// Keep the compiled order (ascending recipe time)
    Declared,
}

impl fmt::Display for OrderingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadyFirst => write!(f, "ready-first"),
            Self::Declared => write!(f, "declared"),
        }
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// A unit of work on the task agenda.
///
/// Descriptors are plain values; the search compares them structurally
/// against the calling stack to detect cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    /// Hold at least `quantity` of `item`.
    HaveEnough {
        agent: String,
        item: String,
        quantity: u32,
    },
    /// Produce `item` once, then re-check the quantity.
    EnsureProduction {
        agent: String,
        item: String,
        quantity: u32,
    },
    /// Run one of the recipes producing `item`.
    Produce { agent: String, item: String },
    /// Execute a recipe.
    Action { agent: String, recipe: String },
}

impl Task {
    pub fn have_enough(agent: &str, item: &str, quantity: u32) -> Self {
        Self::HaveEnough {
            agent: agent.to_string(),
            item: item.to_string(),
            quantity,
        }
    }

    pub fn ensure_production(agent: &str, item: &str, quantity: u32) -> Self {
        Self::EnsureProduction {
            agent: agent.to_string(),
            item: item.to_string(),
            quantity,
        }
    }

    pub fn produce(agent: &str, item: &str) -> Self {
        Self::Produce {
            agent: agent.to_string(),
            item: item.to_string(),
        }
    }

    pub fn action(agent: &str, recipe: &str) -> Self {
        Self::Action {
            agent: agent.to_string(),
            recipe: recipe.to_string(),
        }
    }

    /// The agent the task runs for.
    pub fn agent(&self) -> &str {
        match self {
            Self::HaveEnough { agent, .. }
            | Self::EnsureProduction { agent, .. }
            | Self::Produce { agent, .. }
            | Self::Action { agent, .. } => agent,
        }
    }

    /// `(item, quantity)` for the quantity-checking kinds.
    pub fn requested(&self) -> Option<(&str, u32)> {
        match self {
            Self::HaveEnough { item, quantity, .. }
            | Self::EnsureProduction { item, quantity, .. } => Some((item, *quantity)),
            _ => None,
        }
    }
}

/// Registry key for a produce task of `item`.
pub fn produce_key(item: &str) -> String {
    format!("produce_{}", item)
}

/// Registry key for the operator of recipe `name`.
pub fn action_key(name: &str) -> String {
    format!("op_{}", name.replace(' ', "_"))
}

impl crate::engine::TaskKey for Task {
    fn key(&self) -> String {
        match self {
            Self::HaveEnough { .. } => "have_enough".to_string(),
            Self::EnsureProduction { .. } => "ensure_production".to_string(),
            Self::Produce { item, .. } => produce_key(item),
            Self::Action { recipe, .. } => action_key(recipe),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HaveEnough {
                agent,
                item,
                quantity,
            } => write!(f, "have_enough({}, {}, {})", agent, item, quantity),
            Self::EnsureProduction {
                agent,
                item,
                quantity,
            } => write!(f, "ensure_production({}, {}, {})", agent, item, quantity),
            Self::Produce { agent, item } => write!(f, "produce({}, {})", agent, item),
            Self::Action { agent, recipe } => write!(f, "{}({})", action_key(recipe), agent),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
