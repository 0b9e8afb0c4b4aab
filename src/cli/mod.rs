//! CLI subcommands: init, validate, plan.

use crate::core::types::{Domain, OrderingStrategy, Policy, Task};
use crate::core::{parser, planner, state::ResourceState};
use crate::engine::Solution;
use clap::{Subcommand, ValueEnum};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter domain file
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a domain file without planning
    Validate {
        /// Path to the domain file (JSON, or YAML by extension)
        #[arg(short, long, default_value = "crafting.json")]
        file: PathBuf,
    },

    /// Search for a plan reaching the domain's goals
    Plan {
        /// Path to the domain file (JSON, or YAML by extension)
        #[arg(short, long, default_value = "crafting.json")]
        file: PathBuf,

        /// Agent identifier to plan for
        #[arg(short, long, default_value = "agent")]
        agent: String,

        /// Override the maximum decomposition depth (at most 2000)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Override repeats allowed per unit of requested quantity
        #[arg(long)]
        repeat_factor: Option<u32>,

        /// Override the minimum repeats allowed
        #[arg(long)]
        repeat_floor: Option<u32>,

        /// Override method ordering
        #[arg(long, value_enum)]
        ordering: Option<OrderingArg>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Method ordering as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderingArg {
    ReadyFirst,
    Declared,
}

impl From<OrderingArg> for OrderingStrategy {
    fn from(arg: OrderingArg) -> Self {
        match arg {
            OrderingArg::ReadyFirst => Self::ReadyFirst,
            OrderingArg::Declared => Self::Declared,
        }
    }
}

/// Policy overrides collected from flags.
#[derive(Debug, Clone, Default)]
pub struct PolicyOverrides {
    pub max_depth: Option<usize>,
    pub repeat_factor: Option<u32>,
    pub repeat_floor: Option<u32>,
    pub ordering: Option<OrderingArg>,
}

impl PolicyOverrides {
    /// Apply flags on top of the policy from the domain file.
    pub fn apply(&self, base: &Policy) -> Policy {
        let mut policy = base.clone();
        if let Some(d) = self.max_depth {
            policy.max_depth = d;
        }
        if let Some(f) = self.repeat_factor {
            policy.repeat_factor = f;
        }
        if let Some(f) = self.repeat_floor {
            policy.repeat_floor = f;
        }
        if let Some(o) = self.ordering {
            policy.ordering = o.into();
        }
        policy
    }
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Plan {
            file,
            agent,
            max_depth,
            repeat_factor,
            repeat_floor,
            ordering,
            json,
        } => {
            let overrides = PolicyOverrides {
                max_depth,
                repeat_factor,
                repeat_floor,
                ordering,
            };
            cmd_plan(&file, &agent, &overrides, json)
        }
    }
}

const STARTER_DOMAIN: &str = r#"{
  "Items": ["wood", "plank", "stick"],
  "Tools": ["bench", "wooden_axe"],
  "Recipes": {
    "punch for wood": {"Produces": {"wood": 1}, "Time": 4},
    "wooden_axe for wood": {"Produces": {"wood": 1}, "Requires": {"wooden_axe": 1}, "Time": 2},
    "craft plank": {"Produces": {"plank": 4}, "Consumes": {"wood": 1}, "Time": 1},
    "craft stick": {"Produces": {"stick": 4}, "Consumes": {"plank": 2}, "Time": 1},
    "craft bench": {"Produces": {"bench": 1}, "Consumes": {"plank": 4}, "Time": 1},
    "craft wooden_axe at bench": {
      "Produces": {"wooden_axe": 1},
      "Requires": {"bench": 1},
      "Consumes": {"stick": 2, "plank": 3},
      "Time": 1
    }
  },
  "Problem": {
    "Initial": {},
    "Time": 60,
    "Goal": {"wooden_axe": 1}
  }
}
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let domain_path = path.join("crafting.json");
    if domain_path.exists() {
        return Err(format!("{} already exists", domain_path.display()));
    }
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&domain_path, STARTER_DOMAIN)
        .map_err(|e| format!("cannot write {}: {}", domain_path.display(), e))?;

    println!("Initialized crafting domain at {}", path.display());
    println!("  Created: {}", domain_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let domain = parser::parse_domain_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_domain(&domain);

    if errors.is_empty() {
        println!(
            "OK: {} ({} items, {} tools, {} recipes, {} goals)",
            file.display(),
            domain.items.len(),
            domain.tools.len(),
            domain.recipes.len(),
            domain.problem.goal.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Parse a domain file, apply policy overrides, and validate the result.
fn parse_and_validate(file: &Path, overrides: &PolicyOverrides) -> Result<Domain, String> {
    let mut domain = parser::parse_domain_file(file).map_err(|e| e.to_string())?;
    domain.policy = overrides.apply(&domain.policy);
    let errors = parser::validate_domain(&domain);
    if errors.is_empty() {
        return Ok(domain);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

fn cmd_plan(file: &Path, agent: &str, overrides: &PolicyOverrides, json: bool) -> Result<(), String> {
    let domain = parse_and_validate(file, overrides)?;
    tracing::info!(file = %file.display(), agent, ordering = %domain.policy.ordering, "planning");

    let result = planner::solve(&domain, agent);

    if json {
        let report = PlanReport::new(result.as_ref(), agent);
        let out = serde_json::to_string_pretty(&report).map_err(|e| format!("serialize error: {}", e))?;
        println!("{}", out);
    } else {
        print_plan(result.as_ref(), agent);
    }
    Ok(())
}

/// Machine-readable plan output.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub found: bool,
    pub steps: Vec<String>,
    pub remaining_time: Option<i64>,
    pub holdings: IndexMap<String, u32>,
}

impl PlanReport {
    pub fn new(result: Option<&Solution<ResourceState, Task>>, agent: &str) -> Self {
        match result {
            Some(solution) => Self {
                found: true,
                steps: solution.plan.iter().map(Task::to_string).collect(),
                remaining_time: Some(solution.state.time(agent)),
                holdings: solution
                    .state
                    .holdings(agent)
                    .map(|(item, n)| (item.to_string(), n))
                    .collect(),
            },
            None => Self {
                found: false,
                steps: Vec::new(),
                remaining_time: None,
                holdings: IndexMap::new(),
            },
        }
    }
}

/// Display a plan to stdout.
fn print_plan(result: Option<&Solution<ResourceState, Task>>, agent: &str) {
    let Some(solution) = result else {
        println!("No plan found!");
        return;
    };

    println!("Plan found!");
    println!("Steps: {}", solution.plan.len());
    for (i, step) in solution.plan.iter().enumerate() {
        println!("{}. {}", i + 1, step);
    }
    println!();
    println!("Time remaining: {}", solution.state.time(agent));
    let held: Vec<String> = solution
        .state
        .holdings(agent)
        .map(|(item, n)| format!("{} x{}", item, n))
        .collect();
    println!("Holding: {}", held.join(", "));
}
