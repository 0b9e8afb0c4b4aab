//! Planner configuration and the top-level planning entry point.
//!
//! A [`CraftingPlanner`] owns the compiled method and operator tables and
//! the two heuristics, and hands them to the search explicitly.

use super::grammar;
use super::ordering::Ordering;
use super::pruning::{PruneReason, Pruning};
use super::recipe::{self, Recipe};
use super::state::ResourceState;
use super::types::{Domain, Policy, Task};
use crate::engine::{self, Method, Registry, SearchContext, SearchHooks, Solution, Verdict};
use indexmap::IndexSet;
use std::rc::Rc;

/// Pruning and ordering wired into the search.
#[derive(Debug, Clone)]
pub struct CraftingHooks {
    pruning: Pruning,
    ordering: Ordering,
}

impl CraftingHooks {
    pub fn new(policy: &Policy, recipes: &[Recipe]) -> Self {
        Self {
            pruning: Pruning::new(policy, recipes),
            ordering: Ordering::new(policy.ordering),
        }
    }
}

impl SearchHooks<ResourceState, Task> for CraftingHooks {
    fn prune(&self, ctx: &SearchContext<'_, ResourceState, Task>) -> Verdict {
        let reason = self.pruning.check(
            ctx.state,
            ctx.task,
            ctx.pending(),
            ctx.depth,
            ctx.calling_stack,
        );
        match reason {
            None => Verdict::Expand,
            Some(PruneReason::Repeated { occurrences, limit }) => {
                tracing::trace!(task = %ctx.task, occurrences, limit, "repetition limit");
                Verdict::Cut
            }
            Some(reason) if reason.is_contextual() => {
                tracing::trace!(task = %ctx.task, ?reason, "prune");
                Verdict::Cut
            }
            Some(reason) => {
                tracing::trace!(task = %ctx.task, ?reason, "prune");
                Verdict::DeadEnd
            }
        }
    }

    fn order<'m>(
        &self,
        ctx: &SearchContext<'_, ResourceState, Task>,
        methods: Vec<&'m Method<ResourceState, Task>>,
    ) -> Vec<&'m Method<ResourceState, Task>> {
        self.ordering.order(ctx.state, ctx.task, methods)
    }
}

/// Compiled domain: method/operator tables plus search hooks.
pub struct CraftingPlanner {
    registry: Registry<ResourceState, Task>,
    hooks: CraftingHooks,
    recipes: Vec<Recipe>,
}

impl CraftingPlanner {
    /// Compile `domain`'s recipes under `policy`. Tools are the durable class.
    pub fn new(domain: &Domain, policy: &Policy) -> Self {
        let recipes = recipe::load_recipes(domain);
        let durable: IndexSet<String> = domain.tools.iter().cloned().collect();

        let mut registry = Registry::new();
        recipe::declare_operators(&mut registry, &recipes);
        recipe::declare_methods(&mut registry, &recipes, Rc::new(durable));
        grammar::declare(&mut registry);

        tracing::debug!(
            recipes = recipes.len(),
            operators = registry.operator_count(),
            ordering = %policy.ordering,
            max_depth = policy.max_depth,
            "compiled domain"
        );

        Self {
            registry,
            hooks: CraftingHooks::new(policy, &recipes),
            recipes,
        }
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn registry(&self) -> &Registry<ResourceState, Task> {
        &self.registry
    }

    /// Search for a plan reaching `goals` from `state`.
    ///
    /// `None` means no plan exists under the time budget and search limits.
    pub fn plan(&self, state: ResourceState, goals: Vec<Task>) -> Option<Solution<ResourceState, Task>> {
        engine::find_plan(&self.registry, &self.hooks, state, goals)
    }
}

/// Plan `domain`'s problem for one agent using the domain's own policy.
pub fn solve(domain: &Domain, agent: &str) -> Option<Solution<ResourceState, Task>> {
    solve_with(domain, &domain.policy, agent)
}

/// Plan `domain`'s problem for one agent under `policy`.
pub fn solve_with(domain: &Domain, policy: &Policy, agent: &str) -> Option<Solution<ResourceState, Task>> {
    let planner = CraftingPlanner::new(domain, policy);
    let state = ResourceState::from_domain(domain, agent);
    let goals = grammar::goals(domain, agent);
    planner.plan(state, goals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::OrderingStrategy;

    fn parse(json: &str) -> Domain {
        serde_json::from_str(json).unwrap()
    }

    fn steps(solution: &Solution<ResourceState, Task>) -> Vec<String> {
        solution.plan.iter().map(|t| t.to_string()).collect()
    }

    const PLANK: &str = r#"{
        "Items": ["wood", "plank"],
        "Tools": [],
        "Recipes": {
            "craft plank": {"Produces": {"plank": 4}, "Consumes": {"wood": 1}, "Time": 1}
        },
        "Problem": {"Initial": {"wood": 1}, "Time": 10, "Goal": {"plank": 4}}
    }"#;

    #[test]
    fn test_single_recipe_plan() {
        let domain = parse(PLANK);
        let solution = solve(&domain, "agent").unwrap();
        assert_eq!(steps(&solution), vec!["op_craft_plank(agent)"]);
        assert!(solution.state.count("plank", "agent") >= 4);
        assert_eq!(solution.state.count("wood", "agent"), 0);
        assert_eq!(solution.state.time("agent"), 9);
    }

    #[test]
    fn test_goal_already_held_needs_no_actions() {
        let mut domain = parse(PLANK);
        domain.problem.initial.insert("plank".into(), 5);
        let solution = solve(&domain, "agent").unwrap();
        assert!(solution.plan.is_empty());
        assert_eq!(solution.state.count("wood", "agent"), 1);
    }

    #[test]
    fn test_insufficient_time_yields_no_plan() {
        let mut domain = parse(PLANK);
        domain.problem.time = 0;
        assert!(solve(&domain, "agent").is_none());
    }

    #[test]
    fn test_unproducible_goal_yields_no_plan() {
        let mut domain = parse(PLANK);
        domain.problem.goal.insert("diamond".into(), 1);
        assert!(solve(&domain, "agent").is_none());
    }

    #[test]
    fn test_repeated_production_for_quantity() {
        let mut domain = parse(PLANK);
        domain.problem.initial.insert("wood".into(), 3);
        domain.problem.goal.insert("plank".into(), 10);
        let solution = solve(&domain, "agent").unwrap();
        assert_eq!(solution.plan.len(), 3);
        assert_eq!(solution.state.count("plank", "agent"), 12);
    }

    const CHAIN: &str = r#"{
        "Items": ["wood", "plank"],
        "Tools": ["bench", "axe"],
        "Recipes": {
            "punch for wood": {"Produces": {"wood": 1}, "Time": 4},
            "axe for wood": {"Produces": {"wood": 1}, "Requires": {"axe": 1}, "Time": 1},
            "make axe": {"Produces": {"axe": 1}, "Consumes": {"plank": 2}, "Time": 1},
            "craft plank": {"Produces": {"plank": 4}, "Consumes": {"wood": 1}, "Time": 1},
            "craft bench": {"Produces": {"bench": 1}, "Consumes": {"plank": 4}, "Time": 1}
        },
        "Problem": {"Initial": {}, "Time": 40, "Goal": {"bench": 1}}
    }"#;

    #[test]
    fn test_multi_step_chain() {
        let domain = parse(CHAIN);
        let solution = solve(&domain, "agent").unwrap();
        assert_eq!(solution.state.count("bench", "agent"), 1);
        assert_eq!(solution.plan.last().unwrap().to_string(), "op_craft_bench(agent)");
        assert!(solution.state.time("agent") >= 0);
    }

    #[test]
    fn test_plan_replays_on_initial_state() {
        let domain = parse(CHAIN);
        let solution = solve(&domain, "agent").unwrap();
        let planner = CraftingPlanner::new(&domain, &domain.policy);
        let mut state = ResourceState::from_domain(&domain, "agent");
        for step in &solution.plan {
            let Task::Action { recipe, .. } = step else {
                panic!("non-primitive step {}", step);
            };
            let r = planner.recipes().iter().find(|r| &r.name == recipe).unwrap();
            r.apply(&mut state, "agent").unwrap();
        }
        assert_eq!(state, solution.state);
    }

    #[test]
    fn test_cheapest_recipe_tried_first() {
        let mut domain = parse(CHAIN);
        domain.problem.initial.insert("axe".into(), 1);
        domain.problem.goal = [("wood".to_string(), 1)].into_iter().collect();
        let solution = solve(&domain, "agent").unwrap();
        assert_eq!(steps(&solution), vec!["op_axe_for_wood(agent)"]);
    }

    #[test]
    fn test_ready_first_avoids_tool_detour() {
        // Without the axe, ready-first ordering punches instead of
        // building an axe for a single log.
        let mut domain = parse(CHAIN);
        domain.problem.goal = [("wood".to_string(), 1)].into_iter().collect();
        let solution = solve(&domain, "agent").unwrap();
        assert_eq!(steps(&solution), vec!["op_punch_for_wood(agent)"]);
    }

    #[test]
    fn test_declared_order_follows_recipe_time() {
        let domain = parse(
            r#"{
            "Items": ["wood"],
            "Tools": ["axe"],
            "Recipes": {
                "punch for wood": {"Produces": {"wood": 1}, "Time": 4},
                "axe for wood": {"Produces": {"wood": 1}, "Requires": {"axe": 1}, "Time": 1},
                "make axe": {"Produces": {"axe": 1}, "Time": 1}
            },
            "Problem": {"Initial": {}, "Time": 10, "Goal": {"wood": 1}}
        }"#,
        );
        let ready_first = solve(&domain, "agent").unwrap();
        assert_eq!(steps(&ready_first), vec!["op_punch_for_wood(agent)"]);

        let policy = Policy {
            ordering: OrderingStrategy::Declared,
            ..Policy::default()
        };
        let declared = solve_with(&domain, &policy, "agent").unwrap();
        assert_eq!(
            steps(&declared),
            vec!["op_make_axe(agent)", "op_axe_for_wood(agent)"]
        );
    }

    #[test]
    fn test_durable_good_not_recrafted() {
        let mut domain = parse(CHAIN);
        domain.problem.initial.insert("bench".into(), 1);
        let planner = CraftingPlanner::new(&domain, &domain.policy);
        let state = ResourceState::from_domain(&domain, "agent");
        let solution = planner
            .plan(state, vec![Task::produce("agent", "bench")])
            .unwrap();
        assert!(solution.plan.is_empty());
    }

    #[test]
    fn test_tool_dependency_terminates() {
        // wood needs an axe; the axe needs nothing made of wood.
        let domain = parse(
            r#"{
            "Items": ["wood"],
            "Tools": ["axe"],
            "Recipes": {
                "chop": {"Produces": {"wood": 1}, "Requires": {"axe": 1}, "Time": 1},
                "make axe": {"Produces": {"axe": 1}, "Time": 1}
            },
            "Problem": {"Initial": {}, "Time": 10, "Goal": {"wood": 2}}
        }"#,
        );
        let solution = solve(&domain, "agent").unwrap();
        assert_eq!(
            steps(&solution),
            vec!["op_make_axe(agent)", "op_chop(agent)", "op_chop(agent)"]
        );
    }

    #[test]
    fn test_mutual_cycle_terminates_without_plan() {
        // wood needs an axe, the axe consumes wood, nothing is held.
        let domain = parse(
            r#"{
            "Items": ["wood"],
            "Tools": ["axe"],
            "Recipes": {
                "chop": {"Produces": {"wood": 1}, "Requires": {"axe": 1}, "Time": 1},
                "make axe": {"Produces": {"axe": 1}, "Consumes": {"wood": 1}, "Time": 1}
            },
            "Problem": {"Initial": {}, "Time": 10, "Goal": {"wood": 1}}
        }"#,
        );
        assert!(solve(&domain, "agent").is_none());
    }

    #[test]
    fn test_self_consuming_upgrade() {
        // Producing ore needs a pickaxe made from ore; one ore is held.
        let domain = parse(
            r#"{
            "Items": ["ore"],
            "Tools": ["pickaxe"],
            "Recipes": {
                "mine": {"Produces": {"ore": 2}, "Requires": {"pickaxe": 1}, "Time": 1},
                "make pickaxe": {"Produces": {"pickaxe": 1}, "Consumes": {"ore": 1}, "Time": 1}
            },
            "Problem": {"Initial": {"ore": 1}, "Time": 10, "Goal": {"ore": 3}}
        }"#,
        );
        let solution = solve(&domain, "agent").unwrap();
        assert_eq!(
            steps(&solution),
            vec!["op_make_pickaxe(agent)", "op_mine(agent)", "op_mine(agent)"]
        );
        assert_eq!(solution.state.count("ore", "agent"), 4);
    }

    #[test]
    fn test_time_budget_respected_across_paths() {
        // Needs 3 wood at 4 time each; only 10 time available.
        let domain = parse(
            r#"{
            "Items": ["wood"],
            "Tools": [],
            "Recipes": {
                "punch for wood": {"Produces": {"wood": 1}, "Time": 4}
            },
            "Problem": {"Initial": {}, "Time": 10, "Goal": {"wood": 3}}
        }"#,
        );
        assert!(solve(&domain, "agent").is_none());
    }

    const TOOLS: &str = r#"{
        "Items": ["wood", "plank", "stick", "cobble"],
        "Tools": ["bench", "wooden_axe", "wooden_pickaxe", "stone_pickaxe"],
        "Recipes": {
            "punch for wood": {"Produces": {"wood": 1}, "Time": 4},
            "wooden_axe for wood": {"Produces": {"wood": 1}, "Requires": {"wooden_axe": 1}, "Time": 2},
            "craft plank": {"Produces": {"plank": 4}, "Consumes": {"wood": 1}, "Time": 1},
            "craft stick": {"Produces": {"stick": 4}, "Consumes": {"plank": 2}, "Time": 1},
            "craft bench": {"Produces": {"bench": 1}, "Consumes": {"plank": 4}, "Time": 1},
            "craft wooden_axe at bench": {
                "Produces": {"wooden_axe": 1}, "Requires": {"bench": 1},
                "Consumes": {"stick": 2, "plank": 3}, "Time": 1
            },
            "craft wooden_pickaxe at bench": {
                "Produces": {"wooden_pickaxe": 1}, "Requires": {"bench": 1},
                "Consumes": {"stick": 2, "plank": 3}, "Time": 1
            },
            "wooden_pickaxe for cobble": {"Produces": {"cobble": 1}, "Requires": {"wooden_pickaxe": 1}, "Time": 4},
            "craft stone_pickaxe at bench": {
                "Produces": {"stone_pickaxe": 1}, "Requires": {"bench": 1},
                "Consumes": {"stick": 2, "cobble": 3}, "Time": 1
            }
        },
        "Problem": {"Initial": {}, "Time": 300, "Goal": {"wooden_pickaxe": 1}}
    }"#;

    fn tools_with(goal: &str, time: i64) -> Domain {
        let mut domain = parse(TOOLS);
        domain.problem.goal = [(goal.to_string(), 1)].into_iter().collect();
        domain.problem.time = time;
        domain
    }

    #[test]
    fn test_tight_budget_fails_fast() {
        // The cheapest wooden pickaxe takes 18: three punches, three planks,
        // one stick, the bench and the pickaxe.
        for time in [5, 6, 7, 8, 12, 17] {
            assert!(
                solve(&tools_with("wooden_pickaxe", time), "agent").is_none(),
                "time {}",
                time
            );
        }
        assert!(solve(&tools_with("stone_pickaxe", 15), "agent").is_none());
    }

    #[test]
    fn test_tight_budget_strict_policy_fails_fast() {
        let policy = Policy {
            repeat_factor: 0,
            repeat_floor: 1,
            ..Policy::default()
        };
        assert!(solve_with(&tools_with("wooden_pickaxe", 8), &policy, "agent").is_none());
    }

    #[test]
    fn test_exact_budget_finds_same_plan() {
        let exact = solve(&tools_with("wooden_pickaxe", 18), "agent").unwrap();
        assert_eq!(exact.state.time("agent"), 0);
        let roomy = solve(&tools_with("wooden_pickaxe", 300), "agent").unwrap();
        assert_eq!(steps(&exact), steps(&roomy));
        assert_eq!(
            steps(&exact).last().map(String::as_str),
            Some("op_craft_wooden_pickaxe_at_bench(agent)")
        );
    }

    #[test]
    fn test_stone_pickaxe_with_room() {
        let solution = solve(&tools_with("stone_pickaxe", 100), "agent").unwrap();
        assert_eq!(solution.state.count("stone_pickaxe", "agent"), 1);
        assert!(solution.state.time("agent") >= 0);
    }

    #[test]
    fn test_multiple_goals_in_order() {
        let mut domain = parse(PLANK);
        domain.problem.initial.insert("wood".into(), 2);
        domain.problem.goal.insert("wood".into(), 1);
        let solution = solve(&domain, "agent").unwrap();
        assert_eq!(steps(&solution), vec!["op_craft_plank(agent)"]);
        assert_eq!(solution.state.count("wood", "agent"), 1);
    }
}
