//! Total-order HTN search with backtracking.
//!
//! The engine knows nothing about crafting. It takes an ordered goal list,
//! expands the first pending task with the first applicable method (or
//! applies its operator), and backtracks on failure. Domains plug in
//! through a [`Registry`] of methods and operators and a [`SearchHooks`]
//! implementation that can prune branches and reorder alternatives.
//!
//! State is copy-on-write: every operator application works on a clone, so
//! a failed branch leaves the caller's state untouched. A (state, agenda)
//! pair that failed without any branch-specific cut is recorded and fails
//! immediately when reached again.

use rustc_hash::{FxHashMap, FxHashSet};
use std::error::Error;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// Tasks name the registry entry that handles them.
pub trait TaskKey {
    fn key(&self) -> String;
}

/// Result of applying an operator. `Err` means "not applicable here".
pub type Applied = Result<(), Box<dyn Error>>;

type ExpandFn<S, T> = dyn Fn(&S, &T) -> Option<Vec<T>>;
type ApplyFn<S, T> = dyn Fn(&mut S, &T) -> Applied;

/// A decomposition rule: maps a task to an ordered subtask list, or `None`
/// when it does not apply.
pub struct Method<S, T> {
    name: String,
    expand: Box<ExpandFn<S, T>>,
}

impl<S, T> Method<S, T> {
    pub fn new(name: impl Into<String>, expand: impl Fn(&S, &T) -> Option<Vec<T>> + 'static) -> Self {
        Self {
            name: name.into(),
            expand: Box::new(expand),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compute the subtasks this method would produce, without committing.
    pub fn preview(&self, state: &S, task: &T) -> Option<Vec<T>> {
        (self.expand)(state, task)
    }
}

impl<S, T> fmt::Debug for Method<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method").field("name", &self.name).finish()
    }
}

/// A primitive action: checks its preconditions and mutates state, or
/// fails without mutating.
pub struct Operator<S, T> {
    name: String,
    apply: Box<ApplyFn<S, T>>,
}

impl<S, T> Operator<S, T> {
    pub fn new(name: impl Into<String>, apply: impl Fn(&mut S, &T) -> Applied + 'static) -> Self {
        Self {
            name: name.into(),
            apply: Box::new(apply),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, state: &mut S, task: &T) -> Applied {
        (self.apply)(state, task)
    }
}

impl<S, T> fmt::Debug for Operator<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator").field("name", &self.name).finish()
    }
}

/// Method and operator tables, keyed by task key.
pub struct Registry<S, T> {
    methods: FxHashMap<String, Vec<Method<S, T>>>,
    operators: FxHashMap<String, Operator<S, T>>,
}

impl<S, T> Default for Registry<S, T> {
    fn default() -> Self {
        Self {
            methods: FxHashMap::default(),
            operators: FxHashMap::default(),
        }
    }
}

impl<S, T> Registry<S, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the ordered alternatives for a task key. Replaces any
    /// previous declaration for the same key.
    pub fn declare_methods(&mut self, key: impl Into<String>, methods: Vec<Method<S, T>>) {
        self.methods.insert(key.into(), methods);
    }

    /// Register operators under their own names.
    pub fn declare_operators(&mut self, operators: Vec<Operator<S, T>>) {
        for op in operators {
            self.operators.insert(op.name.clone(), op);
        }
    }

    pub fn methods(&self, key: &str) -> &[Method<S, T>] {
        self.methods.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn operator(&self, key: &str) -> Option<&Operator<S, T>> {
        self.operators.get(key)
    }

    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }
}

/// A task waiting on the agenda, with the ancestors that produced it.
#[derive(Debug, Clone)]
pub struct Pending<T> {
    task: T,
    stack: Rc<Vec<T>>,
}

/// What the hooks see before a task is expanded.
pub struct SearchContext<'a, S, T> {
    pub state: &'a S,
    pub task: &'a T,
    pending: &'a [Pending<T>],
    pub plan: &'a [T],
    pub depth: usize,
    pub calling_stack: &'a [T],
}

impl<'a, S, T> SearchContext<'a, S, T> {
    /// Tasks still queued after the current one.
    pub fn pending(&self) -> impl Iterator<Item = &'a T> {
        self.pending.iter().map(|p| &p.task)
    }
}

/// A hook's decision about the task about to be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Expand,
    /// No plan exists from this state and agenda, wherever they are reached.
    DeadEnd,
    /// Abandoned because of this branch's calling stack or depth.
    Cut,
}

/// Domain hooks consulted during search.
pub trait SearchHooks<S, T> {
    /// Decide whether to expand `ctx.task` or abandon the branch.
    fn prune(&self, _ctx: &SearchContext<'_, S, T>) -> Verdict {
        Verdict::Expand
    }

    /// Reorder the alternatives for `ctx.task`. Called only when more than
    /// one method is registered.
    fn order<'m>(
        &self,
        _ctx: &SearchContext<'_, S, T>,
        methods: Vec<&'m Method<S, T>>,
    ) -> Vec<&'m Method<S, T>> {
        methods
    }
}

/// A successful search: primitive tasks in execution order and the state
/// they leave behind.
#[derive(Debug, Clone)]
pub struct Solution<S, T> {
    pub plan: Vec<T>,
    pub state: S,
}

/// Search for a plan that accomplishes `goals` in order from `state`.
///
/// Subtrees that fail without any [`Verdict::Cut`] are remembered by state
/// and agenda, and never searched twice.
pub fn find_plan<S, T, H>(
    registry: &Registry<S, T>,
    hooks: &H,
    state: S,
    goals: Vec<T>,
) -> Option<Solution<S, T>>
where
    S: Clone + Eq + Hash,
    T: TaskKey + Clone + Eq + Hash + fmt::Display,
    H: SearchHooks<S, T>,
{
    let root = Rc::new(Vec::new());
    let agenda: Vec<Pending<T>> = goals
        .into_iter()
        .map(|task| Pending {
            task,
            stack: Rc::clone(&root),
        })
        .collect();

    let mut search = Search {
        registry,
        hooks,
        dead_ends: FxHashSet::default(),
    };
    let mut plan = Vec::new();
    let result = search.seek(&state, &agenda, &mut plan, 0);
    tracing::debug!(dead_ends = search.dead_ends.len(), "search finished");
    let state = result.ok()?;
    tracing::debug!(steps = plan.len(), "plan found");
    Some(Solution { plan, state })
}

/// How a subtree failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    /// Exhausted without any cut: fails from any branch.
    DeadEnd,
    /// Some part was cut for branch-specific reasons.
    Cut,
}

impl Failure {
    fn merge(self, other: Self) -> Self {
        if self == Self::Cut || other == Self::Cut {
            Self::Cut
        } else {
            Self::DeadEnd
        }
    }
}

struct Search<'r, S, T, H> {
    registry: &'r Registry<S, T>,
    hooks: &'r H,
    dead_ends: FxHashSet<(S, Vec<T>)>,
}

impl<'r, S, T, H> Search<'r, S, T, H>
where
    S: Clone + Eq + Hash,
    T: TaskKey + Clone + Eq + Hash + fmt::Display,
    H: SearchHooks<S, T>,
{
    fn seek(&mut self, state: &S, agenda: &[Pending<T>], plan: &mut Vec<T>, depth: usize) -> Result<S, Failure> {
        let Some((head, rest)) = agenda.split_first() else {
            return Ok(state.clone());
        };

        let memo_key = (state.clone(), agenda.iter().map(|p| p.task.clone()).collect::<Vec<_>>());
        if self.dead_ends.contains(&memo_key) {
            tracing::trace!(depth, task = %head.task, "known dead end");
            return Err(Failure::DeadEnd);
        }

        let result = self.expand(state, head, rest, plan, depth);
        if matches!(result, Err(Failure::DeadEnd)) {
            self.dead_ends.insert(memo_key);
        }
        result
    }

    fn expand(
        &mut self,
        state: &S,
        head: &Pending<T>,
        rest: &[Pending<T>],
        plan: &mut Vec<T>,
        depth: usize,
    ) -> Result<S, Failure> {
        let registry = self.registry;
        let hooks = self.hooks;
        tracing::trace!(depth, task = %head.task, "expanding");

        let ctx = SearchContext {
            state,
            task: &head.task,
            pending: rest,
            plan: plan.as_slice(),
            depth,
            calling_stack: head.stack.as_slice(),
        };
        match hooks.prune(&ctx) {
            Verdict::Expand => {}
            Verdict::DeadEnd => {
                tracing::debug!(depth, task = %head.task, "pruned, dead end");
                return Err(Failure::DeadEnd);
            }
            Verdict::Cut => {
                tracing::debug!(depth, task = %head.task, "pruned, cut");
                return Err(Failure::Cut);
            }
        }

        let key = head.task.key();
        let mut failure = Failure::DeadEnd;

        if let Some(op) = registry.operator(&key) {
            let mut next = state.clone();
            match op.apply(&mut next, &head.task) {
                Ok(()) => {
                    plan.push(head.task.clone());
                    match self.seek(&next, rest, plan, depth + 1) {
                        Ok(done) => return Ok(done),
                        Err(f) => failure = failure.merge(f),
                    }
                    plan.pop();
                }
                Err(reason) => {
                    tracing::debug!(depth, operator = op.name(), %reason, "not applicable");
                }
            }
        }

        let methods = registry.methods(&key);
        if methods.is_empty() {
            return Err(failure);
        }

        let candidates: Vec<&Method<S, T>> = methods.iter().collect();
        let ordered = if candidates.len() > 1 {
            let ctx = SearchContext {
                state,
                task: &head.task,
                pending: rest,
                plan,
                depth,
                calling_stack: &head.stack,
            };
            hooks.order(&ctx, candidates)
        } else {
            candidates
        };

        let mut stack = Vec::with_capacity(head.stack.len() + 1);
        stack.extend(head.stack.iter().cloned());
        stack.push(head.task.clone());
        let stack = Rc::new(stack);

        for method in ordered {
            let Some(subtasks) = method.preview(state, &head.task) else {
                continue;
            };
            tracing::trace!(depth, method = method.name(), subtasks = subtasks.len(), "trying");

            let mut next: Vec<Pending<T>> = Vec::with_capacity(subtasks.len() + rest.len());
            next.extend(subtasks.into_iter().map(|task| Pending {
                task,
                stack: Rc::clone(&stack),
            }));
            next.extend_from_slice(rest);

            match self.seek(state, &next, plan, depth + 1) {
                Ok(done) => return Ok(done),
                Err(f) => failure = failure.merge(f),
            }
        }

        tracing::debug!(depth, task = %head.task, "exhausted");
        Err(failure)
    }
}
