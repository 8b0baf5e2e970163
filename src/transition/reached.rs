//! Reached sets of nested analysis runs.

crate::prelude!();

use std::sync::atomic::{AtomicUsize, Ordering};

use cfa::Loc;

/// Index of a state in its [`Reached`] arena.
pub type StateId = usize;

/// Returns a fresh, globally unique state identifier.
fn next_arg_id() -> usize {
    static ARG_IDS: AtomicUsize = AtomicUsize::new(0);
    ARG_IDS.fetch_add(1, Ordering::Relaxed)
}

/// Name of the branching variable of a state.
pub fn branch_var(arg_id: usize) -> Var {
    Var::new(format!("__branch_{}", arg_id), Typ::Bool)
}

/// A state of a nested analysis run.
#[derive(Debug, Clone)]
pub struct ReachedState {
    /// Globally unique identifier, survives copies across reached sets.
    arg_id: usize,
    location: Loc,
    parents: Vec<StateId>,
    children: Vec<StateId>,
    /// True if a block begins at this state, the run does not expand it.
    block_start: bool,
    /// Path formula from the seed of the run to this state.
    path: PathFormula,
    /// Guard of the edge leading to this state, if that edge is a guard.
    condition: Option<Expr>,
}
impl ReachedState {
    /// Globally unique identifier.
    pub fn arg_id(&self) -> usize {
        self.arg_id
    }
    /// Control-flow location.
    pub fn location(&self) -> Loc {
        self.location
    }
    /// Parents in the run.
    pub fn parents(&self) -> &[StateId] {
        &self.parents
    }
    /// Children in the run.
    pub fn children(&self) -> &[StateId] {
        &self.children
    }
    /// True if a block begins at this state.
    pub fn is_block_start(&self) -> bool {
        self.block_start
    }
    /// Path formula from the seed of the run to this state.
    pub fn path(&self) -> &PathFormula {
        &self.path
    }
    /// Guard of the edge leading to this state.
    pub fn condition(&self) -> Option<&Expr> {
        self.condition.as_ref()
    }
}

/// Arena of the states of a run.
#[derive(Debug, Clone, Default)]
pub struct Reached {
    states: Vec<ReachedState>,
    /// Seed states.
    initial: Vec<StateId>,
}
impl Reached {
    /// Empty reached set.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        arg_id: usize,
        location: Loc,
        path: PathFormula,
        condition: Option<Expr>,
        block_start: bool,
    ) -> StateId {
        let id = self.states.len();
        self.states.push(ReachedState {
            arg_id,
            location,
            parents: vec![],
            children: vec![],
            block_start,
            path,
            condition,
        });
        id
    }

    /// Adds a seed state.
    pub fn add_initial(&mut self, location: Loc, path: PathFormula) -> StateId {
        let id = self.push(next_arg_id(), location, path, None, false);
        self.initial.push(id);
        id
    }
    /// Adds a successor of `parent`.
    pub fn add_child(
        &mut self,
        parent: StateId,
        location: Loc,
        path: PathFormula,
        condition: Option<Expr>,
        block_start: bool,
    ) -> StateId {
        let id = self.push(next_arg_id(), location, path, condition, block_start);
        self.add_edge(parent, id);
        id
    }
    /// Merges a path into an existing state, `parent` becomes one of its parents.
    ///
    /// The path of the state becomes the disjunction of its path and `path`. Its guard is dropped
    /// if `condition` is a different one.
    pub fn merge_into(
        &mut self,
        parent: StateId,
        state: StateId,
        path: &PathFormula,
        condition: Option<Expr>,
    ) {
        let target = &mut self.states[state];
        target.path = target.path.merge(path);
        if target.condition != condition {
            target.condition = None
        }
        self.add_edge(parent, state);
    }
    /// Adds a copy of a state of some other reached set, without its links.
    ///
    /// The copy keeps the identifier of the original.
    pub fn add_copy(&mut self, state: &ReachedState, initial: bool) -> StateId {
        let id = self.push(
            state.arg_id,
            state.location,
            state.path.clone(),
            state.condition.clone(),
            state.block_start,
        );
        if initial {
            self.initial.push(id)
        }
        id
    }
    /// Links two states.
    pub fn add_edge(&mut self, parent: StateId, child: StateId) {
        if !self.states[parent].children.contains(&child) {
            self.states[parent].children.push(child);
        }
        if !self.states[child].parents.contains(&parent) {
            self.states[child].parents.push(parent);
        }
    }

    /// State accessor.
    ///
    /// Panics if `id` does not belong to this reached set.
    pub fn state(&self, id: StateId) -> &ReachedState {
        &self.states[id]
    }
    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }
    /// True if there are no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
    /// Iterator over the states.
    pub fn iter(&self) -> impl Iterator<Item = (StateId, &ReachedState)> {
        self.states.iter().enumerate()
    }
    /// Seed states.
    pub fn initial_states(&self) -> &[StateId] {
        &self.initial
    }
    /// States where a block begins.
    pub fn block_starts(&self) -> impl Iterator<Item = StateId> + '_ {
        self.iter()
            .filter(|(_, state)| state.block_start)
            .map(|(id, _)| id)
    }

    /// Seeds `start` descends from.
    ///
    /// Reverse walk from `start`, stops at seeds and at other block starts.
    pub fn ancestors_in(&self, start: StateId, seeds: &Set<StateId>) -> Set<StateId> {
        let mut res = Set::new();
        let mut visited = Set::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if seeds.contains(&id) {
                res.insert(id);
                continue;
            }
            if id != start && self.states[id].block_start {
                continue;
            }
            stack.extend(self.states[id].parents.iter().copied())
        }
        res
    }

    /// Path from `from` down to `to`, following `branching` at branching states.
    ///
    /// `branching` maps the [`ReachedState::arg_id`] of a branching state to `true` if the path
    /// takes its first child, `false` if it takes its second one. States it does not mention try all
    /// their children.
    pub fn path_between(
        &self,
        from: StateId,
        to: StateId,
        branching: &Map<usize, bool>,
    ) -> Option<Vec<StateId>> {
        let mut path = vec![from];
        let mut visited = Set::new();
        if self.extend_path(to, branching, &mut path, &mut visited) {
            Some(path)
        } else {
            None
        }
    }
    fn extend_path(
        &self,
        to: StateId,
        branching: &Map<usize, bool>,
        path: &mut Vec<StateId>,
        visited: &mut Set<StateId>,
    ) -> bool {
        let current = match path.last() {
            Some(current) => *current,
            None => return false,
        };
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            return false;
        }
        let state = &self.states[current];
        let children: &[StateId] = match branching.get(&state.arg_id) {
            Some(first) if state.children.len() >= 2 => {
                let idx = if *first { 0 } else { 1 };
                &state.children[idx..=idx]
            }
            _ => &state.children,
        };
        for child in children {
            path.push(*child);
            if self.extend_path(to, branching, path, visited) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// Branching formula: for each state with several children, its branching variable is
    /// equivalent to the guard leading to its first child.
    pub fn branching_formula(&self) -> Expr {
        let mut parts = vec![];
        for state in &self.states {
            if state.children.len() < 2 {
                continue;
            }
            let first = &self.states[state.children[0]];
            if let Some(cond) = &first.condition {
                parts.push(Expr::iff(
                    Expr::Var(branch_var(state.arg_id)),
                    cond.clone(),
                ))
            }
        }
        Expr::and(parts)
    }
}
