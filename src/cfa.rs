//! Control-flow automata and the nested block analysis over them.
//!
//! A [`Cfa`] is a graph of locations whose edges carry [`Statement`]s over typed program variables.
//! Some locations are *block heads*: the entry, the targets, the loop heads and any location marked
//! explicitly. [`BlockAnalysis`] explores the automaton from seed locations, forward or backward,
//! encoding each explored path as a [`PathFormula`], and stops at block heads. These stop states are
//! where the blocks of [`transition`] begin.

crate::prelude!();

use std::collections::VecDeque;

use transition::{Direction, Reached, ReachabilityAnalysis, StateId};


/// A control-flow location, also the value of the program counter at that location.
pub type Loc = usize;

/// Statement labeling an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Assignment of an expression over uninstantiated variables.
    Assign {
        /// Assigned variable.
        var: String,
        /// Assigned value.
        expr: Expr,
    },
    /// Nondeterministic assignment.
    Nondet {
        /// Assigned variable.
        var: String,
    },
    /// Guard over uninstantiated variables.
    Assume(Expr),
}
impl Statement {
    /// Assignment constructor.
    pub fn assign(var: impl Into<String>, expr: Expr) -> Self {
        Self::Assign {
            var: var.into(),
            expr,
        }
    }
    /// Nondeterministic assignment constructor.
    pub fn nondet(var: impl Into<String>) -> Self {
        Self::Nondet { var: var.into() }
    }
    /// Guard constructor.
    pub fn assume(cond: Expr) -> Self {
        Self::Assume(cond)
    }

    /// Names of the variables the statement mentions.
    fn var_names(&self) -> Set<&str> {
        match self {
            Self::Assign { var, expr } => {
                let mut names = expr.var_names();
                names.insert(var.as_str());
                names
            }
            Self::Nondet { var } => Some(var.as_str()).into_iter().collect(),
            Self::Assume(cond) => cond.var_names(),
        }
    }
}
impl fmt::Display for Statement {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Assign { var, expr } => write!(fmt, "{} := {}", var, expr),
            Self::Nondet { var } => write!(fmt, "{} := *", var),
            Self::Assume(cond) => write!(fmt, "[{}]", cond),
        }
    }
}

/// A labeled edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Source location.
    pub src: Loc,
    /// Destination location.
    pub dst: Loc,
    /// Label.
    pub stmt: Statement,
}
impl fmt::Display for Edge {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} -- {} --> {}", self.src, self.stmt, self.dst)
    }
}

/// A control-flow automaton.
///
/// # Examples
///
/// ```rust
/// # use ctigar::{build_expr, cfa::{Cfa, Statement}, ssa::CType};
/// // 0: while x < 10 { x := x + 1 } 1: error if x != 10
/// let mut cfa = Cfa::new(0);
/// cfa.declare("x", CType::int());
/// cfa.add_edge(0, 0, Statement::assume(build_expr!((< (x: int) 10)))).unwrap();
/// cfa.add_edge(0, 1, Statement::assume(build_expr!((>= (x: int) 10)))).unwrap();
/// cfa.add_edge(1, 2, Statement::assume(build_expr!((not (= (x: int) 10))))).unwrap();
/// cfa.add_target(2);
/// assert!(cfa.is_block_head(0));
/// assert!(!cfa.is_block_head(1));
/// assert!(cfa.is_block_head(2));
/// ```
#[derive(Debug, Clone)]
pub struct Cfa {
    /// Program variables.
    vars: Map<String, CType>,
    /// Entry location.
    entry: Loc,
    /// Target (error) locations.
    targets: Set<Loc>,
    /// All locations.
    locs: Set<Loc>,
    /// Edges.
    edges: Vec<Edge>,
    /// Locations marked as block heads explicitly.
    marked: Set<Loc>,
    /// Block heads, kept up to date on modification.
    block_heads: Set<Loc>,
}
impl Cfa {
    /// Constructor, an automaton with a single entry location.
    pub fn new(entry: Loc) -> Self {
        let mut res = Self {
            vars: Map::new(),
            entry,
            targets: Set::new(),
            locs: Some(entry).into_iter().collect(),
            edges: vec![],
            marked: Set::new(),
            block_heads: Set::new(),
        };
        res.update_block_heads();
        res
    }

    /// Declares a program variable.
    pub fn declare(&mut self, name: impl Into<String>, ctype: CType) {
        self.vars.insert(name.into(), ctype);
    }
    /// Adds an edge, fails if the statement mentions undeclared variables or is ill-typed.
    pub fn add_edge(&mut self, src: Loc, dst: Loc, stmt: Statement) -> Res<()> {
        for name in stmt.var_names() {
            if !self.vars.contains_key(name) {
                bail!("edge {} -> {} mentions undeclared variable `{}`", src, dst, name)
            }
        }
        match &stmt {
            Statement::Assign { var, expr } => {
                let typ = self.vars.get(var.as_str()).map(CType::typ);
                if typ != Some(expr.typ()) {
                    bail!(
                        "cannot assign `{}` of type {} to `{}`",
                        expr,
                        expr.typ(),
                        var
                    )
                }
            }
            Statement::Assume(cond) => {
                if cond.typ() != Typ::Bool {
                    bail!("non-boolean guard `{}`", cond)
                }
            }
            Statement::Nondet { .. } => (),
        }
        self.locs.insert(src);
        self.locs.insert(dst);
        self.edges.push(Edge { src, dst, stmt });
        self.update_block_heads();
        Ok(())
    }
    /// Registers a target location.
    pub fn add_target(&mut self, loc: Loc) {
        self.locs.insert(loc);
        self.targets.insert(loc);
        self.update_block_heads();
    }
    /// Forces a location to be a block head.
    pub fn mark_block_head(&mut self, loc: Loc) {
        self.locs.insert(loc);
        self.marked.insert(loc);
        self.update_block_heads();
    }

    /// Program variables.
    pub fn vars(&self) -> &Map<String, CType> {
        &self.vars
    }
    /// Type of a program variable.
    pub fn var_ctype(&self, name: &str) -> Option<&CType> {
        self.vars.get(name)
    }
    /// Entry location.
    pub fn entry(&self) -> Loc {
        self.entry
    }
    /// Target locations.
    pub fn targets(&self) -> &Set<Loc> {
        &self.targets
    }
    /// All locations.
    pub fn locations(&self) -> &Set<Loc> {
        &self.locs
    }
    /// Block heads.
    pub fn block_heads(&self) -> &Set<Loc> {
        &self.block_heads
    }
    /// True if `loc` is a block head.
    pub fn is_block_head(&self, loc: Loc) -> bool {
        self.block_heads.contains(&loc)
    }
    /// Edges.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
    /// Edges leaving a location.
    pub fn edges_from(&self, loc: Loc) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.src == loc)
    }
    /// Edges entering a location.
    pub fn edges_into(&self, loc: Loc) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.dst == loc)
    }

    /// SSA context where all program variables are at index `idx`.
    pub fn ssa_context(&self, idx: Index) -> SsaMap {
        let mut ssa = SsaMap::new();
        for (name, ctype) in &self.vars {
            ssa.set(name.clone(), ctype.clone(), idx)
        }
        ssa
    }

    /// Recomputes the block heads: entry, targets, marked locations and loop heads.
    ///
    /// Loop heads are the destinations of the back edges of a depth-first traversal from the entry.
    fn update_block_heads(&mut self) {
        let mut heads: Set<Loc> = self.targets.clone();
        heads.insert(self.entry);
        heads.extend(self.marked.iter().copied());

        // (location, index of the next edge to explore)
        let mut stack: Vec<(Loc, usize)> = vec![(self.entry, 0)];
        let mut on_stack: Set<Loc> = Some(self.entry).into_iter().collect();
        let mut visited: Set<Loc> = on_stack.clone();
        while let Some((loc, next)) = stack.pop() {
            let succ = self
                .edges
                .iter()
                .filter(|edge| edge.src == loc)
                .nth(next)
                .map(|edge| edge.dst);
            match succ {
                None => {
                    on_stack.remove(&loc);
                }
                Some(dst) => {
                    stack.push((loc, next + 1));
                    if on_stack.contains(&dst) {
                        heads.insert(dst);
                    } else if visited.insert(dst) {
                        on_stack.insert(dst);
                        stack.push((dst, 0));
                    }
                }
            }
        }
        self.block_heads = heads;
    }
}

/// Encodes an edge on top of a path formula.
///
/// Forward, assignments read the current indices and write fresh ones. Backward, the current
/// indices are the values *after* the edge: the assigned variable is written at its current index
/// and the right-hand side reads the fresh indices of the values before the edge.
///
/// Returns the new path formula and, for guards, the instantiated guard.
pub fn encode_edge(
    path: &PathFormula,
    edge: &Edge,
    ctype_of: impl Fn(&str) -> Option<CType>,
    direction: Direction,
) -> Res<(PathFormula, Option<Expr>)> {
    let mut next = path.clone();
    let res = match &edge.stmt {
        Statement::Assume(cond) => {
            let cond = ssa::instantiate(cond, path.ssa());
            (next.and(cond.clone()), Some(cond))
        }
        Statement::Assign { var, expr } => {
            let ctype = ctype_of(var).ok_or_else(|| format!("unknown variable `{}`", var))?;
            let constraint = match direction {
                Direction::Forward => {
                    let rhs = ssa::instantiate(expr, path.ssa());
                    let idx = next.ssa_mut().bump(var, &ctype);
                    Expr::eq(Expr::Var(Var::new_at(var.clone(), ctype.typ(), idx)), rhs)
                }
                Direction::Backward => {
                    let idx = path.ssa().index(var).unwrap_or(1);
                    let lhs = Expr::Var(Var::new_at(var.clone(), ctype.typ(), idx));
                    next.ssa_mut().bump(var, &ctype);
                    Expr::eq(lhs, ssa::instantiate(expr, next.ssa()))
                }
            };
            (next.and(constraint), None)
        }
        Statement::Nondet { var } => {
            let ctype = ctype_of(var).ok_or_else(|| format!("unknown variable `{}`", var))?;
            let before = path.ssa().index(var).unwrap_or(1);
            let after = next.ssa_mut().bump(var, &ctype);
            let assigned = match direction {
                Direction::Forward => after,
                Direction::Backward => before,
            };
            next.add_nondet(Var::new_at(var.clone(), ctype.typ(), assigned));
            (next, None)
        }
    };
    Ok(res)
}

/// Nested reachability analysis over a [`Cfa`], stops at block heads.
///
/// All the paths from a seed to the same block head end in a single state, whose path formula is
/// the disjunction of the paths.
#[derive(Debug, Clone)]
pub struct BlockAnalysis<'cfa> {
    cfa: &'cfa Cfa,
    direction: Direction,
    /// Maximal number of states of a run.
    max_states: usize,
}
impl<'cfa> BlockAnalysis<'cfa> {
    /// Default maximal number of states of a run.
    pub const DEFAULT_MAX_STATES: usize = 10_000;

    /// Backward analysis.
    pub fn backward(cfa: &'cfa Cfa) -> Self {
        Self::new(cfa, Direction::Backward)
    }
    /// Forward analysis.
    pub fn forward(cfa: &'cfa Cfa) -> Self {
        Self::new(cfa, Direction::Forward)
    }
    /// Constructor.
    pub fn new(cfa: &'cfa Cfa, direction: Direction) -> Self {
        Self {
            cfa,
            direction,
            max_states: Self::DEFAULT_MAX_STATES,
        }
    }
    /// Sets the maximal number of states of a run.
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    /// Underlying automaton.
    pub fn cfa(&self) -> &'cfa Cfa {
        self.cfa
    }
}
impl<'cfa> ReachabilityAnalysis for BlockAnalysis<'cfa> {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn run(&self, seeds: &[Loc], shutdown: &ShutdownNotifier) -> Res<Reached> {
        let mut reached = Reached::new();
        let mut waitlist = VecDeque::new();
        // seed each state descends from
        let mut origins: HashMap<StateId, StateId> = HashMap::new();
        // (seed, location) to the block start summarizing all paths from the seed to the location
        let mut starts: HashMap<(StateId, Loc), StateId> = HashMap::new();
        let init = PathFormula::new(Expr::tru(), self.cfa.ssa_context(1), Set::new());
        for seed in seeds {
            if !self.cfa.locations().contains(seed) {
                bail!("unknown location {}", seed)
            }
            let id = reached.add_initial(*seed, init.clone());
            origins.insert(id, id);
            waitlist.push_back(id);
        }

        while let Some(id) = waitlist.pop_front() {
            shutdown.check()?;
            if reached.len() > self.max_states {
                return Err(Error::solver(format!(
                    "nested analysis from {:?} exceeds {} states, \
                    is some cycle missing a block head?",
                    seeds, self.max_states
                ))
                .into());
            }

            let state = reached.state(id);
            let loc = state.location();
            let path = state.path().clone();
            let edges: Vec<&Edge> = match self.direction {
                Direction::Forward => self.cfa.edges_from(loc).collect(),
                Direction::Backward => self.cfa.edges_into(loc).collect(),
            };
            for edge in edges {
                let next_loc = match self.direction {
                    Direction::Forward => edge.dst,
                    Direction::Backward => edge.src,
                };
                let (next_path, condition) = encode_edge(
                    &path,
                    edge,
                    |name| self.cfa.var_ctype(name).cloned(),
                    self.direction,
                )?;
                let origin = origins.get(&id).copied().unwrap_or(id);
                if !self.cfa.is_block_head(next_loc) {
                    let child = reached.add_child(id, next_loc, next_path, condition, false);
                    origins.insert(child, origin);
                    waitlist.push_back(child);
                } else if let Some(start) = starts.get(&(origin, next_loc)) {
                    reached.merge_into(id, *start, &next_path, condition);
                } else {
                    let child = reached.add_child(id, next_loc, next_path, condition, true);
                    origins.insert(child, origin);
                    starts.insert((origin, next_loc), child);
                }
            }
        }

        debug!(
            "{:?} block analysis from {:?}: {} state(s)",
            self.direction,
            seeds,
            reached.len()
        );
        Ok(reached)
    }
}
