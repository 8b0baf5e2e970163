//! SMT queries of the PDR engine.

crate::prelude!();

use std::{cmp::Reverse, time::Instant};

use super::{
    frames::FrameSet,
    options::{ConnectingBlockPolicy, PdrOptions},
    precision::{CartesianAbstraction, PredicatePrecisionManager},
    stats::PdrStats,
};
use crate::{
    cfa::Loc,
    trans::TransitionSystem,
    transition::{Block, ForwardTransition},
};

/// A set of states at a single program location.
///
/// `formula` is the (possibly abstract) description of the states, `concrete` a concrete state it
/// contains. Both are over the unprimed context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatesWithLocation {
    formula: Expr,
    location: Loc,
    concrete: Expr,
}
impl StatesWithLocation {
    /// Constructor.
    pub fn new(formula: Expr, location: Loc, concrete: Expr) -> Self {
        Self {
            formula,
            location,
            concrete,
        }
    }
    /// States formula.
    pub fn formula(&self) -> &Expr {
        &self.formula
    }
    /// Location of the states.
    pub fn location(&self) -> Loc {
        self.location
    }
    /// Concrete state.
    pub fn concrete(&self) -> &Expr {
        &self.concrete
    }
}
impl fmt::Display for StatesWithLocation {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} @{}", self.formula, self.location)
    }
}

/// Outcome of a consecution query, or a CTI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsecutionResult {
    /// The states are inductive relative to the frame, carries a generalization of the states
    /// that is still inductive.
    Inductive(StatesWithLocation),
    /// A lifted predecessor outside the states that reaches them.
    Predecessor(StatesWithLocation),
}
impl ConsecutionResult {
    /// True on success.
    pub fn is_inductive(&self) -> bool {
        matches!(self, Self::Inductive(_))
    }
    /// The states carried.
    pub fn states(&self) -> &StatesWithLocation {
        match self {
            Self::Inductive(states) | Self::Predecessor(states) => states,
        }
    }
    /// Owned version of [`Self::states`].
    pub fn into_states(self) -> StatesWithLocation {
        match self {
            Self::Inductive(states) | Self::Predecessor(states) => states,
        }
    }
}

/// Name of the `idx`-th activation literal.
fn activation_literal(idx: usize) -> Expr {
    Expr::Var(Var::new(format!("__act_{}", idx), Typ::Bool))
}

/// The query engine.
///
/// Frames are owned by the caller and passed to each query.
pub struct PdrSmt<'a, S: Solver> {
    solver: &'a S,
    transition: &'a dyn TransitionSystem,
    forward: &'a dyn ForwardTransition,
    precision: PredicatePrecisionManager<'a, S>,
    options: PdrOptions,
    stats: PdrStats,
    shutdown: ShutdownNotifier,
}
impl<'a, S: Solver> PdrSmt<'a, S> {
    /// Constructor.
    ///
    /// Fails if the options require interpolation and the solver cannot produce interpolants.
    pub fn new(
        solver: &'a S,
        transition: &'a dyn TransitionSystem,
        forward: &'a dyn ForwardTransition,
        options: PdrOptions,
    ) -> Res<Self> {
        if !solver.supports_interpolation() {
            if options.use_abstraction && options.use_lifting {
                return Err(Error::unsupported(
                    "abstract lifting requires a solver with interpolation",
                )
                .into());
            }
            if options.double_check_consecution {
                return Err(Error::unsupported(
                    "double-checked consecution requires a solver with interpolation",
                )
                .into());
            }
        }
        let precision = PredicatePrecisionManager::new(
            solver,
            transition,
            Box::new(CartesianAbstraction::new(solver)),
            &options,
        );
        Ok(Self {
            solver,
            transition,
            forward,
            precision,
            options,
            stats: PdrStats::default(),
            shutdown: ShutdownNotifier::new(),
        })
    }
    /// Makes the engine interruptible through a notifier.
    pub fn with_shutdown(mut self, shutdown: ShutdownNotifier) -> Self {
        self.precision = self.precision.with_shutdown(shutdown.clone());
        self.shutdown = shutdown;
        self
    }

    /// Options.
    pub fn options(&self) -> &PdrOptions {
        &self.options
    }
    /// Statistics.
    pub fn stats(&self) -> &PdrStats {
        &self.stats
    }
    /// Predicate precision.
    pub fn precision(&self) -> &PredicatePrecisionManager<'a, S> {
        &self.precision
    }

    /// Looks for a state in the last frame with a successor violating the property.
    ///
    /// The predecessor is lifted and abstracted before being returned as a
    /// [`ConsecutionResult::Predecessor`]. Returns `None` if there is no such state.
    pub fn get_cti(&mut self, frames: &dyn FrameSet) -> Res<Option<ConsecutionResult>> {
        self.shutdown.check()?;
        self.stats.cti_queries += 1;
        let level = frames.max_level();
        let trans = self.transition.transition_relation().clone();
        let not_safety_primed =
            self.transition
                .as_primed(&Expr::not(self.transition.safety_property().clone()));

        let pred = {
            let mut prover = self.solver.new_prover()?;
            for clause in frames.states(level)? {
                prover.push(&clause)?;
            }
            prover.push(&trans)?;
            prover.push(&not_safety_primed)?;
            if prover.is_unsat()? {
                debug!("no CTI at level {}", level);
                return Ok(None);
            }
            self.satisfying_state(&prover.model()?)?
        };
        self.stats.ctis += 1;
        debug!("CTI at level {}: {}", level, pred.concrete());

        let target = self.target_location_for(&pred)?;
        let lifted =
            self.abstract_lift(pred.formula(), &not_safety_primed, pred.location(), target)?;
        if self.options.check_postconditions && !self.cti_ok(frames, &lifted)? {
            return Err(Error::invariant(format!(
                "lifted CTI {} has no successor violating the property",
                lifted
            ))
            .into());
        }
        Ok(Some(ConsecutionResult::Predecessor(StatesWithLocation::new(
            lifted,
            pred.location(),
            pred.concrete().clone(),
        ))))
    }

    /// Checks whether `F_level ∧ ¬s ∧ T ∧ s'` is unsatisfiable, where `s` are `states`.
    ///
    /// On success, returns a generalization of the states that is still inductive relative to
    /// `F_level` and excludes the initial states. Otherwise returns a lifted predecessor.
    pub fn consecution(
        &mut self,
        frames: &dyn FrameSet,
        level: usize,
        states: &StatesWithLocation,
    ) -> Res<ConsecutionResult> {
        self.shutdown.check()?;
        let start = Instant::now();
        let res = if self.options.double_check_consecution {
            self.double_checked_consecution(frames, level, states)
        } else {
            self.plain_consecution(frames, level, states)
        };
        self.stats.consecution_time.record(start.elapsed());
        let res = res?;
        if let ConsecutionResult::Inductive(generalized) = &res {
            let check = self.options.check_postconditions;
            if check && !self.consecution_ok(frames, level, generalized.formula())? {
                return Err(Error::invariant(format!(
                    "generalized states {} are not inductive relative to F_{}",
                    generalized, level
                ))
                .into());
            }
        }
        Ok(res)
    }

    /// True if `states` intersect the initial states.
    pub fn is_initial(&self, states: &Expr) -> Res<bool> {
        let init = self
            .transition
            .as_unprimed(self.transition.initial_condition());
        Ok(!self
            .solver
            .is_unsat(&Expr::and(vec![init, states.clone()]))?)
    }

    fn plain_consecution(
        &mut self,
        frames: &dyn FrameSet,
        level: usize,
        states: &StatesWithLocation,
    ) -> Res<ConsecutionResult> {
        let formula = states.formula();
        let mut prover = self.solver.new_prover()?;
        for clause in frames.states(level)? {
            prover.push(&clause)?;
        }
        prover.push(self.transition.transition_relation())?;
        prover.push(&Expr::not(formula.clone()))?;
        prover.push(&self.transition.as_primed(formula))?;

        if prover.is_unsat()? {
            self.stats.successful_consecutions += 1;
            let generalized = self.generalize(formula, &mut prover)?;
            return Ok(ConsecutionResult::Inductive(StatesWithLocation::new(
                generalized,
                states.location(),
                states.concrete().clone(),
            )));
        }

        self.stats.failed_consecutions += 1;
        let pred = self.satisfying_state(&prover.model()?)?;
        drop(prover);
        self.predecessor_of(pred, formula, states.location())
    }

    fn double_checked_consecution(
        &mut self,
        frames: &dyn FrameSet,
        level: usize,
        states: &StatesWithLocation,
    ) -> Res<ConsecutionResult> {
        let transition = self.transition;
        let concrete = states.concrete();
        let mut abstraction = states.formula().clone();
        let trans = transition.transition_relation();

        let mut concr_prover = self.solver.new_interpolating_prover()?;
        let mut abstr_prover = self.solver.new_prover()?;
        let mut a_part = vec![];
        for clause in frames.states(level)? {
            abstr_prover.push(&clause)?;
            a_part.push(concr_prover.push(&clause)?);
        }
        abstr_prover.push(trans)?;
        a_part.push(concr_prover.push(trans)?);
        abstr_prover.push(&Expr::not(abstraction.clone()))?;
        a_part.push(concr_prover.push(&Expr::not(concrete.clone()))?);
        abstr_prover.push(&self.transition.as_primed(&abstraction))?;
        concr_prover.push(&self.transition.as_primed(concrete))?;

        if !abstr_prover.is_unsat()? {
            if !concr_prover.is_unsat()? {
                self.stats.failed_consecutions += 1;
                let pred = self.satisfying_state(&concr_prover.model()?)?;
                drop(concr_prover);
                drop(abstr_prover);
                return self.predecessor_of(pred, concrete, states.location());
            }

            // Abstraction too coarse, `¬I` separates `s'` from the frame's successors.
            self.stats.consecution_refinements += 1;
            let interpolant = concr_prover.interpolant(&a_part)?;
            abstraction = self
                .precision
                .refine_and_compute_abstraction(concrete, &Expr::not(interpolant))?;
            abstr_prover.pop()?;
            abstr_prover.pop()?;
            abstr_prover.push(&Expr::not(abstraction.clone()))?;
            abstr_prover.push(&self.transition.as_primed(&abstraction))?;
            if !abstr_prover.is_unsat()? {
                return Err(Error::invariant(format!(
                    "abstraction {} is still not inductive after refinement",
                    abstraction
                ))
                .into());
            }
        }

        self.stats.successful_consecutions += 1;
        let generalized = self.generalize(&abstraction, &mut abstr_prover)?;
        Ok(ConsecutionResult::Inductive(StatesWithLocation::new(
            generalized,
            states.location(),
            concrete.clone(),
        )))
    }

    /// Generalizes inductive states, the last two formulas on `prover` are `¬s` and `s'`.
    fn generalize<P: Prover>(&mut self, states: &Expr, prover: &mut P) -> Res<Expr> {
        let primed = self.transition.as_primed(states);
        let reduced = self.reduce_by_unsat_core(&primed, prover)?;
        let reduced = self.transition.as_unprimed(&reduced);
        self.drop_literals(&reduced, prover, true)
    }

    /// Result of a failed consecution query for a predecessor of `successors`.
    fn predecessor_of(
        &mut self,
        pred: StatesWithLocation,
        successors: &Expr,
        location: Loc,
    ) -> Res<ConsecutionResult> {
        if self.is_initial(pred.formula())? {
            debug!("initial predecessor {}", pred.concrete());
            return Ok(ConsecutionResult::Predecessor(pred));
        }
        let lifted = self.abstract_lift(pred.formula(), successors, pred.location(), location)?;
        Ok(ConsecutionResult::Predecessor(StatesWithLocation::new(
            lifted,
            pred.location(),
            pred.concrete().clone(),
        )))
    }

    /// Concrete state of a model, over the unprimed context.
    ///
    /// Variables the model does not mention take their primed value if any, their type's default
    /// value otherwise.
    fn satisfying_state(&self, model: &Model) -> Res<StatesWithLocation> {
        let pc = self.transition.program_counter_name();
        let primed = self.transition.primed_context();
        let mut lits = vec![];
        let mut location = None;
        for (name, idx, ctype) in self.transition.unprimed_context().iter() {
            let var = Var::new_at(name, ctype.typ(), idx);
            let val = match model.value(&var) {
                Some(val) => val.clone(),
                None => primed
                    .var(name)
                    .and_then(|var| model.value(&var).cloned())
                    .unwrap_or_else(|| Cst::default_of(ctype.typ())),
            };
            if name == pc {
                location = val.as_int().and_then(|id| self.transition.node_for_id(id));
                if location.is_none() {
                    return Err(Error::invariant(format!(
                        "program counter value {} is not a location",
                        val
                    ))
                    .into());
                }
            }
            lits.push(Expr::eq(Expr::Var(var), Expr::Cst(val)))
        }
        let location = location.ok_or_else(|| {
            Error::invariant(format!("model has no value for program counter `{}`", pc))
        })?;
        let state = Expr::and(lits);
        Ok(StatesWithLocation::new(state.clone(), location, state))
    }

    /// Target location a state can reach in one block.
    ///
    /// Among several target blocks leaving the state's location, picks the first one whose formula
    /// the concrete state satisfies. Fails with an invariant violation if there is none.
    pub fn target_location_for(&self, states: &StatesWithLocation) -> Res<Loc> {
        let targets = self.transition.target_locations();
        let candidates: Vec<_> = self
            .forward
            .blocks_from(states.location())?
            .into_iter()
            .filter(|block| targets.contains(&block.successor_location()))
            .collect();
        if let [block] = candidates.as_slice() {
            return Ok(block.successor_location());
        }
        for block in &candidates {
            let query = Expr::and(vec![states.concrete().clone(), block.formula().clone()]);
            if !self.solver.is_unsat(&query)? {
                return Ok(block.successor_location());
            }
        }
        Err(Error::invariant(format!(
            "state at {} cannot reach a target location in one block",
            states.location()
        ))
        .into())
    }

    /// Block from `pred` to `succ` the nondet variables of a lifting query come from.
    ///
    /// With [`ConnectingBlockPolicy::MostDisjuncts`], the first block with the most disjuncts.
    pub fn connecting_block(&self, pred: Loc, succ: Loc) -> Res<Option<Block>> {
        let mut blocks = self
            .forward
            .blocks_from(pred)?
            .into_iter()
            .filter(|block| block.successor_location() == succ);
        Ok(match self.options.connecting_block_policy {
            ConnectingBlockPolicy::MostDisjuncts => {
                blocks.min_by_key(|block| Reverse(block.disjunct_count()))
            }
            ConnectingBlockPolicy::First => blocks.next(),
        })
    }

    /// Variables nondeterministically assigned by the block from `pred` to `succ`.
    fn nondet_variables(&self, pred: Loc, succ: Loc) -> Res<Set<String>> {
        Ok(self
            .connecting_block(pred, succ)?
            .map(|block| {
                block
                    .unconstrained_nondet_vars()
                    .into_iter()
                    .map(|var| var.id().to_string())
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Lifts a concrete predecessor of `successors` to a set of states that all reach
    /// `successors`, abstracted over the current predicates.
    fn abstract_lift(
        &mut self,
        concrete: &Expr,
        successors: &Expr,
        pred: Loc,
        succ: Loc,
    ) -> Res<Expr> {
        if !self.options.use_lifting {
            return Ok(concrete.clone());
        }
        let start = Instant::now();
        let res = if self.options.use_abstraction {
            self.lift_with_abstraction(concrete, successors, pred, succ)
        } else {
            self.lift_without_abstraction(concrete, successors)
        };
        self.stats.lifting_time.record(start.elapsed());
        let (lifted, successors) = res?;
        if let Some(successors) = successors {
            if self.options.check_postconditions && !self.lift_ok(&lifted, &successors)? {
                return Err(Error::invariant(format!(
                    "lifted states {} are initial or have successors outside {}",
                    lifted, successors
                ))
                .into());
            }
        }
        Ok(lifted)
    }

    /// Concrete lifting.
    ///
    /// Returns the lifted states and the successors they were lifted against, `None` if `concrete`
    /// could not be lifted.
    fn lift_without_abstraction(
        &mut self,
        concrete: &Expr,
        successors: &Expr,
    ) -> Res<(Expr, Option<Expr>)> {
        let mut prover = self.solver.new_prover()?;
        prover.push(self.transition.transition_relation())?;
        prover.push(&self.transition.as_primed(&Expr::not(successors.clone())))?;
        prover.push(concrete)?;
        if !prover.is_unsat()? {
            self.stats.failed_lifts += 1;
            return Ok((concrete.clone(), None));
        }
        self.stats.successful_lifts += 1;
        let reduced = self.reduce_by_unsat_core(concrete, &mut prover)?;
        let lifted = self.drop_literals(&reduced, &mut prover, false)?;
        Ok((lifted, Some(successors.clone())))
    }

    /// Abstract lifting, see [`Self::lift_without_abstraction`].
    ///
    /// Without nondeterministic variables, the successors are those given. Otherwise the literals
    /// of `successors` over the variables the connecting block assigns nondeterministically are
    /// ignored.
    fn lift_with_abstraction(
        &mut self,
        concrete: &Expr,
        successors: &Expr,
        pred: Loc,
        succ: Loc,
    ) -> Res<(Expr, Option<Expr>)> {
        let transition = self.transition;
        let trans = transition.transition_relation();
        let mut abstraction = self.precision.compute_abstraction(concrete)?;
        let mut successors = successors.clone();
        let mut not_succ_primed = self.transition.as_primed(&Expr::not(successors.clone()));

        let mut concr_prover = self.solver.new_interpolating_prover()?;
        let mut abstr_prover = self.solver.new_prover()?;
        concr_prover.push(trans)?;
        abstr_prover.push(trans)?;
        concr_prover.push(&not_succ_primed)?;
        abstr_prover.push(&not_succ_primed)?;
        let mut a_part = concr_prover.push(concrete)?;
        abstr_prover.push(&abstraction)?;

        let mut concrete_unsat = concr_prover.is_unsat()?;
        if !concrete_unsat && self.options.remove_nondet_variables {
            let nondet = self.nondet_variables(pred, succ)?;
            if !nondet.is_empty() {
                let filtered = successors.filter_literals(|lit| {
                    lit.var_names().iter().all(|name| !nondet.contains(*name))
                });
                trace!("ignoring nondet variables {:?}: {}", nondet, filtered);
                successors = filtered;
                not_succ_primed = self.transition.as_primed(&Expr::not(successors.clone()));
                concr_prover.pop()?;
                concr_prover.pop()?;
                concr_prover.push(&not_succ_primed)?;
                a_part = concr_prover.push(concrete)?;
                abstr_prover.pop()?;
                abstr_prover.pop()?;
                abstr_prover.push(&not_succ_primed)?;
                abstr_prover.push(&abstraction)?;
                concrete_unsat = concr_prover.is_unsat()?;
            }
        }
        if !concrete_unsat && self.options.accept_unlifted_abstraction {
            self.stats.unlifted_abstractions += 1;
            debug!("cannot lift {}, keeping abstraction {}", concrete, abstraction);
            return Ok((abstraction, None));
        }

        if abstr_prover.is_unsat()? {
            self.stats.successful_lifts += 1;
        } else {
            self.stats.failed_lifts += 1;
            if !concrete_unsat {
                return Err(Error::invariant(format!(
                    "cannot refine abstraction {}, concrete state {} does not lift",
                    abstraction, concrete
                ))
                .into());
            }
            let interpolant = concr_prover.interpolant(&[a_part])?;
            abstraction = self
                .precision
                .refine_and_compute_abstraction(concrete, &interpolant)?;
            abstr_prover.pop()?;
            abstr_prover.push(&abstraction)?;
            if !abstr_prover.is_unsat()? {
                return Err(Error::invariant(format!(
                    "abstraction {} still does not lift after refinement",
                    abstraction
                ))
                .into());
            }
        }
        drop(concr_prover);

        let reduced = self.reduce_by_unsat_core(&abstraction, &mut abstr_prover)?;
        let lifted = self.drop_literals(&reduced, &mut abstr_prover, false)?;
        Ok((lifted, Some(successors)))
    }

    /// Shrinks `formula` to the conjuncts an unsat core uses.
    ///
    /// `formula` is the last formula on `prover` and the stack is unsatisfiable. The reduced
    /// formula replaces it on the stack unless it intersects the initial states, in which case
    /// `formula` is kept.
    fn reduce_by_unsat_core<P: Prover>(&mut self, formula: &Expr, prover: &mut P) -> Res<Expr> {
        if !self.options.use_unsat_core {
            return Ok(formula.clone());
        }
        let mut conjuncts: Vec<Expr> = vec![];
        for conj in formula.conjuncts() {
            if !conjuncts.contains(conj) {
                conjuncts.push(conj.clone())
            }
        }
        let activation: Vec<Expr> = (0..conjuncts.len()).map(activation_literal).collect();

        prover.pop()?;
        for (act, conj) in activation.iter().zip(&conjuncts) {
            prover.push(&Expr::iff(act.clone(), conj.clone()))?;
        }
        let core = prover
            .unsat_core_over_assumptions(&activation)?
            .ok_or_else(|| Error::invariant(format!("no unsat core for {}", formula)))?;
        let reduced = Expr::and(
            activation
                .iter()
                .zip(&conjuncts)
                .filter(|(act, _)| core.contains(*act))
                .map(|(_, conj)| conj.clone()),
        );
        let res = if self.is_initial(&self.transition.as_unprimed(&reduced))? {
            formula.clone()
        } else {
            if core.len() < conjuncts.len() {
                self.stats.unsat_core_reductions += 1;
                trace!("unsat core: {} -> {}", formula, reduced)
            }
            reduced
        };
        for _ in &conjuncts {
            prover.pop()?
        }
        prover.push(&res)?;
        Ok(res)
    }

    /// Tries to drop literals of an unprimed `formula` while keeping the stack unsatisfiable.
    ///
    /// In consecution mode the last two formulas on `prover` are `¬s` and `s'`, otherwise the last
    /// one is `s`. Candidates intersecting the initial states are not tried.
    fn drop_literals<P: Prover>(
        &mut self,
        formula: &Expr,
        prover: &mut P,
        consecution: bool,
    ) -> Res<Expr> {
        if !self.options.drop_literals {
            return Ok(formula.clone());
        }
        let mut remaining: Vec<Expr> = vec![];
        for conj in formula.conjuncts() {
            if !remaining.contains(conj) {
                remaining.push(conj.clone())
            }
        }
        let (mut attempts, mut dropped, mut idx) = (0, 0, 0);
        while attempts < self.options.max_attempts_at_dropping_literals
            && dropped < self.options.max_literals_to_drop
            && idx < remaining.len()
        {
            self.shutdown.check()?;
            attempts += 1;
            let candidate = Expr::and(
                remaining
                    .iter()
                    .enumerate()
                    .filter(|(cnt, _)| *cnt != idx)
                    .map(|(_, lit)| lit.clone()),
            );
            if self.is_initial(&candidate)? {
                idx += 1;
                continue;
            }
            self.replace_states(prover, &candidate, consecution)?;
            if prover.is_unsat()? {
                trace!("dropped {}", remaining[idx]);
                remaining.remove(idx);
                dropped += 1;
            } else {
                self.replace_states(prover, &Expr::and(remaining.iter().cloned()), consecution)?;
                idx += 1;
            }
        }
        self.stats.dropped_literals += dropped;
        Ok(Expr::and(remaining))
    }

    fn replace_states<P: Prover>(
        &self,
        prover: &mut P,
        states: &Expr,
        consecution: bool,
    ) -> Res<()> {
        if consecution {
            prover.pop()?;
            prover.pop()?;
            prover.push(&Expr::not(states.clone()))?;
            prover.push(&self.transition.as_primed(states))?;
        } else {
            prover.pop()?;
            prover.push(states)?;
        }
        Ok(())
    }

    /// `F_max ∧ lifted ∧ T ∧ ¬P'` is satisfiable.
    fn cti_ok(&self, frames: &dyn FrameSet, lifted: &Expr) -> Res<bool> {
        let mut parts = frames.states(frames.max_level())?;
        parts.push(lifted.clone());
        parts.push(self.transition.transition_relation().clone());
        parts.push(
            self.transition
                .as_primed(&Expr::not(self.transition.safety_property().clone())),
        );
        Ok(!self.solver.is_unsat(&Expr::and(parts))?)
    }

    /// `F_level ∧ ¬s ∧ T ∧ s'` is unsatisfiable and `s` excludes the initial states.
    fn consecution_ok(&self, frames: &dyn FrameSet, level: usize, states: &Expr) -> Res<bool> {
        if self.is_initial(states)? {
            return Ok(false);
        }
        let mut parts = frames.states(level)?;
        parts.push(self.transition.transition_relation().clone());
        parts.push(Expr::not(states.clone()));
        parts.push(self.transition.as_primed(states));
        self.solver.is_unsat(&Expr::and(parts))
    }

    /// `lifted` excludes the initial states and `lifted ∧ T ∧ ¬successors'` is unsatisfiable.
    fn lift_ok(&self, lifted: &Expr, successors: &Expr) -> Res<bool> {
        if self.is_initial(lifted)? {
            return Ok(false);
        }
        let query = Expr::and(vec![
            lifted.clone(),
            self.transition.transition_relation().clone(),
            self.transition.as_primed(&Expr::not(successors.clone())),
        ]);
        self.solver.is_unsat(&query)
    }
}
