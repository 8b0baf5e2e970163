//! Predicate abstraction.
//!
//! Predicates are uninstantiated boolean atoms over the state variables. The program counter never
//! appears in a predicate, literals over it are kept as is by [`PredicatePrecisionManager`].

crate::prelude!();

use indexmap::IndexSet;

use super::{options::PdrOptions, stats::AbstractionStats};
use crate::trans::TransitionSystem;

/// An abstraction predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predicate {
    atom: Expr,
}
impl Predicate {
    /// Constructor, the atom is uninstantiated.
    pub fn new(atom: &Expr) -> Self {
        Self {
            atom: ssa::uninstantiate(atom),
        }
    }
    /// The atom of the predicate.
    pub fn atom(&self) -> &Expr {
        &self.atom
    }
}
impl fmt::Display for Predicate {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.atom.fmt(fmt)
    }
}

/// Predicates in insertion order.
pub type PredicateSet = IndexSet<Predicate>;

/// Computes abstractions over a set of predicates.
pub trait AbstractionOracle {
    /// Abstraction of an uninstantiated formula.
    ///
    /// The result is implied by `formula` and mentions only the atoms of `predicates`.
    fn compute_abstraction(&self, formula: &Expr, predicates: &PredicateSet) -> Res<Expr>;

    /// Predicate for an atom.
    fn predicate_for(&self, atom: &Expr) -> Predicate {
        Predicate::new(atom)
    }
    /// Predicates for all the atoms of a formula.
    fn predicates_for_atoms_of(&self, formula: &Expr) -> Vec<Predicate> {
        formula
            .atoms()
            .into_iter()
            .map(|atom| self.predicate_for(atom))
            .collect()
    }
}

/// Cartesian abstraction: the conjunction of the predicate literals a formula implies.
pub struct CartesianAbstraction<'a, S> {
    solver: &'a S,
}
impl<'a, S: Solver> CartesianAbstraction<'a, S> {
    /// Constructor.
    pub fn new(solver: &'a S) -> Self {
        Self { solver }
    }
}
impl<'a, S: Solver> AbstractionOracle for CartesianAbstraction<'a, S> {
    fn compute_abstraction(&self, formula: &Expr, predicates: &PredicateSet) -> Res<Expr> {
        let mut prover = self.solver.new_prover()?;
        prover.push(formula)?;
        if prover.is_unsat()? {
            return Ok(Expr::fls());
        }
        let mut lits = Vec::with_capacity(predicates.len());
        for pred in predicates {
            let atom = pred.atom();
            prover.push(&Expr::not(atom.clone()))?;
            let implied = prover.is_unsat()?;
            prover.pop()?;
            if implied {
                lits.push(atom.clone());
                continue;
            }
            prover.push(atom)?;
            let refuted = prover.is_unsat()?;
            prover.pop()?;
            if refuted {
                lits.push(Expr::not(atom.clone()))
            }
        }
        Ok(Expr::and(lits))
    }
}

/// Maintains the abstraction predicates and abstracts/refines states with them.
pub struct PredicatePrecisionManager<'a, S> {
    solver: &'a S,
    transition: &'a dyn TransitionSystem,
    oracle: Box<dyn AbstractionOracle + 'a>,
    predicates: PredicateSet,
    subsume: bool,
    threshold: usize,
    threshold_step: usize,
    stats: AbstractionStats,
    shutdown: ShutdownNotifier,
}
impl<'a, S: Solver> PredicatePrecisionManager<'a, S> {
    /// Constructor, seeds the predicates with the default ones.
    pub fn new(
        solver: &'a S,
        transition: &'a dyn TransitionSystem,
        oracle: Box<dyn AbstractionOracle + 'a>,
        options: &PdrOptions,
    ) -> Self {
        let mut slf = Self {
            solver,
            transition,
            oracle,
            predicates: PredicateSet::new(),
            subsume: options.subsume_redundant_predicates,
            threshold: options.initial_subsumption_threshold,
            threshold_step: options.subsumption_threshold_step,
            stats: AbstractionStats::default(),
            shutdown: ShutdownNotifier::new(),
        };
        for pred in slf.default_predicates() {
            if slf.predicates.insert(pred) {
                slf.stats.predicates_added += 1
            }
        }
        debug!("{} default predicate(s)", slf.predicates.len());
        slf
    }
    /// Makes subsumption interruptible.
    pub fn with_shutdown(mut self, shutdown: ShutdownNotifier) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// `v1 < v2` for all pairs of distinct comparable state variables, the program counter
    /// excluded.
    fn default_predicates(&self) -> Vec<Predicate> {
        let pc = self.transition.program_counter_name();
        let vars: Vec<(&str, &CType)> = self
            .transition
            .unprimed_context()
            .iter()
            .filter(|(name, _, _)| *name != pc)
            .map(|(name, _, ctype)| (name, ctype))
            .collect();
        let mut res = vec![];
        for (n1, t1) in &vars {
            for (n2, t2) in &vars {
                if n1 == n2 || !t1.comparable_with(t2) || !t1.typ().is_arith() {
                    continue;
                }
                res.push(Predicate::new(&Expr::lt(
                    Expr::Var(Var::new(*n1, t1.typ())),
                    Expr::Var(Var::new(*n2, t2.typ())),
                )))
            }
        }
        res
    }

    /// Current predicates.
    pub fn predicates(&self) -> &PredicateSet {
        &self.predicates
    }
    /// Statistics.
    pub fn stats(&self) -> &AbstractionStats {
        &self.stats
    }
    /// Current subsumption threshold.
    pub fn subsumption_threshold(&self) -> usize {
        self.threshold
    }

    /// Abstraction of a formula over the unprimed context.
    ///
    /// Literals over the program counter are kept as is, the rest of the formula is abstracted.
    pub fn compute_abstraction(&self, formula: &Expr) -> Res<Expr> {
        let pc = self.transition.program_counter_name();
        let base = ssa::uninstantiate(formula);
        let location = base.filter_literals(|lit| lit.mentions(pc));
        let rest = base.filter_literals(|lit| !lit.mentions(pc));
        let abstraction = self.oracle.compute_abstraction(&rest, &self.predicates)?;
        Ok(self
            .transition
            .as_unprimed(&Expr::and(vec![location, abstraction])))
    }

    /// Adds predicates from an interpolant, then abstracts `formula`.
    pub fn refine_and_compute_abstraction(
        &mut self,
        formula: &Expr,
        interpolant: &Expr,
    ) -> Res<Expr> {
        self.refine(interpolant)?;
        self.compute_abstraction(formula)
    }

    /// Adds the predicates of an interpolant.
    ///
    /// Literals over the program counter are ignored. Purely conjunctive parts contribute their
    /// atoms, arithmetic equalities split into two inequalities. Other parts become predicates as
    /// is, unless they mention the program counter: they then contribute their atoms that do not.
    pub fn refine(&mut self, interpolant: &Expr) -> Res<()> {
        self.stats.refinements += 1;
        let pc = self.transition.program_counter_name();
        let interpolant = ssa::uninstantiate(interpolant)
            .filter_literals(|lit| !(lit.is_literal() && lit.mentions(pc)));
        debug!("refining with {}", interpolant);
        let mut new = vec![];
        for part in interpolant.into_conjuncts() {
            if part.is_purely_conjunctive() {
                for split in part.split_numeral_equality() {
                    new.extend(self.oracle.predicates_for_atoms_of(&split))
                }
            } else if part.mentions(pc) {
                for atom in part.atoms().into_iter().filter(|atom| !atom.mentions(pc)) {
                    for split in atom.split_numeral_equality() {
                        new.push(self.oracle.predicate_for(&split))
                    }
                }
            } else {
                new.push(self.oracle.predicate_for(&part))
            }
        }
        for pred in new {
            self.add_predicate(pred)?
        }
        Ok(())
    }

    fn add_predicate(&mut self, pred: Predicate) -> Res<()> {
        if pred.atom().is_cst() {
            return Ok(());
        }
        if self.predicates.insert(pred) {
            self.stats.predicates_added += 1;
            if let Some(pred) = self.predicates.last() {
                trace!("new predicate {}", pred)
            }
            self.subsume_if_necessary()?
        }
        Ok(())
    }

    /// Removes predicates implied by others when there are more than the threshold.
    ///
    /// The threshold grows if the set is still too big afterwards.
    fn subsume_if_necessary(&mut self) -> Res<()> {
        if !self.subsume || self.predicates.len() <= self.threshold {
            return Ok(());
        }
        self.stats.subsumption_rounds += 1;
        let preds: Vec<Predicate> = self.predicates.iter().cloned().collect();
        let mut removed = vec![false; preds.len()];
        for i in 0..preds.len() {
            if removed[i] {
                continue;
            }
            for j in (i + 1)..preds.len() {
                if removed[j] {
                    continue;
                }
                self.shutdown.check()?;
                let (p1, p2) = (preds[i].atom(), preds[j].atom());
                if self.solver.implies(p1, p2)? {
                    removed[j] = true
                } else if self.solver.implies(p2, p1)? {
                    removed[i] = true;
                    break;
                }
            }
        }
        let before = self.predicates.len();
        let mut idx = 0;
        self.predicates.retain(|_| {
            idx += 1;
            !removed[idx - 1]
        });
        self.stats.subsumed_predicates += before - self.predicates.len();
        if self.predicates.len() > self.threshold {
            self.threshold += self.threshold_step;
        }
        debug!(
            "subsumption: {} -> {} predicate(s), threshold {}",
            before,
            self.predicates.len(),
            self.threshold
        );
        Ok(())
    }
}
