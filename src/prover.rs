//! Prover sessions and solver backends.
//!
//! The engine only talks to solvers through the [`Solver`] factory and the [`Prover`] /
//! [`InterpolatingProver`] sessions it creates. Sessions follow an incremental stack discipline:
//! every [`Prover::push`] asserts one formula in a new scope and returns a [`PushId`] that
//! identifies it for interpolation.

crate::prelude!();

pub mod finite;
pub mod z3;


/// Identifies a formula pushed on a prover's stack.
pub type PushId = usize;

/// A model, maps instantiated variables to values.
///
/// Models can be partial: a solver may not report values for variables it did not need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    values: Map<Var, Cst>,
}
impl Model {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of a variable.
    pub fn insert(&mut self, var: Var, val: Cst) {
        self.values.insert(var, val);
    }
    /// Value of a variable, if any.
    pub fn value(&self, var: &Var) -> Option<&Cst> {
        self.values.get(var)
    }
    /// Iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Cst)> {
        self.values.iter()
    }
    /// Number of variables with a value.
    pub fn len(&self) -> usize {
        self.values.len()
    }
    /// True if the model has no value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Evaluates a formula, `None` if the model does not determine its value.
    pub fn eval(&self, expr: &Expr) -> Option<Cst> {
        expr.eval(&|var| self.values.get(var).cloned())
    }
}
impl fmt::Display for Model {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{{")?;
        for (cnt, (var, val)) in self.values.iter().enumerate() {
            if cnt > 0 {
                write!(fmt, ",")?;
            }
            write!(fmt, " {} = {}", var, val)?;
        }
        write!(fmt, " }}")
    }
}
impl FromIterator<(Var, Cst)> for Model {
    fn from_iter<I: IntoIterator<Item = (Var, Cst)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// An incremental prover session.
///
/// Sessions are released when dropped.
pub trait Prover {
    /// Opens a new scope and asserts `formula` in it.
    fn push(&mut self, formula: &Expr) -> Res<PushId>;
    /// Closes the last scope.
    fn pop(&mut self) -> Res<()>;
    /// Number of open scopes.
    fn size(&self) -> usize;

    /// True if the conjunction of the formulas on the stack is unsatisfiable.
    fn is_unsat(&mut self) -> Res<bool>;
    /// True if the formulas on the stack and `assumptions` are unsatisfiable together.
    fn is_unsat_assuming(&mut self, assumptions: &[Expr]) -> Res<bool>;
    /// Model of the last satisfiable check.
    fn model(&mut self) -> Res<Model>;

    /// Subset of `assumptions` the stack is unsatisfiable with, `None` if it is satisfiable with
    /// all of them.
    ///
    /// The default implementation minimizes by deletion over [`Self::is_unsat_assuming`].
    fn unsat_core_over_assumptions(&mut self, assumptions: &[Expr]) -> Res<Option<Vec<Expr>>> {
        if !self.is_unsat_assuming(assumptions)? {
            return Ok(None);
        }
        let mut core = assumptions.to_vec();
        let mut idx = 0;
        while idx < core.len() {
            let candidate: Vec<Expr> = core
                .iter()
                .enumerate()
                .filter(|(cnt, _)| *cnt != idx)
                .map(|(_, lit)| lit.clone())
                .collect();
            if self.is_unsat_assuming(&candidate)? {
                core = candidate
            } else {
                idx += 1
            }
        }
        Ok(Some(core))
    }
}

/// A prover session able to produce Craig interpolants.
pub trait InterpolatingProver: Prover {
    /// Interpolant of an unsatisfiable stack.
    ///
    /// Formulas whose ids are in `ids` form the `A` part, the rest of the stack is `B`. The result
    /// `I` is over the variables `A` and `B` share, `A ⇒ I`, and `I ∧ B` is unsatisfiable.
    fn interpolant(&mut self, ids: &[PushId]) -> Res<Expr>;
}

/// Solver factory.
pub trait Solver {
    /// Plain prover sessions.
    type Prover: Prover;
    /// Interpolating prover sessions.
    type Interpolating: InterpolatingProver;

    /// Opens a plain session.
    fn new_prover(&self) -> Res<Self::Prover>;
    /// Opens an interpolating session.
    fn new_interpolating_prover(&self) -> Res<Self::Interpolating>;
    /// False if interpolating sessions cannot actually produce interpolants.
    fn supports_interpolation(&self) -> bool;

    /// One-shot unsatisfiability check.
    fn is_unsat(&self, formula: &Expr) -> Res<bool> {
        let mut prover = self.new_prover()?;
        prover.push(formula)?;
        prover.is_unsat()
    }
    /// True if `lhs` implies `rhs`.
    fn implies(&self, lhs: &Expr, rhs: &Expr) -> Res<bool> {
        self.is_unsat(&Expr::and(vec![lhs.clone(), Expr::not(rhs.clone())]))
    }
}
