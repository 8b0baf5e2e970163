//! Pure-Rust prover over bounded domains.
//!
//! Integer variables range over a fixed interval `[lo, hi]`, booleans over `{false, true}`.
//! Satisfiability is decided by a depth-first search over assignments with three-valued evaluation
//! pruning and propagation of top-level equalities. Rational variables are not supported.
//!
//! Interpolants are computed by projection: the projection of `A` onto the shared variables, or the
//! negation of the projection of `B`, whichever has fewer minterms. Both are valid interpolants
//! over the bounded domain.

crate::prelude!();

use super::{InterpolatingProver, Model, Prover, PushId, Solver};

/// Number of minterms under which a projection is accepted without trying the other side.
const SMALL_PROJECTION: usize = 8;

/// Bounded-domain solver factory.
///
/// # Examples
///
/// ```rust
/// # use ctigar::{build_expr, prover::{Solver, Prover, finite::FiniteSolver}};
/// let solver = FiniteSolver::new(0, 5);
/// let mut prover = solver.new_prover().unwrap();
/// prover.push(&build_expr!((= (x@1: int) (+ (y@1: int) 4)))).unwrap();
/// assert!(!prover.is_unsat().unwrap());
/// prover.push(&build_expr!((> (y@1: int) 1))).unwrap();
/// assert!(prover.is_unsat().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct FiniteSolver {
    domain: Domain,
}
impl FiniteSolver {
    /// Constructor, integers range over `[lo, hi]`.
    pub fn new(lo: i64, hi: i64) -> Self {
        Self {
            domain: Domain {
                lo,
                hi: hi.max(lo),
                max_minterms: 4096,
                shutdown: ShutdownNotifier::new(),
            },
        }
    }
    /// Makes the search interruptible through a notifier.
    pub fn with_shutdown(mut self, shutdown: ShutdownNotifier) -> Self {
        self.domain.shutdown = shutdown;
        self
    }
    /// Sets the maximal number of minterms of an interpolant.
    pub fn with_max_minterms(mut self, max: usize) -> Self {
        self.domain.max_minterms = max;
        self
    }

    /// Integer bounds.
    pub fn bounds(&self) -> (i64, i64) {
        (self.domain.lo, self.domain.hi)
    }

    fn prover(&self) -> FiniteProver {
        FiniteProver {
            domain: self.domain.clone(),
            stack: vec![],
            model: None,
        }
    }
}
impl Solver for FiniteSolver {
    type Prover = FiniteProver;
    type Interpolating = FiniteProver;

    fn new_prover(&self) -> Res<FiniteProver> {
        Ok(self.prover())
    }
    fn new_interpolating_prover(&self) -> Res<FiniteProver> {
        Ok(self.prover())
    }
    fn supports_interpolation(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
struct Domain {
    lo: i64,
    hi: i64,
    max_minterms: usize,
    shutdown: ShutdownNotifier,
}

/// Partial assignment.
type Assignment = HashMap<Var, Cst>;

/// A bounded-domain session.
#[derive(Debug, Clone)]
pub struct FiniteProver {
    domain: Domain,
    stack: Vec<Expr>,
    /// Model of the last satisfiable check.
    model: Option<Model>,
}
impl FiniteProver {
    fn check(&mut self, extra: &[Expr]) -> Res<bool> {
        let constraints: Vec<&Expr> = self.stack.iter().chain(extra).collect();
        let mut search = Search::new(constraints, &[], &self.domain)?;
        let mut asg = Assignment::new();
        let sat = search.solve(0, &mut asg)?;
        trace!(
            "finite search: {} after {} step(s)",
            if sat { "sat" } else { "unsat" },
            search.steps
        );
        self.model = if sat {
            Some(asg.into_iter().collect())
        } else {
            None
        };
        Ok(!sat)
    }
}
impl Prover for FiniteProver {
    fn push(&mut self, formula: &Expr) -> Res<PushId> {
        let id = self.stack.len();
        self.stack.push(formula.clone());
        Ok(id)
    }
    fn pop(&mut self) -> Res<()> {
        if self.stack.pop().is_none() {
            bail!("trying to pop an empty prover stack")
        }
        Ok(())
    }
    fn size(&self) -> usize {
        self.stack.len()
    }

    fn is_unsat(&mut self) -> Res<bool> {
        self.check(&[])
    }
    fn is_unsat_assuming(&mut self, assumptions: &[Expr]) -> Res<bool> {
        self.check(assumptions)
    }
    fn model(&mut self) -> Res<Model> {
        self.model
            .clone()
            .ok_or_else(|| Error::solver("no model available, last check was not satisfiable").into())
    }
}
impl InterpolatingProver for FiniteProver {
    fn interpolant(&mut self, ids: &[PushId]) -> Res<Expr> {
        let (mut a, mut b) = (vec![], vec![]);
        for (id, formula) in self.stack.iter().enumerate() {
            if ids.contains(&id) {
                a.push(formula)
            } else {
                b.push(formula)
            }
        }
        let (a_vars, b_vars) = (vars_of(&a), vars_of(&b));
        let shared: Vec<Var> = a_vars.intersection(&b_vars).cloned().collect();

        {
            let mut search = Search::new(a.iter().chain(&b).copied().collect(), &[], &self.domain)?;
            if search.solve(0, &mut Assignment::new())? {
                return Err(Error::invariant("interpolant requested on a satisfiable stack").into());
            }
        }

        let a_first = a_vars.len() <= b_vars.len();
        let (first, second) = if a_first { (&a, &b) } else { (&b, &a) };
        let project = |side: &Vec<&Expr>| -> Res<Option<Vec<Assignment>>> {
            let mut search = Search::new(side.clone(), &shared, &self.domain)?;
            search.project(shared.len())
        };

        let first_proj = project(first)?;
        let (use_first, proj) = match first_proj {
            Some(proj) if proj.len() <= SMALL_PROJECTION => (true, proj),
            first_proj => match (first_proj, project(second)?) {
                (Some(fst), Some(snd)) if snd.len() < fst.len() => (false, snd),
                (Some(fst), _) => (true, fst),
                (None, Some(snd)) => (false, snd),
                (None, None) => {
                    return Err(Error::solver(format!(
                        "interpolant over {} shared variable(s) exceeds {} minterms",
                        shared.len(),
                        self.domain.max_minterms
                    ))
                    .into())
                }
            },
        };

        let disj = Expr::or(proj.into_iter().map(cube));
        let interpolant = if use_first == a_first {
            disj
        } else {
            Expr::not(disj)
        };
        debug!("interpolant over {} shared variable(s): {}", shared.len(), interpolant);
        Ok(interpolant)
    }
}

fn vars_of(formulas: &[&Expr]) -> Set<Var> {
    formulas
        .iter()
        .flat_map(|f| f.vars().into_iter().cloned())
        .collect()
}

/// Conjunction of the equalities of an assignment.
fn cube(asg: Assignment) -> Expr {
    let mut lits: Vec<(Var, Cst)> = asg.into_iter().collect();
    lits.sort();
    Expr::and(lits.into_iter().map(|(var, val)| match val {
        Cst::B(true) => Expr::Var(var),
        Cst::B(false) => Expr::not(Expr::Var(var)),
        val => Expr::eq(Expr::Var(var), Expr::Cst(val)),
    }))
}

/// Depth-first search state.
struct Search<'a> {
    constraints: Vec<&'a Expr>,
    /// Variables in assignment order.
    vars: Vec<Var>,
    domain: &'a Domain,
    steps: usize,
}
impl<'a> Search<'a> {
    /// Constructor, the variables of `first` come first in the assignment order.
    fn new(formulas: Vec<&'a Expr>, first: &[Var], domain: &'a Domain) -> Res<Self> {
        let mut constraints: Vec<&'a Expr> = formulas.into_iter().flat_map(Expr::conjuncts).collect();
        constraints.sort_by_key(|c| c.vars().len());

        let mut vars: Vec<Var> = first.to_vec();
        let mut known: Set<Var> = first.iter().cloned().collect();
        for c in &constraints {
            for var in c.vars() {
                if var.typ() == Typ::Rat {
                    return Err(Error::unsupported(format!(
                        "rational variable `{}` in bounded-domain search",
                        var
                    ))
                    .into());
                }
                if known.insert(var.clone()) {
                    vars.push(var.clone())
                }
            }
        }

        Ok(Self {
            constraints,
            vars,
            domain,
            steps: 0,
        })
    }

    fn tick(&mut self) -> Res<()> {
        self.steps += 1;
        if self.steps % 1024 == 0 {
            self.domain.shutdown.check()?
        }
        Ok(())
    }

    /// `Some(false)` if a constraint is falsified, `Some(true)` if all hold, `None` otherwise.
    fn status(&self, asg: &Assignment) -> Option<bool> {
        let model = |var: &Var| asg.get(var).cloned();
        let mut all_true = true;
        for c in &self.constraints {
            match c.eval(&model).and_then(|v| v.as_bool()) {
                Some(false) => return Some(false),
                Some(true) => (),
                None => all_true = false,
            }
        }
        if all_true {
            Some(true)
        } else {
            None
        }
    }

    /// Values to try for `var`.
    fn candidates(&self, var: &Var, asg: &Assignment) -> Vec<Cst> {
        if var.typ() == Typ::Bool {
            return vec![Cst::B(false), Cst::B(true)];
        }
        let model = |v: &Var| asg.get(v).cloned();
        for c in &self.constraints {
            if let Expr::App { op: Op::Eq, args } = c {
                if args.len() != 2 {
                    continue;
                }
                let other = match (&args[0], &args[1]) {
                    (Expr::Var(v), other) if v == var => other,
                    (other, Expr::Var(v)) if v == var => other,
                    _ => continue,
                };
                if let Some(Cst::I(val)) = other.eval(&model) {
                    let in_range = Int::from(self.domain.lo) <= val && val <= Int::from(self.domain.hi);
                    return if in_range { vec![Cst::I(val)] } else { vec![] };
                }
            }
        }
        (self.domain.lo..=self.domain.hi).map(Cst::int).collect()
    }

    /// Looks for a satisfying extension of `asg` assigning variables from `depth` on.
    ///
    /// On success, `asg` is the model.
    fn solve(&mut self, depth: usize, asg: &mut Assignment) -> Res<bool> {
        self.tick()?;
        match self.status(asg) {
            Some(sat) => return Ok(sat),
            None => (),
        }
        let var = match self.vars.get(depth) {
            Some(var) => var.clone(),
            None => {
                return Err(Error::solver(
                    "bounded-domain search cannot decide a fully assigned formula",
                )
                .into())
            }
        };
        for val in self.candidates(&var, asg) {
            asg.insert(var.clone(), val);
            if self.solve(depth + 1, asg)? {
                return Ok(true);
            }
        }
        asg.remove(&var);
        Ok(false)
    }

    /// Enumerates the projection of the constraints on the first `n_shared` variables.
    ///
    /// Returns `None` if the projection has more minterms than allowed.
    fn project(&mut self, n_shared: usize) -> Res<Option<Vec<Assignment>>> {
        let mut res = vec![];
        let mut asg = Assignment::new();
        if self.enumerate(0, n_shared, &mut asg, &mut res)? {
            Ok(Some(res))
        } else {
            Ok(None)
        }
    }
    fn enumerate(
        &mut self,
        depth: usize,
        n_shared: usize,
        asg: &mut Assignment,
        res: &mut Vec<Assignment>,
    ) -> Res<bool> {
        self.tick()?;
        match self.status(asg) {
            Some(false) => return Ok(true),
            Some(true) => {
                res.push(asg.clone());
                return Ok(res.len() <= self.domain.max_minterms);
            }
            None => (),
        }
        if depth >= n_shared {
            let mut completion = asg.clone();
            if self.solve(depth, &mut completion)? {
                res.push(asg.clone());
            }
            return Ok(res.len() <= self.domain.max_minterms);
        }
        let var = self.vars[depth].clone();
        for val in self.candidates(&var, asg) {
            asg.insert(var.clone(), val);
            if !self.enumerate(depth + 1, n_shared, asg, res)? {
                return Ok(false);
            }
        }
        asg.remove(&var);
        Ok(true)
    }
}
