//! Prover backend over z3, through [`rsmt2`].
//!
//! Variables are declared lazily, in the scope of the first formula mentioning them, and forgotten
//! when that scope is popped. This backend does not produce interpolants.

crate::prelude!();

use std::path::PathBuf;

use super::{InterpolatingProver, Model, Prover, PushId, Solver};

/// Parser for z3's answers.
///
/// Identifiers are split on `@` to recover SSA indices; values z3 reports that are not constants
/// (algebraic numbers, arrays...) are kept as strings.
#[derive(Debug, Clone, Copy)]
pub struct Parser;

impl<'a> rsmt2::parse::IdentParser<(String, Option<Index>), Typ, &'a str> for Parser {
    fn parse_ident(self, input: &'a str) -> SmtRes<(String, Option<Index>)> {
        let input = input.trim().trim_matches('|');
        let mut subs = input.rsplitn(2, '@');
        let last = subs
            .next()
            .ok_or_else(|| format!("unexpected model variable `{}`", input))?;
        match (subs.next(), last.parse::<Index>()) {
            (Some(name), Ok(idx)) => Ok((name.into(), Some(idx))),
            _ => Ok((input.into(), None)),
        }
    }
    fn parse_type(self, input: &'a str) -> SmtRes<Typ> {
        match input {
            "Bool" => Ok(Typ::Bool),
            "Int" => Ok(Typ::Int),
            "Real" => Ok(Typ::Rat),
            _ => bail!("unexpected type string `{}`", input),
        }
    }
}
impl<'a, Br: std::io::BufRead>
    rsmt2::parse::ModelParser<
        (String, Option<Index>),
        Typ,
        Either<Cst, String>,
        &'a mut RSmtParser<Br>,
    > for Parser
{
    fn parse_value(
        self,
        input: &'a mut RSmtParser<Br>,
        _: &(String, Option<Index>),
        _: &[((String, Option<Index>), Typ)],
        typ: &Typ,
    ) -> SmtRes<Either<Cst, String>> {
        let sexpr = input.get_sexpr()?;
        match parse_cst(sexpr, *typ) {
            Some(cst) => Ok(Either::Left(cst)),
            None => Ok(Either::Right(sexpr.into())),
        }
    }
}

/// Parses a constant as printed by z3.
fn parse_cst(sexpr: &str, typ: Typ) -> Option<Cst> {
    let sexpr = sexpr.trim();
    if let Some(inner) = sexpr
        .strip_prefix("(-")
        .and_then(|s| s.strip_suffix(')'))
    {
        return match parse_cst(inner, typ)? {
            Cst::I(i) => Some(Cst::I(-i)),
            Cst::R(r) => Some(Cst::R(-r)),
            Cst::B(_) => None,
        };
    }
    if let Some(inner) = sexpr
        .strip_prefix("(/")
        .and_then(|s| s.strip_suffix(')'))
    {
        let mut elems = inner.split_whitespace();
        let num = parse_rat(elems.next()?)?;
        let den = parse_rat(elems.next()?)?;
        if den.is_zero() || elems.next().is_some() {
            return None;
        }
        return Some(Cst::R(num / den));
    }
    match (sexpr, typ) {
        ("true", Typ::Bool) => Some(Cst::B(true)),
        ("false", Typ::Bool) => Some(Cst::B(false)),
        (_, Typ::Int) => sexpr.parse::<Int>().ok().map(Cst::I),
        (_, Typ::Rat) => parse_rat(sexpr).map(Cst::R),
        (_, Typ::Bool) => None,
    }
}

/// Parses a decimal rational `12`, `12.0` or `12.5`.
fn parse_rat(s: &str) -> Option<Rat> {
    match s.split_once('.') {
        None => s.parse::<Int>().ok().map(Rat::from_integer),
        Some((int, dec)) => {
            let den = num::pow(Int::from(10), dec.len());
            let num = format!("{}{}", int, dec).parse::<Int>().ok()?;
            Some(Rat::new(num, den))
        }
    }
}

/// z3 solver factory.
#[derive(Debug, Clone)]
pub struct Z3 {
    /// Solver configuration.
    conf: SmtConf,
    /// Optional file to log the SMT-LIB 2 traffic to.
    tee: Option<PathBuf>,
}
impl Z3 {
    /// Constructor from a command, the first token is the binary and the others are options.
    pub fn new(z3_cmd: impl Into<String>) -> Res<Self> {
        let z3_cmd = z3_cmd.into();
        let mut split_cmd = z3_cmd.split(|c: char| c.is_whitespace());
        let bin = split_cmd
            .next()
            .filter(|bin| !bin.is_empty())
            .ok_or_else(|| format!("illegal Z3 command `{}`", z3_cmd))?
            .trim();
        let mut conf = SmtConf::z3(bin);

        for opt in split_cmd {
            let opt = opt.trim();
            if !opt.is_empty() {
                conf.option(opt);
            }
        }
        Ok(Self::with_conf(conf))
    }
    /// Constructor from a configuration.
    pub fn with_conf(conf: SmtConf) -> Self {
        Self { conf, tee: None }
    }
    /// Logs all sessions to files in some directory, one file per session.
    pub fn tee(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tee = Some(dir.into());
        self
    }

    fn spawn(&self) -> Res<Z3Prover> {
        let mut solver = self
            .conf
            .clone()
            .spawn(Parser)
            .chain_err(|| "while spawning z3 solver")?;
        if let Some(dir) = &self.tee {
            let path = dir.join(format!("session_{}.smt2", next_session_id()));
            solver.path_tee(path)?
        }
        Ok(Z3Prover {
            solver,
            declared: vec![Set::new()],
            scopes: vec![],
        })
    }
}

fn next_session_id() -> usize {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static SESSIONS: AtomicUsize = AtomicUsize::new(0);
    SESSIONS.fetch_add(1, Ordering::Relaxed)
}

impl Solver for Z3 {
    type Prover = Z3Prover;
    type Interpolating = Z3Prover;

    fn new_prover(&self) -> Res<Z3Prover> {
        self.spawn()
    }
    fn new_interpolating_prover(&self) -> Res<Z3Prover> {
        self.spawn()
    }
    fn supports_interpolation(&self) -> bool {
        false
    }
}

/// A z3 session, the underlying process is killed when the session is dropped.
pub struct Z3Prover {
    solver: SmtSolver<Parser>,
    /// Variables declared in each scope, the first one is the global scope.
    declared: Vec<Set<Var>>,
    /// Formulas asserted in each scope.
    scopes: Vec<Expr>,
}
impl Z3Prover {
    fn is_declared(&self, var: &Var) -> bool {
        self.declared.iter().any(|scope| scope.contains(var))
    }

    fn declare_in_scope(&mut self, var: Var) {
        if let Some(scope) = self.declared.last_mut() {
            scope.insert(var);
        }
    }

    /// Declares the variables of `expr` not declared yet in the current scope.
    fn declare_vars_of(&mut self, expr: &Expr) -> Res<()> {
        let fresh: Vec<Var> = expr
            .vars()
            .into_iter()
            .filter(|var| !self.is_declared(var))
            .cloned()
            .collect();
        for var in fresh {
            self.solver
                .declare_const(&var, &var.typ())
                .chain_err(|| format!("while declaring variable `{}`", var))?;
            self.declare_in_scope(var);
        }
        Ok(())
    }
}
impl Prover for Z3Prover {
    fn push(&mut self, formula: &Expr) -> Res<PushId> {
        let id = self.scopes.len();
        self.solver.push(1)?;
        self.declared.push(Set::new());
        self.declare_vars_of(formula)?;
        self.solver
            .assert(formula)
            .chain_err(|| format!("while asserting `{}`", formula))?;
        self.scopes.push(formula.clone());
        Ok(id)
    }
    fn pop(&mut self) -> Res<()> {
        if self.scopes.pop().is_none() {
            bail!("trying to pop an empty prover stack")
        }
        self.declared.pop();
        self.solver.pop(1)?;
        Ok(())
    }
    fn size(&self) -> usize {
        self.scopes.len()
    }

    fn is_unsat(&mut self) -> Res<bool> {
        let sat = self.solver.check_sat().chain_err(|| "during check-sat")?;
        Ok(!sat)
    }
    fn is_unsat_assuming(&mut self, assumptions: &[Expr]) -> Res<bool> {
        let mut names = Vec::with_capacity(assumptions.len());
        for lit in assumptions {
            match lit.as_var() {
                Some(var) if var.typ() == Typ::Bool => {
                    if !self.is_declared(var) {
                        self.solver.declare_const(var, &Typ::Bool)?;
                        self.declare_in_scope(var.clone());
                    }
                    names.push(var.to_string())
                }
                _ => bail!("assumption `{}` is not a boolean variable", lit),
            }
        }
        let sat = self
            .solver
            .check_sat_assuming(names.iter())
            .chain_err(|| "during check-sat-assuming")?;
        Ok(!sat)
    }
    fn model(&mut self) -> Res<Model> {
        let model = self
            .solver
            .get_model()
            .chain_err(|| "while retrieving model")?;
        let mut res = Model::new();
        for ((id, idx), args, typ, val) in model {
            match (val, args.is_empty()) {
                (Either::Left(cst), true) => {
                    let var = match idx {
                        Some(idx) => Var::new_at(id, typ, idx),
                        None => Var::new(id, typ),
                    };
                    res.insert(var, cst)
                }
                (val, _) => {
                    let val = val.map_left(|c| c.to_string()).into_inner();
                    trace!("ignoring model entry `{}`: {}", id, val)
                }
            }
        }
        Ok(res)
    }
}
impl InterpolatingProver for Z3Prover {
    fn interpolant(&mut self, _: &[PushId]) -> Res<Expr> {
        Err(Error::unsupported("the z3 backend does not produce interpolants").into())
    }
}
