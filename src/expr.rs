//! Defines the expression structure used to represent formulas.
//!
//! All formulas handled by the engine are [`Expr`]s: frames, transition relations, abstract states,
//! interpolants and predicates. A [`Var`] is either *uninstantiated*, a plain program variable
//! `x`, or *instantiated* at some SSA [`Index`], printed `x@3`.

crate::prelude!();

use std::cmp::Ordering;

use rsmt2::print::{Expr2Smt, Sort2Smt, Sym2Smt};

#[cfg(test)]
mod test;

pub use crate::{build_expr as build, build_typ};

/// SSA index of an instantiated variable.
pub type Index = usize;

/// A type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Typ {
    /// Bool type.
    Bool,
    /// Integer type.
    Int,
    /// Rational type.
    Rat,
}
impl Typ {
    /// Creates a bool type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ctigar::expr::Typ;
    /// let bool_typ = Typ::bool();
    /// assert_eq!(&bool_typ.to_string(), "bool")
    /// ```
    pub fn bool() -> Self {
        Self::Bool
    }
    /// Creates an integer type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ctigar::expr::Typ;
    /// let int_typ = Typ::int();
    /// assert_eq!(&int_typ.to_string(), "int")
    /// ```
    pub fn int() -> Self {
        Self::Int
    }
    /// Creates a rational type.
    pub fn rat() -> Self {
        Self::Rat
    }

    /// True if the type is an arithmetic one.
    pub fn is_arith(self) -> bool {
        match self {
            Self::Bool => false,
            Self::Int | Self::Rat => true,
        }
    }
}
impl Sort2Smt for Typ {
    fn sort_to_smt2<W: Write>(&self, w: &mut W) -> SmtRes<()> {
        write!(
            w,
            "{}",
            match self {
                Self::Bool => "Bool",
                Self::Int => "Int",
                Self::Rat => "Real",
            }
        )?;
        Ok(())
    }
}

/// Constants.
///
/// Currently only booleans, integers and rationals are supported.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cst {
    /// Bool constant.
    B(bool),
    /// Integer constant.
    I(Int),
    /// Rational constant.
    R(Rat),
}
impl HasTyp for Cst {
    fn typ(&self) -> Typ {
        match self {
            Self::B(_) => Typ::Bool,
            Self::I(_) => Typ::Int,
            Self::R(_) => Typ::Rat,
        }
    }
}
impl Cst {
    /// Creates a boolean constant.
    pub fn bool(b: bool) -> Self {
        Cst::B(b)
    }
    /// Creates an integer constant.
    pub fn int<I: Into<Int>>(i: I) -> Self {
        Cst::I(i.into())
    }
    /// Creates a rational constant.
    pub fn rat<R: Into<Rat>>(r: R) -> Self {
        Cst::R(r.into())
    }

    /// Some value of a type, used to complete partial models.
    pub fn default_of(typ: Typ) -> Self {
        match typ {
            Typ::Bool => Self::B(false),
            Typ::Int => Self::I(Int::zero()),
            Typ::Rat => Self::R(Rat::zero()),
        }
    }

    /// Boolean value, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::B(b) => Some(*b),
            Self::I(_) | Self::R(_) => None,
        }
    }
    /// Integer value, if any.
    pub fn as_int(&self) -> Option<&Int> {
        match self {
            Self::I(i) => Some(i),
            Self::B(_) | Self::R(_) => None,
        }
    }

    /// Rational view of an arithmetic constant.
    fn to_rat(&self) -> Option<Rat> {
        match self {
            Self::I(i) => Some(Rat::from_integer(i.clone())),
            Self::R(r) => Some(r.clone()),
            Self::B(_) => None,
        }
    }

    /// Compares two arithmetic constants, `None` on booleans.
    pub fn arith_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::I(lft), Self::I(rgt)) => Some(lft.cmp(rgt)),
            (Self::B(_), _) | (_, Self::B(_)) => None,
            (lft, rgt) => Some(lft.to_rat()?.cmp(&rgt.to_rat()?)),
        }
    }
}
impl Expr2Smt<()> for Cst {
    fn expr_to_smt2<W: Write>(&self, w: &mut W, _: ()) -> SmtRes<()> {
        write!(w, "{}", self)?;
        Ok(())
    }
}

/// Operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Op {
    /// If-then-else.
    Ite,
    /// Implication, right-associative.
    Implies,
    /// Addition.
    Add,
    /// Subtraction, unary minus with one argument.
    Sub,
    /// Multiplication.
    Mul,
    /// Rational division.
    Div,
    /// Integer division.
    IDiv,
    /// Modulo.
    Mod,
    /// Greater or equal.
    Ge,
    /// Less or equal.
    Le,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Equality.
    Eq,
    /// Negation.
    Not,
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
}
impl Op {
    /// True if `self` is an arithmetic relation.
    pub fn is_arith_relation(self) -> bool {
        match self {
            Self::Ge | Self::Le | Self::Gt | Self::Lt => true,
            Self::Ite
            | Self::Implies
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::IDiv
            | Self::Mod
            | Self::Eq
            | Self::Not
            | Self::And
            | Self::Or => false,
        }
    }
    /// True if `self` is a relation, *i.e.* its applications are atoms.
    pub fn is_relation(self) -> bool {
        self == Self::Eq || self.is_arith_relation()
    }

    /// Minimal arity of `self`.
    pub fn min_arity(self) -> usize {
        match self {
            Self::Not | Self::Add | Self::Sub => 1,
            Self::Mod
            | Self::Mul
            | Self::Div
            | Self::IDiv
            | Self::And
            | Self::Or
            | Self::Implies
            | Self::Eq
            | Self::Le
            | Self::Lt
            | Self::Ge
            | Self::Gt => 2,
            Self::Ite => 3,
        }
    }

    /// Maximal arity for `self`, `None` if infinite.
    pub fn max_arity(self) -> Option<usize> {
        match self {
            Self::Not => Some(1),
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::And
            | Self::Or
            | Self::Implies
            | Self::Eq
            | Self::Le
            | Self::Lt
            | Self::Ge
            | Self::Gt => None,
            Self::Mod | Self::Div | Self::IDiv => Some(2),
            Self::Ite => Some(3),
        }
    }

    /// Type-checks an operator application.
    pub fn type_check(self, args: &[Expr]) -> Res<Typ> {
        if args.len() < self.min_arity() {
            bail!(
                "`{}` expects at least {} argument(s)",
                self,
                self.min_arity(),
            )
        }
        if let Some(max) = self.max_arity() {
            if args.len() > max {
                bail!("`{}` expects at most {} argument(s)", self, max)
            }
        }

        let typ = match self {
            Self::Ite => {
                let typ = args[0].typ();
                if typ != Typ::Bool {
                    bail!("expected first argument of type `bool`, got `{}`", typ)
                }

                let thn_typ = args[1].typ();
                let els_typ = args[2].typ();

                if thn_typ != els_typ {
                    bail!(
                        "`{}`'s second and third arguments should have the same type, got `{}` and `{}`",
                        self, thn_typ, els_typ,
                    )
                }

                thn_typ
            }
            Self::Implies | Self::And | Self::Or | Self::Not => {
                if args.iter().any(|e| e.typ() != Typ::Bool) {
                    bail!("`{}`'s arguments must all be boolean expressions", self)
                }
                Typ::Bool
            }

            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::IDiv
            | Self::Mod
            | Self::Le
            | Self::Ge
            | Self::Lt
            | Self::Gt => {
                let first = args[0].typ();
                if !first.is_arith() {
                    bail!(
                        "`{}`'s arguments must have an arithmetic type, unexpected type `{}`",
                        self,
                        first,
                    )
                }
                for typ in args[1..].iter().map(Expr::typ) {
                    if typ != first {
                        bail!(
                            "`{}`'s arguments must all have the same type, found `{}` and `{}`",
                            self,
                            first,
                            typ,
                        )
                    }
                }
                if (self == Self::IDiv || self == Self::Mod) && first != Typ::Int {
                    bail!(
                        "`{}` can only be applied to integer arguments, found `{}`",
                        self,
                        first,
                    )
                }
                self.result_typ(first)
            }

            Self::Eq => {
                let first = args[0].typ();
                for typ in args[1..].iter().map(Expr::typ) {
                    if typ != first {
                        bail!(
                            "`{}`'s arguments must all have the same type, found `{}` and `{}`",
                            self,
                            first,
                            typ,
                        )
                    }
                }
                Typ::Bool
            }
        };

        Ok(typ)
    }

    /// Type of an application given the type of its first argument, assuming it type-checks.
    fn result_typ(self, first: Typ) -> Typ {
        match self {
            Self::Div => Typ::Rat,
            Self::IDiv | Self::Mod => Typ::Int,
            Self::Add | Self::Sub | Self::Mul | Self::Ite => first,
            Self::Ge
            | Self::Le
            | Self::Gt
            | Self::Lt
            | Self::Eq
            | Self::Not
            | Self::And
            | Self::Or
            | Self::Implies => Typ::Bool,
        }
    }
}
impl Expr2Smt<()> for Op {
    fn expr_to_smt2<W: Write>(&self, w: &mut W, _: ()) -> SmtRes<()> {
        write!(w, "{}", self)?;
        Ok(())
    }
}

/// Trait implemented by everything that has a type.
pub trait HasTyp: fmt::Display {
    /// Type accessor.
    fn typ(&self) -> Typ;
}

/// A variable, possibly instantiated at some SSA index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var {
    /// Variable identifier.
    id: String,
    /// Type of the variable.
    typ: Typ,
    /// SSA index, `None` if uninstantiated.
    idx: Option<Index>,
}
impl Var {
    /// Uninstantiated variable constructor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ctigar::expr::{Var, Typ};
    /// let var = Var::new("cnt", Typ::Int);
    /// assert!(!var.is_instantiated());
    /// assert_eq!(&var.to_string(), "cnt");
    /// ```
    pub fn new<S: Into<String>>(id: S, typ: Typ) -> Self {
        Self {
            id: id.into(),
            typ,
            idx: None,
        }
    }
    /// Instantiated variable constructor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ctigar::expr::{Var, Typ};
    /// let var = Var::new_at("cnt", Typ::Int, 3);
    /// assert_eq!(var.idx(), Some(3));
    /// assert_eq!(&var.to_string(), "cnt@3");
    /// ```
    pub fn new_at<S: Into<String>>(id: S, typ: Typ, idx: Index) -> Self {
        Self {
            id: id.into(),
            typ,
            idx: Some(idx),
        }
    }

    /// Identifier accessor.
    pub fn id(&self) -> &str {
        &self.id
    }
    /// SSA index accessor.
    pub fn idx(&self) -> Option<Index> {
        self.idx
    }
    /// True if the variable carries an SSA index.
    pub fn is_instantiated(&self) -> bool {
        self.idx.is_some()
    }

    /// Same variable at some SSA index.
    pub fn at(&self, idx: Index) -> Self {
        Self::new_at(self.id.clone(), self.typ, idx)
    }
    /// Same variable without SSA index.
    pub fn uninstantiated(&self) -> Self {
        Self::new(self.id.clone(), self.typ)
    }
}
impl HasTyp for Var {
    fn typ(&self) -> Typ {
        self.typ
    }
}
impl Sym2Smt<()> for Var {
    fn sym_to_smt2<W: Write>(&self, w: &mut W, _: ()) -> SmtRes<()> {
        write!(w, "{}", self)?;
        Ok(())
    }
}

/// The expression structure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    /// A constant.
    Cst(Cst),
    /// A variable.
    Var(Var),
    /// An operator application.
    App {
        /// The operator.
        op: Op,
        /// The arguments.
        args: Vec<Expr>,
    },
}
impl Expr {
    /// Variable constructor.
    pub fn new_var(var: Var) -> Self {
        Self::Var(var)
    }

    /// Type-checked operator application constructor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ctigar::expr::{Expr, Var, Typ, Op};
    /// let x = Expr::new_var(Var::new("x", Typ::Int));
    /// let b = Expr::new_var(Var::new("b", Typ::Bool));
    /// assert!(Expr::new_op(Op::Lt, vec![x.clone(), 0.into()]).is_ok());
    /// assert!(Expr::new_op(Op::Lt, vec![x, b]).is_err());
    /// ```
    pub fn new_op(op: Op, args: Vec<Self>) -> Res<Self> {
        op.type_check(&args)?;
        Ok(Self::App { op, args })
    }

    /// `true`.
    pub fn tru() -> Self {
        Self::Cst(Cst::B(true))
    }
    /// `false`.
    pub fn fls() -> Self {
        Self::Cst(Cst::B(false))
    }
    /// Integer constant.
    pub fn int(i: impl Into<Int>) -> Self {
        Self::Cst(Cst::I(i.into()))
    }

    /// Conjunction, flattens nested conjunctions and simplifies constants.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ctigar::expr::Expr;
    /// # use ctigar::build_expr;
    /// let lhs = build_expr!((and (a: bool) (b: bool)));
    /// let rhs = build_expr!((c: bool));
    /// let conj = Expr::and(vec![lhs, Expr::tru(), rhs]);
    /// assert_eq!(&conj.to_string(), "(and a b c)");
    /// assert_eq!(Expr::and(vec![]), Expr::tru());
    /// ```
    pub fn and(args: impl IntoIterator<Item = Self>) -> Self {
        Self::flat_app(Op::And, args)
    }
    /// Disjunction, flattens nested disjunctions and simplifies constants.
    pub fn or(args: impl IntoIterator<Item = Self>) -> Self {
        Self::flat_app(Op::Or, args)
    }

    /// Flat conjunction/disjunction.
    fn flat_app(op: Op, args: impl IntoIterator<Item = Self>) -> Self {
        let (neutral, absorbing) = if op == Op::And {
            (true, false)
        } else {
            (false, true)
        };
        let mut flat: Vec<Self> = vec![];
        let mut stack: Vec<Self> = args.into_iter().collect();
        stack.reverse();
        while let Some(arg) = stack.pop() {
            match arg {
                Self::Cst(Cst::B(b)) if b == neutral => (),
                Self::Cst(Cst::B(b)) if b == absorbing => return Self::from(absorbing),
                Self::App { op: sub_op, args } if sub_op == op => {
                    stack.extend(args.into_iter().rev())
                }
                arg => {
                    if !flat.contains(&arg) {
                        flat.push(arg)
                    }
                }
            }
        }
        match flat.len() {
            0 => Self::from(neutral),
            1 => flat.pop().unwrap_or_else(|| Self::from(neutral)),
            _ => Self::App { op, args: flat },
        }
    }

    /// Negation, removes double negations and negates constants.
    pub fn not(expr: Self) -> Self {
        match expr {
            Self::Cst(Cst::B(b)) => Self::from(!b),
            Self::App { op: Op::Not, mut args } if args.len() == 1 => {
                args.pop().unwrap_or_else(Self::tru)
            }
            expr => Self::App {
                op: Op::Not,
                args: vec![expr],
            },
        }
    }

    /// Binary application helper.
    fn bin(op: Op, lft: Self, rgt: Self) -> Self {
        Self::App {
            op,
            args: vec![lft, rgt],
        }
    }
    /// Equality.
    pub fn eq(lft: Self, rgt: Self) -> Self {
        Self::bin(Op::Eq, lft, rgt)
    }
    /// Boolean equivalence.
    pub fn iff(lft: Self, rgt: Self) -> Self {
        Self::bin(Op::Eq, lft, rgt)
    }
    /// Strict less-than.
    pub fn lt(lft: Self, rgt: Self) -> Self {
        Self::bin(Op::Lt, lft, rgt)
    }
    /// Less-or-equal.
    pub fn le(lft: Self, rgt: Self) -> Self {
        Self::bin(Op::Le, lft, rgt)
    }
    /// Greater-or-equal.
    pub fn ge(lft: Self, rgt: Self) -> Self {
        Self::bin(Op::Ge, lft, rgt)
    }
    /// Addition.
    pub fn add(lft: Self, rgt: Self) -> Self {
        Self::bin(Op::Add, lft, rgt)
    }
    /// Implication.
    pub fn implies(lft: Self, rgt: Self) -> Self {
        Self::bin(Op::Implies, lft, rgt)
    }

    /// True if `self` is a constant.
    pub fn is_cst(&self) -> bool {
        matches!(self, Self::Cst(_))
    }
    /// True if `self` is the constant `true`.
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Cst(Cst::B(true)))
    }
    /// Variable accessor.
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Self::Var(var) => Some(var),
            Self::Cst(_) | Self::App { .. } => None,
        }
    }

    /// Top-level conjuncts of `self`, nested conjunctions are flattened.
    ///
    /// The conjuncts of `true` are empty, any other non-conjunction is its own single conjunct.
    pub fn conjuncts(&self) -> Vec<&Self> {
        self.flat_args(Op::And)
    }
    /// Owned version of [`Self::conjuncts`].
    pub fn into_conjuncts(self) -> Vec<Self> {
        match self {
            Self::Cst(Cst::B(true)) => vec![],
            Self::App { op: Op::And, args } => {
                args.into_iter().flat_map(Self::into_conjuncts).collect()
            }
            expr => vec![expr],
        }
    }
    /// Top-level disjuncts of `self`, nested disjunctions are flattened.
    pub fn disjuncts(&self) -> Vec<&Self> {
        self.flat_args(Op::Or)
    }
    fn flat_args(&self, op: Op) -> Vec<&Self> {
        let neutral = op == Op::And;
        let mut res = vec![];
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Self::Cst(Cst::B(b)) if *b == neutral => (),
                Self::App { op: sub_op, args } if *sub_op == op => {
                    stack.extend(args.iter().rev())
                }
                expr => res.push(expr),
            }
        }
        res
    }

    /// True if `self` is an atom: a boolean variable/constant or a relation application.
    pub fn is_atom(&self) -> bool {
        match self {
            Self::Cst(cst) => cst.typ() == Typ::Bool,
            Self::Var(var) => var.typ() == Typ::Bool,
            Self::App { op, .. } => op.is_relation(),
        }
    }
    /// True if `self` is an atom or the negation of an atom.
    pub fn is_literal(&self) -> bool {
        match self {
            Self::App { op: Op::Not, args } => args.len() == 1 && args[0].is_atom(),
            expr => expr.is_atom(),
        }
    }
    /// True if `self` is a conjunction of literals.
    pub fn is_purely_conjunctive(&self) -> bool {
        self.conjuncts().into_iter().all(Self::is_literal)
    }

    /// Atoms appearing in the boolean structure of `self`.
    pub fn atoms(&self) -> Set<&Self> {
        let mut res = Set::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            if expr.is_atom() {
                if !expr.is_cst() {
                    res.insert(expr);
                }
                continue;
            }
            if let Self::App { args, .. } = expr {
                stack.extend(args.iter().filter(|arg| arg.typ() == Typ::Bool))
            }
        }
        res
    }

    /// Conjunction of the top-level conjuncts of `self` that verify `keep`.
    pub fn filter_literals(&self, mut keep: impl FnMut(&Self) -> bool) -> Self {
        Self::and(
            self.conjuncts()
                .into_iter()
                .filter(|lit| keep(lit))
                .cloned(),
        )
    }

    /// Splits an arithmetic equality `a = b` into `a <= b` and `a >= b`.
    ///
    /// Anything else is returned as is.
    pub fn split_numeral_equality(&self) -> Vec<Self> {
        match self {
            Self::App { op: Op::Eq, args } if args.len() == 2 && args[0].typ().is_arith() => {
                vec![
                    Self::le(args[0].clone(), args[1].clone()),
                    Self::ge(args[0].clone(), args[1].clone()),
                ]
            }
            expr => vec![expr.clone()],
        }
    }

    /// Variables appearing in `self`.
    pub fn vars(&self) -> Set<&Var> {
        let mut res = Set::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Self::Cst(_) => (),
                Self::Var(var) => {
                    res.insert(var);
                }
                Self::App { args, .. } => stack.extend(args.iter()),
            }
        }
        res
    }
    /// Names of the variables appearing in `self`, regardless of SSA indices.
    pub fn var_names(&self) -> Set<&str> {
        self.vars().into_iter().map(Var::id).collect()
    }
    /// True if `self` mentions a variable called `name`, at any SSA index.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Self::Cst(_) => false,
            Self::Var(var) => var.id() == name,
            Self::App { args, .. } => args.iter().any(|arg| arg.mentions(name)),
        }
    }

    /// Replaces the variables of `self`.
    pub fn map_vars(&self, f: &mut impl FnMut(&Var) -> Self) -> Self {
        match self {
            Self::Cst(cst) => Self::Cst(cst.clone()),
            Self::Var(var) => f(var),
            Self::App { op, args } => Self::App {
                op: *op,
                args: args.iter().map(|arg| arg.map_vars(f)).collect(),
            },
        }
    }

    /// Three-valued evaluation under a partial valuation.
    ///
    /// Returns `None` when the valuation does not determine the value of `self`. Boolean connectives
    /// short-circuit, so `(or x true)` evaluates to `true` even if `x` has no value.
    pub fn eval(&self, model: &impl Fn(&Var) -> Option<Cst>) -> Option<Cst> {
        match self {
            Self::Cst(cst) => Some(cst.clone()),
            Self::Var(var) => model(var),
            Self::App { op, args } => Self::eval_app(*op, args, model),
        }
    }

    fn eval_app(op: Op, args: &[Self], model: &impl Fn(&Var) -> Option<Cst>) -> Option<Cst> {
        let eval_bool = |expr: &Self| expr.eval(model).and_then(|cst| cst.as_bool());
        match op {
            Op::Not => eval_bool(args.first()?).map(|b| Cst::B(!b)),
            Op::And | Op::Or => {
                let absorbing = op == Op::Or;
                let mut unknown = false;
                for arg in args {
                    match eval_bool(arg) {
                        Some(b) if b == absorbing => return Some(Cst::B(absorbing)),
                        Some(_) => (),
                        None => unknown = true,
                    }
                }
                if unknown {
                    None
                } else {
                    Some(Cst::B(!absorbing))
                }
            }
            Op::Implies => {
                let (last, prems) = args.split_last()?;
                let mut unknown = false;
                for prem in prems {
                    match eval_bool(prem) {
                        Some(false) => return Some(Cst::B(true)),
                        Some(true) => (),
                        None => unknown = true,
                    }
                }
                match eval_bool(last) {
                    Some(true) => Some(Cst::B(true)),
                    Some(false) if !unknown => Some(Cst::B(false)),
                    _ => None,
                }
            }
            Op::Ite => match eval_bool(args.first()?) {
                Some(true) => args.get(1)?.eval(model),
                Some(false) => args.get(2)?.eval(model),
                None => {
                    let (thn, els) = (args.get(1)?.eval(model)?, args.get(2)?.eval(model)?);
                    if thn == els {
                        Some(thn)
                    } else {
                        None
                    }
                }
            },
            Op::Eq => {
                let vals: Vec<Option<Cst>> = args.iter().map(|arg| arg.eval(model)).collect();
                let known: Vec<&Cst> = vals.iter().flatten().collect();
                for pair in known.windows(2) {
                    let equal = match pair[0].arith_cmp(pair[1]) {
                        Some(ord) => ord == Ordering::Equal,
                        None => pair[0] == pair[1],
                    };
                    if !equal {
                        return Some(Cst::B(false));
                    }
                }
                if known.len() == vals.len() {
                    Some(Cst::B(true))
                } else {
                    None
                }
            }
            Op::Le | Op::Lt | Op::Ge | Op::Gt => {
                let vals = args
                    .iter()
                    .map(|arg| arg.eval(model))
                    .collect::<Option<Vec<_>>>()?;
                let mut res = true;
                for pair in vals.windows(2) {
                    let ord = pair[0].arith_cmp(&pair[1])?;
                    res = res
                        && match op {
                            Op::Le => ord != Ordering::Greater,
                            Op::Lt => ord == Ordering::Less,
                            Op::Ge => ord != Ordering::Less,
                            _ => ord == Ordering::Greater,
                        }
                }
                Some(Cst::B(res))
            }
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::IDiv | Op::Mod => {
                let vals = args
                    .iter()
                    .map(|arg| arg.eval(model))
                    .collect::<Option<Vec<_>>>()?;
                Self::eval_arith(op, vals)
            }
        }
    }

    fn eval_arith(op: Op, vals: Vec<Cst>) -> Option<Cst> {
        use num::Integer;
        if let (Op::IDiv | Op::Mod, [Cst::I(num), Cst::I(den)]) = (op, vals.as_slice()) {
            if den.is_zero() {
                return None;
            }
            // euclidean semantics, the remainder is always non-negative
            let rem = num.mod_floor(&den.abs());
            return if op == Op::Mod {
                Some(Cst::I(rem))
            } else {
                Some(Cst::I((num - &rem) / den))
            };
        }
        let all_int = vals.iter().all(|val| val.as_int().is_some()) && op != Op::Div;
        let mut rats = vals.iter().map(Cst::to_rat).collect::<Option<Vec<_>>>()?;
        let res = match op {
            Op::Sub if rats.len() == 1 => -rats.pop()?,
            Op::Sub => {
                let (first, rest) = rats.split_first()?;
                rest.iter().fold(first.clone(), |acc, r| acc - r)
            }
            Op::Add => rats.iter().fold(Rat::zero(), |acc, r| acc + r),
            Op::Mul => rats.iter().fold(Rat::one(), |acc, r| acc * r),
            Op::Div => {
                let (num, den) = (rats.first()?, rats.get(1)?);
                if den.is_zero() {
                    return None;
                }
                num / den
            }
            _ => return None,
        };
        if all_int {
            Some(Cst::I(res.to_integer()))
        } else {
            Some(Cst::R(res))
        }
    }
}
impl HasTyp for Expr {
    fn typ(&self) -> Typ {
        match self {
            Self::Var(var) => var.typ(),
            Self::Cst(cst) => cst.typ(),
            Self::App { op, args } => match op {
                Op::Ite => args.get(1).map(Self::typ).unwrap_or(Typ::Bool),
                op => op.result_typ(args.first().map(Self::typ).unwrap_or(Typ::Bool)),
            },
        }
    }
}
impl Expr2Smt<()> for Expr {
    fn expr_to_smt2<W: Write>(&self, w: &mut W, _: ()) -> SmtRes<()> {
        match self {
            Self::Cst(cst) => cst.expr_to_smt2(w, ()),
            Self::Var(var) => var.sym_to_smt2(w, ()),
            Self::App { op, args } => {
                write!(w, "(")?;
                op.expr_to_smt2(w, ())?;
                for arg in args {
                    write!(w, " ")?;
                    arg.expr_to_smt2(w, ())?
                }
                write!(w, ")")?;
                Ok(())
            }
        }
    }
}

/// Packs basic trait implementations.
mod trait_impls {
    use super::*;

    impl fmt::Display for Typ {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::Bool => write!(fmt, "bool"),
                Self::Int => write!(fmt, "int"),
                Self::Rat => write!(fmt, "rat"),
            }
        }
    }

    impl fmt::Display for Op {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::Ite => write!(fmt, "ite"),
                Self::Implies => write!(fmt, "=>"),
                Self::Add => write!(fmt, "+"),
                Self::Sub => write!(fmt, "-"),
                Self::Mul => write!(fmt, "*"),
                Self::Div => write!(fmt, "/"),
                Self::IDiv => write!(fmt, "div"),
                Self::Mod => write!(fmt, "mod"),
                Self::Ge => write!(fmt, ">="),
                Self::Le => write!(fmt, "<="),
                Self::Gt => write!(fmt, ">"),
                Self::Lt => write!(fmt, "<"),
                Self::Eq => write!(fmt, "="),
                Self::Not => write!(fmt, "not"),
                Self::And => write!(fmt, "and"),
                Self::Or => write!(fmt, "or"),
            }
        }
    }

    impl fmt::Display for Cst {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::B(b) => b.fmt(fmt),
                Self::I(i) => {
                    if i.sign() == Sign::Minus {
                        write!(fmt, "(- {})", -i)
                    } else {
                        i.fmt(fmt)
                    }
                }
                Self::R(r) => {
                    let (num, den) = (r.numer(), r.denom());
                    match (num.sign(), den.sign()) {
                        (Sign::Minus, Sign::Minus) => write!(fmt, "(/ {} {})", -num, -den),
                        (Sign::Minus, _) => write!(fmt, "(- (/ {} {}))", -num, den),
                        (_, Sign::Minus) => write!(fmt, "(- (/ {} {}))", num, -den),
                        _ => write!(fmt, "(/ {} {})", num, den),
                    }
                }
            }
        }
    }
    impl From<bool> for Cst {
        fn from(b: bool) -> Self {
            Self::B(b)
        }
    }
    impl From<Int> for Cst {
        fn from(i: Int) -> Self {
            Self::I(i)
        }
    }
    impl From<i64> for Cst {
        fn from(n: i64) -> Self {
            Self::I(n.into())
        }
    }
    impl From<i32> for Cst {
        fn from(n: i32) -> Self {
            Self::I(n.into())
        }
    }
    impl From<usize> for Cst {
        fn from(n: usize) -> Self {
            Self::I(n.into())
        }
    }
    impl From<Rat> for Cst {
        fn from(r: Rat) -> Self {
            Self::R(r)
        }
    }

    impl fmt::Display for Var {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self.idx {
                Some(idx) => write!(fmt, "{}@{}", self.id, idx),
                None => write!(fmt, "{}", self.id),
            }
        }
    }

    impl fmt::Display for Expr {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::Cst(cst) => cst.fmt(fmt),
                Self::Var(var) => var.fmt(fmt),
                Self::App { op, args } => {
                    write!(fmt, "({}", op)?;
                    for arg in args {
                        write!(fmt, " {}", arg)?
                    }
                    write!(fmt, ")")
                }
            }
        }
    }
    impl<C> From<C> for Expr
    where
        C: Into<Cst>,
    {
        fn from(cst: C) -> Self {
            Self::Cst(cst.into())
        }
    }
    impl From<(Op, Vec<Expr>)> for Expr {
        fn from((op, args): (Op, Vec<Expr>)) -> Self {
            Self::App { op, args }
        }
    }
}
