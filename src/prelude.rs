//! Common imports throughout this project.

pub use std::{
    collections::{BTreeMap as Map, BTreeSet as Set, HashMap},
    fmt,
    io::Write,
    ops::{Deref, DerefMut},
    rc::Rc,
};

pub use either::Either;
pub use num::{bigint::Sign, BigInt as Int, BigRational as Rat, One, Signed, ToPrimitive, Zero};
pub use rsmt2::{parse::SmtParser as RSmtParser, SmtConf, SmtRes, Solver as SmtSolver};
pub use tracing::{debug, info, trace, warn};

pub use crate::{
    bail, build_expr, build_typ, cfa,
    err::{ChainExt, Error, ErrorChain, Res},
    expr,
    expr::{Cst, Expr, HasTyp, Index, Op, Typ, Var},
    pdr, prover,
    prover::{InterpolatingProver, Model, Prover, Solver},
    shutdown::ShutdownNotifier,
    ssa,
    ssa::{CType, PathFormula, SsaMap},
    trans, transition,
};
