//! SSA contexts and index transformations over formulas.
//!
//! A formula describing a single state mentions each program variable at one SSA index. A formula
//! describing a sequence of steps (a block, a path) mentions variables at several indices, from `1`
//! at the start of the sequence to the maximal index recorded in its [`SsaMap`] at the end.

crate::prelude!();

#[cfg(test)]
mod test;

/// Static type of a program variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CType {
    /// Simple type.
    Simple {
        /// Underlying SMT type.
        typ: Typ,
        /// Signedness, irrelevant for booleans.
        signed: bool,
    },
    /// Composite type, never used in default predicates.
    Composite {
        /// Name of the type.
        name: String,
        /// SMT type of the encoding.
        typ: Typ,
    },
}
impl CType {
    /// Signed integer type.
    pub fn int() -> Self {
        Self::Simple {
            typ: Typ::Int,
            signed: true,
        }
    }
    /// Unsigned integer type.
    pub fn unsigned() -> Self {
        Self::Simple {
            typ: Typ::Int,
            signed: false,
        }
    }
    /// Boolean type.
    pub fn bool() -> Self {
        Self::Simple {
            typ: Typ::Bool,
            signed: false,
        }
    }

    /// SMT type of the variables of this type.
    pub fn typ(&self) -> Typ {
        match self {
            Self::Simple { typ, .. } | Self::Composite { typ, .. } => *typ,
        }
    }

    /// True if `self` and `other` are the same simple arithmetic type with the same signedness.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ctigar::ssa::CType;
    /// assert!(CType::int().comparable_with(&CType::int()));
    /// assert!(!CType::int().comparable_with(&CType::unsigned()));
    /// assert!(!CType::bool().comparable_with(&CType::bool()));
    /// ```
    pub fn comparable_with(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Simple { typ, signed },
                Self::Simple {
                    typ: otyp,
                    signed: osigned,
                },
            ) => typ == otyp && typ.is_arith() && signed == osigned,
            _ => false,
        }
    }
}

/// Maps variable names to their current SSA index and type.
///
/// A map can have a default index, returned for variables it does not know explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsaMap {
    /// Explicit indices.
    vars: Map<String, (Index, CType)>,
    /// Default index.
    default: Option<Index>,
}
impl SsaMap {
    /// Empty map, no default index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the index of a variable.
    pub fn set(&mut self, name: impl Into<String>, ctype: CType, idx: Index) {
        self.vars.insert(name.into(), (idx, ctype));
    }
    /// Builder version of [`Self::set`].
    pub fn with(mut self, name: impl Into<String>, ctype: CType, idx: Index) -> Self {
        self.set(name, ctype, idx);
        self
    }
    /// Copy of `self` with a default index.
    pub fn with_default(&self, idx: Index) -> Self {
        Self {
            vars: self.vars.clone(),
            default: Some(idx),
        }
    }
    /// Default index.
    pub fn default_index(&self) -> Option<Index> {
        self.default
    }

    /// Index of a variable, falls back on the default index.
    pub fn index(&self, name: &str) -> Option<Index> {
        self.vars.get(name).map(|(idx, _)| *idx).or(self.default)
    }
    /// Type of a variable.
    pub fn ctype(&self, name: &str) -> Option<&CType> {
        self.vars.get(name).map(|(_, ctype)| ctype)
    }
    /// True if the variable is known explicitly.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Instantiated version of a variable known explicitly.
    pub fn var(&self, name: &str) -> Option<Var> {
        self.vars
            .get(name)
            .map(|(idx, ctype)| Var::new_at(name, ctype.typ(), *idx))
    }
    /// Iterator over the variables known explicitly.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Index, &CType)> {
        self.vars
            .iter()
            .map(|(name, (idx, ctype))| (name.as_str(), *idx, ctype))
    }
    /// Names of the variables known explicitly.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
    /// Number of variables known explicitly.
    pub fn len(&self) -> usize {
        self.vars.len()
    }
    /// True if no variable is known explicitly.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Increments the index of a variable, the first increment of an unknown variable yields `2`.
    pub fn bump(&mut self, name: &str, ctype: &CType) -> Index {
        let next = self.index(name).unwrap_or(1) + 1;
        self.set(name, ctype.clone(), next);
        next
    }

    /// Pointwise maximum of two maps, keeps the default of `self`.
    pub fn merge_max(&self, other: &Self) -> Self {
        let mut res = self.clone();
        for (name, idx, ctype) in other.iter() {
            let keep = res.vars.get(name).map(|(old, _)| *old >= idx).unwrap_or(false);
            if !keep {
                res.set(name, ctype.clone(), idx)
            }
        }
        res
    }
}
impl fmt::Display for SsaMap {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{{")?;
        for (cnt, (name, idx, _)) in self.iter().enumerate() {
            if cnt > 0 {
                write!(fmt, ",")?;
            }
            write!(fmt, " {}@{}", name, idx)?;
        }
        if let Some(default) = self.default {
            write!(fmt, " (default {})", default)?;
        }
        write!(fmt, " }}")
    }
}

/// A formula together with its SSA context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFormula {
    /// The formula.
    formula: Expr,
    /// SSA indices at the end of the formula.
    ssa: SsaMap,
    /// Instantiated variables the formula leaves unconstrained on purpose (nondeterministic
    /// assignments).
    nondet: Set<Var>,
}
impl PathFormula {
    /// Empty path formula: `true`, empty SSA map.
    pub fn empty() -> Self {
        Self {
            formula: Expr::tru(),
            ssa: SsaMap::new(),
            nondet: Set::new(),
        }
    }
    /// Constructor.
    pub fn new(formula: Expr, ssa: SsaMap, nondet: Set<Var>) -> Self {
        Self {
            formula,
            ssa,
            nondet,
        }
    }

    /// Formula accessor.
    pub fn formula(&self) -> &Expr {
        &self.formula
    }
    /// SSA accessor.
    pub fn ssa(&self) -> &SsaMap {
        &self.ssa
    }
    /// Nondeterministically assigned variables.
    pub fn nondet(&self) -> &Set<Var> {
        &self.nondet
    }

    /// Conjoins a constraint.
    pub fn and(&self, constraint: Expr) -> Self {
        Self {
            formula: Expr::and(vec![self.formula.clone(), constraint]),
            ssa: self.ssa.clone(),
            nondet: self.nondet.clone(),
        }
    }
    /// Mutable SSA accessor.
    pub fn ssa_mut(&mut self) -> &mut SsaMap {
        &mut self.ssa
    }
    /// Disjunction of two path formulas.
    ///
    /// Each variable ends at the largest of its two indices, the side where it is lower equates
    /// both indices. Nondeterministic variables are those of either side.
    pub fn merge(&self, other: &Self) -> Self {
        let ssa = self.ssa.merge_max(&other.ssa);
        let padded = |path: &Self| {
            let mut parts = vec![path.formula.clone()];
            for (name, idx, ctype) in ssa.iter() {
                let own = path.ssa.index(name).unwrap_or(1);
                if own < idx {
                    parts.push(Expr::eq(
                        Expr::Var(Var::new_at(name, ctype.typ(), idx)),
                        Expr::Var(Var::new_at(name, ctype.typ(), own)),
                    ))
                }
            }
            Expr::and(parts)
        };
        Self {
            formula: Expr::or(vec![padded(self), padded(other)]),
            nondet: self.nondet.union(&other.nondet).cloned().collect(),
            ssa,
        }
    }
    /// Registers a nondeterministic variable.
    pub fn add_nondet(&mut self, var: Var) {
        self.nondet.insert(var);
    }
}

/// Instantiates the uninstantiated variables of a formula.
///
/// Variables `ssa` has no index for, even by default, are left untouched.
///
/// # Examples
///
/// ```rust
/// # use ctigar::{build_expr, ssa::{self, CType, SsaMap}};
/// let ssa = SsaMap::new().with("x", CType::int(), 3).with_default(1);
/// let expr = build_expr!((< (x: int) (y: int)));
/// assert_eq!(&ssa::instantiate(&expr, &ssa).to_string(), "(< x@3 y@1)");
/// ```
pub fn instantiate(expr: &Expr, ssa: &SsaMap) -> Expr {
    expr.map_vars(&mut |var| match (var.idx(), ssa.index(var.id())) {
        (None, Some(idx)) => Expr::Var(var.at(idx)),
        _ => Expr::Var(var.clone()),
    })
}

/// Removes all SSA indices from a formula.
pub fn uninstantiate(expr: &Expr) -> Expr {
    expr.map_vars(&mut |var| Expr::Var(var.uninstantiated()))
}

/// Changes the indices of the instantiated variables `ssa` has an index for.
pub fn reindex(expr: &Expr, ssa: &SsaMap, f: impl Fn(&str, Index) -> Index) -> Expr {
    expr.map_vars(&mut |var| match var.idx() {
        Some(idx) if ssa.index(var.id()).is_some() => Expr::Var(var.at(f(var.id(), idx))),
        _ => Expr::Var(var.clone()),
    })
}

/// Inverts the SSA indices of a formula: index `i` in `[1, max]` becomes `max - i + 1`, where `max`
/// is the index of the variable in `ssa`.
///
/// Inverting twice with the same map yields the original formula.
///
/// # Examples
///
/// ```rust
/// # use ctigar::{build_expr, ssa::{self, CType, SsaMap}};
/// let ssa = SsaMap::new().with("x", CType::int(), 3);
/// let expr = build_expr!((= (x@1: int) (+ (x@3: int) 1)));
/// let inverted = ssa::invert_indices(&expr, &ssa);
/// assert_eq!(&inverted.to_string(), "(= x@3 (+ x@1 1))");
/// assert_eq!(ssa::invert_indices(&inverted, &ssa), expr);
/// ```
pub fn invert_indices(expr: &Expr, ssa: &SsaMap) -> Expr {
    reindex(expr, ssa, |name, idx| match ssa.index(name) {
        Some(max) if 1 <= idx && idx <= max => max - idx + 1,
        _ => idx,
    })
}
