//! Transition system structures and helpers.
//!
//! A transition system is composed of
//!
//! - an *initial* condition `I`,
//! - a *transition* relation `T`, and
//! - a *safety property* `P`.
//!
//! All three are SSA-instantiated formulas: `I` and `P` over the *unprimed* context, where every
//! state variable is at index `1`, and `T` over the unprimed and *primed* contexts. A program
//! counter variable encodes the control-flow location of a state.

crate::prelude!();

use cfa::{BlockAnalysis, Cfa, Loc};
use transition::ReachabilityAnalysis;

#[cfg(test)]
mod test;

/// Name of the program counter of the systems built from control-flow automata.
pub const PC_NAME: &str = "__pc";

/// The transition system interface the PDR engine works with.
pub trait TransitionSystem {
    /// Transition relation `T`.
    fn transition_relation(&self) -> &Expr;
    /// Safety property `P`, unprimed.
    fn safety_property(&self) -> &Expr;
    /// Initial condition `I`, unprimed.
    fn initial_condition(&self) -> &Expr;
    /// Context of the current state.
    fn unprimed_context(&self) -> &SsaMap;
    /// Context of the next state.
    fn primed_context(&self) -> &SsaMap;
    /// Name of the program counter.
    fn program_counter_name(&self) -> &str;
    /// Location a program counter value encodes.
    fn node_for_id(&self, id: &Int) -> Option<Loc>;
    /// Names of the state variables, program counter included.
    fn all_variable_names(&self) -> Vec<String>;
    /// Target (error) locations.
    fn target_locations(&self) -> &Set<Loc>;

    /// Re-instantiates a state formula over the unprimed context.
    fn as_unprimed(&self, expr: &Expr) -> Expr {
        ssa::instantiate(&ssa::uninstantiate(expr), self.unprimed_context())
    }
    /// Re-instantiates a state formula over the primed context.
    fn as_primed(&self, expr: &Expr) -> Expr {
        ssa::instantiate(&ssa::uninstantiate(expr), self.primed_context())
    }
}

/// A concrete transition system.
#[derive(Debug, Clone)]
pub struct Sys {
    pc: String,
    unprimed: SsaMap,
    primed: SsaMap,
    init: Expr,
    trans: Expr,
    prop: Expr,
    locations: Set<Loc>,
    targets: Set<Loc>,
}
impl Sys {
    /// Hand-built system.
    ///
    /// `vars` are the state variables, program counter included. `init` and `prop` are
    /// uninstantiated, `trans` mentions current variables at index `1` and next ones at index `2`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ctigar::{prelude::*, trans::{Sys, TransitionSystem}};
    /// let vars = vec![("pc".to_string(), CType::int()), ("x".to_string(), CType::int())];
    /// let sys = Sys::new(
    ///     vars,
    ///     "pc",
    ///     vec![0],
    ///     build_expr!((and (= (pc: int) 0) (= (x: int) 0))),
    ///     build_expr!((and (= (pc@2: int) 0) (= (x@2: int) (+ (x@1: int) 1)))),
    ///     build_expr!((< (x: int) 10)),
    /// ).unwrap();
    /// assert_eq!(&sys.safety_property().to_string(), "(< x@1 10)");
    /// assert_eq!(&sys.as_primed(sys.safety_property()).to_string(), "(< x@2 10)");
    /// ```
    pub fn new(
        vars: impl IntoIterator<Item = (String, CType)>,
        pc: impl Into<String>,
        locations: impl IntoIterator<Item = Loc>,
        init: Expr,
        trans: Expr,
        prop: Expr,
    ) -> Res<Self> {
        let pc = pc.into();
        let (mut unprimed, mut primed) = (SsaMap::new(), SsaMap::new());
        for (name, ctype) in vars {
            unprimed.set(name.clone(), ctype.clone(), 1);
            primed.set(name, ctype, 2);
        }
        match unprimed.ctype(&pc) {
            Some(ctype) if ctype.typ() == Typ::Int => (),
            Some(_) => bail!("program counter `{}` is not an integer", pc),
            None => bail!("undeclared program counter `{}`", pc),
        }
        let parts = [
            ("initial condition", &init),
            ("transition relation", &trans),
            ("property", &prop),
        ];
        for (desc, expr) in parts {
            if expr.typ() != Typ::Bool {
                bail!("non-boolean {} `{}`", desc, expr)
            }
            let undeclared = expr
                .var_names()
                .into_iter()
                .find(|name| !unprimed.contains(name));
            if let Some(name) = undeclared {
                bail!("{} mentions undeclared variable `{}`", desc, name)
            }
        }
        let init = ssa::instantiate(&init, &unprimed);
        let prop = ssa::instantiate(&prop, &unprimed);
        Ok(Self {
            pc,
            unprimed,
            primed,
            init,
            trans,
            prop,
            locations: locations.into_iter().collect(),
            targets: Set::new(),
        })
    }

    /// System of a control-flow automaton.
    ///
    /// The transition relation has one disjunct per forward block between block heads. Each
    /// disjunct constrains the program counter before and after the block, and equates the last
    /// index of each variable in the block with its primed index. `init` is an uninstantiated
    /// constraint over the variables at the entry, the property states that no target is reached.
    pub fn of_cfa(cfa: &Cfa, init: Expr, shutdown: &ShutdownNotifier) -> Res<Self> {
        if cfa.var_ctype(PC_NAME).is_some() {
            bail!("program variable `{}` clashes with the program counter", PC_NAME)
        }
        let pc_typ = CType::int();
        let pc_at = |idx: Index| Expr::Var(Var::new_at(PC_NAME, Typ::Int, idx));
        let pc_is = |idx: Index, loc: Loc| Expr::eq(pc_at(idx), Expr::int(loc));

        let analysis = BlockAnalysis::forward(cfa);
        // (head, successor, formula, final ssa)
        let mut blocks: Vec<(Loc, Loc, Expr, SsaMap)> = vec![];
        for head in cfa.block_heads() {
            let reached = analysis.run(&[*head], shutdown)?;
            for start in reached.block_starts() {
                let state = reached.state(start);
                blocks.push((
                    *head,
                    state.location(),
                    state.path().formula().clone(),
                    state.path().ssa().clone(),
                ))
            }
        }

        let mut primed = cfa.ssa_context(2);
        for (_, _, _, ssa) in &blocks {
            primed = primed.merge_max(ssa);
        }
        primed.set(PC_NAME, pc_typ.clone(), 2);
        let mut unprimed = cfa.ssa_context(1);
        unprimed.set(PC_NAME, pc_typ, 1);

        let mut disjuncts = Vec::with_capacity(blocks.len());
        for (head, succ, formula, ssa) in blocks {
            let mut parts = vec![pc_is(1, head), formula, pc_is(2, succ)];
            for (name, max, ctype) in primed.iter() {
                if name == PC_NAME {
                    continue;
                }
                let last = ssa.index(name).unwrap_or(1);
                if last != max {
                    parts.push(Expr::eq(
                        Expr::Var(Var::new_at(name, ctype.typ(), last)),
                        Expr::Var(Var::new_at(name, ctype.typ(), max)),
                    ))
                }
            }
            disjuncts.push(Expr::and(parts))
        }
        let trans = Expr::or(disjuncts);

        let undeclared = init
            .var_names()
            .into_iter()
            .find(|name| cfa.var_ctype(name).is_none());
        if let Some(name) = undeclared {
            bail!("initial condition mentions undeclared variable `{}`", name)
        }
        let init = Expr::and(vec![pc_is(1, cfa.entry()), ssa::instantiate(&init, &unprimed)]);
        let prop = Expr::and(
            cfa.targets()
                .iter()
                .map(|target| Expr::not(pc_is(1, *target))),
        );
        debug!(
            "transition system over {} variable(s), {} block(s)",
            unprimed.len(),
            trans.disjuncts().len()
        );

        Ok(Self {
            pc: PC_NAME.into(),
            unprimed,
            primed,
            init,
            trans,
            prop,
            locations: cfa.locations().clone(),
            targets: cfa.targets().clone(),
        })
    }

    /// Replaces the safety property, `prop` is uninstantiated.
    pub fn with_safety_property(mut self, prop: Expr) -> Self {
        self.prop = ssa::instantiate(&prop, &self.unprimed);
        self
    }
    /// Replaces the target locations.
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = Loc>) -> Self {
        self.targets = targets.into_iter().collect();
        self.locations.extend(self.targets.iter().copied());
        self
    }
}
impl TransitionSystem for Sys {
    fn transition_relation(&self) -> &Expr {
        &self.trans
    }
    fn safety_property(&self) -> &Expr {
        &self.prop
    }
    fn initial_condition(&self) -> &Expr {
        &self.init
    }
    fn unprimed_context(&self) -> &SsaMap {
        &self.unprimed
    }
    fn primed_context(&self) -> &SsaMap {
        &self.primed
    }
    fn program_counter_name(&self) -> &str {
        &self.pc
    }
    fn node_for_id(&self, id: &Int) -> Option<Loc> {
        id.to_usize().filter(|loc| self.locations.contains(loc))
    }
    fn all_variable_names(&self) -> Vec<String> {
        self.unprimed.names().map(String::from).collect()
    }
    fn target_locations(&self) -> &Set<Loc> {
        &self.targets
    }
}
impl fmt::Display for Sys {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "vars: {}", self.unprimed)?;
        writeln!(fmt, "init: {}", self.init)?;
        writeln!(fmt, "trans: {}", self.trans)?;
        write!(fmt, "prop: {}", self.prop)
    }
}
