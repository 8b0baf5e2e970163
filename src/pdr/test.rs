//! Tests over the PDR query engine.

crate::prelude!();

use cfa::{Cfa, Loc, Statement};
use pdr::{
    CartesianAbstraction, ConnectingBlockPolicy, ConsecutionResult, FrameSet, Frames, PdrOptions,
    PdrSmt, PredicatePrecisionManager, StatesWithLocation,
};
use prover::{finite::FiniteSolver, z3::Z3};
use trans::{Sys, TransitionSystem};
use transition::{Block, CfaForwardTransition, ForwardTransition};

/// Initializes logging once, `RUST_LOG` selects the level.
fn init_log() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn solver() -> FiniteSolver {
    FiniteSolver::new(-4, 12)
}

/// `0: loop { x := x + 1 }`, `y` never changes.
fn counter() -> Cfa {
    let mut cfa = Cfa::new(0);
    cfa.declare("x", CType::int());
    cfa.declare("y", CType::int());
    cfa.add_edge(0, 0, Statement::assign("x", build_expr!((+ (x: int) 1))))
        .unwrap();
    cfa
}

/// `0: loop { x := x + 1; 1: y := * }`.
fn nondet_counter() -> Cfa {
    let mut cfa = Cfa::new(0);
    cfa.declare("x", CType::int());
    cfa.declare("y", CType::int());
    cfa.add_edge(0, 1, Statement::assign("x", build_expr!((+ (x: int) 1))))
        .unwrap();
    cfa.add_edge(1, 0, Statement::nondet("y")).unwrap();
    cfa
}

/// Counter system, `x < 10` must hold at location `0`.
fn system(cfa: &Cfa) -> Sys {
    Sys::of_cfa(
        cfa,
        build_expr!((and (= (x: int) 0) (= (y: int) 0))),
        &ShutdownNotifier::new(),
    )
    .unwrap()
    .with_safety_property(build_expr!((< (x: int) 10)))
    .with_targets([0])
}

/// Runs `f` on an engine over `cfa`.
fn with_engine<T>(
    cfa: &Cfa,
    options: PdrOptions,
    f: impl FnOnce(&mut PdrSmt<FiniteSolver>, &Sys) -> T,
) -> T {
    init_log();
    let sys = system(cfa);
    let forward = CfaForwardTransition::new(cfa, ShutdownNotifier::new());
    let solver = solver();
    let mut engine = PdrSmt::new(&solver, &sys, &forward, options).unwrap();
    f(&mut engine, &sys)
}

/// `pc = 0 ∧ x = <x> ∧ y = 0`.
fn state(x: i64) -> StatesWithLocation {
    let formula = Expr::and(vec![
        build_expr!((= (__pc@1: int) 0)),
        Expr::eq(build_expr!((x@1: int)), Expr::int(x)),
        build_expr!((= (y@1: int) 0)),
    ]);
    StatesWithLocation::new(formula.clone(), 0, formula)
}

fn frames(sys: &Sys, levels: usize) -> Frames {
    let mut frames = Frames::new(sys.initial_condition().clone());
    for _ in 0..levels {
        frames.push_level();
    }
    frames
}

fn conjuncts(expr: &Expr) -> Vec<String> {
    expr.conjuncts().into_iter().map(Expr::to_string).collect()
}

/// `states ∧ T ∧ ¬successors'` is unsatisfiable.
fn all_successors_in(sys: &Sys, states: &Expr, successors: &Expr) -> bool {
    let query = Expr::and(vec![
        states.clone(),
        sys.transition_relation().clone(),
        sys.as_primed(&Expr::not(successors.clone())),
    ]);
    solver().is_unsat(&query).unwrap()
}

#[test]
fn no_cti_in_initial_frame() {
    let cfa = counter();
    with_engine(&cfa, PdrOptions::default(), |engine, sys| {
        let frames = frames(sys, 0);
        assert_eq!(engine.get_cti(&frames).unwrap(), None);
        assert_eq!(engine.stats().cti_queries, 1);
        assert_eq!(engine.stats().ctis, 0);
    })
}

#[test]
fn lifted_cti() {
    let cfa = counter();
    with_engine(&cfa, PdrOptions::default(), |engine, sys| {
        let mut frames = frames(sys, 1);
        frames
            .add_clause(1, build_expr!((<= (x@1: int) 9)))
            .unwrap();
        let cti = match engine.get_cti(&frames).unwrap() {
            Some(ConsecutionResult::Predecessor(cti)) => cti,
            res => panic!("expected a CTI, got {:?}", res),
        };
        assert_eq!(cti.location(), 0);
        assert!(conjuncts(cti.concrete()).contains(&"(= x@1 9)".to_string()));

        let lifted = cti.formula();
        assert!(solver().implies(cti.concrete(), lifted).unwrap());
        assert!(!engine.is_initial(lifted).unwrap());
        // every successor of the lifted CTI violates the property
        let violation = Expr::not(sys.safety_property().clone());
        assert!(all_successors_in(sys, lifted, &violation));

        assert_eq!(engine.stats().ctis, 1);
        assert_eq!(engine.stats().failed_lifts, 1);
        assert!(engine.precision().predicates().len() > 2);
    })
}

#[test]
fn inductive_generalization() {
    let cfa = counter();
    with_engine(&cfa, PdrOptions::default(), |engine, sys| {
        let frames = frames(sys, 0);
        let states = state(5);
        let res = engine.consecution(&frames, 0, &states).unwrap();
        let generalized = match res {
            ConsecutionResult::Inductive(generalized) => generalized,
            res => panic!("expected success, got {:?}", res),
        };
        assert_eq!(&generalized.formula().to_string(), "(= x@1 5)");
        assert_eq!(generalized.location(), 0);
        assert_eq!(generalized.concrete(), states.concrete());

        // still inductive relative to F_0 and disjoint from the initial states
        assert!(!engine.is_initial(generalized.formula()).unwrap());
        let mut query = frames.states(0).unwrap();
        query.push(sys.transition_relation().clone());
        query.push(Expr::not(generalized.formula().clone()));
        query.push(sys.as_primed(generalized.formula()));
        assert!(solver().is_unsat(&Expr::and(query)).unwrap());
        assert_eq!(engine.stats().successful_consecutions, 1);
    })
}

#[test]
fn initial_predecessor() {
    let cfa = counter();
    with_engine(&cfa, PdrOptions::default(), |engine, sys| {
        let frames = frames(sys, 0);
        let res = engine.consecution(&frames, 0, &state(1)).unwrap();
        assert!(!res.is_inductive());
        let pred = res.into_states();
        assert!(conjuncts(pred.concrete()).contains(&"(= x@1 0)".to_string()));
        // initial predecessors are not lifted
        assert_eq!(pred.formula(), pred.concrete());
        assert!(engine.is_initial(pred.formula()).unwrap());
        assert_eq!(engine.stats().failed_consecutions, 1);
    })
}

#[test]
fn lifted_predecessor() {
    let cfa = counter();
    for double_check in [true, false] {
        let options = PdrOptions::default().with_double_check_consecution(double_check);
        with_engine(&cfa, options, |engine, sys| {
            let frames = frames(sys, 1);
            let states = state(5);
            let pred = match engine.consecution(&frames, 1, &states).unwrap() {
                ConsecutionResult::Predecessor(pred) => pred,
                res => panic!("expected a predecessor, got {:?}", res),
            };
            assert!(conjuncts(pred.concrete()).contains(&"(= x@1 4)".to_string()));
            let lifted = pred.formula();
            assert!(solver().implies(pred.concrete(), lifted).unwrap());
            assert!(!engine.is_initial(lifted).unwrap());
            assert!(all_successors_in(sys, lifted, states.formula()));
        })
    }
}

#[test]
fn double_check_refines() {
    let cfa = counter();
    with_engine(&cfa, PdrOptions::default(), |engine, sys| {
        let frames = frames(sys, 0);
        let concrete = state(5).concrete().clone();
        // too coarse: the initial state's successor is in it
        let coarse = StatesWithLocation::new(build_expr!((< (y@1: int) (x@1: int))), 0, concrete);
        let before: Vec<_> = engine.precision().predicates().iter().cloned().collect();

        let res = engine.consecution(&frames, 0, &coarse).unwrap();
        assert!(res.is_inductive());
        assert_eq!(engine.stats().consecution_refinements, 1);
        let after = engine.precision().predicates();
        assert!(after.len() > before.len());
        assert!(before.iter().all(|pred| after.contains(pred)));
        assert!(after
            .iter()
            .all(|pred| !pred.atom().mentions(sys.program_counter_name())));
    })
}

#[test]
fn plain_consecution_without_abstraction() {
    let cfa = counter();
    let options = PdrOptions::default()
        .with_abstraction(false)
        .with_double_check_consecution(false);
    with_engine(&cfa, options, |engine, sys| {
        let frames = frames(sys, 1);
        let pred = engine.consecution(&frames, 1, &state(5)).unwrap().into_states();
        assert!(solver().implies(pred.concrete(), pred.formula()).unwrap());
        assert!(all_successors_in(sys, pred.formula(), state(5).formula()));
        assert_eq!(engine.precision().stats().refinements, 0);
    })
}

#[test]
fn nondet_successors() {
    let cfa = nondet_counter();
    with_engine(&cfa, PdrOptions::default(), |engine, sys| {
        let frames = frames(sys, 1);
        let pred = engine.consecution(&frames, 1, &state(5)).unwrap();
        let pred = match pred {
            ConsecutionResult::Predecessor(pred) => pred,
            res => panic!("expected a predecessor, got {:?}", res),
        };
        let lifted = pred.formula();
        assert!(!lifted.mentions("y"));
        let target = build_expr!((and (= (__pc@1: int) 0) (= (x@1: int) 5)));
        assert!(all_successors_in(sys, lifted, &target));
        assert_eq!(engine.stats().unlifted_abstractions, 0);
    })
}

#[test]
fn unlifted_abstraction() {
    let cfa = nondet_counter();
    let options = PdrOptions::default().with_remove_nondet_variables(false);
    with_engine(&cfa, options, |engine, sys| {
        let frames = frames(sys, 1);
        let pred = engine.consecution(&frames, 1, &state(5)).unwrap();
        assert!(!pred.is_inductive());
        assert_eq!(engine.stats().unlifted_abstractions, 1);
        let pred = pred.into_states();
        assert!(solver()
            .implies(pred.concrete(), pred.formula())
            .unwrap());
    })
}

#[test]
fn interruption() {
    let cfa = counter();
    let shutdown = ShutdownNotifier::new();
    let sys = system(&cfa);
    let forward = CfaForwardTransition::new(&cfa, ShutdownNotifier::new());
    let solver = solver();
    let mut engine = PdrSmt::new(&solver, &sys, &forward, PdrOptions::default())
        .unwrap()
        .with_shutdown(shutdown.clone());
    let frames = frames(&sys, 1);
    assert!(engine.get_cti(&frames).is_ok());
    shutdown.request_shutdown();
    assert!(engine.get_cti(&frames).unwrap_err().is_interrupted());
    assert!(engine
        .consecution(&frames, 1, &state(5))
        .unwrap_err()
        .is_interrupted());
}

#[test]
fn unsupported_backend() {
    let cfa = counter();
    let sys = system(&cfa);
    let forward = CfaForwardTransition::new(&cfa, ShutdownNotifier::new());
    let z3 = Z3::new("z3").unwrap();
    for options in [
        PdrOptions::default(),
        PdrOptions::default().with_double_check_consecution(false),
    ] {
        match PdrSmt::new(&z3, &sys, &forward, options) {
            Err(e) => assert!(matches!(e.source, Error::Unsupported(_))),
            Ok(_) => panic!("interpolation-free backend accepted"),
        }
    }
    let options = PdrOptions::default()
        .with_abstraction(false)
        .with_double_check_consecution(false);
    assert!(PdrSmt::new(&z3, &sys, &forward, options).is_ok());
}

#[test]
fn subsumption() {
    let vars = vec![("pc".to_string(), CType::int()), ("x".to_string(), CType::int())];
    let sys = Sys::new(
        vars,
        "pc",
        vec![0],
        build_expr!((and (= (pc: int) 0) (= (x: int) 0))),
        build_expr!((and (= (pc@1: int) 0) (= (pc@2: int) 0) (= (x@2: int) (+ (x@1: int) 1)))),
        build_expr!((< (x: int) 10)),
    )
    .unwrap();
    let solver = solver();
    let options = PdrOptions::default().with_initial_subsumption_threshold(2);
    let mut precision = PredicatePrecisionManager::new(
        &solver,
        &sys,
        Box::new(CartesianAbstraction::new(&solver)),
        &options,
    );
    // single variable besides the program counter, no default predicate
    assert!(precision.predicates().is_empty());

    precision
        .refine(&build_expr!((and (<= (x@1: int) 3) (<= (x@1: int) 5) (>= (x@1: int) 0))))
        .unwrap();
    let preds: Set<String> = precision.predicates().iter().map(|p| p.to_string()).collect();
    assert_eq!(
        preds,
        ["(<= x 3)", "(>= x 0)"].iter().map(|s| s.to_string()).collect()
    );
    assert_eq!(precision.stats().subsumed_predicates, 1);
    assert_eq!(precision.subsumption_threshold(), 2);

    let abstraction = precision
        .compute_abstraction(&build_expr!((and (= (pc@1: int) 0) (= (x@1: int) 2))))
        .unwrap();
    assert_eq!(
        &abstraction.to_string(),
        "(and (= pc@1 0) (<= x@1 3) (>= x@1 0))"
    );
}

#[test]
fn subsumption_threshold_grows() {
    let vars = vec![("pc".to_string(), CType::int()), ("x".to_string(), CType::int())];
    let sys = Sys::new(
        vars,
        "pc",
        vec![0],
        build_expr!((= (pc: int) 0)),
        build_expr!((= (pc@2: int) (pc@1: int))),
        build_expr!((< (x: int) 10)),
    )
    .unwrap();
    let solver = solver();
    let options = PdrOptions::default()
        .with_initial_subsumption_threshold(0)
        .with_subsumption_threshold_step(10);
    let mut precision = PredicatePrecisionManager::new(
        &solver,
        &sys,
        Box::new(CartesianAbstraction::new(&solver)),
        &options,
    );
    precision.refine(&build_expr!((<= (x@1: int) 3))).unwrap();
    assert_eq!(precision.predicates().len(), 1);
    assert_eq!(precision.subsumption_threshold(), 10);
    assert_eq!(precision.stats().subsumption_rounds, 1);
}

fn states_at(location: Loc, formula: Expr) -> StatesWithLocation {
    StatesWithLocation::new(formula.clone(), location, formula)
}

#[test]
fn core_reduction_stays_non_initial() {
    let cfa = counter();
    let options = PdrOptions::default()
        .with_double_check_consecution(false)
        .with_drop_literals(false);

    // the core only needs `x = 0`, which intersects the initial states
    with_engine(&cfa, options.clone(), |engine, sys| {
        let frames = frames(sys, 0);
        let states = states_at(
            0,
            build_expr!((and (= (y@1: int) 1) (= (__pc@1: int) 0) (= (x@1: int) 0))),
        );
        let generalized = engine
            .consecution(&frames, 0, &states)
            .unwrap()
            .into_states();
        assert_eq!(generalized.formula(), states.formula());
        assert!(!engine.is_initial(generalized.formula()).unwrap());
        assert_eq!(engine.stats().unsat_core_reductions, 0);
    });

    // same states, the core now only needs `y = 1`
    with_engine(&cfa, options, |engine, sys| {
        let frames = frames(sys, 0);
        let states = states_at(
            0,
            build_expr!((and (= (__pc@1: int) 0) (= (x@1: int) 0) (= (y@1: int) 1))),
        );
        let res = engine.consecution(&frames, 0, &states).unwrap();
        assert!(res.is_inductive());
        assert_eq!(&res.states().formula().to_string(), "(= y@1 1)");
        assert_eq!(engine.stats().unsat_core_reductions, 1);
    })
}

#[test]
fn initial_cti_fails_lift_check() {
    let cfa = counter();
    let sys = Sys::of_cfa(
        &cfa,
        build_expr!((and (= (x: int) 9) (= (y: int) 0))),
        &ShutdownNotifier::new(),
    )
    .unwrap()
    .with_safety_property(build_expr!((< (x: int) 10)))
    .with_targets([0]);
    let forward = CfaForwardTransition::new(&cfa, ShutdownNotifier::new());
    let solver = solver();
    let frames = Frames::new(sys.initial_condition().clone());
    let options = PdrOptions::default()
        .with_abstraction(false)
        .with_double_check_consecution(false)
        .with_unsat_core(false)
        .with_drop_literals(false);

    let mut engine =
        PdrSmt::new(&solver, &sys, &forward, options.clone().with_check_postconditions(true))
            .unwrap();
    // the only CTI is the initial state, its lifting is initial too
    let err = engine.get_cti(&frames).unwrap_err();
    assert!(err.is_invariant());

    let mut engine =
        PdrSmt::new(&solver, &sys, &forward, options.with_check_postconditions(false)).unwrap();
    let cti = engine.get_cti(&frames).unwrap().unwrap().into_states();
    assert!(engine.is_initial(cti.formula()).unwrap());
}

#[test]
fn default_predicates() {
    let composite = || CType::Composite {
        name: "pair".into(),
        typ: Typ::Int,
    };
    let vars = vec![
        ("pc".to_string(), CType::int()),
        ("x".to_string(), CType::int()),
        ("y".to_string(), CType::int()),
        ("u".to_string(), CType::unsigned()),
        ("v".to_string(), CType::unsigned()),
        ("b".to_string(), CType::bool()),
        ("c".to_string(), CType::bool()),
        ("p".to_string(), composite()),
        ("q".to_string(), composite()),
    ];
    let sys = Sys::new(
        vars,
        "pc",
        vec![0],
        build_expr!((= (pc: int) 0)),
        build_expr!((= (pc@2: int) (pc@1: int))),
        build_expr!((< (x: int) 10)),
    )
    .unwrap();
    let solver = solver();
    let precision = PredicatePrecisionManager::new(
        &solver,
        &sys,
        Box::new(CartesianAbstraction::new(&solver)),
        &PdrOptions::default(),
    );
    let preds: Set<String> = precision.predicates().iter().map(|p| p.to_string()).collect();
    let expected: Set<String> = ["(< x y)", "(< y x)", "(< u v)", "(< v u)"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(preds, expected);
    assert_eq!(precision.stats().predicates_added, 4);
}

/// Blocks of several automata over the same locations.
struct Combined<'cfa>(Vec<CfaForwardTransition<'cfa>>);
impl<'cfa> ForwardTransition for Combined<'cfa> {
    fn blocks_from(&self, loc: Loc) -> Res<Vec<Block>> {
        let mut res = vec![];
        for forward in &self.0 {
            res.extend(forward.blocks_from(loc)?)
        }
        Ok(res)
    }
}

#[test]
fn connecting_block_policy() {
    let single = counter();
    // `0: if x < 5 { 1: y := * } else { 2: x := x + 1 }`, back to `0`
    let mut branching = Cfa::new(0);
    branching.declare("x", CType::int());
    branching.declare("y", CType::int());
    branching
        .add_edge(0, 1, Statement::assume(build_expr!((< (x: int) 5))))
        .unwrap();
    branching.add_edge(1, 0, Statement::nondet("y")).unwrap();
    branching
        .add_edge(0, 2, Statement::assume(build_expr!((>= (x: int) 5))))
        .unwrap();
    branching
        .add_edge(2, 0, Statement::assign("x", build_expr!((+ (x: int) 1))))
        .unwrap();

    let sys = system(&single);
    let forward = Combined(vec![
        CfaForwardTransition::new(&single, ShutdownNotifier::new()),
        CfaForwardTransition::new(&branching, ShutdownNotifier::new()),
    ]);
    let solver = solver();
    let nondet = |block: &Block| -> Vec<String> {
        block
            .unconstrained_nondet_vars()
            .iter()
            .map(Var::to_string)
            .collect()
    };

    let options = PdrOptions::default().with_connecting_block_policy(ConnectingBlockPolicy::First);
    let engine = PdrSmt::new(&solver, &sys, &forward, options).unwrap();
    let first = engine.connecting_block(0, 0).unwrap().unwrap();
    assert_eq!(first.disjunct_count(), 1);
    assert!(nondet(&first).is_empty());

    let options = PdrOptions::default();
    let engine = PdrSmt::new(&solver, &sys, &forward, options).unwrap();
    let most = engine.connecting_block(0, 0).unwrap().unwrap();
    assert_eq!(most.disjunct_count(), 2);
    assert_eq!(nondet(&most), vec!["y@2".to_string()]);

    assert!(engine.connecting_block(0, 7).unwrap().is_none());
}

#[test]
fn target_location_by_satisfiability() {
    let mut cfa = counter();
    cfa.add_edge(0, 1, Statement::assume(build_expr!((< (x: int) 5))))
        .unwrap();
    cfa.add_edge(0, 2, Statement::assume(build_expr!((>= (x: int) 5))))
        .unwrap();
    cfa.add_target(1);
    cfa.add_target(2);
    let sys = Sys::of_cfa(
        &cfa,
        build_expr!((and (= (x: int) 0) (= (y: int) 0))),
        &ShutdownNotifier::new(),
    )
    .unwrap();
    let forward = CfaForwardTransition::new(&cfa, ShutdownNotifier::new());
    let solver = solver();
    let engine = PdrSmt::new(&solver, &sys, &forward, PdrOptions::default()).unwrap();

    assert_eq!(engine.target_location_for(&state(7)).unwrap(), 2);
    assert_eq!(engine.target_location_for(&state(1)).unwrap(), 1);

    // no target block leaves `1`
    let stuck = states_at(1, build_expr!((and (= (__pc@1: int) 1) (= (x@1: int) 1))));
    let err = engine.target_location_for(&stuck).unwrap_err();
    assert!(err.is_invariant());
}
