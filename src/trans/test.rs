//! Tests over transition systems.

crate::prelude!();

use cfa::{Cfa, Statement};
use prover::finite::FiniteSolver;
use trans::{Sys, TransitionSystem, PC_NAME};

/// `0: loop { x := x + 1 }`, `y` is never assigned.
fn counter() -> Cfa {
    let mut cfa = Cfa::new(0);
    cfa.declare("x", CType::int());
    cfa.declare("y", CType::int());
    cfa.add_edge(0, 0, Statement::assign("x", build_expr!((+ (x: int) 1))))
        .unwrap();
    cfa
}

fn counter_sys() -> Sys {
    Sys::of_cfa(
        &counter(),
        build_expr!((and (= (x: int) 0) (= (y: int) 0))),
        &ShutdownNotifier::new(),
    )
    .unwrap()
}

#[test]
fn of_cfa() {
    let sys = counter_sys();
    assert_eq!(sys.program_counter_name(), PC_NAME);
    assert_eq!(
        &sys.initial_condition().to_string(),
        "(and (= __pc@1 0) (= x@1 0) (= y@1 0))"
    );
    assert_eq!(
        &sys.transition_relation().to_string(),
        "(and (= __pc@1 0) (= x@2 (+ x@1 1)) (= __pc@2 0) (= y@1 y@2))"
    );
    assert!(sys.safety_property().is_true());
    assert_eq!(
        sys.all_variable_names(),
        vec![PC_NAME.to_string(), "x".into(), "y".into()]
    );
    assert_eq!(sys.node_for_id(&Int::from(0)), Some(0));
    assert_eq!(sys.node_for_id(&Int::from(7)), None);
}

#[test]
fn steps() {
    let sys = counter_sys();
    let solver = FiniteSolver::new(-4, 12);
    let step = |post: Expr| {
        Expr::and(vec![
            sys.initial_condition().clone(),
            sys.transition_relation().clone(),
            sys.as_primed(&post),
        ])
    };
    assert!(!solver.is_unsat(&step(build_expr!((= (x: int) 1)))).unwrap());
    assert!(solver.is_unsat(&step(build_expr!((= (x: int) 2)))).unwrap());
    assert!(solver.is_unsat(&step(build_expr!((= (y: int) 1)))).unwrap());
}

#[test]
fn targets_and_properties() {
    let mut cfa = counter();
    cfa.add_edge(0, 1, Statement::assume(build_expr!((>= (x: int) 10))))
        .unwrap();
    cfa.add_target(1);
    let sys = Sys::of_cfa(&cfa, build_expr!((= (x: int) 0)), &ShutdownNotifier::new()).unwrap();
    assert_eq!(&sys.safety_property().to_string(), "(not (= __pc@1 1))");
    assert_eq!(sys.transition_relation().disjuncts().len(), 2);
    assert!(sys.target_locations().contains(&1));

    let sys = counter_sys()
        .with_safety_property(build_expr!((< (x: int) 10)))
        .with_targets([0]);
    assert_eq!(&sys.safety_property().to_string(), "(< x@1 10)");
    assert_eq!(
        &sys.as_primed(sys.safety_property()).to_string(),
        "(< x@2 10)"
    );
    assert!(sys.target_locations().contains(&0));
}

#[test]
fn ill_formed() {
    let mut cfa = counter();
    cfa.declare(PC_NAME, CType::int());
    assert!(Sys::of_cfa(&cfa, Expr::tru(), &ShutdownNotifier::new()).is_err());
    assert!(Sys::of_cfa(
        &counter(),
        build_expr!((= (z: int) 0)),
        &ShutdownNotifier::new()
    )
    .is_err());

    let vars = || vec![("x".to_string(), CType::int()), ("b".to_string(), CType::bool())];
    let prop = build_expr!((< (x: int) 10));
    assert!(Sys::new(vars(), "pc", vec![0], Expr::tru(), Expr::tru(), prop.clone()).is_err());
    assert!(Sys::new(vars(), "b", vec![0], Expr::tru(), Expr::tru(), prop.clone()).is_err());
    assert!(Sys::new(vars(), "x", vec![0], Expr::int(0), Expr::tru(), prop).is_err());
}
