//! Tests over SSA transformations.

crate::prelude!();

use ssa::{instantiate, invert_indices, reindex, uninstantiate};

fn ctx() -> SsaMap {
    SsaMap::new()
        .with("x", CType::int(), 3)
        .with("y", CType::int(), 2)
}

#[test]
fn instantiation_round_trip() {
    let expr = build_expr!((and (< (x: int) (y: int)) (b: bool)));
    let inst = instantiate(&expr, &ctx());
    assert_eq!(&inst.to_string(), "(and (< x@3 y@2) b)");
    assert_eq!(uninstantiate(&inst), expr);
}

#[test]
fn default_index() {
    let expr = build_expr!((= (z: int) (x: int)));
    let inst = instantiate(&expr, &ctx().with_default(1));
    assert_eq!(&inst.to_string(), "(= z@1 x@3)");
}

#[test]
fn chaining_offset() {
    // shift a formula over `x@1 .. x@3` so that it starts at `x@3`
    let expr = build_expr!((and (= (x@2: int) (+ (x@1: int) 1)) (= (x@3: int) (x@2: int))));
    let prev = ctx();
    let shifted = reindex(&expr, &ctx(), |name, idx| {
        prev.index(name).unwrap_or(1) + idx - 1
    });
    assert_eq!(
        &shifted.to_string(),
        "(and (= x@4 (+ x@3 1)) (= x@5 x@4))"
    );
}

#[test]
fn inversion_leaves_out_of_range_alone() {
    let expr = build_expr!((and (= (y@1: int) (y@2: int)) (< (y@5: int) (z@1: int))));
    let inverted = invert_indices(&expr, &ctx());
    assert_eq!(
        &inverted.to_string(),
        "(and (= y@2 y@1) (< y@5 z@1))"
    );
    assert_eq!(invert_indices(&inverted, &ctx()), expr);
}

#[test]
fn merge_max() {
    let lft = ctx();
    let rgt = SsaMap::new()
        .with("x", CType::int(), 1)
        .with("z", CType::bool(), 4);
    let merged = lft.merge_max(&rgt);
    assert_eq!(merged.index("x"), Some(3));
    assert_eq!(merged.index("y"), Some(2));
    assert_eq!(merged.index("z"), Some(4));
}

#[test]
fn path_merge() {
    let start = SsaMap::new()
        .with("x", CType::int(), 1)
        .with("y", CType::int(), 1);
    // x := x + 1
    let incr = PathFormula::new(
        build_expr!((= (x@2: int) (+ (x@1: int) 1))),
        start.clone().with("x", CType::int(), 2),
        Set::new(),
    );
    // y := *
    let mut havoc = PathFormula::new(
        Expr::tru(),
        start.with("y", CType::int(), 2),
        Set::new(),
    );
    havoc.add_nondet(Var::new_at("y", Typ::Int, 2));

    let merged = incr.merge(&havoc);
    assert_eq!(
        &merged.formula().to_string(),
        "(or (and (= x@2 (+ x@1 1)) (= y@2 y@1)) (= x@2 x@1))"
    );
    assert_eq!(merged.ssa().index("x"), Some(2));
    assert_eq!(merged.ssa().index("y"), Some(2));
    assert!(merged.nondet().contains(&Var::new_at("y", Typ::Int, 2)));
}
