//! Tests over blocks and block transitions.

crate::prelude!();

use cfa::{BlockAnalysis, Cfa, Statement};
use prover::finite::FiniteSolver;
use transition::{blocks, BackwardTransition, Block, CfaForwardTransition, ForwardTransition};

/// `1: x := x + 1; 2: y := x; 3: error`, `2` is a block head.
fn chain() -> Cfa {
    let mut cfa = Cfa::new(1);
    cfa.declare("x", CType::int());
    cfa.declare("y", CType::int());
    cfa.add_edge(1, 2, Statement::assign("x", build_expr!((+ (x: int) 1))))
        .unwrap();
    cfa.add_edge(2, 3, Statement::assign("y", build_expr!((x: int))))
        .unwrap();
    cfa.mark_block_head(2);
    cfa.add_target(3);
    cfa
}

fn backward(cfa: &Cfa) -> BackwardTransition<BlockAnalysis> {
    BackwardTransition::new(BlockAnalysis::backward(cfa), ShutdownNotifier::new()).unwrap()
}

fn single(blocks: Vec<Block>) -> Block {
    assert_eq!(blocks.len(), 1, "expected a single block");
    blocks.into_iter().next().unwrap()
}

#[test]
fn backward_blocks() {
    let cfa = chain();
    let trans = backward(&cfa);
    let b12 = single(trans.blocks_to(2).unwrap());
    assert_eq!(
        (b12.predecessor_location(), b12.successor_location()),
        (1, 2)
    );
    assert_eq!(&b12.formula().to_string(), "(= x@1 (+ x@2 1))");
    assert_eq!(
        &blocks::formula_with_inverted_indices(&b12).to_string(),
        "(= x@2 (+ x@1 1))"
    );

    let b23 = single(trans.blocks_to(3).unwrap());
    assert_eq!(
        (b23.predecessor_location(), b23.successor_location()),
        (2, 3)
    );
    assert!(trans.blocks_to(1).unwrap().is_empty());
}

#[test]
fn inversion() {
    let cfa = chain();
    let trans = backward(&cfa);
    let block = single(trans.blocks_to(2).unwrap());
    let inverted = block.invert_direction();

    assert!(inverted.is_inverted());
    assert_ne!(inverted, block);
    assert_eq!(inverted.predecessor_location(), 2);
    assert_eq!(inverted.successor_location(), 1);
    assert_eq!(inverted.direction(), transition::Direction::Forward);
    assert_eq!(
        inverted.formula(),
        &blocks::formula_with_inverted_indices(&block)
    );
    // memoized
    assert!(std::ptr::eq(inverted.formula(), inverted.formula()));

    let back = inverted.invert_direction();
    assert_eq!(back, block);
    assert_eq!(back.formula(), block.formula());
}

#[test]
fn chained_formulas() {
    let cfa = chain();
    let trans = backward(&cfa);
    let b12 = single(trans.blocks_to(2).unwrap());
    let b23 = single(trans.blocks_to(3).unwrap());
    let chained = blocks::conjoin_block_formulas(&[b12.clone(), b23.clone()]).unwrap();
    assert_eq!(
        &chained.to_string(),
        "(and (= x@2 (+ x@1 1)) (= y@2 x@2))"
    );

    let solver = FiniteSolver::new(-4, 12);
    let from_zero = Expr::and(vec![chained.clone(), build_expr!((= (x@1: int) 0))]);
    assert!(!solver.is_unsat(&from_zero).unwrap());
    let y_zero = Expr::and(vec![from_zero, build_expr!((= (y@2: int) 0))]);
    assert!(solver.is_unsat(&y_zero).unwrap());

    assert!(blocks::conjoin_block_formulas(&[b23, b12]).is_err());
}

#[test]
fn arg_paths_and_reached_sets() {
    let cfa = chain();
    let trans = backward(&cfa);
    let b12 = single(trans.blocks_to(2).unwrap());
    let b23 = single(trans.blocks_to(3).unwrap());
    let seq = [b12.clone(), b23.clone()];

    let path = blocks::combine_arg_paths(&seq, &Map::new()).unwrap();
    assert_eq!(path.locations(), vec![1, 2, 3]);
    assert!(blocks::combine_arg_paths(&[], &Map::new()).is_err());
    assert!(blocks::combine_arg_paths(&[b12.invert_direction()], &Map::new()).is_err());

    let reached = blocks::combine_reached_sets(&seq).unwrap();
    assert_eq!(reached.len(), 3);
    let initial = reached.initial_states();
    assert_eq!(initial.len(), 1);
    assert_eq!(reached.state(initial[0]).location(), 3);
    let locs: Set<cfa::Loc> = reached.iter().map(|(_, state)| state.location()).collect();
    assert_eq!(locs, [1, 2, 3].into_iter().collect());
}

#[test]
fn cache() {
    let cfa = chain();
    let trans = backward(&cfa).with_capacity(1);
    let first = trans.blocks_to(2).unwrap();
    let second = trans.blocks_to(2).unwrap();
    assert_eq!(first, second);
    assert!(Rc::ptr_eq(first[0].reached(), second[0].reached()));
    assert_eq!(trans.cached_len(), 1);

    // evicts the blocks to `2`
    trans.blocks_to(3).unwrap();
    assert_eq!(trans.cached_len(), 1);
    let third = trans.blocks_to(2).unwrap();
    assert!(!Rc::ptr_eq(first[0].reached(), third[0].reached()));
    assert_eq!(first[0].formula(), third[0].formula());
}

fn summary(blocks: &[Block]) -> Set<(cfa::Loc, cfa::Loc, String)> {
    blocks
        .iter()
        .map(|block| {
            (
                block.predecessor_location(),
                block.successor_location(),
                block.formula().to_string(),
            )
        })
        .collect()
}

#[test]
fn batched_blocks() {
    let cfa = chain();
    let batched = backward(&cfa)
        .blocks_to_all(&[2, 3, 2], |_| true)
        .unwrap();

    let separate = backward(&cfa);
    let mut union = separate.blocks_to(2).unwrap();
    union.extend(separate.blocks_to(3).unwrap());
    assert_eq!(batched.len(), 2);
    assert_eq!(summary(&batched), summary(&union));

    let filtered = backward(&cfa)
        .blocks_to_all(&[2, 3], |state| state.location() == 1)
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].successor_location(), 2);

    let trans = backward(&cfa);
    trans.blocks_to_all(&[2, 3], |_| true).unwrap();
    assert_eq!(trans.cached_len(), 2);
}

#[test]
fn forward_blocks() {
    let cfa = chain();
    let forward = CfaForwardTransition::new(&cfa, ShutdownNotifier::new());
    let b12 = single(forward.blocks_from(1).unwrap());
    assert_eq!(
        (b12.predecessor_location(), b12.successor_location()),
        (1, 2)
    );
    assert_eq!(&b12.formula().to_string(), "(= x@2 (+ x@1 1))");
    assert!(forward.blocks_from(3).unwrap().is_empty());
}

#[test]
fn wrong_direction() {
    let cfa = chain();
    assert!(
        BackwardTransition::new(BlockAnalysis::forward(&cfa), ShutdownNotifier::new()).is_err()
    );
}

#[test]
fn interrupted() {
    let cfa = chain();
    let shutdown = ShutdownNotifier::new();
    let trans = BackwardTransition::new(BlockAnalysis::backward(&cfa), shutdown.clone()).unwrap();
    shutdown.request_shutdown();
    let err = trans.blocks_to(3).unwrap_err();
    assert!(err.is_interrupted());
}

/// `0: if x < 5 { 1: x := x + 1 } else { 2: x := * } 3: error`
fn diamond() -> Cfa {
    let mut cfa = Cfa::new(0);
    cfa.declare("x", CType::int());
    cfa.add_edge(0, 1, Statement::assume(build_expr!((< (x: int) 5))))
        .unwrap();
    cfa.add_edge(1, 3, Statement::assign("x", build_expr!((+ (x: int) 1))))
        .unwrap();
    cfa.add_edge(0, 2, Statement::assume(build_expr!((>= (x: int) 5))))
        .unwrap();
    cfa.add_edge(2, 3, Statement::nondet("x")).unwrap();
    cfa.add_target(3);
    cfa
}

#[test]
fn diamond_summarized_backward() {
    let cfa = diamond();
    let trans = backward(&cfa);
    let block = single(trans.blocks_to(3).unwrap());
    assert_eq!(
        (block.predecessor_location(), block.successor_location()),
        (0, 3)
    );
    assert_eq!(
        &block.formula().to_string(),
        "(or (and (= x@1 (+ x@2 1)) (< x@2 5)) (>= x@2 5))"
    );
    assert_eq!(block.disjunct_count(), 2);
    let nondet: Vec<String> = block
        .unconstrained_nondet_vars()
        .iter()
        .map(Var::to_string)
        .collect();
    assert_eq!(nondet, vec!["x@1".to_string()]);

    // both paths are parents of the block start
    let start = block.reached().state(block.last_state());
    assert_eq!(start.parents().len(), 2);
    let seeds: Set<_> = block.reached().initial_states().iter().copied().collect();
    assert_eq!(
        block.reached().ancestors_in(block.last_state(), &seeds),
        seeds
    );

    let solver = FiniteSolver::new(-4, 12);
    let inverted = block.invert_direction();
    // `x = 7` goes through the nondet branch, anything can follow
    let from_seven = Expr::and(vec![
        inverted.formula().clone(),
        build_expr!((= (x@1: int) 7)),
        build_expr!((= (x@2: int) 0)),
    ]);
    assert!(!solver.is_unsat(&from_seven).unwrap());
    let from_two = Expr::and(vec![
        inverted.formula().clone(),
        build_expr!((= (x@1: int) 2)),
        build_expr!((= (x@2: int) 0)),
    ]);
    assert!(solver.is_unsat(&from_two).unwrap());
}

#[test]
fn diamond_summarized_forward() {
    let cfa = diamond();
    let forward = CfaForwardTransition::new(&cfa, ShutdownNotifier::new());
    let block = single(forward.blocks_from(0).unwrap());
    assert_eq!(block.successor_location(), 3);
    assert_eq!(
        &block.formula().to_string(),
        "(or (and (< x@1 5) (= x@2 (+ x@1 1))) (>= x@1 5))"
    );
    assert_eq!(block.disjunct_count(), 2);
    assert!(block
        .unconstrained_nondet_vars()
        .contains(&Var::new_at("x", Typ::Int, 2)));
}

#[test]
fn diamond_shared_run() {
    let mut cfa = diamond();
    cfa.add_edge(3, 4, Statement::assume(build_expr!((> (x: int) 0))))
        .unwrap();
    cfa.add_target(4);
    let batched = backward(&cfa).blocks_to_all(&[3, 4], |_| true).unwrap();
    let separate = backward(&cfa);
    let mut union = separate.blocks_to(3).unwrap();
    union.extend(separate.blocks_to(4).unwrap());
    assert_eq!(batched.len(), 2);
    assert_eq!(summary(&batched), summary(&union));
}
