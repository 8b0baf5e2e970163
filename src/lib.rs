//! Property-directed reachability (PDR/IC3) over predicate abstraction.
//!
//! This crate provides the SMT-query engine of a CTIGAR-style model checker: relative-induction
//! ("consecution") checks, counterexample-to-induction extraction, predecessor lifting and clause
//! generalization, plus the two components the engine leans on.
//!
//! - [`pdr::precision`] maintains the abstraction predicates, abstracts concrete formulas and
//!   refines the predicates from interpolants;
//! - [`transition`] computes one-step *blocks* between control-flow locations, with caching and
//!   direction inversion, and chains block formulas.
//!
//! The frame sequence, the transition system and the SMT solver are collaborators given to the
//! engine through traits ([`pdr::FrameSet`], [`trans::TransitionSystem`], [`prover::Solver`]).
//! Simple implementations ship with the crate: [`pdr::Frames`], [`trans::Sys`] (hand-written or
//! derived from a [`cfa::Cfa`]), a [`prover::z3::Z3`] backend over [`rsmt2`] and a pure-Rust
//! [`prover::finite::FiniteSolver`] over bounded integer domains.
//!
//! # Example
//!
//! ```rust
//! use ctigar::prelude::*;
//! use ctigar::{
//!     cfa::{Cfa, Statement},
//!     pdr::{ConsecutionResult, Frames, PdrOptions, PdrSmt},
//!     prover::finite::FiniteSolver,
//!     trans::{Sys, TransitionSystem},
//!     transition::CfaForwardTransition,
//! };
//!
//! // `x` counts up from `0`, the property is `x < 10`.
//! let mut cfa = Cfa::new(0);
//! cfa.declare("x", CType::int());
//! cfa.add_edge(0, 0, Statement::assign("x", build_expr!((+ (x: int) 1)))).unwrap();
//! let shutdown = ShutdownNotifier::new();
//! let sys = Sys::of_cfa(&cfa, build_expr!((= (x: int) 0)), &shutdown)
//!     .unwrap()
//!     .with_safety_property(build_expr!((< (x: int) 10)))
//!     .with_targets([0]);
//! let forward = CfaForwardTransition::new(&cfa, shutdown.clone());
//! let solver = FiniteSolver::new(-2, 12);
//! let mut pdr = PdrSmt::new(&solver, &sys, &forward, PdrOptions::default()).unwrap();
//!
//! let mut frames = Frames::new(sys.initial_condition().clone());
//! // the initial states are safe
//! assert!(pdr.get_cti(&frames).unwrap().is_none());
//! // the frontier frame is `true`, so some state at `x = 9` reaches the error
//! frames.push_level();
//! let cti = match pdr.get_cti(&frames).unwrap() {
//!     Some(ConsecutionResult::Predecessor(cti)) => cti,
//!     res => panic!("unexpected result {:?}", res),
//! };
//! assert_eq!(cti.location(), 0);
//! assert!(!pdr.is_initial(cti.formula()).unwrap());
//! ```

#![deny(missing_docs)]

pub extern crate rsmt2;

mod macros;

pub mod prelude;

pub mod cfa;
pub mod err;
pub mod expr;
pub mod pdr;
pub mod prover;
pub mod shutdown;
pub mod ssa;
pub mod trans;
pub mod transition;
