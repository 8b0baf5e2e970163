//! Property-directed reachability over predicate abstraction.
//!
//! [`PdrSmt`] issues the SMT queries of a CTIGAR-style PDR loop: counterexample-to-induction
//! extraction ([`PdrSmt::get_cti`]), relative induction ([`PdrSmt::consecution`]) with lifting and
//! generalization of the states involved. The driver owning the [`FrameSet`] decides what to do
//! with the results.
//!
//! Predecessor states are abstracted over the predicates of a [`PredicatePrecisionManager`], which
//! refines them from interpolants whenever an abstraction turns out to be too coarse.

crate::prelude!();

pub mod frames;
pub mod options;
pub mod precision;
pub mod smt;
pub mod stats;

#[cfg(test)]
mod test;

pub use self::{
    frames::{FrameSet, Frames},
    options::{ConnectingBlockPolicy, PdrOptions},
    precision::{
        AbstractionOracle, CartesianAbstraction, Predicate, PredicatePrecisionManager,
        PredicateSet,
    },
    smt::{ConsecutionResult, PdrSmt, StatesWithLocation},
    stats::{AbstractionStats, PdrStats},
};
