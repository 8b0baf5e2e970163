//! Block transitions between control-flow locations.
//!
//! A nested reachability analysis ([`ReachabilityAnalysis`]) explores the control flow from some
//! seed locations and stops at block heads. Each stop state, together with the seed it descends
//! from, yields a [`Block`]: the SMT-level summary of the paths between two block heads.
//!
//! - [`backward::BackwardTransition`] computes the blocks *entering* a location, with caching;
//! - [`forward::ForwardTransition`] provides the blocks *leaving* a location;
//! - [`blocks`] chains blocks into path formulas and stitches their runs together.

crate::prelude!();

use cfa::Loc;

pub mod backward;
pub mod block;
pub mod blocks;
pub mod forward;
pub mod reached;

#[cfg(test)]
mod test;

pub use self::{
    backward::BackwardTransition,
    block::{Block, Direction},
    forward::{CfaForwardTransition, ForwardTransition},
    reached::{Reached, ReachedState, StateId},
};

/// A bounded nested reachability analysis.
pub trait ReachabilityAnalysis {
    /// Direction the analysis explores the control flow in.
    fn direction(&self) -> Direction;
    /// Runs the analysis from some seed locations, one seed state per location.
    ///
    /// Fails with [`Error::Interrupted`] when `shutdown` requests it.
    fn run(&self, seeds: &[Loc], shutdown: &ShutdownNotifier) -> Res<Reached>;
}
