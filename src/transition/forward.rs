//! Blocks leaving a location.

crate::prelude!();

use std::cell::RefCell;

use cfa::{BlockAnalysis, Cfa, Loc};
use transition::{Block, Direction, ReachabilityAnalysis};

/// Provides the blocks whose predecessor is some location.
pub trait ForwardTransition {
    /// Blocks leaving `loc`.
    fn blocks_from(&self, loc: Loc) -> Res<Vec<Block>>;
}

/// Forward blocks over a [`Cfa`], cached per location.
pub struct CfaForwardTransition<'cfa> {
    analysis: BlockAnalysis<'cfa>,
    cache: RefCell<Map<Loc, Vec<Block>>>,
    shutdown: ShutdownNotifier,
}
impl<'cfa> CfaForwardTransition<'cfa> {
    /// Constructor.
    pub fn new(cfa: &'cfa Cfa, shutdown: ShutdownNotifier) -> Self {
        Self {
            analysis: BlockAnalysis::forward(cfa),
            cache: RefCell::new(Map::new()),
            shutdown,
        }
    }
}
impl<'cfa> ForwardTransition for CfaForwardTransition<'cfa> {
    fn blocks_from(&self, loc: Loc) -> Res<Vec<Block>> {
        if let Some(blocks) = self.cache.borrow().get(&loc) {
            return Ok(blocks.clone());
        }
        let reached = Rc::new(self.analysis.run(&[loc], &self.shutdown)?);
        let blocks: Vec<Block> = reached
            .initial_states()
            .iter()
            .flat_map(|seed| {
                let reached = &reached;
                reached
                    .block_starts()
                    .map(move |start| Block::new(Rc::clone(reached), *seed, start, Direction::Forward))
            })
            .collect();
        trace!("{} block(s) from {}", blocks.len(), loc);
        self.cache.borrow_mut().insert(loc, blocks.clone());
        Ok(blocks)
    }
}
