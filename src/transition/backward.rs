//! Blocks entering a location, with an LRU cache.

crate::prelude!();

use std::cell::RefCell;

use indexmap::IndexMap;

use cfa::Loc;
use transition::{Block, Direction, ReachabilityAnalysis, ReachedState, StateId};

/// Default number of locations whose blocks are cached.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Computes the blocks whose successor is some location.
///
/// Results are cached per location, unfiltered. The least recently used entry is evicted when the
/// cache is full; evicted entries are recomputed on demand and yield the same blocks.
pub struct BackwardTransition<A> {
    analysis: A,
    /// Cache, most recently used entries last.
    cache: RefCell<IndexMap<Loc, Vec<Block>>>,
    capacity: usize,
    shutdown: ShutdownNotifier,
}
impl<A: ReachabilityAnalysis> BackwardTransition<A> {
    /// Constructor, fails if the analysis is not backward.
    pub fn new(analysis: A, shutdown: ShutdownNotifier) -> Res<Self> {
        if analysis.direction() != Direction::Backward {
            bail!("backward transitions require a backward analysis")
        }
        Ok(Self {
            analysis,
            cache: RefCell::new(IndexMap::new()),
            capacity: DEFAULT_CACHE_CAPACITY,
            shutdown,
        })
    }
    /// Sets the capacity of the cache, at least one location.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Number of cached locations.
    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    fn cache_get(&self, loc: Loc) -> Option<Vec<Block>> {
        let mut cache = self.cache.borrow_mut();
        let blocks = cache.shift_remove(&loc)?;
        cache.insert(loc, blocks.clone());
        trace!("block cache hit for {}", loc);
        Some(blocks)
    }
    fn cache_put(&self, loc: Loc, blocks: Vec<Block>) {
        let mut cache = self.cache.borrow_mut();
        cache.shift_remove(&loc);
        cache.insert(loc, blocks);
        while cache.len() > self.capacity {
            if let Some((evicted, _)) = cache.shift_remove_index(0) {
                debug!("evicting blocks to {} from the block cache", evicted)
            }
        }
    }

    /// Blocks whose successor is `loc`.
    pub fn blocks_to(&self, loc: Loc) -> Res<Vec<Block>> {
        if let Some(blocks) = self.cache_get(loc) {
            return Ok(blocks);
        }
        trace!("block cache miss for {}", loc);
        let reached = Rc::new(self.analysis.run(&[loc], &self.shutdown)?);
        let seed = match reached.initial_states() {
            [seed] => *seed,
            seeds => bail!(
                "nested analysis from a single location has {} seed state(s)",
                seeds.len()
            ),
        };
        let blocks: Vec<Block> = reached
            .block_starts()
            .map(|start| Block::new(Rc::clone(&reached), seed, start, Direction::Backward))
            .collect();
        debug!("{} block(s) to {}", blocks.len(), loc);
        self.cache_put(loc, blocks.clone());
        Ok(blocks)
    }

    /// Blocks whose successor is one of `locs` and whose predecessor verifies `filter`.
    ///
    /// Uncached locations are computed by a single shared run, whose blocks are then assigned to
    /// the seeds they descend from.
    pub fn blocks_to_all(
        &self,
        locs: &[Loc],
        filter: impl Fn(&ReachedState) -> bool,
    ) -> Res<Vec<Block>> {
        let mut blocks = vec![];
        let mut uncached = vec![];
        let mut seen = Set::new();
        for loc in locs {
            if !seen.insert(*loc) {
                continue;
            }
            match self.cache_get(*loc) {
                Some(cached) => blocks.extend(cached),
                None => uncached.push(*loc),
            }
        }

        match uncached.as_slice() {
            [] => (),
            [loc] => blocks.extend(self.blocks_to(*loc)?),
            _ => blocks.extend(self.shared_blocks_to(&uncached)?),
        }

        Ok(blocks
            .into_iter()
            .filter(|block| filter(block.predecessor()))
            .collect())
    }

    /// Computes and caches the blocks to several locations in a single run.
    fn shared_blocks_to(&self, locs: &[Loc]) -> Res<Vec<Block>> {
        trace!("block cache miss for {:?}", locs);
        let reached = Rc::new(self.analysis.run(locs, &self.shutdown)?);
        let seeds: Set<StateId> = reached.initial_states().iter().copied().collect();

        let mut per_loc: Map<Loc, Vec<Block>> = locs.iter().map(|loc| (*loc, vec![])).collect();
        for start in reached.block_starts() {
            self.shutdown.check()?;
            for seed in reached.ancestors_in(start, &seeds) {
                let loc = reached.state(seed).location();
                per_loc.entry(loc).or_insert_with(Vec::new).push(Block::new(
                    Rc::clone(&reached),
                    seed,
                    start,
                    Direction::Backward,
                ))
            }
        }

        let mut blocks = vec![];
        for (loc, loc_blocks) in per_loc {
            debug!("{} block(s) to {}", loc_blocks.len(), loc);
            blocks.extend(loc_blocks.iter().cloned());
            self.cache_put(loc, loc_blocks);
        }
        Ok(blocks)
    }
}
