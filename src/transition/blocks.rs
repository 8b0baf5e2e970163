//! Utilities over sequences of blocks.
//!
//! Sequences are ordered *forward*, from the predecessor of the first block to the successor of the
//! last one, and must connect: the successor location of each block is the predecessor location of
//! the next one. Sequences that do not connect are rejected with an error.

crate::prelude!();

use cfa::Loc;
use transition::{Block, Direction, Reached, ReachedState, StateId};

/// Lifts a predicate over states to the predecessor of blocks.
pub fn apply_to_predecessor(
    pred: impl Fn(&ReachedState) -> bool,
) -> impl Fn(&Block) -> bool {
    move |block| pred(block.predecessor())
}
/// Lifts a predicate over locations to the predecessor of blocks.
pub fn apply_to_predecessor_location(pred: impl Fn(Loc) -> bool) -> impl Fn(&Block) -> bool {
    move |block| pred(block.predecessor_location())
}
/// Lifts a predicate over states to the successor of blocks.
pub fn apply_to_successor(pred: impl Fn(&ReachedState) -> bool) -> impl Fn(&Block) -> bool {
    move |block| pred(block.successor())
}
/// Lifts a predicate over locations to the successor of blocks.
pub fn apply_to_successor_location(pred: impl Fn(Loc) -> bool) -> impl Fn(&Block) -> bool {
    move |block| pred(block.successor_location())
}

/// Block formula with inverted indices.
///
/// Indices are inverted with respect to the context of the end of the block: the successor's for
/// forward blocks, the predecessor's for backward ones.
///
/// # Examples
///
/// For a backward block over `x := x + 1`, the formula is `x@1 = x@2 + 1`: the successor's `x` is
/// at index `1`. Inverting it yields the forward view `x@2 = x@1 + 1`.
pub fn formula_with_inverted_indices(block: &Block) -> Expr {
    let ctx = match block.direction() {
        Direction::Forward => block.primed_context(),
        Direction::Backward => block.unprimed_context(),
    };
    ssa::invert_indices(block.formula(), &ctx)
}

fn check_connected(blocks: &[Block]) -> Res<()> {
    for pair in blocks.windows(2) {
        if pair[0].successor_location() != pair[1].predecessor_location() {
            bail!("blocks `{}` and `{}` do not connect", pair[0], pair[1])
        }
    }
    Ok(())
}

/// Conjunction of forward-oriented block formulas, each shifted so that its starting indices are
/// the ending indices of the previous ones.
///
/// `run_formula` extracts, from a block, a formula over the indices of the run it comes from.
fn conjoin_formulas(blocks: &[Block], run_formula: impl Fn(&Block) -> Expr) -> Res<Expr> {
    check_connected(blocks)?;
    let mut parts = Vec::with_capacity(blocks.len());
    let mut prev: Option<SsaMap> = None;

    for block in blocks {
        let formula = block.forward_oriented(&run_formula(block));
        let end = block.end_context();
        match prev {
            None => {
                parts.push(formula);
                prev = Some(end);
            }
            Some(prev_ctx) => {
                let offset = |name: &str| prev_ctx.index(name).unwrap_or(1);
                parts.push(ssa::reindex(&formula, &end, |name, idx| {
                    offset(name) + idx - 1
                }));
                let mut next = prev_ctx.clone();
                for (name, idx, ctype) in end.iter() {
                    next.set(name, ctype.clone(), offset(name) + idx - 1)
                }
                prev = Some(next);
            }
        }
    }
    Ok(Expr::and(parts))
}

/// Conjunction of the block formulas of a connected sequence of blocks.
///
/// The formula of each block is shifted so that its predecessor indices are the successor indices
/// of the previous block: an index `i` of variable `v` becomes `prev(v) + i - 1`.
pub fn conjoin_block_formulas(blocks: &[Block]) -> Res<Expr> {
    conjoin_formulas(blocks, |block| block.run_formula().clone())
}

/// Conjunction of the branching formulas of the runs of a connected sequence of blocks, shifted
/// like [`conjoin_block_formulas`] does.
pub fn conjoin_branching_formulas(blocks: &[Block]) -> Res<Expr> {
    conjoin_formulas(blocks, |block| block.reached().branching_formula())
}

/// An element of an [`ArgPath`].
#[derive(Debug, Clone)]
pub struct PathElement {
    /// Run the state belongs to.
    pub reached: Rc<Reached>,
    /// State.
    pub state: StateId,
}
impl PathElement {
    /// State accessor.
    pub fn state(&self) -> &ReachedState {
        self.reached.state(self.state)
    }
}

/// A path through the runs of a sequence of blocks, in program order.
#[derive(Debug, Clone)]
pub struct ArgPath {
    elems: Vec<PathElement>,
}
impl ArgPath {
    /// Elements of the path.
    pub fn elems(&self) -> &[PathElement] {
        &self.elems
    }
    /// Locations along the path.
    pub fn locations(&self) -> Vec<Loc> {
        self.elems.iter().map(|elem| elem.state().location()).collect()
    }
    /// Number of states.
    pub fn len(&self) -> usize {
        self.elems.len()
    }
    /// True if the path has no state.
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

/// Path in program order through the runs of a connected sequence of backward blocks.
///
/// `branching` decides which child branching states follow, see [`Reached::path_between`]. The
/// state shared by two consecutive blocks appears once.
pub fn combine_arg_paths(blocks: &[Block], branching: &Map<usize, bool>) -> Res<ArgPath> {
    if blocks.is_empty() {
        bail!("cannot build a path from an empty sequence of blocks")
    }
    check_connected(blocks)?;

    let mut elems: Vec<PathElement> = vec![];
    for block in blocks {
        if block.run_direction() != Direction::Backward || block.is_inverted() {
            bail!("paths can only be combined from backward blocks, got `{}`", block)
        }
        let reached = block.reached();
        let mut states = reached
            .path_between(block.first_state(), block.last_state(), branching)
            .ok_or_else(|| format!("no path through the run of block `{}`", block))?;
        // the run goes from the successor to the predecessor
        states.reverse();
        let skip = usize::from(!elems.is_empty());
        elems.extend(states.into_iter().skip(skip).map(|state| PathElement {
            reached: Rc::clone(reached),
            state,
        }));
    }
    Ok(ArgPath { elems })
}

/// Merges the runs of a connected sequence of blocks into a single reached set.
///
/// Runs are chained in the order they were computed in: program order for forward blocks, reverse
/// program order for backward ones. The seed of each run is identified with the block start the
/// previous run ended at, the seed's children become children of that state.
pub fn combine_reached_sets(blocks: &[Block]) -> Res<Reached> {
    check_connected(blocks)?;
    let backward = match blocks.first() {
        None => return Ok(Reached::new()),
        Some(block) => block.run_direction() == Direction::Backward,
    };
    for block in blocks {
        if block.is_inverted() || (block.run_direction() == Direction::Backward) != backward {
            bail!("cannot combine the run of `{}` with runs of the other direction", block)
        }
    }
    let ordered: Vec<&Block> = if backward {
        blocks.iter().rev().collect()
    } else {
        blocks.iter().collect()
    };

    let mut target = Reached::new();
    let mut previous: Option<StateId> = None;

    for block in ordered {
        let reached = block.reached();
        let first = block.first_state();
        let mut ids: Map<StateId, StateId> = Map::new();

        match previous {
            None => {
                ids.insert(first, target.add_copy(reached.state(first), true));
            }
            Some(prev) => {
                let (prev_loc, first_loc) =
                    (target.state(prev).location(), reached.state(first).location());
                if prev_loc != first_loc {
                    bail!(
                        "cannot splice the run of `{}` at {} onto location {}",
                        block,
                        first_loc,
                        prev_loc
                    )
                }
                ids.insert(first, prev);
            }
        }

        for (id, state) in reached.iter() {
            if id != first {
                ids.insert(id, target.add_copy(state, false));
            }
        }
        for (id, state) in reached.iter() {
            for child in state.children() {
                target.add_edge(ids[&id], ids[child]);
            }
        }

        previous = Some(ids[&block.last_state()]);
    }
    Ok(target)
}
