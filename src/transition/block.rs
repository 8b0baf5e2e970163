//! Blocks: one-step transitions between two block heads.

crate::prelude!();

use once_cell::unsync::OnceCell;

use cfa::Loc;
use transition::{Reached, ReachedState, StateId};

/// Direction of an analysis, or of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    /// From predecessors to successors.
    Forward,
    /// From successors to predecessors.
    Backward,
}
impl Direction {
    /// The other direction.
    pub fn inverse(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// Data shared by a block and its inverted view.
#[derive(Debug)]
struct BlockCore {
    /// Run the block comes from.
    reached: Rc<Reached>,
    /// Seed of the run.
    first: StateId,
    /// Block start the block ends at.
    last: StateId,
    /// Direction of the run.
    direction: Direction,
    /// Formula with inverted indices, computed at most once.
    inverted: OnceCell<Expr>,
}

/// A one-step transition between two locations.
///
/// A block is extracted from a nested run: it goes from the seed of the run to a block start, and
/// its formula is the disjunction of all the paths between the two. For a backward run, the block
/// start is the predecessor and the seed the successor; the formula then mentions the successor's
/// variables at index `1` and the predecessor's at the largest indices.
///
/// [`Block::invert_direction`] views the same block in the other direction; inverting twice yields
/// a block equal to the original, sharing its data.
#[derive(Debug, Clone)]
pub struct Block {
    core: Rc<BlockCore>,
    inverted: bool,
}
impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core) && self.inverted == other.inverted
    }
}
impl Eq for Block {}

impl Block {
    /// Constructor, `first` is the seed of the run and `last` a block start.
    pub fn new(reached: Rc<Reached>, first: StateId, last: StateId, direction: Direction) -> Self {
        Self {
            core: Rc::new(BlockCore {
                reached,
                first,
                last,
                direction,
                inverted: OnceCell::new(),
            }),
            inverted: false,
        }
    }

    /// Same block, other direction.
    pub fn invert_direction(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            inverted: !self.inverted,
        }
    }
    /// True if `self` is the inverted view of a block.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Direction of the block.
    pub fn direction(&self) -> Direction {
        if self.inverted {
            self.core.direction.inverse()
        } else {
            self.core.direction
        }
    }
    /// Direction of the run the block comes from.
    pub fn run_direction(&self) -> Direction {
        self.core.direction
    }

    /// Run the block comes from.
    pub fn reached(&self) -> &Rc<Reached> {
        &self.core.reached
    }
    /// Seed of the run.
    pub fn first_state(&self) -> StateId {
        self.core.first
    }
    /// Block start the block ends at.
    pub fn last_state(&self) -> StateId {
        self.core.last
    }

    /// Predecessor and successor state ids, in the run's direction.
    fn endpoints(&self) -> (StateId, StateId) {
        match self.core.direction {
            Direction::Forward => (self.core.first, self.core.last),
            Direction::Backward => (self.core.last, self.core.first),
        }
    }

    /// Predecessor state.
    pub fn predecessor(&self) -> &ReachedState {
        let (pred, succ) = self.endpoints();
        self.core
            .reached
            .state(if self.inverted { succ } else { pred })
    }
    /// Successor state.
    pub fn successor(&self) -> &ReachedState {
        let (pred, succ) = self.endpoints();
        self.core
            .reached
            .state(if self.inverted { pred } else { succ })
    }
    /// Predecessor location.
    pub fn predecessor_location(&self) -> Loc {
        self.predecessor().location()
    }
    /// Successor location.
    pub fn successor_location(&self) -> Loc {
        self.successor().location()
    }

    /// Path formula of the run at the end of the block.
    fn end_path(&self) -> &PathFormula {
        self.core.reached.state(self.core.last).path()
    }
    /// Block formula over the indices of the run, regardless of inversion.
    pub fn run_formula(&self) -> &Expr {
        self.end_path().formula()
    }
    /// SSA context at the end of the run, every variable is at its largest index.
    pub fn end_context(&self) -> SsaMap {
        self.end_path().ssa().with_default(1)
    }

    /// Block formula.
    pub fn formula(&self) -> &Expr {
        if self.inverted {
            self.core.inverted.get_or_init(|| {
                ssa::invert_indices(self.end_path().formula(), &self.end_context())
            })
        } else {
            self.end_path().formula()
        }
    }

    /// Orients a formula over the run's indices in the forward direction.
    pub(crate) fn forward_oriented(&self, formula: &Expr) -> Expr {
        match self.core.direction {
            Direction::Forward => formula.clone(),
            Direction::Backward => ssa::invert_indices(formula, &self.end_context()),
        }
    }

    /// SSA context of the predecessor.
    pub fn unprimed_context(&self) -> SsaMap {
        let (pred, succ) = self.endpoints();
        let id = if self.inverted { succ } else { pred };
        self.core.reached.state(id).path().ssa().with_default(1)
    }
    /// SSA context of the successor.
    pub fn primed_context(&self) -> SsaMap {
        let (pred, succ) = self.endpoints();
        let id = if self.inverted { pred } else { succ };
        self.core.reached.state(id).path().ssa().with_default(1)
    }

    /// Variables assigned nondeterministically along the block, at the index of the formula.
    pub fn unconstrained_nondet_vars(&self) -> Set<Var> {
        let nondet = self.end_path().nondet();
        if !self.inverted {
            return nondet.clone();
        }
        let ctx = self.end_context();
        nondet
            .iter()
            .map(|var| match (var.idx(), ctx.index(var.id())) {
                (Some(idx), Some(max)) if 1 <= idx && idx <= max => var.at(max - idx + 1),
                _ => var.clone(),
            })
            .collect()
    }

    /// Number of top-level disjuncts of the formula.
    pub fn disjunct_count(&self) -> usize {
        self.formula().disjuncts().len()
    }
}
impl fmt::Display for Block {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{} --[{:?}]--> {}",
            self.predecessor_location(),
            self.direction(),
            self.successor_location()
        )
    }
}
