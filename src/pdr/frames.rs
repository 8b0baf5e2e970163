//! Frame sequences.

crate::prelude!();

/// The frame sequence `F_0, F_1, ..., F_k` the engine checks relative induction against.
///
/// Implementations guarantee that no frame excludes an initial state, and that `F_{i+1}` is never
/// weaker than `F_i`.
pub trait FrameSet {
    /// Clauses of `F_level`, to be conjoined.
    fn states(&self, level: usize) -> Res<Vec<Expr>>;
    /// Index of the last frame.
    fn max_level(&self) -> usize;
}

/// Delta-encoded frames.
///
/// `F_0` is the initial condition. A clause added at level `i > 0` belongs to all frames `F_1` to
/// `F_i`.
///
/// # Examples
///
/// ```rust
/// # use ctigar::{build_expr, pdr::{FrameSet, Frames}};
/// let mut frames = Frames::new(build_expr!((= (x@1: int) 0)));
/// frames.push_level();
/// frames.push_level();
/// frames.add_clause(2, build_expr!((>= (x@1: int) 0))).unwrap();
/// assert_eq!(frames.max_level(), 2);
/// assert_eq!(frames.states(1).unwrap().len(), 1);
/// assert_eq!(frames.states(2).unwrap().len(), 1);
/// assert!(frames.add_clause(3, build_expr!((>= (x@1: int) 0))).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Frames {
    init: Expr,
    /// Clauses per level, index `0` is unused.
    deltas: Vec<Vec<Expr>>,
}
impl Frames {
    /// Constructor, a single frame `F_0`.
    pub fn new(init: Expr) -> Self {
        Self {
            init,
            deltas: vec![vec![]],
        }
    }

    /// Adds a new frame `true` at the end of the sequence.
    pub fn push_level(&mut self) -> usize {
        self.deltas.push(vec![]);
        self.max_level()
    }

    /// Adds a clause to all frames from `1` to `level`.
    pub fn add_clause(&mut self, level: usize, clause: Expr) -> Res<()> {
        if level == 0 || level > self.max_level() {
            bail!(
                "cannot add a clause at level {}, levels range from 1 to {}",
                level,
                self.max_level()
            )
        }
        let known = self.deltas[level..].iter().any(|delta| delta.contains(&clause));
        if !known {
            trace!("F_{} += {}", level, clause);
            self.deltas[level].push(clause)
        }
        Ok(())
    }
}
impl FrameSet for Frames {
    fn states(&self, level: usize) -> Res<Vec<Expr>> {
        if level > self.max_level() {
            bail!("no frame at level {}, last frame is F_{}", level, self.max_level())
        }
        if level == 0 {
            return Ok(vec![self.init.clone()]);
        }
        Ok(self.deltas[level..].iter().flatten().cloned().collect())
    }
    fn max_level(&self) -> usize {
        self.deltas.len() - 1
    }
}
impl fmt::Display for Frames {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "F_0: {}", self.init)?;
        for (level, delta) in self.deltas.iter().enumerate().skip(1) {
            write!(fmt, "\nF_{}:", level)?;
            for clause in delta {
                write!(fmt, " {}", clause)?;
            }
        }
        Ok(())
    }
}
