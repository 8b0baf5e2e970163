//! Engine statistics.

crate::prelude!();

use std::time::{Duration, Instant};

/// Accumulates the time spent in a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    total: Duration,
    intervals: usize,
}
impl Timer {
    /// Runs `f` and records its duration.
    pub fn time<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let res = f();
        self.total += start.elapsed();
        self.intervals += 1;
        res
    }
    /// Records a duration.
    pub fn record(&mut self, duration: Duration) {
        self.total += duration;
        self.intervals += 1;
    }
    /// Total time.
    pub fn total(&self) -> Duration {
        self.total
    }
    /// Number of recorded intervals.
    pub fn intervals(&self) -> usize {
        self.intervals
    }
    /// Average time of an interval.
    pub fn average(&self) -> Option<Duration> {
        u32::try_from(self.intervals)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| self.total / n)
    }
}

/// Query statistics of [`super::PdrSmt`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdrStats {
    /// CTI queries.
    pub cti_queries: usize,
    /// CTIs found.
    pub ctis: usize,
    /// Successful consecution queries.
    pub successful_consecutions: usize,
    /// Failed consecution queries.
    pub failed_consecutions: usize,
    /// Consecution queries whose abstract check needed a refinement.
    pub consecution_refinements: usize,
    /// Lifts whose abstraction was precise enough.
    pub successful_lifts: usize,
    /// Lifts that needed a refinement.
    pub failed_lifts: usize,
    /// Lifts that returned the abstraction as is.
    pub unlifted_abstractions: usize,
    /// Formulas shrunk by an unsat core.
    pub unsat_core_reductions: usize,
    /// Literals dropped.
    pub dropped_literals: usize,
    /// Time spent in consecution queries.
    pub consecution_time: Timer,
    /// Time spent lifting.
    pub lifting_time: Timer,
}
impl PdrStats {
    /// Total number of consecution queries.
    pub fn consecutions(&self) -> usize {
        self.successful_consecutions + self.failed_consecutions
    }
    /// Total number of lifts.
    pub fn lifts(&self) -> usize {
        self.successful_lifts + self.failed_lifts
    }
    /// Logs the statistics at info level.
    pub fn log(&self) {
        for line in self.to_string().lines() {
            info!("{}", line)
        }
    }
}
impl fmt::Display for PdrStats {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "CTI queries:                 {}", self.cti_queries)?;
        writeln!(fmt, "CTIs found:                  {}", self.ctis)?;
        writeln!(fmt, "consecution queries:         {}", self.consecutions())?;
        writeln!(fmt, "  successful:                {}", self.successful_consecutions)?;
        writeln!(fmt, "  failed:                    {}", self.failed_consecutions)?;
        writeln!(fmt, "  with refinement:           {}", self.consecution_refinements)?;
        if let Some(avg) = self.consecution_time.average() {
            writeln!(fmt, "  total time:                {:?}", self.consecution_time.total())?;
            writeln!(fmt, "  average time:              {:?}", avg)?;
        }
        writeln!(fmt, "lifting queries:             {}", self.lifts())?;
        writeln!(fmt, "  successful:                {}", self.successful_lifts)?;
        writeln!(fmt, "  failed:                    {}", self.failed_lifts)?;
        writeln!(fmt, "  unlifted abstractions:     {}", self.unlifted_abstractions)?;
        if let Some(avg) = self.lifting_time.average() {
            writeln!(fmt, "  total time:                {:?}", self.lifting_time.total())?;
            writeln!(fmt, "  average time:              {:?}", avg)?;
        }
        writeln!(fmt, "unsat core reductions:       {}", self.unsat_core_reductions)?;
        write!(fmt, "dropped literals:            {}", self.dropped_literals)
    }
}

/// Statistics of the predicate precision manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbstractionStats {
    /// Predicates added, default ones included.
    pub predicates_added: usize,
    /// Refinements.
    pub refinements: usize,
    /// Subsumption rounds.
    pub subsumption_rounds: usize,
    /// Predicates removed by subsumption.
    pub subsumed_predicates: usize,
}
impl AbstractionStats {
    /// Logs the statistics at info level.
    pub fn log(&self) {
        for line in self.to_string().lines() {
            info!("{}", line)
        }
    }
}
impl fmt::Display for AbstractionStats {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "abstraction predicates added: {}", self.predicates_added)?;
        writeln!(fmt, "refinements:                  {}", self.refinements)?;
        writeln!(fmt, "subsumption rounds:           {}", self.subsumption_rounds)?;
        write!(fmt, "subsumed predicates:          {}", self.subsumed_predicates)
    }
}
