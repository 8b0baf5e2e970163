//! Engine configuration.

/// Selects the block used to strip nondeterministic variables when several blocks connect two
/// locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectingBlockPolicy {
    /// The block whose formula has the most top-level disjuncts.
    MostDisjuncts,
    /// The first block.
    First,
}

/// Options of [`super::PdrSmt`].
///
/// # Examples
///
/// ```rust
/// # use ctigar::pdr::PdrOptions;
/// let options = PdrOptions::default()
///     .with_double_check_consecution(false)
///     .with_max_literals_to_drop(3);
/// assert!(options.use_abstraction);
/// assert!(!options.double_check_consecution);
/// assert_eq!(options.max_literals_to_drop, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdrOptions {
    /// Abstracts predecessor states over the predicates.
    pub use_abstraction: bool,
    /// Checks consecution on both the concrete and the abstract states, refining on disagreement.
    pub double_check_consecution: bool,
    /// Lifts predecessor states.
    pub use_lifting: bool,
    /// Reduces generalized states with unsat cores.
    pub use_unsat_core: bool,
    /// Tries to drop literals of generalized states.
    pub drop_literals: bool,
    /// Maximal number of literals tried when dropping literals.
    pub max_attempts_at_dropping_literals: usize,
    /// Maximal number of literals dropped.
    pub max_literals_to_drop: usize,
    /// Ignores nondeterministically assigned variables in successors when lifting.
    pub remove_nondet_variables: bool,
    /// Returns the abstraction as is when the concrete lifting query is satisfiable.
    pub accept_unlifted_abstraction: bool,
    /// Connecting block selection.
    pub connecting_block_policy: ConnectingBlockPolicy,
    /// Prunes predicates implied by others when there are too many of them.
    pub subsume_redundant_predicates: bool,
    /// Number of predicates above which subsumption triggers.
    pub initial_subsumption_threshold: usize,
    /// Threshold increase when subsumption fails to go back under the threshold.
    pub subsumption_threshold_step: usize,
    /// Re-checks the results of the engine, an inconsistent result is an invariant error.
    pub check_postconditions: bool,
}
impl Default for PdrOptions {
    fn default() -> Self {
        Self {
            use_abstraction: true,
            double_check_consecution: true,
            use_lifting: true,
            use_unsat_core: true,
            drop_literals: true,
            max_attempts_at_dropping_literals: 10,
            max_literals_to_drop: 5,
            remove_nondet_variables: true,
            accept_unlifted_abstraction: true,
            connecting_block_policy: ConnectingBlockPolicy::MostDisjuncts,
            subsume_redundant_predicates: true,
            initial_subsumption_threshold: 200,
            subsumption_threshold_step: 100,
            check_postconditions: cfg!(debug_assertions),
        }
    }
}

macro_rules! setters {
    ($($fun:ident : $field:ident : $typ:ty),* $(,)?) => {
        impl PdrOptions {
            $(
                #[doc = concat!("Sets `", stringify!($field), "`.")]
                pub fn $fun(mut self, val: $typ) -> Self {
                    self.$field = val;
                    self
                }
            )*
        }
    };
}
setters! {
    with_abstraction: use_abstraction: bool,
    with_double_check_consecution: double_check_consecution: bool,
    with_lifting: use_lifting: bool,
    with_unsat_core: use_unsat_core: bool,
    with_drop_literals: drop_literals: bool,
    with_max_attempts_at_dropping_literals: max_attempts_at_dropping_literals: usize,
    with_max_literals_to_drop: max_literals_to_drop: usize,
    with_remove_nondet_variables: remove_nondet_variables: bool,
    with_accept_unlifted_abstraction: accept_unlifted_abstraction: bool,
    with_connecting_block_policy: connecting_block_policy: ConnectingBlockPolicy,
    with_subsume_redundant_predicates: subsume_redundant_predicates: bool,
    with_initial_subsumption_threshold: initial_subsumption_threshold: usize,
    with_subsumption_threshold_step: subsumption_threshold_step: usize,
    with_check_postconditions: check_postconditions: bool,
}
