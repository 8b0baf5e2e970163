//! Error-handling.
//!
//! Besides IO and [`rsmt2`] errors, errors fall in three classes the engine's driver must tell
//! apart:
//!
//! - solver failures ([`Error::Solver`], [`Error::Smt`]), the query did not produce an answer;
//! - cooperative cancellation ([`Error::Interrupted`]), "no answer yet";
//! - internal invariant violations ([`Error::Invariant`]), fatal.

crate::prelude!();

/// Plain errors.
#[derive(Debug)]
pub enum Error {
    /// IO error from `std`.
    Io(std::io::Error),
    /// Error from [`rsmt2`].
    Smt(rsmt2::errors::Error),
    /// Solver failure that does not come from [`rsmt2`].
    Solver(String),
    /// A shutdown was requested while computing.
    Interrupted,
    /// Internal invariant violation.
    Invariant(String),
    /// The selected backend cannot serve the requested configuration.
    Unsupported(String),
    /// A simple message.
    Msg(String),
}
impl Error {
    /// Solver failure constructor.
    pub fn solver(msg: impl Into<String>) -> Self {
        Self::Solver(msg.into())
    }
    /// Invariant violation constructor.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
    /// Unsupported configuration constructor.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Extends an error with a chain of errors.
    pub fn extend(self, errs: impl Iterator<Item = Error>) -> ErrorChain {
        ErrorChain::from(self).extend(errs)
    }

    /// True if the error is an interruption.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
    /// True if the error is an invariant violation.
    pub fn is_invariant(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
    /// True if the error is a solver failure.
    pub fn is_solver(&self) -> bool {
        matches!(self, Self::Solver(_) | Self::Smt(_))
    }
}
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => e.fmt(fmt),
            Self::Smt(e) => e.fmt(fmt),
            Self::Solver(msg) => write!(fmt, "solver failure: {}", msg),
            Self::Interrupted => write!(fmt, "interrupted"),
            Self::Invariant(msg) => write!(fmt, "internal invariant violated: {}", msg),
            Self::Unsupported(msg) => write!(fmt, "unsupported: {}", msg),
            Self::Msg(e) => e.fmt(fmt),
        }
    }
}
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
impl From<rsmt2::errors::Error> for Error {
    fn from(e: rsmt2::errors::Error) -> Self {
        Self::Smt(e)
    }
}
impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Msg(s)
    }
}
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Msg(s.into())
    }
}

/// A source error and a chain of errors.
#[derive(Debug)]
pub struct ErrorChain {
    /// Source error.
    pub source: Error,
    /// Chain of errors on top.
    pub chain: Vec<Error>,
}
impl fmt::Display for ErrorChain {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.iter().enumerate() {
            if idx > 0 {
                write!(fmt, ", ")?;
            }
            err.fmt(fmt)?;
        }
        Ok(())
    }
}
impl ErrorChain {
    /// Constructor.
    pub fn new(source: impl Into<Error>) -> Self {
        Self {
            source: source.into(),
            chain: vec![],
        }
    }

    /// Forces a new source, move the old source to the front of the chain.
    pub fn force_source(mut self, source: impl Into<Error>) -> Self {
        let mut source = source.into();
        std::mem::swap(&mut source, &mut self.source);
        self.chain.insert(0, source);
        self
    }

    /// Ref-iterator over all the errors in the chain.
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        Some(&self.source).into_iter().chain(&self.chain)
    }
    /// Own-iterator over all the errors in the chain.
    pub fn into_iter(self) -> impl Iterator<Item = Error> {
        Some(self.source).into_iter().chain(self.chain)
    }

    /// Extends the chain.
    pub fn extend(mut self, errs: impl Iterator<Item = Error>) -> Self {
        self.chain.extend(errs);
        self
    }

    /// True if the source of the chain is an interruption.
    ///
    /// Interruptions mean "no answer yet", not failure.
    pub fn is_interrupted(&self) -> bool {
        self.source.is_interrupted()
    }
    /// True if the source of the chain is an invariant violation.
    pub fn is_invariant(&self) -> bool {
        self.source.is_invariant()
    }
    /// True if the source of the chain is a solver failure.
    pub fn is_solver(&self) -> bool {
        self.source.is_solver()
    }
}
impl From<Error> for ErrorChain {
    fn from(source: Error) -> Self {
        Self::new(source)
    }
}
impl From<std::io::Error> for ErrorChain {
    fn from(e: std::io::Error) -> Self {
        Self::new(e)
    }
}
impl From<rsmt2::errors::Error> for ErrorChain {
    fn from(e: rsmt2::errors::Error) -> Self {
        Self::new(e)
    }
}
impl From<String> for ErrorChain {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
impl From<&str> for ErrorChain {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Result type.
pub type Res<T> = Result<T, ErrorChain>;

/// Error-chaining extension trait.
pub trait ChainExt {
    /// Error-chaining result type.
    type Res;
    /// Chains an error.
    fn chain_err<E>(self, err: impl FnOnce() -> E) -> Self::Res
    where
        E: Into<Error>;
}

impl ChainExt for ErrorChain {
    type Res = ErrorChain;
    fn chain_err<E>(mut self, err: impl FnOnce() -> E) -> Self::Res
    where
        E: Into<Error>,
    {
        self.chain.push(err().into());
        self
    }
}
impl ChainExt for Error {
    type Res = ErrorChain;
    fn chain_err<E>(self, err: impl FnOnce() -> E) -> Self::Res
    where
        E: Into<Error>,
    {
        ErrorChain::from(self).chain_err(err)
    }
}
impl<T, Err> ChainExt for Result<T, Err>
where
    Err: Into<ErrorChain>,
{
    type Res = Res<T>;
    fn chain_err<E>(self, err: impl FnOnce() -> E) -> Self::Res
    where
        E: Into<Error>,
    {
        self.map_err(|e| e.into().chain_err(err))
    }
}
