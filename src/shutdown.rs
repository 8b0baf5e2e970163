//! Cooperative cancellation.

crate::prelude!();

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cloneable shutdown flag shared between a driver and the computations it starts.
///
/// # Examples
///
/// ```rust
/// # use ctigar::shutdown::ShutdownNotifier;
/// let notifier = ShutdownNotifier::new();
/// let handle = notifier.clone();
/// assert!(notifier.check().is_ok());
/// handle.request_shutdown();
/// assert!(notifier.check().unwrap_err().is_interrupted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShutdownNotifier {
    flag: Arc<AtomicBool>,
}
impl ShutdownNotifier {
    /// Constructor, no shutdown requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a shutdown of every computation sharing this notifier.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst)
    }
    /// True if a shutdown was requested.
    pub fn should_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
    /// Fails with [`Error::Interrupted`] if a shutdown was requested.
    pub fn check(&self) -> Res<()> {
        if self.should_shutdown() {
            debug!("shutdown requested, interrupting");
            Err(Error::Interrupted.into())
        } else {
            Ok(())
        }
    }
}
