//! Progress reporting and cancellation for long-running solves.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag a caller flips to stop a solve at the next checkpoint.
///
/// Cloning shares the flag. The solver polls it between inner L-BFGS chunks,
/// so a cancel takes effect within one chunk.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Snapshot emitted after every outer (multiplier) iteration.
#[derive(Debug, Clone, Serialize)]
pub struct SolveProgress {
    /// Free-form label of the solve ("relaxed", "monotype HE", ...)
    pub stage: String,
    pub outer_iteration: usize,
    pub max_outer_iterations: usize,
    /// Cumulative L-BFGS iterations so far
    pub inner_iterations: usize,
    pub max_violation: f64,
    /// Objective in problem units
    pub objective: f64,
    pub penalty: f64,
}

type ProgressFn = dyn Fn(&SolveProgress) + Send + Sync;

/// Caller-side hooks for a solve. The default neither reports nor cancels.
#[derive(Default)]
pub struct SolveControl {
    pub cancel: Option<CancelToken>,
    progress: Option<Box<ProgressFn>>,
}

impl SolveControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SolveProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    pub fn report(&self, progress: &SolveProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

impl std::fmt::Debug for SolveControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolveControl")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
