//! Span helpers for the process and for individual reconciliation cycles.

use tracing::{Span, span::Entered};
use uuid::Uuid;

use crate::init::build_sha;

/// Guard that keeps the process-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the process span, tagged with the service name and build SHA.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", service = %service, build_sha = %build_sha()),
        ));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Span for one run of a reconciliation task, with a fresh `cycle_id`.
#[must_use]
pub fn cycle_span(task: &'static str) -> Span {
    tracing::info_span!("reconcile", task, cycle_id = %Uuid::new_v4())
}
