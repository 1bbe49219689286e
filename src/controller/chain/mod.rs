//! # Chain
//!
//! Ordered provisioning pipelines.
//!
//! A [`Chain`] is a fixed list of [`Handler`]s built once by the factory.
//! Handlers run strictly in order; the first error stops the chain and is
//! returned unchanged. Classification of that error belongs to the reconciler.

pub mod factory;

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info_span};

use crate::constants::DEFAULT_POSTPONE_SECS;
use crate::controller::errors::Postpone;
use crate::observability::metrics;

/// Per-reconciliation context handed to every handler
///
/// Carries the reconciliation span, the caller's cancellation token and the
/// names of the handlers entered so far.
#[derive(Debug)]
pub struct RequestContext {
    span: Span,
    cancel: CancellationToken,
    trace: Mutex<Vec<&'static str>>,
}

impl RequestContext {
    pub fn new(span: Span, cancel: CancellationToken) -> Self {
        Self {
            span,
            cancel,
            trace: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn enter(&self, handler: &'static str) {
        if let Ok(mut trace) = self.trace.lock() {
            trace.push(handler);
        }
    }

    /// Handlers entered so far, in order
    #[must_use]
    pub fn visited(&self) -> Vec<&'static str> {
        self.trace.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// The handler entered last, i.e. the one that failed when the chain failed
    #[must_use]
    pub fn last_action(&self) -> Option<&'static str> {
        self.trace.lock().ok().and_then(|t| t.last().copied())
    }
}

/// One idempotent unit of provisioning work
///
/// A handler either skips (progress says its step is done), performs one
/// category of side effect, or fails.
#[async_trait]
pub trait Handler<K: Send>: Send + Sync {
    /// Step name, recorded in `status.action`
    fn name(&self) -> &'static str;

    async fn serve_request(&self, ctx: &RequestContext, entity: &mut K) -> anyhow::Result<()>;
}

pub struct Chain<K: Send> {
    handlers: Vec<Box<dyn Handler<K>>>,
}

impl<K: Send> std::fmt::Debug for Chain<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("handlers", &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl<K: Send> Default for Chain<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Send> Chain<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append a handler
    #[must_use]
    pub fn with(mut self, handler: impl Handler<K> + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    #[must_use]
    pub fn with_boxed(mut self, handler: Box<dyn Handler<K>>) -> Self {
        self.handlers.push(handler);
        self
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler in order, stopping at the first error
    ///
    /// Cancellation is checked between handlers and surfaces as a postpone.
    pub async fn serve_request(&self, ctx: &RequestContext, entity: &mut K) -> anyhow::Result<()> {
        for handler in &self.handlers {
            if ctx.is_cancelled() {
                return Err(Postpone::new(
                    Duration::from_secs(DEFAULT_POSTPONE_SECS),
                    "reconciliation cancelled",
                )
                .into());
            }

            let name = handler.name();
            ctx.enter(name);
            let span = info_span!(parent: ctx.span(), "handler", handler = name);
            let start = Instant::now();

            let result = handler.serve_request(ctx, entity).instrument(span).await;

            metrics::observe_handler_duration(name, start.elapsed().as_secs_f64());
            if let Err(e) = result {
                debug!(parent: ctx.span(), handler = name, error = %e, "Handler failed, stopping chain");
                return Err(e);
            }
        }
        Ok(())
    }
}
