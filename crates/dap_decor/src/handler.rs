//! The interception handler contract.
//!
//! A handler is one composable concern. On the request side the router asks
//! every handler for a [`RequestAction`] and acts on the first non-`Forward`
//! answer; later handlers still observe the request but their actions are
//! ignored. On the backend side each handler maps a message to the ordered
//! list of messages that replace it, so injections and suppressions from
//! independent handlers layer without coordination.

use std::{future::Future, pin::Pin, time::Duration};

use crate::{
    error::DecorError,
    protocol::{DapMessage, Request, Response},
    router::HandlerCtx,
    session::Session,
};

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, DecorError>> + Send>>;

/// The closure behind [`RequestAction::HandleAsync`]: a multi-step
/// conversation with the backend on behalf of a single client request.
pub type AsyncHandlerFn = Box<dyn FnOnce(Request, HandlerCtx) -> HandlerFuture + Send>;

pub enum RequestAction {
    /// Hand the request to the backend verbatim; its response is relayed.
    Forward,
    /// Forward this request instead; the response still correlates to the
    /// original client `seq`.
    ForwardModified(Request),
    /// Answer locally without contacting the backend.
    Respond(Response),
    /// Answer from a spawned task that may hold its own conversation with
    /// the backend (and the client) before producing the response.
    HandleAsync(AsyncHandlerFn),
}

impl RequestAction {
    /// Boxes an async closure into [`RequestAction::HandleAsync`].
    pub fn handle_async<F, Fut>(f: F) -> RequestAction
    where
        F: FnOnce(Request, HandlerCtx) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Response, DecorError>> + Send + 'static,
    {
        RequestAction::HandleAsync(Box::new(move |request, ctx| Box::pin(f(request, ctx))))
    }
}

pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_request(&self, _request: &Request, _session: &Session) -> RequestAction {
        RequestAction::Forward
    }

    /// Returns the messages that replace `message` in the client-bound
    /// stream: `[message]` forwards unchanged, `[]` suppresses, and longer
    /// lists inject around it.
    fn on_backend_message(&self, message: DapMessage, _session: &Session) -> Vec<DapMessage> {
        vec![message]
    }

    /// Overrides the router's budget for this handler's async tasks.
    fn async_timeout(&self) -> Option<Duration> {
        None
    }
}
