//! The concrete interception concerns, one module per group.

mod console;
mod evaluate;
mod launch_events;
mod lifecycle;
mod observe;
mod output;

pub use console::ConsoleModeHandler;
pub use evaluate::{EvaluateContextRewriter, TriggerErrorHandler};
pub use launch_events::{LaunchEventsHandler, ProcessEventHandler};
pub use lifecycle::{AttachHandler, DisconnectHandler, LaunchHandler, TerminateHandler};
pub use observe::InitializeObserver;
pub use output::{ExitStatusHandler, OutputCategoryNormalizer};

use crate::handler::Handler;

/// The canonical chain. Request-side decisions take the first non-`Forward`
/// answer in this order; backend-side rewrites apply in this order via
/// flat-map. ProcessEventHandler must stay after LaunchEventsHandler (which
/// needs to see the original `process` event), and OutputCategoryNormalizer
/// must stay before ExitStatusHandler (which expects exit lines still
/// labeled `console`).
pub fn default_handlers() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(TriggerErrorHandler),
        Box::new(EvaluateContextRewriter),
        Box::new(LaunchHandler),
        Box::new(AttachHandler),
        Box::new(TerminateHandler),
        Box::new(DisconnectHandler),
        Box::new(InitializeObserver),
        Box::new(ConsoleModeHandler::new()),
        Box::new(LaunchEventsHandler::new()),
        Box::new(ProcessEventHandler),
        Box::new(OutputCategoryNormalizer),
        Box::new(ExitStatusHandler),
    ]
}
