use std::time::Duration;

use serde_json::{json, Value};
use tokio::time;

use crate::{
    codec,
    error::DecorError,
    handler::{Handler, RequestAction},
    handlers::{
        default_handlers, ConsoleModeHandler, EvaluateContextRewriter, ExitStatusHandler,
        LaunchEventsHandler, OutputCategoryNormalizer, ProcessEventHandler, TriggerErrorHandler,
    },
    protocol::{self, DapMessage, Event, GracefulShutdown, Request, RequestKind, Terminal},
    router::{RouterConfig, SessionRouter},
    session::Session,
};

mod support;
use support::*;

mod interceptors;
mod model;
