use crate::{
    handler::{Handler, RequestAction},
    protocol::{EvaluateArguments, Request, Response},
    session::Session,
};

/// Translates the client dialect's `_command` evaluate context into the
/// backend's `repl`. Everything else passes untouched, including `evaluate`
/// requests whose arguments fail to parse — the backend owns that error.
pub struct EvaluateContextRewriter;

impl Handler for EvaluateContextRewriter {
    fn name(&self) -> &'static str {
        "evaluate-context-rewriter"
    }

    fn on_request(&self, request: &Request, _session: &Session) -> RequestAction {
        if request.command != "evaluate" {
            return RequestAction::Forward;
        }
        let Ok(mut args) = request.load_args::<EvaluateArguments>() else {
            return RequestAction::Forward;
        };
        if args.context.as_deref() != Some("_command") {
            return RequestAction::Forward;
        }
        args.context = Some("repl".to_string());
        match serde_json::to_value(&args) {
            Ok(arguments) => RequestAction::ForwardModified(Request::new("evaluate", arguments)),
            Err(_) => RequestAction::Forward,
        }
    }
}

/// Test hook: `_triggerError` is answered locally with a fixed failure so
/// clients can exercise the local-response path.
pub struct TriggerErrorHandler;

impl Handler for TriggerErrorHandler {
    fn name(&self) -> &'static str {
        "trigger-error"
    }

    fn on_request(&self, request: &Request, _session: &Session) -> RequestAction {
        if request.command == "_triggerError" {
            RequestAction::Respond(Response::failure(
                request.base.seq,
                &request.command,
                "triggered internal error",
            ))
        } else {
            RequestAction::Forward
        }
    }
}
