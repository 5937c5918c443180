use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::{
    handler::{Handler, RequestAction},
    protocol::{
        console_output, ContinuedEventBody, DapMessage, Event, LaunchArguments, ProcessEventBody,
        Request,
    },
    session::Session,
};

/// Observes `launch` requests to capture the program path, then narrates the
/// first `process` event with two `console` output lines injected ahead of
/// it.
pub struct LaunchEventsHandler {
    launched_injected: AtomicBool,
}

impl LaunchEventsHandler {
    pub fn new() -> LaunchEventsHandler {
        LaunchEventsHandler {
            launched_injected: AtomicBool::new(false),
        }
    }
}

impl Default for LaunchEventsHandler {
    fn default() -> Self {
        LaunchEventsHandler::new()
    }
}

impl Handler for LaunchEventsHandler {
    fn name(&self) -> &'static str {
        "launch-events"
    }

    fn on_request(&self, request: &Request, session: &Session) -> RequestAction {
        if request.command == "launch" {
            if let Ok(args) = request.load_args::<LaunchArguments>() {
                session.set_launch_program(args.program);
            }
        }
        RequestAction::Forward
    }

    fn on_backend_message(&self, message: DapMessage, session: &Session) -> Vec<DapMessage> {
        let DapMessage::Event(event) = &message else {
            return vec![message];
        };
        if event.event != "process" || self.launched_injected.swap(true, Ordering::AcqRel) {
            return vec![message];
        }
        let program = session
            .launch_program()
            .unwrap_or_else(|| "?".to_string());
        let pid = serde_json::from_value::<ProcessEventBody>(event.body.clone())
            .ok()
            .and_then(|body| body.system_process_id)
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "?".to_string());
        vec![
            console_output(format!("Launching: {program}\n")),
            console_output(format!("Launched process {pid} from '{program}'\n")),
            message,
        ]
    }
}

/// Replaces every backend `process` event with a `continued` event carrying
/// `allThreadsContinued`, which is what clients act on. Must run after
/// [`LaunchEventsHandler`] so the pid is still visible there.
pub struct ProcessEventHandler;

impl Handler for ProcessEventHandler {
    fn name(&self) -> &'static str {
        "process-event"
    }

    fn on_backend_message(&self, message: DapMessage, _session: &Session) -> Vec<DapMessage> {
        match &message {
            DapMessage::Event(event) if event.event == "process" => {
                let body = ContinuedEventBody {
                    thread_id: None,
                    all_threads_continued: Some(true),
                };
                vec![DapMessage::Event(Event::new(
                    "continued",
                    serde_json::to_value(body).unwrap_or(Value::Null),
                ))]
            }
            _ => vec![message],
        }
    }
}
