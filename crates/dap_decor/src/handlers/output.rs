use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::{
    handler::Handler,
    protocol::{console_output, DapMessage, OutputEventBody},
    session::Session,
};

static EXIT_STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Process \d+ exited with status = (\d+)").expect("exit status regex"));

fn console_output_body(message: &DapMessage) -> Option<OutputEventBody> {
    let DapMessage::Event(event) = message else {
        return None;
    };
    if event.event != "output" {
        return None;
    }
    let body = serde_json::from_value::<OutputEventBody>(event.body.clone()).ok()?;
    (body.category.as_deref() == Some("console")).then_some(body)
}

/// While the debuggee runs, the backend labels its stdout `console` on some
/// hosts. Clients expect `stdout`, so reclassify — except for the backend's
/// own exit-status line, which [`ExitStatusHandler`] still needs to see as
/// `console`.
pub struct OutputCategoryNormalizer;

impl Handler for OutputCategoryNormalizer {
    fn name(&self) -> &'static str {
        "output-category-normalizer"
    }

    fn on_backend_message(&self, mut message: DapMessage, session: &Session) -> Vec<DapMessage> {
        let reclassify = match console_output_body(&message) {
            Some(body) => session.process_running() && !EXIT_STATUS_RE.is_match(&body.output),
            None => false,
        };
        if reclassify {
            if let DapMessage::Event(event) = &mut message {
                if let Some(object) = event.body.as_object_mut() {
                    object.insert("category".to_string(), json!("stdout"));
                }
            }
        }
        vec![message]
    }
}

/// Rewrites the backend's `Process <pid> exited with status = <code> ...`
/// console line into a uniform `Process exited with code <code>.` line.
pub struct ExitStatusHandler;

impl Handler for ExitStatusHandler {
    fn name(&self) -> &'static str {
        "exit-status"
    }

    fn on_backend_message(&self, message: DapMessage, _session: &Session) -> Vec<DapMessage> {
        let code = console_output_body(&message).and_then(|body| {
            EXIT_STATUS_RE
                .captures(&body.output)
                .and_then(|captures| captures.get(1))
                .map(|code| code.as_str().to_string())
        });
        match code {
            Some(code) => vec![console_output(format!("Process exited with code {code}.\n"))],
            None => vec![message],
        }
    }
}
