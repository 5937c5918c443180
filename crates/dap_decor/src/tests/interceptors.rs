use super::*;

fn output_event(category: &str, text: &str) -> DapMessage {
    DapMessage::Event(Event::new(
        "output",
        json!({ "category": category, "output": text }),
    ))
}

fn assert_console_output(message: &DapMessage, expected: &str) {
    let DapMessage::Event(event) = message else {
        panic!("expected an event, got {message:?}");
    };
    assert_eq!(event.event, "output");
    assert_eq!(event.body["category"], "console");
    assert_eq!(event.body["output"], expected);
}

#[test]
fn evaluate_rewriter_translates_the_command_context() {
    let session = Session::new();
    let handler = EvaluateContextRewriter;
    let request = Request::new(
        "evaluate",
        json!({ "expression": "bt", "context": "_command", "frameId": 2 }),
    );
    let RequestAction::ForwardModified(modified) = handler.on_request(&request, &session) else {
        panic!("expected a rewrite");
    };
    assert_eq!(modified.command, "evaluate");
    assert_eq!(
        modified.arguments,
        json!({ "expression": "bt", "context": "repl", "frameId": 2 })
    );
}

#[test]
fn evaluate_rewriter_leaves_repl_context_alone() {
    let session = Session::new();
    let handler = EvaluateContextRewriter;
    let request = Request::new("evaluate", json!({ "expression": "bt", "context": "repl" }));
    assert!(matches!(
        handler.on_request(&request, &session),
        RequestAction::Forward
    ));
}

#[test]
fn trigger_error_answers_locally() {
    let session = Session::new();
    let handler = TriggerErrorHandler;
    let mut request = Request::new("_triggerError", Value::Null);
    request.base.seq = 42;
    let RequestAction::Respond(response) = handler.on_request(&request, &session) else {
        panic!("expected a local response");
    };
    assert_eq!(response.request_seq, 42);
    assert!(!response.success);
    assert_eq!(response.message.as_deref(), Some("triggered internal error"));
}

#[test]
fn console_mode_notice_is_injected_exactly_once() {
    let session = Session::new();
    let handler = ConsoleModeHandler::new();
    let initialized = DapMessage::Event(Event::new("initialized", Value::Null));

    let first = handler.on_backend_message(initialized.clone(), &session);
    assert_eq!(first.len(), 2);
    assert_console_output(
        &first[0],
        "Console is in 'commands' mode, prefix expressions with '?'.\n",
    );
    assert!(matches!(&first[1], DapMessage::Event(e) if e.event == "initialized"));

    // A conforming backend never sends a second initialized event; if one
    // shows up anyway it passes through untouched.
    let second = handler.on_backend_message(initialized, &session);
    assert_eq!(second.len(), 1);
}

#[test]
fn launch_events_narrate_the_first_process_event() {
    let session = Session::new();
    let handler = LaunchEventsHandler::new();
    let launch = Request::new("launch", json!({ "program": "/tmp/a.out" }));
    assert!(matches!(
        handler.on_request(&launch, &session),
        RequestAction::Forward
    ));
    assert_eq!(session.launch_program().as_deref(), Some("/tmp/a.out"));

    let process = DapMessage::Event(Event::new("process", json!({ "systemProcessId": 12345 })));
    let out = handler.on_backend_message(process.clone(), &session);
    assert_eq!(out.len(), 3);
    assert_console_output(&out[0], "Launching: /tmp/a.out\n");
    assert_console_output(&out[1], "Launched process 12345 from '/tmp/a.out'\n");
    assert!(matches!(&out[2], DapMessage::Event(e) if e.event == "process"));

    // Only the first process event is narrated.
    let again = handler.on_backend_message(process, &session);
    assert_eq!(again.len(), 1);
}

#[test]
fn launch_events_fall_back_to_placeholders() {
    let session = Session::new();
    let handler = LaunchEventsHandler::new();
    let process = DapMessage::Event(Event::new("process", Value::Null));
    let out = handler.on_backend_message(process, &session);
    assert_eq!(out.len(), 3);
    assert_console_output(&out[0], "Launching: ?\n");
    assert_console_output(&out[1], "Launched process ? from '?'\n");
}

#[test]
fn process_events_become_continued_events() {
    let session = Session::new();
    let handler = ProcessEventHandler;
    let process = DapMessage::Event(Event::new("process", json!({ "systemProcessId": 1 })));
    let out = handler.on_backend_message(process, &session);
    assert_eq!(out.len(), 1);
    let DapMessage::Event(event) = &out[0] else {
        panic!("expected an event");
    };
    assert_eq!(event.event, "continued");
    assert_eq!(event.body, json!({ "allThreadsContinued": true }));
}

#[test]
fn console_output_is_reclassified_only_while_the_process_runs() {
    let session = Session::new();
    let handler = OutputCategoryNormalizer;

    let out = handler.on_backend_message(output_event("console", "hello\n"), &session);
    assert!(matches!(&out[0], DapMessage::Event(e) if e.body["category"] == "console"));

    session.set_process_running(true);
    let out = handler.on_backend_message(output_event("console", "hello\n"), &session);
    assert!(matches!(&out[0], DapMessage::Event(e) if e.body["category"] == "stdout"));

    // stderr output is none of this handler's business.
    let out = handler.on_backend_message(output_event("stderr", "oops\n"), &session);
    assert!(matches!(&out[0], DapMessage::Event(e) if e.body["category"] == "stderr"));
}

#[test]
fn exit_status_lines_stay_console_even_while_running() {
    let session = Session::new();
    session.set_process_running(true);
    let handler = OutputCategoryNormalizer;
    let line = "Process 12345 exited with status = 255 (0x000000ff) \n";
    let out = handler.on_backend_message(output_event("console", line), &session);
    assert!(matches!(&out[0], DapMessage::Event(e) if e.body["category"] == "console"));
}

#[test]
fn exit_status_lines_are_reformatted() {
    let session = Session::new();
    let handler = ExitStatusHandler;
    let line = "Process 12345 exited with status = 255 (0x000000ff) \n";
    let out = handler.on_backend_message(output_event("console", line), &session);
    assert_eq!(out.len(), 1);
    assert_console_output(&out[0], "Process exited with code 255.\n");
}

#[test]
fn unrelated_console_output_passes_the_exit_status_handler() {
    let session = Session::new();
    let handler = ExitStatusHandler;
    let out = handler.on_backend_message(output_event("console", "loading symbols\n"), &session);
    assert!(matches!(&out[0], DapMessage::Event(e) if e.body["output"] == "loading symbols\n"));
}
