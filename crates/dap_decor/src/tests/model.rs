use super::*;

#[test]
fn classifies_the_three_message_shapes() {
    let request = protocol::from_json(
        r#"{"seq":1,"type":"request","command":"next","arguments":{"threadId":1}}"#,
    )
    .unwrap();
    assert!(matches!(request, DapMessage::Request(_)));

    let response = protocol::from_json(
        r#"{"seq":2,"type":"response","request_seq":1,"command":"next","success":true}"#,
    )
    .unwrap();
    assert!(matches!(response, DapMessage::Response(_)));

    let event = protocol::from_json(r#"{"seq":3,"type":"event","event":"stopped"}"#).unwrap();
    assert!(matches!(event, DapMessage::Event(_)));

    assert!(protocol::from_json(r#"{"seq":4,"type":"banana"}"#).is_err());
}

#[test]
fn unknown_commands_keep_their_raw_arguments() {
    let message = protocol::from_json(
        r#"{"seq":9,"type":"request","command":"_customThing","arguments":{"a":1,"b":[true]}}"#,
    )
    .unwrap();
    let DapMessage::Request(request) = message else {
        panic!("expected a request");
    };
    assert!(matches!(
        request.kind().unwrap(),
        RequestKind::Unknown { ref command } if command == "_customThing"
    ));
    assert_eq!(request.arguments, json!({ "a": 1, "b": [true] }));

    let round_tripped = protocol::to_json(&DapMessage::Request(request.clone())).unwrap();
    let reparsed: Value = serde_json::from_str(&round_tripped).unwrap();
    assert_eq!(reparsed["arguments"], json!({ "a": 1, "b": [true] }));
}

#[test]
fn parses_launch_arguments_with_decorator_extensions() {
    let request = Request::new(
        "launch",
        json!({
            "program": "/tmp/a.out",
            "args": ["--x"],
            "cwd": "/tmp",
            "env": { "RUST_LOG": "debug" },
            "stopOnEntry": true,
            "terminal": "integrated",
            "initCommands": ["settings set x y"],
            "preTerminateCommands": ["log disable"],
            "exitCommands": ["quit"],
            "gracefulShutdown": "TERM",
            "sourceMap": { "/local": "/remote" },
            "vendorExtra": 42
        }),
    );
    let RequestKind::Launch(args) = request.kind().unwrap() else {
        panic!("expected launch");
    };
    assert_eq!(args.program.as_deref(), Some("/tmp/a.out"));
    assert_eq!(args.args, vec!["--x"]);
    assert!(args.stop_on_entry);
    assert_eq!(args.terminal, Terminal::Integrated);
    assert_eq!(args.init_commands, vec!["settings set x y"]);
    assert_eq!(args.pre_terminate_commands, vec!["log disable"]);
    assert_eq!(args.exit_commands, vec!["quit"]);
    assert_eq!(
        args.graceful_shutdown,
        Some(GracefulShutdown::Signal("TERM".to_string()))
    );
    assert_eq!(args.source_map["/local"], "/remote");
    assert_eq!(args.other["vendorExtra"], 42);
}

#[test]
fn graceful_shutdown_takes_its_shape_from_the_json() {
    let signal: GracefulShutdown = serde_json::from_value(json!("INT")).unwrap();
    assert_eq!(signal, GracefulShutdown::Signal("INT".to_string()));

    let commands: GracefulShutdown = serde_json::from_value(json!(["detach", "quit"])).unwrap();
    assert_eq!(
        commands,
        GracefulShutdown::Commands(vec!["detach".to_string(), "quit".to_string()])
    );
}

#[test]
fn terminal_defaults_to_console() {
    let request = Request::new("launch", json!({ "program": "/tmp/a.out" }));
    let RequestKind::Launch(args) = request.kind().unwrap() else {
        panic!("expected launch");
    };
    assert_eq!(args.terminal, Terminal::Console);
}

#[test]
fn absent_arguments_behave_like_an_empty_object() {
    let request = Request::new("disconnect", Value::Null);
    assert!(matches!(
        request.kind().unwrap(),
        RequestKind::Disconnect(_)
    ));
}

#[test]
fn evaluate_arguments_carry_unknown_fields_through_serialization() {
    let request = Request::new(
        "evaluate",
        json!({ "expression": "bt", "context": "repl", "frameId": 3, "vendor": "yes" }),
    );
    let RequestKind::Evaluate(args) = request.kind().unwrap() else {
        panic!("expected evaluate");
    };
    let value = serde_json::to_value(&args).unwrap();
    assert_eq!(
        value,
        json!({ "expression": "bt", "context": "repl", "frameId": 3, "vendor": "yes" })
    );
}

#[test]
fn invalid_arguments_for_a_known_command_are_rejected() {
    let request = Request::new("evaluate", json!({ "context": "repl" }));
    let err = request.kind().unwrap_err();
    assert!(
        matches!(err, DecorError::InvalidArgs { ref command, .. } if command == "evaluate"),
        "got {err:?}"
    );
}

#[test]
fn set_breakpoints_and_run_in_terminal_are_modeled() {
    let breakpoints = Request::new(
        "setBreakpoints",
        json!({
            "source": { "path": "/tmp/main.rs" },
            "breakpoints": [{ "line": 10, "condition": "x > 2" }]
        }),
    );
    let RequestKind::SetBreakpoints(args) = breakpoints.kind().unwrap() else {
        panic!("expected setBreakpoints");
    };
    assert_eq!(args.source.path.as_deref(), Some("/tmp/main.rs"));
    let lines: Vec<i64> = args
        .breakpoints
        .unwrap()
        .iter()
        .map(|breakpoint| breakpoint.line)
        .collect();
    assert_eq!(lines, vec![10]);

    let reverse = Request::new(
        "runInTerminal",
        json!({ "kind": "integrated", "cwd": "/tmp", "args": ["/tmp/a.out", "--x"] }),
    );
    let RequestKind::RunInTerminal(args) = reverse.kind().unwrap() else {
        panic!("expected runInTerminal");
    };
    assert_eq!(args.kind.as_deref(), Some("integrated"));
    assert_eq!(args.args, vec!["/tmp/a.out", "--x"]);
}

#[test]
fn event_bodies_deserialize_from_backend_shapes() {
    use crate::protocol::{ExitedEventBody, OutputEventBody, ProcessEventBody, TerminatedEventBody};

    let process: ProcessEventBody =
        serde_json::from_value(json!({ "name": "a.out", "systemProcessId": 12345 })).unwrap();
    assert_eq!(process.system_process_id, Some(12345));

    let output: OutputEventBody =
        serde_json::from_value(json!({ "category": "stderr", "output": "oops\n" })).unwrap();
    assert_eq!(output.category.as_deref(), Some("stderr"));

    let exited: ExitedEventBody = serde_json::from_value(json!({ "exitCode": 255 })).unwrap();
    assert_eq!(exited.exit_code, 255);

    let terminated: TerminatedEventBody = serde_json::from_value(json!({})).unwrap();
    assert_eq!(terminated.restart, None);
}

#[test]
fn cancel_arguments_parse_the_request_id() {
    let request = Request::new("cancel", json!({ "requestId": 17 }));
    let RequestKind::Cancel(args) = request.kind().unwrap() else {
        panic!("expected cancel");
    };
    assert_eq!(args.request_id, Some(17));
}
