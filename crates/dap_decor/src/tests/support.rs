use super::*;

use tokio::io::{BufReader, DuplexStream, ReadHalf, WriteHalf};

pub(super) const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// One end of an in-memory DAP channel, speaking framed JSON values.
pub(super) struct DapPipe {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl DapPipe {
    pub(super) fn new(stream: DuplexStream) -> DapPipe {
        let (reader, writer) = tokio::io::split(stream);
        DapPipe {
            reader: BufReader::new(reader),
            writer,
        }
    }

    pub(super) async fn send(&mut self, message: Value) {
        let payload = message.to_string();
        codec::write_payload(&mut self.writer, &payload)
            .await
            .expect("write to pipe");
    }

    pub(super) async fn recv(&mut self) -> Value {
        let payload = time::timeout(RECV_TIMEOUT, codec::read_payload(&mut self.reader))
            .await
            .expect("timed out waiting for a message")
            .expect("read from pipe")
            .expect("pipe closed while waiting for a message");
        serde_json::from_str(&payload).expect("framed payload is JSON")
    }

    /// Asserts nothing arrives for a little while.
    pub(super) async fn expect_silence(&mut self) {
        let result =
            time::timeout(Duration::from_millis(100), codec::read_payload(&mut self.reader)).await;
        assert!(result.is_err(), "expected no traffic, got {result:?}");
    }
}

pub(super) struct Harness {
    pub(super) client: DapPipe,
    pub(super) backend: DapPipe,
    pub(super) handle: tokio::task::JoinHandle<Result<(), DecorError>>,
}

impl Harness {
    /// Waits for the router to finish on its own.
    pub(super) async fn join(self) -> Result<(), DecorError> {
        time::timeout(RECV_TIMEOUT, self.handle)
            .await
            .expect("router should stop")
            .expect("router task should not panic")
    }
}

pub(super) fn start_router() -> Harness {
    start_router_with(default_handlers(), RouterConfig::default())
}

pub(super) fn start_router_with(handlers: Vec<Box<dyn Handler>>, config: RouterConfig) -> Harness {
    let (client_local, client_remote) = tokio::io::duplex(64 * 1024);
    let (backend_local, backend_remote) = tokio::io::duplex(64 * 1024);
    let router = SessionRouter::with_config(handlers, config);
    let (client_reader, client_writer) = tokio::io::split(client_remote);
    let (backend_reader, backend_writer) = tokio::io::split(backend_remote);
    let handle = tokio::spawn(router.run(client_reader, client_writer, backend_reader, backend_writer));
    Harness {
        client: DapPipe::new(client_local),
        backend: DapPipe::new(backend_local),
        handle,
    }
}

pub(super) fn request(seq: i64, command: &str, arguments: Value) -> Value {
    json!({ "seq": seq, "type": "request", "command": command, "arguments": arguments })
}

pub(super) fn response_to(fwd: &Value, success: bool, body: Value) -> Value {
    json!({
        "seq": 0,
        "type": "response",
        "request_seq": fwd["seq"],
        "command": fwd["command"],
        "success": success,
        "body": body,
    })
}

pub(super) fn event(name: &str, body: Value) -> Value {
    json!({ "seq": 0, "type": "event", "event": name, "body": body })
}

/// Drives a `launch` through the backend pipe, including the `process`
/// event, leaving the session in the running state with the narration
/// consumed.
pub(super) async fn complete_launch(harness: &mut Harness, program: &str) {
    harness
        .client
        .send(request(1, "launch", json!({ "program": program })))
        .await;
    let fwd = harness.backend.recv().await;
    assert_eq!(fwd["command"], "launch");
    harness
        .backend
        .send(response_to(&fwd, true, Value::Null))
        .await;
    let launch_response = harness.client.recv().await;
    assert_eq!(launch_response["request_seq"], 1);
    assert_eq!(launch_response["success"], true);

    harness
        .backend
        .send(event("process", json!({ "systemProcessId": 4242 })))
        .await;
    let launching = harness.client.recv().await;
    assert_eq!(launching["body"]["category"], "console");
    let launched = harness.client.recv().await;
    assert_eq!(launched["body"]["category"], "console");
    let continued = harness.client.recv().await;
    assert_eq!(continued["event"], "continued");
}

#[cfg(unix)]
pub(super) mod fake_backend {
    use std::{fs, os::unix::fs::PermissionsExt, path::PathBuf};

    /// Writes a minimal Content-Length-framed DAP adapter. It answers
    /// `initialize` (response + `initialized` event), `launch`, emits a
    /// `process` event ahead of the `configurationDone` response, echoes
    /// `evaluate`, and leaves on `disconnect`.
    pub(in crate::tests) fn write(dir: &std::path::Path) -> PathBuf {
        let script_path = dir.join("fake-lldb-dap");
        let script = r#"#!/usr/bin/env python3
import json
import sys

seq = 0

def send(payload):
    global seq
    seq += 1
    payload["seq"] = seq
    data = json.dumps(payload).encode()
    sys.stdout.buffer.write(b"Content-Length: %d\r\n\r\n" % len(data))
    sys.stdout.buffer.write(data)
    sys.stdout.buffer.flush()

def read_message():
    length = None
    while True:
        line = sys.stdin.buffer.readline()
        if not line:
            return None
        line = line.strip()
        if not line:
            break
        if line.lower().startswith(b"content-length:"):
            length = int(line.split(b":", 1)[1])
    if length is None:
        return None
    return json.loads(sys.stdin.buffer.read(length))

while True:
    msg = read_message()
    if msg is None:
        break
    if msg.get("type") != "request":
        continue
    command = msg.get("command")
    if command == "initialize":
        send({"type": "response", "request_seq": msg["seq"], "command": command, "success": True, "body": {"supportsConfigurationDoneRequest": True}})
        send({"type": "event", "event": "initialized"})
    elif command == "launch":
        send({"type": "response", "request_seq": msg["seq"], "command": command, "success": True})
    elif command == "configurationDone":
        send({"type": "event", "event": "process", "body": {"name": "a.out", "systemProcessId": 4242}})
        send({"type": "response", "request_seq": msg["seq"], "command": command, "success": True})
    elif command == "evaluate":
        expression = (msg.get("arguments") or {}).get("expression", "")
        send({"type": "response", "request_seq": msg["seq"], "command": command, "success": True, "body": {"result": expression, "variablesReference": 0}})
    elif command == "disconnect":
        send({"type": "response", "request_seq": msg["seq"], "command": command, "success": True})
        break
    else:
        send({"type": "response", "request_seq": msg["seq"], "command": command, "success": True})
"#;

        fs::write(&script_path, script).expect("write script");
        let mut perms = fs::metadata(&script_path)
            .expect("script metadata")
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script_path, perms).expect("chmod script");
        script_path
    }
}
