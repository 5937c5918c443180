//! The DAP message model.
//!
//! Messages keep their payloads as [`serde_json::Value`] so that commands the
//! decorator does not recognize round-trip without field loss; the typed layer
//! ([`RequestKind`] and the argument/body structs) is produced on demand from
//! the raw payload.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, de::Error as SerdeError, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecorError;

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Clone)]
pub struct ProtocolMessage {
    pub seq: i64,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Clone)]
pub struct Request {
    #[serde(flatten)]
    pub base: ProtocolMessage,
    pub command: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub arguments: Value,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Response {
    #[serde(flatten)]
    pub base: ProtocolMessage,
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub body: Value,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Event {
    #[serde(flatten)]
    pub base: ProtocolMessage,
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub body: Value,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(untagged)]
pub enum DapMessage {
    Request(Request),
    Response(Response),
    Event(Event),
}

impl Request {
    /// A request with a placeholder `seq`; the owning writer stamps the real
    /// one just before the bytes leave.
    pub fn new(command: impl Into<String>, arguments: Value) -> Request {
        Request {
            base: ProtocolMessage {
                seq: 0,
                type_: "request".to_string(),
            },
            command: command.into(),
            arguments,
        }
    }

    /// Deserializes the raw arguments into a typed struct. Absent arguments
    /// behave like an empty object, which DAP clients routinely send.
    pub fn load_args<T: DeserializeOwned>(&self) -> Result<T, DecorError> {
        let value = if self.arguments.is_null() {
            Value::Object(Map::new())
        } else {
            self.arguments.clone()
        };
        serde_json::from_value(value).map_err(|source| DecorError::InvalidArgs {
            command: self.command.clone(),
            source,
        })
    }

    /// Classifies the command and parses the typed arguments for commands the
    /// decorator models. Anything else degrades to [`RequestKind::Unknown`],
    /// leaving the raw arguments untouched for verbatim forwarding.
    pub fn kind(&self) -> Result<RequestKind, DecorError> {
        let kind = match self.command.as_str() {
            "initialize" => RequestKind::Initialize(self.load_args()?),
            "launch" => RequestKind::Launch(Box::new(self.load_args()?)),
            "attach" => RequestKind::Attach(Box::new(self.load_args()?)),
            "configurationDone" => RequestKind::ConfigurationDone,
            "disconnect" => RequestKind::Disconnect(self.load_args()?),
            "terminate" => RequestKind::Terminate(self.load_args()?),
            "setBreakpoints" => RequestKind::SetBreakpoints(self.load_args()?),
            "evaluate" => RequestKind::Evaluate(self.load_args()?),
            "cancel" => RequestKind::Cancel(self.load_args()?),
            "runInTerminal" => RequestKind::RunInTerminal(self.load_args()?),
            _ => RequestKind::Unknown {
                command: self.command.clone(),
            },
        };
        Ok(kind)
    }
}

impl Response {
    pub fn success(request_seq: i64, command: impl Into<String>, body: Value) -> Response {
        Response {
            base: ProtocolMessage {
                seq: 0,
                type_: "response".to_string(),
            },
            request_seq,
            success: true,
            command: command.into(),
            message: None,
            body,
        }
    }

    pub fn failure(
        request_seq: i64,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Response {
        Response {
            base: ProtocolMessage {
                seq: 0,
                type_: "response".to_string(),
            },
            request_seq,
            success: false,
            command: command.into(),
            message: Some(message.into()),
            body: Value::Null,
        }
    }
}

impl Event {
    pub fn new(event: impl Into<String>, body: Value) -> Event {
        Event {
            base: ProtocolMessage {
                seq: 0,
                type_: "event".to_string(),
            },
            event: event.into(),
            body,
        }
    }
}

impl DapMessage {
    pub fn seq(&self) -> i64 {
        match self {
            DapMessage::Request(r) => r.base.seq,
            DapMessage::Response(r) => r.base.seq,
            DapMessage::Event(e) => e.base.seq,
        }
    }

    pub fn set_seq(&mut self, seq: i64) {
        match self {
            DapMessage::Request(r) => r.base.seq = seq,
            DapMessage::Response(r) => r.base.seq = seq,
            DapMessage::Event(e) => e.base.seq = seq,
        }
    }
}

/// An `output` event of category `console`, the decorator's channel for
/// user-facing status lines.
pub fn console_output(text: impl Into<String>) -> DapMessage {
    let body = OutputEventBody {
        category: Some("console".to_string()),
        output: text.into(),
        ..OutputEventBody::default()
    };
    DapMessage::Event(Event::new(
        "output",
        serde_json::to_value(body).unwrap_or(Value::Null),
    ))
}

pub fn from_json(s: &str) -> Result<DapMessage, DecorError> {
    let value: Value = serde_json::from_str(s)?;
    match value.get("type").and_then(|v| v.as_str()) {
        Some("request") => Ok(DapMessage::Request(serde_json::from_value(value)?)),
        Some("response") => Ok(DapMessage::Response(serde_json::from_value(value)?)),
        Some("event") => Ok(DapMessage::Event(serde_json::from_value(value)?)),
        _ => Err(serde_json::Error::custom("unknown DAP message type"))?,
    }
}

pub fn to_json(message: &DapMessage) -> Result<String, DecorError> {
    Ok(serde_json::to_string(message)?)
}

/// Typed view over the commands the decorator reshapes. `Unknown` retains
/// nothing beyond the command name — the raw JSON stays on the [`Request`].
#[derive(Debug, PartialEq, Clone)]
pub enum RequestKind {
    Initialize(InitializeArguments),
    Launch(Box<LaunchArguments>),
    Attach(Box<AttachArguments>),
    ConfigurationDone,
    Disconnect(DisconnectArguments),
    Terminate(TerminateArguments),
    SetBreakpoints(SetBreakpointsArguments),
    Evaluate(EvaluateArguments),
    Cancel(CancelArguments),
    RunInTerminal(RunInTerminalArguments),
    Unknown { command: String },
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    #[serde(default, rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, rename = "adapterID", skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_run_in_terminal_request: Option<bool>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Where the debuggee's terminal should live.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Terminal {
    #[default]
    Console,
    Integrated,
    External,
}

/// How the debuggee is brought down before the backend is asked to
/// terminate: a signal name delivered through the backend, or a list of
/// debugger commands run in order.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(untagged)]
pub enum GracefulShutdown {
    Signal(String),
    Commands(Vec<String>),
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LaunchArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub stop_on_entry: bool,
    #[serde(default)]
    pub terminal: Terminal,
    #[serde(default)]
    pub init_commands: Vec<String>,
    #[serde(default)]
    pub pre_run_commands: Vec<String>,
    #[serde(default)]
    pub post_run_commands: Vec<String>,
    #[serde(default)]
    pub pre_terminate_commands: Vec<String>,
    #[serde(default)]
    pub exit_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graceful_shutdown: Option<GracefulShutdown>,
    #[serde(default)]
    pub source_map: HashMap<String, String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AttachArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default)]
    pub init_commands: Vec<String>,
    #[serde(default)]
    pub pre_run_commands: Vec<String>,
    #[serde(default)]
    pub post_run_commands: Vec<String>,
    #[serde(default)]
    pub pre_terminate_commands: Vec<String>,
    #[serde(default)]
    pub exit_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graceful_shutdown: Option<GracefulShutdown>,
    #[serde(default)]
    pub source_map: HashMap<String, String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminate_debuggee: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TerminateArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    pub line: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsArguments {
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoints: Option<Vec<SourceBreakpoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_modified: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CancelArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RunInTerminalArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, Option<String>>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OutputEventBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables_reference: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEventBody {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_process_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_local_process: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_method: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContinuedEventBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_threads_continued: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExitedEventBody {
    #[serde(default)]
    pub exit_code: i64,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedEventBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<Value>,
}
