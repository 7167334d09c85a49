use serde_json::{Map, Value};

/// Typed event decoded from one backend frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Progress/status payload; stored under the `status` section.
    Status(Value),
    /// Latest payload of one agent.
    AgentResult { agent: String, payload: Value },
    /// Fragment of the streamed report text.
    TokenChunk(String),
    /// Any frame type not recognized above, stored under its own name.
    NamedSection { name: String, payload: Value },
    /// Terminal, authoritative result object.
    Done(Map<String, Value>),
    /// Terminal failure reported by the backend.
    Error(String),
}

impl Event {
    /// Returns true for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Error(_))
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &str {
        match self {
            Self::Status(_) => "status",
            Self::AgentResult { .. } => "agent",
            Self::TokenChunk(_) => "llm_token",
            Self::NamedSection { name, .. } => name,
            Self::Done(_) => "done",
            Self::Error(_) => "error",
        }
    }
}

/// A frame that could not be turned into an `Event`.
///
/// Never fatal: the controller logs it and moves on to the next frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON frame: {0}")]
    InvalidJson(String),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no string `type` field")]
    MissingType,
    #[error("`{kind}` frame is missing or has an invalid `{field}` field")]
    InvalidField { kind: String, field: &'static str },
}

/// Decodes one raw frame payload.
pub fn decode(raw: &[u8]) -> Result<Event, DecodeError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    decode_value(value)
}

/// Decodes an already-parsed JSON frame.
pub fn decode_value(value: Value) -> Result<Event, DecodeError> {
    let Value::Object(mut frame) = value else {
        return Err(DecodeError::NotAnObject);
    };
    let Some(kind) = frame
        .get("type")
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned)
    else {
        return Err(DecodeError::MissingType);
    };

    match kind.as_str() {
        "status" => frame
            .remove("data")
            .map(Event::Status)
            .ok_or_else(|| invalid_field(&kind, "data")),
        "agent" => {
            let agent = frame
                .get("agent")
                .and_then(|v| v.as_str())
                .map(ToOwned::to_owned)
                .ok_or_else(|| invalid_field(&kind, "agent"))?;
            let payload = frame.remove("data").ok_or_else(|| invalid_field(&kind, "data"))?;
            Ok(Event::AgentResult { agent, payload })
        }
        "llm_token" => match frame.remove("data") {
            Some(Value::String(text)) => Ok(Event::TokenChunk(text)),
            _ => Err(invalid_field(&kind, "data")),
        },
        "done" => match frame.remove("result") {
            Some(Value::Object(result)) => Ok(Event::Done(result)),
            _ => Err(invalid_field(&kind, "result")),
        },
        "error" => frame
            .get("message")
            .and_then(|v| v.as_str())
            .map(|m| Event::Error(m.to_string()))
            .ok_or_else(|| invalid_field(&kind, "message")),
        _ => {
            let payload = match frame.remove("data") {
                Some(Value::Null) | None => Value::Object(frame),
                Some(data) => data,
            };
            Ok(Event::NamedSection {
                name: kind,
                payload,
            })
        }
    }
}

fn invalid_field(kind: &str, field: &'static str) -> DecodeError {
    DecodeError::InvalidField {
        kind: kind.to_string(),
        field,
    }
}
