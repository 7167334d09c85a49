//! Single-shot ingestion: turns a request/response body into the same
//! `ResultModel` the streaming path produces.

use serde_json::Value;

use crate::errors::{ClientError, TransportError};
use crate::event::Event;
use crate::model::ResultModel;
use crate::reducer::reduce;

/// Interprets a non-streaming response body.
///
/// A body with `status: "error"` fails with its `message`. Otherwise the
/// result is `data` when present, else the whole body. The result replaces
/// an empty model exactly as a streamed `done` frame would.
pub fn interpret_response(body: Value) -> Result<ResultModel, ClientError> {
    let Value::Object(mut body) = body else {
        return Err(TransportError::protocol("response body is not a JSON object").into());
    };
    if body.get("status").and_then(|v| v.as_str()) == Some("error") {
        let message = body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("request failed");
        return Err(ClientError::Envelope(message.to_string()));
    }
    let result = match body.remove("data") {
        Some(Value::Object(data)) => data,
        Some(Value::Null) | None => body,
        Some(_) => {
            return Err(TransportError::protocol("response `data` is not a JSON object").into());
        }
    };
    Ok(reduce(ResultModel::new(), &Event::Done(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_result_is_used_verbatim() {
        let body = json!({"molecule":"Aspirin","mit":{"innovation_score":82}});
        let model = interpret_response(body.clone()).expect("ok");
        assert_eq!(model.to_json(), body);
    }

    #[test]
    fn ok_envelope_unwraps_data() {
        let model = interpret_response(json!({"status":"ok","data":{"molecule":"Metformin"}}))
            .expect("ok");
        assert_eq!(model.to_json(), json!({"molecule":"Metformin"}));
    }

    #[test]
    fn envelope_without_data_keeps_whole_body() {
        let body = json!({"status":"ok","molecule":"Metformin"});
        let model = interpret_response(body.clone()).expect("ok");
        assert_eq!(model.to_json(), body);
    }

    #[test]
    fn error_envelope_fails_with_message() {
        assert_eq!(
            interpret_response(json!({"status":"error","message":"molecule not found"})),
            Err(ClientError::Envelope("molecule not found".into()))
        );
        assert_eq!(
            interpret_response(json!({"status":"error"})),
            Err(ClientError::Envelope("request failed".into()))
        );
    }

    #[test]
    fn non_object_bodies_are_protocol_errors() {
        assert!(matches!(
            interpret_response(json!([1])),
            Err(ClientError::Transport(TransportError::Protocol { .. }))
        ));
        assert!(matches!(
            interpret_response(json!({"data":"text"})),
            Err(ClientError::Transport(TransportError::Protocol { .. }))
        ));
    }
}
