use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version written on every response.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request read from the input stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version (ignored).
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Correlative message identifier.
    ///
    /// Requests without an identifier are notifications and never
    /// receive a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Name of the method to invoke.
    pub method: String,
    /// Method parameters, `null` when omitted.
    #[serde(default)]
    pub params: Value,
}

impl Request {
    /// Returns `true` when the sender does not expect a response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Response written to the output stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// JSON-RPC version used.
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    /// Identifier copied from the request, `null` if it could not be read.
    pub id: Value,
    /// Result of the invoked method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error raised while handling the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

fn jsonrpc_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// Error object following JSON-RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric code that identifies the error condition.
    pub code: i64,
    /// Readable message associated with the error.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(Self::PARSE_ERROR, format!("Parse error: {detail}"))
    }

    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self::new(Self::INVALID_REQUEST, format!("Invalid request: {detail}"))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            Self::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::new(Self::INVALID_PARAMS, format!("Invalid params: {detail}"))
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(Self::INTERNAL_ERROR, detail.to_string())
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

impl From<anyhow::Error> for RpcError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<RpcError>() {
            Ok(rpc) => rpc,
            Err(other) => Self::internal(format!("{other:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_without_params_defaults_to_null() {
        let req: Request = serde_json::from_str(r#"{"id":1,"method":"getmanifest"}"#).unwrap();
        assert_eq!(req.method, "getmanifest");
        assert!(req.params.is_null());
        assert!(!req.is_notification());
    }

    #[test]
    fn request_without_id_is_notification() {
        let req: Request =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"shutdown"}"#).unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn success_response_omits_error() {
        let res = Response::success(json!(7), json!("ok"));
        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 7, "result": "ok"}));
    }

    #[test]
    fn anyhow_keeps_wrapped_rpc_error() {
        let err = anyhow::Error::new(RpcError::invalid_params("amount"));
        assert_eq!(RpcError::from(err).code, RpcError::INVALID_PARAMS);

        let err = anyhow::anyhow!("disk full").context("saving state");
        let rpc = RpcError::from(err);
        assert_eq!(rpc.code, RpcError::INTERNAL_ERROR);
        assert_eq!(rpc.message, "saving state: disk full");
    }

    #[test]
    fn failure_response_carries_code() {
        let res = Response::failure(json!("a"), RpcError::method_not_found("nope"));
        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["error"]["code"], json!(RpcError::METHOD_NOT_FOUND));
        assert!(value.get("result").is_none());
    }
}
