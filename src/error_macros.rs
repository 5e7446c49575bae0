//! Error handling macros shared by the JSON-RPC method handlers.
//!
//! Every failed method call carries the same structured debug payload so the
//! host UI can show where an operation went wrong without scraping stderr.

use crate::comms::JsonRpcError;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Call-site context attached to enhanced errors.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub operation: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub function: String,
    pub method_name: Option<String>,
    pub request_id: Option<Value>,
    pub additional_data: HashMap<String, Value>,
}

impl ErrorContext {
    pub fn new(operation: &str, file: &str, line: u32, column: u32, function: &str) -> Self {
        Self {
            operation: operation.to_string(),
            file: file.to_string(),
            line,
            column,
            function: function.to_string(),
            method_name: None,
            request_id: None,
            additional_data: HashMap::new(),
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method_name = Some(method.to_string());
        self
    }

    pub fn with_request_id(mut self, id: Option<Value>) -> Self {
        self.request_id = id;
        self
    }

    pub fn with_data<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.additional_data.insert(key.into(), value.into());
        self
    }
}

/// Convert anyhow::Error to JsonRpcError with call-site context.
pub fn create_enhanced_error(
    error: &anyhow::Error,
    context: &ErrorContext,
    error_code: i32,
) -> JsonRpcError {
    let error_message = format!("{}: {}", context.operation, error);
    let debug_data = json!({
        "operation": context.operation,
        "error_source": error.to_string(),
        "error_chain": format!("{:?}", error),
        "location": {
            "file": context.file,
            "line": context.line,
            "column": context.column,
            "function": context.function
        },
        "method": context.method_name,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "additional_data": context.additional_data
    });
    JsonRpcError::custom(error_code, error_message, Some(debug_data))
}

/// Wrap a method result into a JSON-RPC response with unified error handling.
#[macro_export]
macro_rules! handle_jsonrpc_method {
    (
        $request_id:expr,
        $method_name:expr,
        $operation:expr,
        $result:expr
    ) => {{
        let context = $crate::error_macros::ErrorContext::new(
            $operation,
            file!(),
            line!(),
            column!(),
            module_path!(),
        )
        .with_method($method_name)
        .with_request_id($request_id.clone());
        match $result {
            Ok(value) => {
                eprintln!("[DEBUG] Operation '{}' completed successfully", $operation);
                let json_value = match serde_json::to_value(&value) {
                    Ok(v) => v,
                    Err(e) => {
                        eprintln!("[ERROR] Failed to serialize result for {}: {}", $operation, e);
                        serde_json::Value::Null
                    }
                };
                $crate::comms::JsonRpcServer::success_response($request_id, json_value)
            }
            Err(error) => {
                let enhanced_error =
                    $crate::error_macros::create_enhanced_error(&error, &context, -1);
                eprintln!("[ERROR] Operation '{}' failed: {}", $operation, error);
                eprintln!("[ERROR] Context: {}:{} in {}", file!(), line!(), module_path!());
                $crate::comms::JsonRpcServer::error_response($request_id, enhanced_error)
            }
        }
    }};
}

/// Methods that take no parameters.
#[macro_export]
macro_rules! handle_simple_method {
    (
        $request_id:expr,
        $method_name:expr,
        $operation:expr,
        $async_call:expr
    ) => {{
        let result = $async_call.await;
        handle_jsonrpc_method!($request_id, $method_name, $operation, result)
    }};
}

/// Methods with required parameters; a missing or malformed params object
/// yields -32602 without touching the handler.
#[macro_export]
macro_rules! handle_parameterized_method {
    (
        $request:expr,
        $param_type:ty,
        $method_name:expr,
        $operation:expr,
        |$params:ident| $async_call:expr
    ) => {{
        match $request.params {
            Some(params) => match serde_json::from_value::<$param_type>(params) {
                Ok($params) => {
                    let result = $async_call.await;
                    handle_jsonrpc_method!($request.id, $method_name, $operation, result)
                }
                Err(e) => {
                    let context = $crate::error_macros::ErrorContext::new(
                        &format!("Parse {} parameters", stringify!($param_type)),
                        file!(),
                        line!(),
                        column!(),
                        module_path!(),
                    )
                    .with_method($method_name)
                    .with_request_id($request.id.clone());
                    let error = anyhow::anyhow!("Parameter parsing failed: {}", e);
                    let enhanced_error =
                        $crate::error_macros::create_enhanced_error(&error, &context, -32602);
                    eprintln!("[ERROR] Parameter parsing failed for {}: {}", $method_name, e);
                    $crate::comms::JsonRpcServer::error_response($request.id, enhanced_error)
                }
            },
            None => {
                eprintln!("[ERROR] Missing required parameters for method: {}", $method_name);
                $crate::comms::JsonRpcServer::error_response(
                    $request.id,
                    $crate::comms::JsonRpcError::invalid_params(),
                )
            }
        }
    }};
}

/// Structured error line the host debug channel can parse.
pub fn log_error_to_debug_channel(
    operation: &str,
    error: &anyhow::Error,
    context: &ErrorContext,
) {
    let structured_log = json!({
        "level": "ERROR",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "operation": operation,
        "error": error.to_string(),
        "context": {
            "file": context.file,
            "line": context.line,
            "function": context.function,
            "method": context.method_name
        },
        "debug_data": context.additional_data
    });
    eprintln!("TREEDO_DEBUG: {}", structured_log);
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("test_operation", "test.rs", 42, 10, "test_module")
            .with_method("test_method")
            .with_data("param1", "value1");
        assert_eq!(context.operation, "test_operation");
        assert_eq!(context.line, 42);
        assert_eq!(context.method_name, Some("test_method".to_string()));
        assert_eq!(context.additional_data.get("param1"), Some(&json!("value1")));
    }

    #[test]
    fn test_enhanced_error_creation() {
        let error = anyhow::anyhow!("boom");
        let context = ErrorContext::new("test_operation", "test.rs", 42, 10, "test_module");
        let json_error = create_enhanced_error(&error, &context, -1000);
        assert_eq!(json_error.code, -1000);
        assert!(json_error.message.contains("test_operation"));
        let data = json_error.data.unwrap();
        assert!(data.get("location").is_some());
        assert!(data.get("timestamp").is_some());
    }

    fn mock_successful_operation() -> Result<serde_json::Value> {
        Ok(json!({"success": true}))
    }

    fn mock_failing_operation() -> Result<serde_json::Value> {
        Err(anyhow::anyhow!("mock error"))
    }

    #[test]
    fn test_macro_success_case() {
        let response = handle_jsonrpc_method!(
            Some(json!(1)),
            "test_method",
            "test_operation",
            mock_successful_operation()
        );
        assert!(response.result.is_some());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_macro_error_case() {
        let response = handle_jsonrpc_method!(
            Some(json!(1)),
            "test_method",
            "test_operation",
            mock_failing_operation()
        );
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, -1);
        assert!(error.message.contains("test_operation"));
    }
}
