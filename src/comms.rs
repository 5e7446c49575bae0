use crate::filter::TaskFilter;
use crate::model::{NodeKind, ParentRef, Priority, TaskStatus};
use crate::reparent::{DragNode, DropTarget};
use crate::stats::Granularity;
use crate::storage::{BoardLayout, NotificationState, SavedSearch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "Parse error".to_string(),
            data: None,
        }
    }

    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "Invalid Request".to_string(),
            data: None,
        }
    }

    pub fn method_not_found() -> Self {
        Self {
            code: -32601,
            message: "Method not found".to_string(),
            data: None,
        }
    }

    pub fn invalid_params() -> Self {
        Self {
            code: -32602,
            message: "Invalid params".to_string(),
            data: None,
        }
    }

    pub fn custom(code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            code,
            message,
            data,
        }
    }
}

// --- method parameters ---

#[derive(Debug, Deserialize)]
pub struct GetChildrenParams {
    pub id: String,
    pub kind: NodeKind,
    pub filter: Option<TaskFilter>,
}

#[derive(Debug, Deserialize)]
pub struct GetTasksParams {
    pub filter: Option<TaskFilter>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectParams {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameParams {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupParams {
    pub name: String,
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskParams {
    pub title: String,
    pub description: Option<String>,
    pub parent: Option<ParentRef>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskParams {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusParams {
    pub id: String,
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct MoveNodeParams {
    pub node: DragNode,
    pub target: DropTarget,
}

#[derive(Debug, Deserialize)]
pub struct CreateGoalParams {
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub linked_task_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct LinkTaskParams {
    pub goal_id: String,
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetStatisticsParams {
    pub granularity: Option<Granularity>,
    pub reference_time: Option<DateTime<Utc>>,
    pub filter: Option<TaskFilter>,
}

#[derive(Debug, Deserialize)]
pub struct SaveBoardParams {
    pub board: BoardLayout,
}

#[derive(Debug, Deserialize)]
pub struct SaveNotificationsParams {
    pub state: NotificationState,
}

#[derive(Debug, Deserialize)]
pub struct SaveSearchParams {
    pub search: SavedSearch,
}

#[derive(Debug, Deserialize)]
pub struct ConnectIntegrationParams {
    pub provider: String,
}

#[derive(Debug, Deserialize)]
pub struct SetCascadePolicyParams {
    pub policy: crate::store::CascadePolicy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BasicResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: String,
}

// --- server ---

pub trait JsonRpcHandler: Send + Sync {
    fn handle_request(
        &self,
        request: JsonRpcRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = JsonRpcResponse> + Send + '_>>;
}

pub struct JsonRpcServer {
    handler: Box<dyn JsonRpcHandler>,
}

impl JsonRpcServer {
    pub fn new(handler: Box<dyn JsonRpcHandler>) -> Self {
        Self { handler }
    }

    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();
        println!("[INFO] JSON-RPC server started on stdin/stdout");
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    println!("[INFO] JSON-RPC server shutting down");
                    break;
                }
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let response = self.process_line(line).await;
                    let response_json = serde_json::to_string(&response)?;
                    stdout.write_all(response_json.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                    stdout.flush().await?;
                }
                Err(e) => {
                    eprintln!("[ERROR] Error reading from stdin: {}", e);
                    break;
                }
            }
        }
        Ok(())
    }

    pub async fn process_line(&self, line: &str) -> JsonRpcResponse {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(_) => {
                return JsonRpcResponse {
                    jsonrpc: JSONRPC_VERSION.to_string(),
                    result: None,
                    error: Some(JsonRpcError::parse_error()),
                    id: None,
                };
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                result: None,
                error: Some(JsonRpcError::invalid_request()),
                id: request.id,
            };
        }
        self.handler.handle_request(request).await
    }

    pub fn success_response(id: Option<Value>, result: Value) -> JsonRpcResponse {
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error_response(id: Option<Value>, error: JsonRpcError) -> JsonRpcResponse {
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonrpc_request_serialization() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: "get_tasks".to_string(),
            params: Some(serde_json::json!({
                "filter": { "statuses": ["in_progress"] }
            })),
            id: Some(Value::Number(serde_json::Number::from(1))),
        };
        let json = serde_json::to_string(&request).unwrap();
        let parsed: JsonRpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.method, "get_tasks");
        assert_eq!(parsed.jsonrpc, "2.0");
    }

    #[test]
    fn test_jsonrpc_error_codes() {
        assert_eq!(JsonRpcError::method_not_found().code, -32601);
        assert_eq!(JsonRpcError::invalid_params().code, -32602);
        assert_eq!(JsonRpcError::parse_error().code, -32700);
    }

    #[test]
    fn test_move_node_params_deserialize() {
        let params: MoveNodeParams = serde_json::from_value(serde_json::json!({
            "node": { "kind": "task", "id": "t1" },
            "target": { "id": "g2", "kind": "group" }
        }))
        .unwrap();
        assert_eq!(params.node, DragNode::Task("t1".to_string()));
        assert_eq!(params.target.kind, NodeKind::Group);
    }
}
