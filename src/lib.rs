pub mod comms;
pub mod error_macros;
pub mod filter;
pub mod handler;
pub mod hierarchy;
pub mod model;
pub mod reparent;
pub mod stats;
pub mod storage;
pub mod store;
pub mod validation;
pub mod watcher;

pub use model::{
    Attachment, Goal, GoalStatus, Group, Note, NodeKind, ParentRef, Priority, Project, Task,
    TaskStatus, TreeNode,
};

pub use store::{sample_store, CascadePolicy, EntityStore, StoreMeta, SCHEMA_VERSION};

pub use hierarchy::HierarchyIndex;

pub use filter::{DateBound, TaskFilter};

pub use stats::{DueBuckets, Granularity, StatusCounts, TimeBucket};

pub use reparent::{
    DragDropCoordinator, DragNode, DragState, DropTarget, MoveOutcome, RejectReason,
};

pub use storage::{
    BoardColumn, BoardLayout, IntegrationConfig, NotificationEntry, NotificationSettings,
    NotificationState, SavedSearch, StorageInfo, StorageManager,
};

pub use comms::{
    BasicResponse, ConnectIntegrationParams, CreateGoalParams, CreateGroupParams,
    CreateProjectParams, CreateTaskParams, CreatedResponse, DeleteParams, GetChildrenParams,
    GetStatisticsParams, GetTasksParams, JsonRpcError, JsonRpcHandler, JsonRpcRequest,
    JsonRpcResponse, JsonRpcServer, LinkTaskParams, MoveNodeParams, RenameParams, SaveBoardParams,
    SaveNotificationsParams, SaveSearchParams, SetCascadePolicyParams, UpdateTaskParams,
    UpdateTaskStatusParams,
};

pub use validation::{
    TaskInput, ValidationConfig, ValidationEngine, ValidationError, ValidationResult,
    ValidationWarning,
};

pub use watcher::{BlobEvent, EventDebouncer, StoreWatcher, WatcherConfig};

pub use handler::{CoreHandler, StatisticsOverview, StatusChangeResponse};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub fn version_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
