//! Business logic behind the JSON-RPC methods.
//!
//! The handler owns the in-memory entity snapshot plus its derived hierarchy
//! index and the drag-drop session. Mutating methods follow one shape: apply
//! to the store, rebuild the index, persist, refresh the validation context.

use crate::comms::{
    BasicResponse, ConnectIntegrationParams, CreateGoalParams, CreateGroupParams,
    CreateProjectParams, CreateTaskParams, CreatedResponse, DeleteParams, GetChildrenParams,
    GetStatisticsParams, GetTasksParams, JsonRpcHandler, JsonRpcRequest, JsonRpcResponse,
    JsonRpcServer, LinkTaskParams, MoveNodeParams, RenameParams, SaveBoardParams,
    SaveNotificationsParams, SaveSearchParams, SetCascadePolicyParams, UpdateTaskParams,
    UpdateTaskStatusParams,
};
use crate::hierarchy::HierarchyIndex;
use crate::model::{new_id, Goal, Group, Project, Task, TreeNode};
use crate::reparent::{DragDropCoordinator, MoveOutcome};
use crate::stats::{self, Granularity};
use crate::storage::{
    BoardLayout, IntegrationConfig, NotificationState, SavedSearch, StorageManager,
};
use crate::store::EntityStore;
use crate::validation::{TaskInput, ValidationEngine, ValidationResult};
use crate::{handle_jsonrpc_method, handle_parameterized_method, handle_simple_method};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// How far `upcoming` looks ahead when bucketing due dates.
const UPCOMING_WINDOW_DAYS: i64 = 7;

/// Simulated latency for integration connects; there is no real remote side.
const INTEGRATION_CONNECT_DELAY_MS: u64 = 400;

struct CoreState {
    store: EntityStore,
    index: HierarchyIndex,
    coordinator: DragDropCoordinator,
}

pub struct CoreHandler {
    storage: Arc<StorageManager>,
    validation_engine: Arc<ValidationEngine>,
    state: Mutex<CoreState>,
}

#[derive(Debug, Serialize)]
pub struct StatisticsOverview {
    pub status_counts: stats::StatusCounts,
    pub due: stats::DueBuckets,
    pub completion_histogram: Vec<stats::TimeBucket>,
    pub priority_distribution: Vec<(String, u32)>,
    pub time_of_day_distribution: Vec<(String, u32)>,
    pub tag_distribution: Vec<(String, u32)>,
    pub longest_streak: u32,
}

#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub success: bool,
    pub completed_goal_ids: Vec<String>,
}

impl CoreHandler {
    pub async fn new(base_path: PathBuf) -> anyhow::Result<Self> {
        let storage = Arc::new(StorageManager::new(&base_path));
        storage.initialize().await?;
        let store = storage.load_store().await;
        let index = HierarchyIndex::build(&store);
        let validation_engine = Arc::new(ValidationEngine::new(None)?);
        validation_engine.update_context(store.clone())?;
        Ok(Self {
            storage,
            validation_engine,
            state: Mutex::new(CoreState {
                store,
                index,
                coordinator: DragDropCoordinator::new(),
            }),
        })
    }

    /// Rebuild the derived index, write the snapshot to disk and refresh the
    /// validation context. Runs after every store mutation.
    async fn commit(&self, state: &mut CoreState) -> anyhow::Result<()> {
        state.index.rebuild(&state.store);
        self.storage.save_store(&state.store).await?;
        self.validation_engine.update_context(state.store.clone())?;
        Ok(())
    }

    fn require_valid_name(&self, name: &str) -> anyhow::Result<()> {
        let result = self.validation_engine.validate_name(name);
        if let Some(error) = result.errors.first() {
            return Err(anyhow::anyhow!("{}", error.message));
        }
        Ok(())
    }

    // --- tree reads ---

    pub async fn get_projects(&self) -> anyhow::Result<Vec<Project>> {
        let state = self.state.lock().await;
        Ok(state.store.projects.values().cloned().collect())
    }

    pub async fn get_children(&self, params: GetChildrenParams) -> anyhow::Result<Vec<TreeNode>> {
        let state = self.state.lock().await;
        let children = match params.filter {
            Some(filter) if !filter.is_empty() => state.index.children_of_filtered(
                &state.store,
                &params.id,
                params.kind,
                &filter,
            ),
            _ => state.index.children_of(&state.store, &params.id, params.kind),
        };
        Ok(children)
    }

    pub async fn get_tasks(&self, params: Option<GetTasksParams>) -> anyhow::Result<Vec<Task>> {
        let state = self.state.lock().await;
        let tasks = state.store.tasks_in_order();
        let filtered = match params.and_then(|p| p.filter) {
            Some(filter) => filter.apply(tasks, &state.store, &state.index),
            None => tasks,
        };
        Ok(filtered.into_iter().cloned().collect())
    }

    // --- projects and groups ---

    pub async fn create_project(&self, params: CreateProjectParams) -> anyhow::Result<CreatedResponse> {
        self.require_valid_name(&params.name)?;
        let mut state = self.state.lock().await;
        let id = state.store.add_project(Project::new(params.name))?;
        self.commit(&mut state).await?;
        Ok(CreatedResponse { success: true, id })
    }

    pub async fn rename_project(&self, params: RenameParams) -> anyhow::Result<BasicResponse> {
        self.require_valid_name(&params.name)?;
        let mut state = self.state.lock().await;
        state.store.rename_project(&params.id, params.name)?;
        self.commit(&mut state).await?;
        Ok(BasicResponse {
            success: true,
            message: "Project renamed".to_string(),
        })
    }

    pub async fn delete_project(&self, params: DeleteParams) -> anyhow::Result<BasicResponse> {
        let mut state = self.state.lock().await;
        state.store.delete_project(&params.id)?;
        let completed = state.store.recompute_all_goals();
        self.commit(&mut state).await?;
        Ok(BasicResponse {
            success: true,
            message: format!(
                "Project deleted; {} goal(s) completed by the recompute",
                completed.len()
            ),
        })
    }

    pub async fn create_group(&self, params: CreateGroupParams) -> anyhow::Result<CreatedResponse> {
        self.require_valid_name(&params.name)?;
        let mut state = self.state.lock().await;
        let id = state
            .store
            .add_group(Group::new(params.name, params.project_id))?;
        self.commit(&mut state).await?;
        Ok(CreatedResponse { success: true, id })
    }

    pub async fn rename_group(&self, params: RenameParams) -> anyhow::Result<BasicResponse> {
        self.require_valid_name(&params.name)?;
        let mut state = self.state.lock().await;
        state.store.rename_group(&params.id, params.name)?;
        self.commit(&mut state).await?;
        Ok(BasicResponse {
            success: true,
            message: "Group renamed".to_string(),
        })
    }

    pub async fn delete_group(&self, params: DeleteParams) -> anyhow::Result<BasicResponse> {
        let mut state = self.state.lock().await;
        state.store.delete_group(&params.id)?;
        let completed = state.store.recompute_all_goals();
        self.commit(&mut state).await?;
        Ok(BasicResponse {
            success: true,
            message: format!(
                "Group deleted; {} goal(s) completed by the recompute",
                completed.len()
            ),
        })
    }

    // --- tasks ---

    pub async fn create_task(&self, params: CreateTaskParams) -> anyhow::Result<CreatedResponse> {
        let input = TaskInput {
            title: params.title.clone(),
            description: params.description.clone(),
            tags: params.tags.clone(),
            parent: params.parent.clone(),
            start_date: params.start_date,
            end_date: params.end_date,
        };
        let result = self.validation_engine.validate_task_input(&input)?;
        if let Some(error) = result.errors.first() {
            return Err(anyhow::anyhow!("{}", error.message));
        }
        let mut state = self.state.lock().await;
        let mut task = Task::new(params.title, params.parent);
        if let Some(description) = params.description {
            task.description = description;
        }
        if let Some(priority) = params.priority {
            task.priority = priority;
        }
        if let Some(tags) = params.tags {
            task.tags = tags;
        }
        task.start_date = params.start_date;
        task.end_date = params.end_date;
        let id = state.store.add_task(task)?;
        self.commit(&mut state).await?;
        Ok(CreatedResponse { success: true, id })
    }

    pub async fn update_task(&self, params: UpdateTaskParams) -> anyhow::Result<BasicResponse> {
        let mut state = self.state.lock().await;
        let id = params.id.clone();
        state.store.edit_task(&id, |task| {
            if let Some(title) = params.title {
                task.title = title;
            }
            if let Some(description) = params.description {
                task.description = description;
            }
            if let Some(priority) = params.priority {
                task.priority = priority;
            }
            if let Some(tags) = params.tags {
                task.tags = tags;
            }
            if let Some(start) = params.start_date {
                task.start_date = Some(start);
            }
            if let Some(end) = params.end_date {
                task.end_date = Some(end);
            }
        })?;
        self.commit(&mut state).await?;
        Ok(BasicResponse {
            success: true,
            message: "Task updated".to_string(),
        })
    }

    pub async fn update_task_status(
        &self,
        params: UpdateTaskStatusParams,
    ) -> anyhow::Result<StatusChangeResponse> {
        let mut state = self.state.lock().await;
        let completed_goal_ids = state.store.set_task_status(&params.id, params.status)?;
        self.commit(&mut state).await?;
        Ok(StatusChangeResponse {
            success: true,
            completed_goal_ids,
        })
    }

    pub async fn delete_task(&self, params: DeleteParams) -> anyhow::Result<StatusChangeResponse> {
        let mut state = self.state.lock().await;
        let completed_goal_ids = state.store.delete_task(&params.id)?;
        self.commit(&mut state).await?;
        Ok(StatusChangeResponse {
            success: true,
            completed_goal_ids,
        })
    }

    /// One-shot drag-and-drop move. A rejection is a normal outcome, not an
    /// error; the caller inspects the returned tag.
    pub async fn move_node(&self, params: MoveNodeParams) -> anyhow::Result<MoveOutcome> {
        let mut state = self.state.lock().await;
        let CoreState {
            store,
            index,
            coordinator,
        } = &mut *state;
        let outcome = coordinator.perform_move(store, index, params.node, &params.target);
        if outcome == MoveOutcome::Moved {
            self.commit(&mut state).await?;
        }
        Ok(outcome)
    }

    // --- goals ---

    pub async fn get_goals(&self) -> anyhow::Result<Vec<Goal>> {
        let state = self.state.lock().await;
        Ok(state.store.goals.values().cloned().collect())
    }

    pub async fn create_goal(&self, params: CreateGoalParams) -> anyhow::Result<CreatedResponse> {
        self.require_valid_name(&params.title)?;
        let mut state = self.state.lock().await;
        let mut goal = Goal::new(params.title, params.linked_task_ids.unwrap_or_default());
        if let Some(description) = params.description {
            goal.description = description;
        }
        goal.deadline = params.deadline;
        goal.category = params.category;
        let id = state.store.add_goal(goal)?;
        self.commit(&mut state).await?;
        Ok(CreatedResponse { success: true, id })
    }

    pub async fn delete_goal(&self, params: DeleteParams) -> anyhow::Result<BasicResponse> {
        let mut state = self.state.lock().await;
        state.store.delete_goal(&params.id)?;
        self.commit(&mut state).await?;
        Ok(BasicResponse {
            success: true,
            message: "Goal deleted".to_string(),
        })
    }

    pub async fn link_task_to_goal(
        &self,
        params: LinkTaskParams,
    ) -> anyhow::Result<StatusChangeResponse> {
        let mut state = self.state.lock().await;
        if state.store.get_task(&params.task_id).is_none() {
            return Err(anyhow::anyhow!("Task not found: {}", params.task_id));
        }
        let completed_goal_ids = state
            .store
            .link_task_to_goal(&params.goal_id, &params.task_id)?;
        self.commit(&mut state).await?;
        Ok(StatusChangeResponse {
            success: true,
            completed_goal_ids,
        })
    }

    // --- statistics ---

    pub async fn get_statistics(
        &self,
        params: Option<GetStatisticsParams>,
    ) -> anyhow::Result<StatisticsOverview> {
        let state = self.state.lock().await;
        let (granularity, reference, filter) = match params {
            Some(p) => (
                p.granularity.unwrap_or(Granularity::Week),
                p.reference_time.unwrap_or_else(Utc::now),
                p.filter,
            ),
            None => (Granularity::Week, Utc::now(), None),
        };
        let all = state.store.tasks_in_order();
        let tasks: Vec<&Task> = match filter {
            Some(filter) if !filter.is_empty() => {
                filter.apply(all, &state.store, &state.index)
            }
            _ => all,
        };
        Ok(StatisticsOverview {
            status_counts: stats::status_counts(tasks.iter().copied()),
            due: stats::due_date_buckets(
                tasks.iter().copied(),
                reference,
                Duration::days(UPCOMING_WINDOW_DAYS),
            ),
            completion_histogram: stats::completion_histogram(
                tasks.iter().copied(),
                granularity,
                reference,
            ),
            priority_distribution: stats::distribution(tasks.iter().copied(), stats::priority_key),
            time_of_day_distribution: stats::distribution(
                tasks.iter().copied(),
                stats::time_of_day_key,
            ),
            tag_distribution: stats::tag_distribution(tasks.iter().copied()),
            longest_streak: stats::longest_completion_streak(tasks.iter().copied()),
        })
    }

    pub async fn validate_task_input(&self, input: TaskInput) -> anyhow::Result<ValidationResult> {
        self.validation_engine.validate_task_input(&input)
    }

    // --- persisted host state ---

    pub async fn get_board(&self) -> anyhow::Result<BoardLayout> {
        Ok(self.storage.load_board().await)
    }

    pub async fn save_board(&self, params: SaveBoardParams) -> anyhow::Result<BasicResponse> {
        self.storage.save_board(&params.board).await?;
        Ok(BasicResponse {
            success: true,
            message: "Board saved".to_string(),
        })
    }

    pub async fn get_notifications(&self) -> anyhow::Result<NotificationState> {
        Ok(self.storage.load_notifications().await)
    }

    pub async fn save_notifications(
        &self,
        params: SaveNotificationsParams,
    ) -> anyhow::Result<BasicResponse> {
        self.storage.save_notifications(&params.state).await?;
        Ok(BasicResponse {
            success: true,
            message: "Notifications saved".to_string(),
        })
    }

    pub async fn get_saved_searches(&self) -> anyhow::Result<Vec<SavedSearch>> {
        Ok(self.storage.load_saved_searches().await)
    }

    pub async fn save_saved_search(&self, params: SaveSearchParams) -> anyhow::Result<BasicResponse> {
        let mut searches = self.storage.load_saved_searches().await;
        match searches.iter_mut().find(|s| s.id == params.search.id) {
            Some(existing) => *existing = params.search,
            None => searches.push(params.search),
        }
        self.storage.save_saved_searches(&searches).await?;
        Ok(BasicResponse {
            success: true,
            message: "Search saved".to_string(),
        })
    }

    pub async fn delete_saved_search(&self, params: DeleteParams) -> anyhow::Result<BasicResponse> {
        let mut searches = self.storage.load_saved_searches().await;
        let before = searches.len();
        searches.retain(|s| s.id != params.id);
        if searches.len() == before {
            return Err(anyhow::anyhow!("Saved search not found: {}", params.id));
        }
        self.storage.save_saved_searches(&searches).await?;
        Ok(BasicResponse {
            success: true,
            message: "Search deleted".to_string(),
        })
    }

    pub async fn get_integrations(&self) -> anyhow::Result<Vec<IntegrationConfig>> {
        Ok(self.storage.load_integrations().await)
    }

    /// There is no real remote side; the connect handshake is simulated with
    /// a fixed delay and always succeeds.
    pub async fn connect_integration(
        &self,
        params: ConnectIntegrationParams,
    ) -> anyhow::Result<IntegrationConfig> {
        tokio::time::sleep(tokio::time::Duration::from_millis(
            INTEGRATION_CONNECT_DELAY_MS,
        ))
        .await;
        let mut configs = self.storage.load_integrations().await;
        let config = match configs.iter_mut().find(|c| c.provider == params.provider) {
            Some(existing) => {
                existing.connected = true;
                existing.clone()
            }
            None => {
                let config = IntegrationConfig {
                    id: new_id(),
                    provider: params.provider,
                    connected: true,
                    settings: serde_json::Value::Null,
                };
                configs.push(config.clone());
                config
            }
        };
        self.storage.save_integrations(&configs).await?;
        Ok(config)
    }

    pub async fn set_cascade_policy(
        &self,
        params: SetCascadePolicyParams,
    ) -> anyhow::Result<BasicResponse> {
        let mut state = self.state.lock().await;
        state.store.cascade_policy = params.policy;
        self.commit(&mut state).await?;
        Ok(BasicResponse {
            success: true,
            message: "Cascade policy updated".to_string(),
        })
    }

    pub async fn create_backup(&self) -> anyhow::Result<BasicResponse> {
        let backup_path = self.storage.create_backup().await?;
        Ok(BasicResponse {
            success: true,
            message: format!("Backup created: {:?}", backup_path),
        })
    }
}

impl JsonRpcHandler for CoreHandler {
    fn handle_request(
        &self,
        request: JsonRpcRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = JsonRpcResponse> + Send + '_>> {
        Box::pin(async move {
            match request.method.as_str() {
                "get_projects" => {
                    handle_simple_method!(
                        request.id,
                        "get_projects",
                        "Retrieve projects",
                        self.get_projects()
                    )
                }
                "get_children" => {
                    handle_parameterized_method!(
                        request,
                        GetChildrenParams,
                        "get_children",
                        "Retrieve node children",
                        |params| self.get_children(params)
                    )
                }
                "get_tasks" => {
                    let params = request.params.and_then(|p| serde_json::from_value(p).ok());
                    handle_simple_method!(
                        request.id,
                        "get_tasks",
                        "Retrieve tasks",
                        self.get_tasks(params)
                    )
                }
                "create_project" => {
                    handle_parameterized_method!(
                        request,
                        CreateProjectParams,
                        "create_project",
                        "Create project",
                        |params| self.create_project(params)
                    )
                }
                "rename_project" => {
                    handle_parameterized_method!(
                        request,
                        RenameParams,
                        "rename_project",
                        "Rename project",
                        |params| self.rename_project(params)
                    )
                }
                "delete_project" => {
                    handle_parameterized_method!(
                        request,
                        DeleteParams,
                        "delete_project",
                        "Delete project",
                        |params| self.delete_project(params)
                    )
                }
                "create_group" => {
                    handle_parameterized_method!(
                        request,
                        CreateGroupParams,
                        "create_group",
                        "Create group",
                        |params| self.create_group(params)
                    )
                }
                "rename_group" => {
                    handle_parameterized_method!(
                        request,
                        RenameParams,
                        "rename_group",
                        "Rename group",
                        |params| self.rename_group(params)
                    )
                }
                "delete_group" => {
                    handle_parameterized_method!(
                        request,
                        DeleteParams,
                        "delete_group",
                        "Delete group",
                        |params| self.delete_group(params)
                    )
                }
                "create_task" => {
                    handle_parameterized_method!(
                        request,
                        CreateTaskParams,
                        "create_task",
                        "Create task",
                        |params| self.create_task(params)
                    )
                }
                "update_task" => {
                    handle_parameterized_method!(
                        request,
                        UpdateTaskParams,
                        "update_task",
                        "Update task",
                        |params| self.update_task(params)
                    )
                }
                "update_task_status" => {
                    handle_parameterized_method!(
                        request,
                        UpdateTaskStatusParams,
                        "update_task_status",
                        "Update task status",
                        |params| self.update_task_status(params)
                    )
                }
                "delete_task" => {
                    handle_parameterized_method!(
                        request,
                        DeleteParams,
                        "delete_task",
                        "Delete task",
                        |params| self.delete_task(params)
                    )
                }
                "move_node" => {
                    handle_parameterized_method!(
                        request,
                        MoveNodeParams,
                        "move_node",
                        "Move node via drag and drop",
                        |params| self.move_node(params)
                    )
                }
                "get_goals" => {
                    handle_simple_method!(
                        request.id,
                        "get_goals",
                        "Retrieve goals",
                        self.get_goals()
                    )
                }
                "create_goal" => {
                    handle_parameterized_method!(
                        request,
                        CreateGoalParams,
                        "create_goal",
                        "Create goal",
                        |params| self.create_goal(params)
                    )
                }
                "delete_goal" => {
                    handle_parameterized_method!(
                        request,
                        DeleteParams,
                        "delete_goal",
                        "Delete goal",
                        |params| self.delete_goal(params)
                    )
                }
                "link_task_to_goal" => {
                    handle_parameterized_method!(
                        request,
                        LinkTaskParams,
                        "link_task_to_goal",
                        "Link task to goal",
                        |params| self.link_task_to_goal(params)
                    )
                }
                "get_statistics" => {
                    let params = request.params.and_then(|p| serde_json::from_value(p).ok());
                    handle_simple_method!(
                        request.id,
                        "get_statistics",
                        "Compute statistics overview",
                        self.get_statistics(params)
                    )
                }
                "validate_task_input" => {
                    handle_parameterized_method!(
                        request,
                        TaskInput,
                        "validate_task_input",
                        "Validate task input",
                        |params| self.validate_task_input(params)
                    )
                }
                "get_board" => {
                    handle_simple_method!(
                        request.id,
                        "get_board",
                        "Retrieve board layout",
                        self.get_board()
                    )
                }
                "save_board" => {
                    handle_parameterized_method!(
                        request,
                        SaveBoardParams,
                        "save_board",
                        "Save board layout",
                        |params| self.save_board(params)
                    )
                }
                "get_notifications" => {
                    handle_simple_method!(
                        request.id,
                        "get_notifications",
                        "Retrieve notification state",
                        self.get_notifications()
                    )
                }
                "save_notifications" => {
                    handle_parameterized_method!(
                        request,
                        SaveNotificationsParams,
                        "save_notifications",
                        "Save notification state",
                        |params| self.save_notifications(params)
                    )
                }
                "get_saved_searches" => {
                    handle_simple_method!(
                        request.id,
                        "get_saved_searches",
                        "Retrieve saved searches",
                        self.get_saved_searches()
                    )
                }
                "save_saved_search" => {
                    handle_parameterized_method!(
                        request,
                        SaveSearchParams,
                        "save_saved_search",
                        "Save search",
                        |params| self.save_saved_search(params)
                    )
                }
                "delete_saved_search" => {
                    handle_parameterized_method!(
                        request,
                        DeleteParams,
                        "delete_saved_search",
                        "Delete saved search",
                        |params| self.delete_saved_search(params)
                    )
                }
                "get_integrations" => {
                    handle_simple_method!(
                        request.id,
                        "get_integrations",
                        "Retrieve integrations",
                        self.get_integrations()
                    )
                }
                "connect_integration" => {
                    handle_parameterized_method!(
                        request,
                        ConnectIntegrationParams,
                        "connect_integration",
                        "Connect integration",
                        |params| self.connect_integration(params)
                    )
                }
                "set_cascade_policy" => {
                    handle_parameterized_method!(
                        request,
                        SetCascadePolicyParams,
                        "set_cascade_policy",
                        "Set cascade policy",
                        |params| self.set_cascade_policy(params)
                    )
                }
                "create_backup" => {
                    handle_simple_method!(
                        request.id,
                        "create_backup",
                        "Create snapshot backup",
                        self.create_backup()
                    )
                }
                _ => {
                    eprintln!("[ERROR] Unknown method: {}", request.method);
                    JsonRpcServer::error_response(
                        request.id,
                        crate::comms::JsonRpcError::method_not_found(),
                    )
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, ParentRef, TaskStatus};
    use crate::reparent::DragNode;
    use tempfile::TempDir;

    async fn fresh_handler() -> (CoreHandler, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let handler = CoreHandler::new(temp_dir.path().to_path_buf())
            .await
            .unwrap();
        (handler, temp_dir)
    }

    #[tokio::test]
    async fn test_sample_data_loaded_on_fresh_start() {
        let (handler, _dir) = fresh_handler().await;
        let projects = handler.get_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Website");
    }

    #[tokio::test]
    async fn test_create_hierarchy_and_list_children() {
        let (handler, _dir) = fresh_handler().await;
        let project = handler
            .create_project(CreateProjectParams {
                name: "Mobile app".to_string(),
            })
            .await
            .unwrap();
        let group = handler
            .create_group(CreateGroupParams {
                name: "Frontend".to_string(),
                project_id: project.id.clone(),
            })
            .await
            .unwrap();
        let task = handler
            .create_task(CreateTaskParams {
                title: "Login screen".to_string(),
                description: None,
                parent: Some(ParentRef::Group(group.id.clone())),
                priority: None,
                tags: None,
                start_date: None,
                end_date: None,
            })
            .await
            .unwrap();
        let children = handler
            .get_children(GetChildrenParams {
                id: group.id,
                kind: NodeKind::Group,
                filter: None,
            })
            .await
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id(), task.id);
    }

    #[tokio::test]
    async fn test_create_task_rejects_empty_title() {
        let (handler, _dir) = fresh_handler().await;
        let result = handler
            .create_task(CreateTaskParams {
                title: "   ".to_string(),
                description: None,
                parent: None,
                priority: None,
                tags: None,
                start_date: None,
                end_date: None,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_status_change_completes_linked_goal() {
        let (handler, _dir) = fresh_handler().await;
        let task = handler
            .create_task(CreateTaskParams {
                title: "Ship release".to_string(),
                description: None,
                parent: None,
                priority: None,
                tags: None,
                start_date: None,
                end_date: None,
            })
            .await
            .unwrap();
        let goal = handler
            .create_goal(CreateGoalParams {
                title: "Launch".to_string(),
                description: None,
                deadline: None,
                category: None,
                linked_task_ids: Some(vec![task.id.clone()]),
            })
            .await
            .unwrap();
        let response = handler
            .update_task_status(UpdateTaskStatusParams {
                id: task.id,
                status: TaskStatus::Completed,
            })
            .await
            .unwrap();
        assert_eq!(response.completed_goal_ids, vec![goal.id]);
    }

    #[tokio::test]
    async fn test_move_node_rejection_is_not_an_error() {
        let (handler, _dir) = fresh_handler().await;
        let task = handler
            .create_task(CreateTaskParams {
                title: "Floating".to_string(),
                description: None,
                parent: None,
                priority: None,
                tags: None,
                start_date: None,
                end_date: None,
            })
            .await
            .unwrap();
        let projects = handler.get_projects().await.unwrap();
        let outcome = handler
            .move_node(MoveNodeParams {
                node: DragNode::Task(task.id),
                target: crate::reparent::DropTarget {
                    id: projects[0].id.clone(),
                    kind: NodeKind::Project,
                },
            })
            .await
            .unwrap();
        assert!(matches!(outcome, MoveOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let (handler, _dir) = fresh_handler().await;
        let response = handler
            .handle_request(JsonRpcRequest {
                jsonrpc: "2.0".to_string(),
                method: "does_not_exist".to_string(),
                params: None,
                id: Some(serde_json::json!(7)),
            })
            .await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_connect_integration_simulated_success() {
        let (handler, _dir) = fresh_handler().await;
        let config = handler
            .connect_integration(ConnectIntegrationParams {
                provider: "calendar".to_string(),
            })
            .await
            .unwrap();
        assert!(config.connected);
        let listed = handler.get_integrations().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].provider, "calendar");
    }
}
