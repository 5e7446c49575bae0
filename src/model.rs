use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    #[serde(rename = "not_started")]
    NotStarted,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "blocked")]
    Blocked,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::NotStarted
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Parent of a task. A task always hangs off a group or another task,
/// never off a project directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id")]
pub enum ParentRef {
    #[serde(rename = "group")]
    Group(String),
    #[serde(rename = "task")]
    Task(String),
}

impl ParentRef {
    pub fn id(&self) -> &str {
        match self {
            ParentRef::Group(id) | ParentRef::Task(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(text: String) -> Self {
        Self {
            id: new_id(),
            text,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
}

impl Project {
    pub fn new(name: String) -> Self {
        Self { id: new_id(), name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,
    /// References a project id.
    pub parent_id: String,
}

impl Group {
    pub fn new(name: String, parent_id: String) -> Self {
        Self {
            id: new_id(),
            name,
            parent_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    pub parent: Option<ParentRef>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Task {
    pub fn new(title: String, parent: Option<ParentRef>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            title,
            description: String::new(),
            status: TaskStatus::default(),
            priority: Priority::default(),
            tags: Vec::new(),
            parent,
            start_date: None,
            end_date: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            attachments: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Change status, keeping `completed_at` in sync: set exactly when the
    /// task becomes completed, cleared when it leaves that state.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.completed_at = match status {
            TaskStatus::Completed => Some(Utc::now()),
            _ => None,
        };
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Timestamp used for date-range filtering: last update, which starts out
    /// equal to the creation time.
    pub fn filter_timestamp(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GoalStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "archived")]
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<String>,
    /// Derived from linked tasks, not authoritative user input.
    pub progress: u8,
    pub status: GoalStatus,
    #[serde(default)]
    pub linked_task_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Goal {
    pub fn new(title: String, linked_task_ids: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            title,
            description: String::new(),
            deadline: None,
            category: None,
            progress: 0,
            status: GoalStatus::Active,
            linked_task_ids,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Store the recomputed progress. When it first reaches 100 on an active
    /// goal, the goal completes and `completed_at` is stamped; that transition
    /// is one-way and happens only here. Returns true when the goal completed
    /// on this call.
    pub fn apply_progress(&mut self, progress: u8) -> bool {
        self.progress = progress.min(100);
        self.updated_at = Utc::now();
        if self.progress == 100 && self.status == GoalStatus::Active {
            self.status = GoalStatus::Completed;
            self.completed_at = Some(Utc::now());
            return true;
        }
        false
    }
}

/// A node of the project tree, addressable uniformly for tree traversal,
/// expand/collapse and drag purposes. The variant tag is the single source of
/// truth for a node's kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TreeNode {
    #[serde(rename = "project")]
    Project(Project),
    #[serde(rename = "group")]
    Group(Group),
    #[serde(rename = "task")]
    Task(Task),
}

impl TreeNode {
    pub fn id(&self) -> &str {
        match self {
            TreeNode::Project(p) => &p.id,
            TreeNode::Group(g) => &g.id,
            TreeNode::Task(t) => &t.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            TreeNode::Project(_) => NodeKind::Project,
            TreeNode::Group(_) => NodeKind::Group,
            TreeNode::Task(_) => NodeKind::Task,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeKind {
    #[serde(rename = "project")]
    Project,
    #[serde(rename = "group")]
    Group,
    #[serde(rename = "task")]
    Task,
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("Test task".to_string(), None);
        assert_eq!(task.title, "Test task");
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.parent.is_none());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_set_status_stamps_completed_at() {
        let mut task = Task::new("Test task".to_string(), None);
        task.set_status(TaskStatus::Completed);
        assert!(task.completed_at.is_some());
        task.set_status(TaskStatus::InProgress);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_goal_completes_once() {
        let mut goal = Goal::new("Ship it".to_string(), vec!["t1".to_string()]);
        assert!(goal.apply_progress(100));
        assert_eq!(goal.status, GoalStatus::Completed);
        let stamped = goal.completed_at;
        assert!(stamped.is_some());
        // A second recompute at 100 must not re-trigger the transition.
        assert!(!goal.apply_progress(100));
        assert_eq!(goal.completed_at, stamped);
    }

    #[test]
    fn test_parent_ref_serialization() {
        let parent = ParentRef::Group("g1".to_string());
        let json = serde_json::to_string(&parent).unwrap();
        assert!(json.contains("\"kind\":\"group\""));
        let parsed: ParentRef = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, parent);
    }

    #[test]
    fn test_tree_node_kind_matches_variant() {
        let node = TreeNode::Task(Task::new("t".to_string(), None));
        assert_eq!(node.kind(), NodeKind::Task);
    }
}
