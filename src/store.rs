use crate::model::{
    Goal, Group, ParentRef, Priority, Project, Task, TaskStatus,
};
use crate::stats;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// What happens to descendants when a project or group is deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CascadePolicy {
    /// Descendant groups and tasks are deleted with their parent.
    #[serde(rename = "cascade")]
    Cascade,
    /// Descendant tasks are detached (parent cleared) and kept. Groups cannot
    /// outlive their project, so project deletion still removes its groups.
    #[serde(rename = "orphan")]
    Orphan,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        CascadePolicy::Cascade
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Default for StoreMeta {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            schema_version: SCHEMA_VERSION,
            created: now,
            last_updated: now,
        }
    }
}

/// Authoritative flat collections, keyed by id in insertion order. The
/// hierarchy is parent pointers only; `HierarchyIndex` derives the
/// parent→children view from these maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStore {
    pub meta: StoreMeta,
    pub projects: IndexMap<String, Project>,
    pub groups: IndexMap<String, Group>,
    pub tasks: IndexMap<String, Task>,
    pub goals: IndexMap<String, Goal>,
    #[serde(default)]
    pub cascade_policy: CascadePolicy,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            meta: StoreMeta::default(),
            projects: IndexMap::new(),
            groups: IndexMap::new(),
            tasks: IndexMap::new(),
            goals: IndexMap::new(),
            cascade_policy: CascadePolicy::default(),
        }
    }

    fn touch(&mut self) {
        self.meta.last_updated = Utc::now();
    }

    // --- projects ---

    pub fn add_project(&mut self, project: Project) -> anyhow::Result<String> {
        if self.projects.contains_key(&project.id) {
            return Err(anyhow::anyhow!("Duplicate project id: {}", project.id));
        }
        let id = project.id.clone();
        self.projects.insert(id.clone(), project);
        self.touch();
        Ok(id)
    }

    pub fn get_project(&self, id: &str) -> Option<&Project> {
        self.projects.get(id)
    }

    pub fn rename_project(&mut self, id: &str, name: String) -> anyhow::Result<()> {
        let project = self
            .projects
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Project not found: {}", id))?;
        project.name = name;
        self.touch();
        Ok(())
    }

    /// Delete a project. Its groups always go with it; what happens to the
    /// tasks under those groups depends on the configured cascade policy.
    pub fn delete_project(&mut self, id: &str) -> anyhow::Result<()> {
        if self.projects.shift_remove(id).is_none() {
            return Err(anyhow::anyhow!("Project not found: {}", id));
        }
        let group_ids: Vec<String> = self
            .groups
            .values()
            .filter(|g| g.parent_id == id)
            .map(|g| g.id.clone())
            .collect();
        for gid in &group_ids {
            self.remove_group_contents(gid);
            self.groups.shift_remove(gid);
        }
        self.touch();
        Ok(())
    }

    // --- groups ---

    pub fn add_group(&mut self, group: Group) -> anyhow::Result<String> {
        if self.groups.contains_key(&group.id) {
            return Err(anyhow::anyhow!("Duplicate group id: {}", group.id));
        }
        if !self.projects.contains_key(&group.parent_id) {
            return Err(anyhow::anyhow!(
                "Group parent project not found: {}",
                group.parent_id
            ));
        }
        let id = group.id.clone();
        self.groups.insert(id.clone(), group);
        self.touch();
        Ok(id)
    }

    pub fn get_group(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn rename_group(&mut self, id: &str, name: String) -> anyhow::Result<()> {
        let group = self
            .groups
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Group not found: {}", id))?;
        group.name = name;
        self.touch();
        Ok(())
    }

    pub fn delete_group(&mut self, id: &str) -> anyhow::Result<()> {
        if self.groups.shift_remove(id).is_none() {
            return Err(anyhow::anyhow!("Group not found: {}", id));
        }
        self.remove_group_contents(id);
        self.touch();
        Ok(())
    }

    /// Apply the cascade policy to every task that hangs (directly or through
    /// sub-tasks) under the given group.
    fn remove_group_contents(&mut self, group_id: &str) {
        let direct: Vec<String> = self
            .tasks
            .values()
            .filter(|t| t.parent == Some(ParentRef::Group(group_id.to_string())))
            .map(|t| t.id.clone())
            .collect();
        match self.cascade_policy {
            CascadePolicy::Cascade => {
                for tid in direct {
                    self.remove_task_subtree(&tid);
                }
            }
            CascadePolicy::Orphan => {
                for tid in direct {
                    if let Some(task) = self.tasks.get_mut(&tid) {
                        task.parent = None;
                        task.touch();
                    }
                }
            }
        }
    }

    /// Delete a task together with its transitive sub-tasks.
    fn remove_task_subtree(&mut self, task_id: &str) {
        let mut pending = vec![task_id.to_string()];
        while let Some(tid) = pending.pop() {
            self.tasks.shift_remove(&tid);
            let children: Vec<String> = self
                .tasks
                .values()
                .filter(|t| t.parent == Some(ParentRef::Task(tid.clone())))
                .map(|t| t.id.clone())
                .collect();
            pending.extend(children);
        }
    }

    // --- tasks ---

    pub fn add_task(&mut self, task: Task) -> anyhow::Result<String> {
        if self.tasks.contains_key(&task.id) {
            return Err(anyhow::anyhow!("Duplicate task id: {}", task.id));
        }
        let id = task.id.clone();
        self.tasks.insert(id.clone(), task);
        self.touch();
        Ok(id)
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn get_task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn tasks_in_order(&self) -> Vec<&Task> {
        self.tasks.values().collect()
    }

    /// Status change: stamps `completed_at` in the task and recomputes every
    /// goal linked to it.
    pub fn set_task_status(&mut self, id: &str, status: TaskStatus) -> anyhow::Result<Vec<String>> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;
        task.set_status(status);
        self.touch();
        Ok(self.recompute_goals_for(&[id.to_string()]))
    }

    pub fn set_task_priority(&mut self, id: &str, priority: Priority) -> anyhow::Result<()> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;
        task.priority = priority;
        task.touch();
        self.touch();
        Ok(())
    }

    /// Targeted field edit used by the update operations; touches the task
    /// and store timestamps.
    pub fn edit_task<F>(&mut self, id: &str, edit: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Task),
    {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;
        edit(task);
        task.touch();
        self.touch();
        Ok(())
    }

    /// Reparent primitive used by the drag-drop coordinator. Does not
    /// validate; callers run the move through the coordinator first.
    pub fn set_task_parent(&mut self, id: &str, parent: Option<ParentRef>) -> anyhow::Result<()> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;
        task.parent = parent;
        task.touch();
        self.touch();
        Ok(())
    }

    pub fn set_group_parent(&mut self, id: &str, project_id: String) -> anyhow::Result<()> {
        let group = self
            .groups
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Group not found: {}", id))?;
        group.parent_id = project_id;
        self.touch();
        Ok(())
    }

    /// Deleting a task has no cascading effect on other tasks; its sub-tasks
    /// keep their (now dangling) parent reference, which every derivation
    /// tolerates. Goals linked to it are recomputed with the task excluded.
    pub fn delete_task(&mut self, id: &str) -> anyhow::Result<Vec<String>> {
        if self.tasks.shift_remove(id).is_none() {
            return Err(anyhow::anyhow!("Task not found: {}", id));
        }
        self.touch();
        Ok(self.recompute_goals_for(&[id.to_string()]))
    }

    // --- goals ---

    pub fn add_goal(&mut self, mut goal: Goal) -> anyhow::Result<String> {
        if self.goals.contains_key(&goal.id) {
            return Err(anyhow::anyhow!("Duplicate goal id: {}", goal.id));
        }
        // Initial derived progress; an empty-link goal stays at its creation
        // value rather than being forced by the recompute pass.
        if let Some(progress) = stats::goal_progress(&goal, &self.tasks) {
            goal.apply_progress(progress);
        }
        let id = goal.id.clone();
        self.goals.insert(id.clone(), goal);
        self.touch();
        Ok(id)
    }

    pub fn get_goal(&self, id: &str) -> Option<&Goal> {
        self.goals.get(id)
    }

    pub fn delete_goal(&mut self, id: &str) -> anyhow::Result<()> {
        if self.goals.shift_remove(id).is_none() {
            return Err(anyhow::anyhow!("Goal not found: {}", id));
        }
        self.touch();
        Ok(())
    }

    pub fn link_task_to_goal(&mut self, goal_id: &str, task_id: &str) -> anyhow::Result<Vec<String>> {
        let goal = self
            .goals
            .get_mut(goal_id)
            .ok_or_else(|| anyhow::anyhow!("Goal not found: {}", goal_id))?;
        if !goal.linked_task_ids.iter().any(|id| id == task_id) {
            goal.linked_task_ids.push(task_id.to_string());
        }
        self.touch();
        Ok(self.recompute_goals_for(&[task_id.to_string()]))
    }

    /// Recompute derived progress for every goal linked to one of the given
    /// tasks. Returns the ids of goals that completed during this pass.
    pub fn recompute_goals_for(&mut self, task_ids: &[String]) -> Vec<String> {
        let affected: Vec<String> = self
            .goals
            .values()
            .filter(|g| g.linked_task_ids.iter().any(|id| task_ids.contains(id)))
            .map(|g| g.id.clone())
            .collect();
        let mut completed = Vec::new();
        for gid in affected {
            let progress = {
                let goal = &self.goals[&gid];
                stats::goal_progress(goal, &self.tasks)
            };
            if let (Some(progress), Some(goal)) = (progress, self.goals.get_mut(&gid)) {
                if goal.apply_progress(progress) {
                    completed.push(gid);
                }
            }
        }
        if !completed.is_empty() {
            self.touch();
        }
        completed
    }

    pub fn recompute_all_goals(&mut self) -> Vec<String> {
        let all_task_ids: Vec<String> = self.tasks.keys().cloned().collect();
        self.recompute_goals_for(&all_task_ids)
    }
}

/// Small starter dataset used when persisted data is absent or unreadable.
pub fn sample_store() -> EntityStore {
    let mut store = EntityStore::new();
    let mut website = Project::new("Website".to_string());
    website.id = "sample-project-website".to_string();
    let project_id = website.id.clone();
    let _ = store.add_project(website);

    let mut backend = Group::new("Backend".to_string(), project_id);
    backend.id = "sample-group-backend".to_string();
    let group_id = backend.id.clone();
    let _ = store.add_group(backend);

    let mut auth = Task::new(
        "Implement auth".to_string(),
        Some(ParentRef::Group(group_id)),
    );
    auth.description = "Session handling and login form".to_string();
    auth.status = TaskStatus::InProgress;
    auth.priority = Priority::High;
    auth.end_date = Some(Utc::now() + chrono::Duration::days(2));
    let _ = store.add_task(auth);

    store
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (EntityStore, String, String, String) {
        let mut store = EntityStore::new();
        let pid = store.add_project(Project::new("P".to_string())).unwrap();
        let gid = store
            .add_group(Group::new("G".to_string(), pid.clone()))
            .unwrap();
        let tid = store
            .add_task(Task::new(
                "T".to_string(),
                Some(ParentRef::Group(gid.clone())),
            ))
            .unwrap();
        (store, pid, gid, tid)
    }

    #[test]
    fn test_group_requires_project() {
        let mut store = EntityStore::new();
        let result = store.add_group(Group::new("G".to_string(), "missing".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_cascade_delete_removes_subtree() {
        let (mut store, pid, _gid, tid) = seeded();
        let sub = store
            .add_task(Task::new(
                "Sub".to_string(),
                Some(ParentRef::Task(tid.clone())),
            ))
            .unwrap();
        store.delete_project(&pid).unwrap();
        assert!(store.tasks.get(&tid).is_none());
        assert!(store.tasks.get(&sub).is_none());
        assert!(store.groups.is_empty());
    }

    #[test]
    fn test_orphan_policy_detaches_tasks() {
        let (mut store, pid, _gid, tid) = seeded();
        store.cascade_policy = CascadePolicy::Orphan;
        store.delete_project(&pid).unwrap();
        let task = store.get_task(&tid).unwrap();
        assert!(task.parent.is_none());
        assert!(store.groups.is_empty());
    }

    #[test]
    fn test_status_change_recomputes_linked_goal() {
        let (mut store, _pid, _gid, tid) = seeded();
        let goal_id = store
            .add_goal(Goal::new("Launch".to_string(), vec![tid.clone()]))
            .unwrap();
        let completed = store
            .set_task_status(&tid, TaskStatus::Completed)
            .unwrap();
        assert_eq!(completed, vec![goal_id.clone()]);
        let goal = store.get_goal(&goal_id).unwrap();
        assert_eq!(goal.progress, 100);
    }

    #[test]
    fn test_deleted_task_leaves_goal_denominator() {
        let (mut store, _pid, _gid, tid) = seeded();
        let other = store.add_task(Task::new("U".to_string(), None)).unwrap();
        store.set_task_status(&other, TaskStatus::Completed).unwrap();
        let goal_id = store
            .add_goal(Goal::new(
                "Pair".to_string(),
                vec![tid.clone(), other.clone()],
            ))
            .unwrap();
        assert_eq!(store.get_goal(&goal_id).unwrap().progress, 50);
        // Removing the incomplete task shrinks the denominator to the one
        // completed task, so the goal finishes.
        let completed = store.delete_task(&tid).unwrap();
        assert_eq!(completed, vec![goal_id.clone()]);
        assert_eq!(store.get_goal(&goal_id).unwrap().progress, 100);
    }
}
