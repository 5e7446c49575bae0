use crate::filter::TaskFilter;
use crate::model::{NodeKind, ParentRef, TreeNode};
use crate::store::EntityStore;
use std::collections::{HashMap, HashSet};

/// Derived parent→children view over the store's flat collections.
///
/// The store owns only parent pointers; this index is rebuilt after mutations
/// so that tree reads are a map lookup instead of a scan per node. All reads
/// are pure and tolerate unknown or dangling ids by returning empty results.
#[derive(Debug, Default)]
pub struct HierarchyIndex {
    groups_by_project: HashMap<String, Vec<String>>,
    tasks_by_group: HashMap<String, Vec<String>>,
    subtasks_by_task: HashMap<String, Vec<String>>,
}

impl HierarchyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(store: &EntityStore) -> Self {
        let mut index = Self::new();
        index.rebuild(store);
        index
    }

    pub fn rebuild(&mut self, store: &EntityStore) {
        self.groups_by_project.clear();
        self.tasks_by_group.clear();
        self.subtasks_by_task.clear();
        for group in store.groups.values() {
            self.groups_by_project
                .entry(group.parent_id.clone())
                .or_default()
                .push(group.id.clone());
        }
        for task in store.tasks.values() {
            match &task.parent {
                Some(ParentRef::Group(gid)) => self
                    .tasks_by_group
                    .entry(gid.clone())
                    .or_default()
                    .push(task.id.clone()),
                Some(ParentRef::Task(tid)) => self
                    .subtasks_by_task
                    .entry(tid.clone())
                    .or_default()
                    .push(task.id.clone()),
                None => {}
            }
        }
    }

    /// Children of a node: a project's groups, a group's tasks, or a task's
    /// sub-tasks. Unknown ids yield an empty sequence.
    pub fn children_of(&self, store: &EntityStore, id: &str, kind: NodeKind) -> Vec<TreeNode> {
        match kind {
            NodeKind::Project => self
                .groups_by_project
                .get(id)
                .into_iter()
                .flatten()
                .filter_map(|gid| store.groups.get(gid))
                .map(|g| TreeNode::Group(g.clone()))
                .collect(),
            NodeKind::Group => self
                .tasks_by_group
                .get(id)
                .into_iter()
                .flatten()
                .filter_map(|tid| store.tasks.get(tid))
                .map(|t| TreeNode::Task(t.clone()))
                .collect(),
            NodeKind::Task => self
                .subtasks_by_task
                .get(id)
                .into_iter()
                .flatten()
                .filter_map(|tid| store.tasks.get(tid))
                .map(|t| TreeNode::Task(t.clone()))
                .collect(),
        }
    }

    /// Same as `children_of`, with filter criteria applied to the task subset
    /// only; group and project children always pass through.
    pub fn children_of_filtered(
        &self,
        store: &EntityStore,
        id: &str,
        kind: NodeKind,
        filter: &TaskFilter,
    ) -> Vec<TreeNode> {
        self.children_of(store, id, kind)
            .into_iter()
            .filter(|node| match node {
                TreeNode::Task(task) => filter.matches(task, store, self),
                _ => true,
            })
            .collect()
    }

    /// The group a task ultimately hangs under, following sub-task parents
    /// upward. None when the chain is dangling or leaves the group level.
    pub fn resolve_group_of_task<'a>(
        &self,
        store: &'a EntityStore,
        task_id: &str,
    ) -> Option<&'a crate::model::Group> {
        let mut seen = HashSet::new();
        let mut current = task_id.to_string();
        loop {
            if !seen.insert(current.clone()) {
                // Corrupt parent cycle; treat as unresolvable.
                return None;
            }
            let task = store.tasks.get(&current)?;
            match &task.parent {
                Some(ParentRef::Group(gid)) => return store.groups.get(gid),
                Some(ParentRef::Task(tid)) => current = tid.clone(),
                None => return None,
            }
        }
    }

    /// Ancestor chain of a node, nearest first: sub-task parents, then the
    /// group, then the project. Dangling links truncate the chain.
    pub fn ancestors_of(
        &self,
        store: &EntityStore,
        id: &str,
        kind: NodeKind,
    ) -> Vec<(NodeKind, String)> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        match kind {
            NodeKind::Project => {}
            NodeKind::Group => {
                if let Some(group) = store.groups.get(id) {
                    if store.projects.contains_key(&group.parent_id) {
                        chain.push((NodeKind::Project, group.parent_id.clone()));
                    }
                }
            }
            NodeKind::Task => {
                let mut current = id.to_string();
                while seen.insert(current.clone()) {
                    let Some(task) = store.tasks.get(&current) else {
                        break;
                    };
                    match &task.parent {
                        Some(ParentRef::Task(tid)) => {
                            if store.tasks.contains_key(tid) {
                                chain.push((NodeKind::Task, tid.clone()));
                            }
                            current = tid.clone();
                        }
                        Some(ParentRef::Group(gid)) => {
                            if let Some(group) = store.groups.get(gid) {
                                chain.push((NodeKind::Group, gid.clone()));
                                if store.projects.contains_key(&group.parent_id) {
                                    chain.push((NodeKind::Project, group.parent_id.clone()));
                                }
                            }
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
        chain
    }

    /// True when `candidate` sits somewhere inside the subtree rooted at
    /// `node` — the test behind drag-drop cycle prevention.
    pub fn is_descendant_of(
        &self,
        store: &EntityStore,
        candidate_id: &str,
        candidate_kind: NodeKind,
        node_id: &str,
        node_kind: NodeKind,
    ) -> bool {
        if candidate_id == node_id && candidate_kind == node_kind {
            return true;
        }
        self.ancestors_of(store, candidate_id, candidate_kind)
            .iter()
            .any(|(kind, id)| *kind == node_kind && id == node_id)
    }
}
