use crate::hierarchy::HierarchyIndex;
use crate::model::{NodeKind, ParentRef};
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};

/// A draggable node. Projects are never draggable, which the type makes
/// unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id")]
pub enum DragNode {
    #[serde(rename = "task")]
    Task(String),
    #[serde(rename = "group")]
    Group(String),
}

impl DragNode {
    pub fn id(&self) -> &str {
        match self {
            DragNode::Task(id) | DragNode::Group(id) => id,
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            DragNode::Task(_) => NodeKind::Task,
            DragNode::Group(_) => NodeKind::Group,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropTarget {
    pub id: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragNode),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Drop received with no drag in progress.
    NoActiveDrag,
    /// The dragged node no longer exists in the store.
    UnknownNode,
    /// The drop target does not exist in the store.
    UnknownTarget,
    /// The target kind cannot parent the dragged node (e.g. task onto
    /// project).
    TargetNotAllowed,
    /// The candidate parent sits inside the dragged node's own subtree.
    WouldCycle,
}

/// Result of a drop. Rejections are expected, recoverable conditions; the
/// store is untouched for anything but `Moved`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved,
    NoOp,
    Rejected { reason: RejectReason },
}

/// Drag-and-drop session: `idle → dragging → (dropped | cancelled) → idle`.
/// The drop path validates target kind, detects no-op moves, and walks the
/// candidate parent's ancestor chain to refuse cycles before any write.
#[derive(Debug, Default)]
pub struct DragDropCoordinator {
    state: DragState,
}

impl DragDropCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn start_drag(&mut self, node: DragNode) {
        self.state = DragState::Dragging(node);
    }

    /// Drop outside any valid target, or a host-level cancel. Leaves the
    /// store untouched.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Complete the drag on `target`. The session returns to idle whatever
    /// the outcome; only a `Moved` outcome writes to the store (and rebuilds
    /// the hierarchy index).
    pub fn drop_on(
        &mut self,
        store: &mut EntityStore,
        index: &mut HierarchyIndex,
        target: &DropTarget,
    ) -> MoveOutcome {
        let DragState::Dragging(node) = std::mem::take(&mut self.state) else {
            return MoveOutcome::Rejected {
                reason: RejectReason::NoActiveDrag,
            };
        };
        let outcome = Self::validate(store, index, &node, target);
        if outcome != MoveOutcome::Moved {
            return outcome;
        }
        let applied = match &node {
            DragNode::Task(id) => {
                let parent = match target.kind {
                    NodeKind::Group => ParentRef::Group(target.id.clone()),
                    NodeKind::Task => ParentRef::Task(target.id.clone()),
                    NodeKind::Project => {
                        return MoveOutcome::Rejected {
                            reason: RejectReason::TargetNotAllowed,
                        };
                    }
                };
                store.set_task_parent(id, Some(parent))
            }
            DragNode::Group(id) => store.set_group_parent(id, target.id.clone()),
        };
        match applied {
            Ok(()) => {
                index.rebuild(store);
                MoveOutcome::Moved
            }
            // The store shifted underneath us; treat like any stale drag.
            Err(_) => MoveOutcome::Rejected {
                reason: RejectReason::UnknownNode,
            },
        }
    }

    /// Pure validation half of the drop sequence: rules 1-4 without writes.
    fn validate(
        store: &EntityStore,
        index: &HierarchyIndex,
        node: &DragNode,
        target: &DropTarget,
    ) -> MoveOutcome {
        let reject = |reason| MoveOutcome::Rejected { reason };
        match node {
            DragNode::Task(task_id) => {
                let Some(task) = store.get_task(task_id) else {
                    return reject(RejectReason::UnknownNode);
                };
                let candidate = match target.kind {
                    // A task never lands directly on a project.
                    NodeKind::Project => return reject(RejectReason::TargetNotAllowed),
                    NodeKind::Group => {
                        if store.get_group(&target.id).is_none() {
                            return reject(RejectReason::UnknownTarget);
                        }
                        ParentRef::Group(target.id.clone())
                    }
                    NodeKind::Task => {
                        if store.get_task(&target.id).is_none() {
                            return reject(RejectReason::UnknownTarget);
                        }
                        ParentRef::Task(target.id.clone())
                    }
                };
                if task.parent.as_ref() == Some(&candidate) {
                    return MoveOutcome::NoOp;
                }
                if target.kind == NodeKind::Task
                    && index.is_descendant_of(
                        store,
                        &target.id,
                        NodeKind::Task,
                        task_id,
                        NodeKind::Task,
                    )
                {
                    return reject(RejectReason::WouldCycle);
                }
                MoveOutcome::Moved
            }
            DragNode::Group(group_id) => {
                let Some(group) = store.get_group(group_id) else {
                    return reject(RejectReason::UnknownNode);
                };
                if target.kind != NodeKind::Project {
                    return reject(RejectReason::TargetNotAllowed);
                }
                if store.get_project(&target.id).is_none() {
                    return reject(RejectReason::UnknownTarget);
                }
                if group.parent_id == target.id {
                    return MoveOutcome::NoOp;
                }
                MoveOutcome::Moved
            }
        }
    }

    /// Convenience for hosts that deliver start and drop as one event.
    pub fn perform_move(
        &mut self,
        store: &mut EntityStore,
        index: &mut HierarchyIndex,
        node: DragNode,
        target: &DropTarget,
    ) -> MoveOutcome {
        self.start_drag(node);
        self.drop_on(store, index, target)
    }
}
