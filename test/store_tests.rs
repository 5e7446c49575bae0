use treedo::{
    CascadePolicy, EntityStore, Goal, Group, ParentRef, Priority, Project, Task, TaskStatus,
};

fn seeded() -> (EntityStore, String, String, String) {
    let mut store = EntityStore::new();
    let pid = store.add_project(Project::new("Website".to_string())).unwrap();
    let gid = store
        .add_group(Group::new("Backend".to_string(), pid.clone()))
        .unwrap();
    let tid = store
        .add_task(Task::new(
            "Implement auth".to_string(),
            Some(ParentRef::Group(gid.clone())),
        ))
        .unwrap();
    (store, pid, gid, tid)
}

#[test]
fn test_add_and_rename_project() {
    let (mut store, pid, _, _) = seeded();
    store.rename_project(&pid, "Website v2".to_string()).unwrap();
    assert_eq!(store.get_project(&pid).unwrap().name, "Website v2");
}

#[test]
fn test_group_rejected_without_project() {
    let mut store = EntityStore::new();
    assert!(store
        .add_group(Group::new("Orphan".to_string(), "missing".to_string()))
        .is_err());
}

#[test]
fn test_duplicate_ids_rejected() {
    let (mut store, _, _, tid) = seeded();
    let mut dup = Task::new("Dup".to_string(), None);
    dup.id = tid;
    assert!(store.add_task(dup).is_err());
}

#[test]
fn test_cascade_delete_removes_tasks_and_subtasks() {
    let (mut store, pid, _, tid) = seeded();
    let sub = store
        .add_task(Task::new(
            "Write session tests".to_string(),
            Some(ParentRef::Task(tid.clone())),
        ))
        .unwrap();
    store.delete_project(&pid).unwrap();
    assert!(store.projects.is_empty());
    assert!(store.groups.is_empty());
    assert!(store.get_task(&tid).is_none());
    assert!(store.get_task(&sub).is_none());
}

#[test]
fn test_orphan_policy_keeps_detached_tasks() {
    let (mut store, _pid, gid, tid) = seeded();
    store.cascade_policy = CascadePolicy::Orphan;
    store.delete_group(&gid).unwrap();
    let task = store.get_task(&tid).unwrap();
    assert!(task.parent.is_none());
}

#[test]
fn test_task_priority_and_edit() {
    let (mut store, _, _, tid) = seeded();
    store.set_task_priority(&tid, Priority::High).unwrap();
    store
        .edit_task(&tid, |task| {
            task.tags = vec!["security".to_string()];
        })
        .unwrap();
    let task = store.get_task(&tid).unwrap();
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.tags, vec!["security".to_string()]);
}

#[test]
fn test_status_change_stamps_and_clears_completed_at() {
    let (mut store, _, _, tid) = seeded();
    store.set_task_status(&tid, TaskStatus::Completed).unwrap();
    assert!(store.get_task(&tid).unwrap().completed_at.is_some());
    store.set_task_status(&tid, TaskStatus::InProgress).unwrap();
    assert!(store.get_task(&tid).unwrap().completed_at.is_none());
}

#[test]
fn test_goal_completion_is_one_way() {
    let (mut store, _, _, tid) = seeded();
    let gid = store
        .add_goal(Goal::new("Ship auth".to_string(), vec![tid.clone()]))
        .unwrap();
    let completed = store.set_task_status(&tid, TaskStatus::Completed).unwrap();
    assert_eq!(completed, vec![gid.clone()]);
    let stamped = store.get_goal(&gid).unwrap().completed_at;

    // Reopening the task lowers progress but the goal stays completed.
    store.set_task_status(&tid, TaskStatus::InProgress).unwrap();
    let goal = store.get_goal(&gid).unwrap();
    assert_eq!(goal.progress, 0);
    assert_eq!(goal.status, treedo::GoalStatus::Completed);
    assert_eq!(goal.completed_at, stamped);
}

#[test]
fn test_link_task_is_idempotent() {
    let (mut store, _, _, tid) = seeded();
    let gid = store
        .add_goal(Goal::new("Ship".to_string(), vec![]))
        .unwrap();
    store.link_task_to_goal(&gid, &tid).unwrap();
    store.link_task_to_goal(&gid, &tid).unwrap();
    assert_eq!(store.get_goal(&gid).unwrap().linked_task_ids.len(), 1);
}

#[test]
fn test_store_serialization_round_trip() {
    let (store, _, _, _) = seeded();
    let json = serde_json::to_string(&store).unwrap();
    let parsed: EntityStore = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.projects.len(), 1);
    assert_eq!(parsed.groups.len(), 1);
    assert_eq!(parsed.tasks.len(), 1);
    // Insertion order survives the round trip.
    assert_eq!(
        parsed.tasks.keys().collect::<Vec<_>>(),
        store.tasks.keys().collect::<Vec<_>>()
    );
}
