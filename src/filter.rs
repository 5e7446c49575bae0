use crate::hierarchy::HierarchyIndex;
use crate::model::{Priority, Task, TaskStatus};
use crate::store::EntityStore;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A range bound that is either a precise timestamp or a calendar day.
/// Day-only upper bounds are widened to the end of that day so "to 2024-03-01"
/// includes everything that happened on March 1st.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DateBound {
    Timestamp(DateTime<Utc>),
    Day(NaiveDate),
}

impl DateBound {
    pub fn lower_bound(&self) -> DateTime<Utc> {
        match self {
            DateBound::Timestamp(ts) => *ts,
            DateBound::Day(day) => day.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    pub fn upper_bound(&self) -> DateTime<Utc> {
        match self {
            DateBound::Timestamp(ts) => *ts,
            DateBound::Day(day) => day
                .and_hms_milli_opt(23, 59, 59, 999)
                .unwrap_or_else(|| day.and_time(NaiveTime::MIN))
                .and_utc(),
        }
    }
}

/// Filter criteria over tasks. Every field is independently optional; an
/// absent or empty field places no constraint. Fields combine with AND,
/// the values inside one field with OR.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskFilter {
    pub text: Option<String>,
    pub statuses: Option<Vec<TaskStatus>>,
    pub priorities: Option<Vec<Priority>>,
    pub tags: Option<Vec<String>>,
    pub project_ids: Option<Vec<String>>,
    pub group_ids: Option<Vec<String>>,
    pub date_from: Option<DateBound>,
    pub date_to: Option<DateBound>,
}

fn constrains<T>(field: &Option<Vec<T>>) -> bool {
    field.as_ref().is_some_and(|values| !values.is_empty())
}

impl TaskFilter {
    /// True when no field constrains anything; applying such a filter is the
    /// identity.
    pub fn is_empty(&self) -> bool {
        self.text.as_ref().is_none_or(|t| t.is_empty())
            && !constrains(&self.statuses)
            && !constrains(&self.priorities)
            && !constrains(&self.tags)
            && !constrains(&self.project_ids)
            && !constrains(&self.group_ids)
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    pub fn matches(&self, task: &Task, store: &EntityStore, index: &HierarchyIndex) -> bool {
        if let Some(text) = self.text.as_ref().filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task.description.to_lowercase().contains(&needle);
            if !in_title && !in_description {
                return false;
            }
        }
        if let Some(statuses) = self.statuses.as_ref().filter(|s| !s.is_empty()) {
            if !statuses.contains(&task.status) {
                return false;
            }
        }
        if let Some(priorities) = self.priorities.as_ref().filter(|p| !p.is_empty()) {
            if !priorities.contains(&task.priority) {
                return false;
            }
        }
        if let Some(tags) = self.tags.as_ref().filter(|t| !t.is_empty()) {
            if !task.tags.iter().any(|tag| tags.contains(tag)) {
                return false;
            }
        }
        if constrains(&self.project_ids) || constrains(&self.group_ids) {
            // A task with no resolvable ancestor group never matches a
            // non-empty project or group filter.
            let Some(group) = index.resolve_group_of_task(store, &task.id) else {
                return false;
            };
            if let Some(group_ids) = self.group_ids.as_ref().filter(|g| !g.is_empty()) {
                if !group_ids.iter().any(|id| *id == group.id) {
                    return false;
                }
            }
            if let Some(project_ids) = self.project_ids.as_ref().filter(|p| !p.is_empty()) {
                if !project_ids.iter().any(|id| *id == group.parent_id) {
                    return false;
                }
            }
        }
        let stamp = task.filter_timestamp();
        if let Some(from) = &self.date_from {
            if stamp < from.lower_bound() {
                return false;
            }
        }
        if let Some(to) = &self.date_to {
            if stamp > to.upper_bound() {
                return false;
            }
        }
        true
    }

    /// Stable filter: output preserves the relative order of the input.
    pub fn apply<'a, I>(
        &self,
        tasks: I,
        store: &EntityStore,
        index: &HierarchyIndex,
    ) -> Vec<&'a Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        tasks
            .into_iter()
            .filter(|task| self.matches(task, store, index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParentRef;
    use crate::model::{Group, Project};

    fn store_with_tagged_tasks() -> (EntityStore, HierarchyIndex) {
        let mut store = EntityStore::new();
        let pid = store.add_project(Project::new("P".to_string())).unwrap();
        let gid = store.add_group(Group::new("G".to_string(), pid)).unwrap();
        let mut t1 = Task::new("Fix login".to_string(), Some(ParentRef::Group(gid.clone())));
        t1.tags = vec!["bug".to_string()];
        let mut t2 = Task::new("Write docs".to_string(), Some(ParentRef::Group(gid)));
        t2.description = "login flow described".to_string();
        t2.tags = vec!["docs".to_string()];
        store.add_task(t1).unwrap();
        store.add_task(t2).unwrap();
        let index = HierarchyIndex::build(&store);
        (store, index)
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let (store, index) = store_with_tagged_tasks();
        let filter = TaskFilter::default();
        assert!(filter.is_empty());
        let all = store.tasks_in_order();
        let filtered = filter.apply(all.iter().copied(), &store, &index);
        assert_eq!(filtered.len(), all.len());
    }

    #[test]
    fn test_text_matches_title_or_description() {
        let (store, index) = store_with_tagged_tasks();
        let filter = TaskFilter {
            text: Some("LOGIN".to_string()),
            ..Default::default()
        };
        let hits = filter.apply(store.tasks_in_order(), &store, &index);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_tag_or_semantics() {
        let (store, index) = store_with_tagged_tasks();
        let filter = TaskFilter {
            tags: Some(vec!["bug".to_string(), "unused".to_string()]),
            ..Default::default()
        };
        let hits = filter.apply(store.tasks_in_order(), &store, &index);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Fix login");
    }

    #[test]
    fn test_unparented_task_never_matches_project_filter() {
        let (mut store, _) = store_with_tagged_tasks();
        let stray = store.add_task(Task::new("Stray".to_string(), None)).unwrap();
        let index = HierarchyIndex::build(&store);
        let project_id = store.projects.keys().next().unwrap().clone();
        let filter = TaskFilter {
            project_ids: Some(vec![project_id]),
            ..Default::default()
        };
        let hits = filter.apply(store.tasks_in_order(), &store, &index);
        assert!(hits.iter().all(|t| t.id != stray));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_day_bound_widens_to_end_of_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bound = DateBound::Day(day);
        let late = day.and_hms_milli_opt(23, 59, 59, 500).unwrap().and_utc();
        assert!(late <= bound.upper_bound());
    }
}
