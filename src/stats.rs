//! Read-only derived statistics over the task collection.
//!
//! Every function here is pure: same input, same output, no mutation of the
//! passed-in collections and no I/O. Reference times are parameters so hosts
//! control "today".

use crate::model::{Goal, Task, TaskStatus};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusCounts {
    pub not_started: u32,
    pub in_progress: u32,
    pub completed: u32,
    pub blocked: u32,
    pub total: u32,
    /// completed / total in 0..=1; 0 for an empty collection.
    pub completion_rate: f32,
}

pub fn status_counts<'a, I>(tasks: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut counts = StatusCounts {
        not_started: 0,
        in_progress: 0,
        completed: 0,
        blocked: 0,
        total: 0,
        completion_rate: 0.0,
    };
    for task in tasks {
        counts.total += 1;
        match task.status {
            TaskStatus::NotStarted => counts.not_started += 1,
            TaskStatus::InProgress => counts.in_progress += 1,
            TaskStatus::Completed => counts.completed += 1,
            TaskStatus::Blocked => counts.blocked += 1,
        }
    }
    if counts.total > 0 {
        counts.completion_rate = counts.completed as f32 / counts.total as f32;
    }
    counts
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DueBuckets {
    pub overdue: Vec<String>,
    pub due_today: Vec<String>,
    pub upcoming: Vec<String>,
}

/// Bucket tasks by their due date (`end_date`) relative to `reference`.
///
/// overdue: due strictly before start-of-today and not completed;
/// due_today: due within [start-of-today, start-of-tomorrow);
/// upcoming: due within (reference, reference + window] and neither completed
/// nor blocked. Tasks without a due date land nowhere.
pub fn due_date_buckets<'a, I>(tasks: I, reference: DateTime<Utc>, window: Duration) -> DueBuckets
where
    I: IntoIterator<Item = &'a Task>,
{
    let start_of_today = reference.date_naive().and_time(NaiveTime::MIN).and_utc();
    let start_of_tomorrow = start_of_today + Duration::days(1);
    let mut buckets = DueBuckets::default();
    for task in tasks {
        let Some(due) = task.end_date else { continue };
        if due < start_of_today && task.status != TaskStatus::Completed {
            buckets.overdue.push(task.id.clone());
        }
        if due >= start_of_today && due < start_of_tomorrow {
            buckets.due_today.push(task.id.clone());
        }
        if due > reference
            && due <= reference + window
            && task.status != TaskStatus::Completed
            && task.status != TaskStatus::Blocked
        {
            buckets.upcoming.push(task.id.clone());
        }
    }
    buckets
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Granularity {
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "all")]
    All,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeBucket {
    pub label: String,
    pub count: u32,
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Completed tasks bucketed by completion timestamp.
///
/// Day: 24 hour bins for the reference day. Week: weekday bins for the
/// reference week, starting Monday. Month: week-of-month bins for the
/// reference month. All: one bin per calendar month that saw a completion,
/// ascending.
pub fn completion_histogram<'a, I>(
    tasks: I,
    granularity: Granularity,
    reference: DateTime<Utc>,
) -> Vec<TimeBucket>
where
    I: IntoIterator<Item = &'a Task>,
{
    let completions: Vec<DateTime<Utc>> = tasks
        .into_iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter_map(|t| t.completed_at)
        .collect();
    match granularity {
        Granularity::Day => {
            let day = reference.date_naive();
            let mut bins = vec![0u32; 24];
            for stamp in &completions {
                if stamp.date_naive() == day {
                    bins[stamp.hour() as usize] += 1;
                }
            }
            bins.into_iter()
                .enumerate()
                .map(|(hour, count)| TimeBucket {
                    label: format!("{}:00", hour),
                    count,
                })
                .collect()
        }
        Granularity::Week => {
            let day = reference.date_naive();
            let monday = day - Duration::days(day.weekday().num_days_from_monday() as i64);
            let mut bins = vec![0u32; 7];
            for stamp in &completions {
                let offset = (stamp.date_naive() - monday).num_days();
                if (0..7).contains(&offset) {
                    bins[offset as usize] += 1;
                }
            }
            bins.into_iter()
                .enumerate()
                .map(|(i, count)| TimeBucket {
                    label: weekday_label(
                        (monday + Duration::days(i as i64)).weekday(),
                    )
                    .to_string(),
                    count,
                })
                .collect()
        }
        Granularity::Month => {
            // Weeks of the month counted from the 1st: days 1-7 are week 1.
            let mut bins = vec![0u32; 6];
            for stamp in &completions {
                if stamp.year() == reference.year() && stamp.month() == reference.month() {
                    let week = ((stamp.day() - 1) / 7) as usize;
                    bins[week] += 1;
                }
            }
            while bins.len() > 4 && bins.last() == Some(&0) {
                bins.pop();
            }
            bins.into_iter()
                .enumerate()
                .map(|(i, count)| TimeBucket {
                    label: format!("Week {}", i + 1),
                    count,
                })
                .collect()
        }
        Granularity::All => {
            let mut bins: IndexMap<(i32, u32), u32> = IndexMap::new();
            let mut stamps = completions.clone();
            stamps.sort();
            for stamp in stamps {
                *bins.entry((stamp.year(), stamp.month())).or_insert(0) += 1;
            }
            bins.into_iter()
                .map(|((year, month), count)| TimeBucket {
                    label: format!("{:04}-{:02}", year, month),
                    count,
                })
                .collect()
        }
    }
}

/// Generic labeled counting; keys appear in first-seen order. Tasks whose key
/// function yields None are skipped.
pub fn distribution<'a, I, F>(tasks: I, key_fn: F) -> Vec<(String, u32)>
where
    I: IntoIterator<Item = &'a Task>,
    F: Fn(&Task) -> Option<String>,
{
    let mut counts: IndexMap<String, u32> = IndexMap::new();
    for task in tasks {
        if let Some(key) = key_fn(task) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts.into_iter().collect()
}

/// Key function for priority distributions.
pub fn priority_key(task: &Task) -> Option<String> {
    let label = match task.priority {
        crate::model::Priority::Low => "low",
        crate::model::Priority::Medium => "medium",
        crate::model::Priority::High => "high",
    };
    Some(label.to_string())
}

/// Key function for time-of-day distributions, from the completion hour:
/// night 0-5, morning 6-11, afternoon 12-17, evening 18-23 (inclusive).
pub fn time_of_day_key(task: &Task) -> Option<String> {
    let hour = task.completed_at?.hour();
    let label = match hour {
        0..=5 => "night",
        6..=11 => "morning",
        12..=17 => "afternoon",
        _ => "evening",
    };
    Some(label.to_string())
}

/// Tag counts; a task contributes once per tag it carries.
pub fn tag_distribution<'a, I>(tasks: I) -> Vec<(String, u32)>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut counts: IndexMap<String, u32> = IndexMap::new();
    for task in tasks {
        for tag in &task.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    counts.into_iter().collect()
}

/// Derived goal progress: rounded percentage of completed tasks among the
/// goal's linked tasks that still exist. Stale linked ids drop out of the
/// denominator. None when no linked task resolves; an empty-link goal's
/// progress is never forced by this function.
pub fn goal_progress(goal: &Goal, tasks: &IndexMap<String, Task>) -> Option<u8> {
    let live: Vec<&Task> = goal
        .linked_task_ids
        .iter()
        .filter_map(|id| tasks.get(id))
        .collect();
    if live.is_empty() {
        return None;
    }
    let completed = live
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let percent = (completed as f64 / live.len() as f64 * 100.0).round();
    Some(percent as u8)
}

/// Longest run of consecutive calendar days containing at least one
/// completion. 0 with no completed tasks; a single completion day is a
/// streak of 1.
pub fn longest_completion_streak<'a, I>(tasks: I) -> u32
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut days: Vec<NaiveDate> = tasks
        .into_iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter_map(|t| t.completed_at)
        .map(|stamp| stamp.date_naive())
        .collect();
    days.sort();
    days.dedup();
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = match previous {
            Some(prev) if day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn completed_at(ts: DateTime<Utc>) -> Task {
        let mut task = Task::new("done".to_string(), None);
        task.status = TaskStatus::Completed;
        task.completed_at = Some(ts);
        task
    }

    #[test]
    fn test_status_counts_sum_to_total() {
        let mut a = Task::new("a".to_string(), None);
        a.status = TaskStatus::InProgress;
        let mut b = Task::new("b".to_string(), None);
        b.status = TaskStatus::Blocked;
        let c = Task::new("c".to_string(), None);
        let counts = status_counts([&a, &b, &c]);
        assert_eq!(counts.total, 3);
        assert_eq!(
            counts.not_started + counts.in_progress + counts.completed + counts.blocked,
            counts.total
        );
        assert_eq!(counts.completion_rate, 0.0);
    }

    #[test]
    fn test_completion_rate_never_divides_by_zero() {
        let counts = status_counts(std::iter::empty::<&Task>());
        assert_eq!(counts.total, 0);
        assert_eq!(counts.completion_rate, 0.0);
    }

    #[test]
    fn test_day_histogram_hours() {
        let reference = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let t1 = completed_at(Utc.with_ymd_and_hms(2024, 5, 10, 9, 15, 0).unwrap());
        let t2 = completed_at(Utc.with_ymd_and_hms(2024, 5, 10, 9, 45, 0).unwrap());
        let t3 = completed_at(Utc.with_ymd_and_hms(2024, 5, 10, 14, 5, 0).unwrap());
        let buckets = completion_histogram([&t1, &t2, &t3], Granularity::Day, reference);
        assert_eq!(buckets.len(), 24);
        assert_eq!(buckets[9].label, "9:00");
        assert_eq!(buckets[9].count, 2);
        assert_eq!(buckets[14].count, 1);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u32>(), 3);
    }

    #[test]
    fn test_week_histogram_starts_monday() {
        // 2024-05-10 is a Friday; its week starts Monday 2024-05-06.
        let reference = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let monday = completed_at(Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap());
        let sunday = completed_at(Utc.with_ymd_and_hms(2024, 5, 12, 8, 0, 0).unwrap());
        let outside = completed_at(Utc.with_ymd_and_hms(2024, 5, 5, 8, 0, 0).unwrap());
        let buckets =
            completion_histogram([&monday, &sunday, &outside], Granularity::Week, reference);
        assert_eq!(buckets[0].label, "Monday");
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[6].label, "Sunday");
        assert_eq!(buckets[6].count, 1);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u32>(), 2);
    }

    #[test]
    fn test_time_of_day_ranges() {
        let night = completed_at(Utc.with_ymd_and_hms(2024, 5, 10, 5, 59, 0).unwrap());
        let morning = completed_at(Utc.with_ymd_and_hms(2024, 5, 10, 6, 0, 0).unwrap());
        let evening = completed_at(Utc.with_ymd_and_hms(2024, 5, 10, 23, 0, 0).unwrap());
        let dist = distribution([&night, &morning, &evening], time_of_day_key);
        assert!(dist.contains(&("night".to_string(), 1)));
        assert!(dist.contains(&("morning".to_string(), 1)));
        assert!(dist.contains(&("evening".to_string(), 1)));
    }

    #[test]
    fn test_streak_examples() {
        assert_eq!(longest_completion_streak(std::iter::empty::<&Task>()), 0);

        let single = completed_at(Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap());
        assert_eq!(longest_completion_streak([&single]), 1);

        let d1 = completed_at(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        let d2 = completed_at(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap());
        let d3 = completed_at(Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap());
        let d10 = completed_at(Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap());
        assert_eq!(longest_completion_streak([&d1, &d2, &d3, &d10]), 3);
    }

    #[test]
    fn test_goal_progress_rounding_and_stale_ids() {
        let mut tasks: IndexMap<String, Task> = IndexMap::new();
        let mut done = Task::new("done".to_string(), None);
        done.id = "done".to_string();
        done.status = TaskStatus::Completed;
        let mut open = Task::new("open".to_string(), None);
        open.id = "open".to_string();
        let mut open2 = Task::new("open2".to_string(), None);
        open2.id = "open2".to_string();
        tasks.insert("done".to_string(), done);
        tasks.insert("open".to_string(), open);
        tasks.insert("open2".to_string(), open2);

        let goal = Goal::new(
            "g".to_string(),
            vec![
                "done".to_string(),
                "open".to_string(),
                "open2".to_string(),
                "stale".to_string(),
            ],
        );
        // Stale id excluded: 1 of 3 live tasks completed, 33%.
        assert_eq!(goal_progress(&goal, &tasks), Some(33));

        let empty_goal = Goal::new("empty".to_string(), vec!["stale".to_string()]);
        assert_eq!(goal_progress(&empty_goal, &tasks), None);
    }
}
