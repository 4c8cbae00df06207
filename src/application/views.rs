//! Read-only computations over a task collection: the day list, its progress
//! and the 7-day summary. Nothing here is cached; callers recompute on demand.

use std::fmt;

use chrono::{Days, NaiveDate};

use crate::domain::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl fmt::Display for DayProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} — {}%", self.completed, self.total, self.percent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
}

impl DaySummary {
    /// Short `MM-DD` label.
    pub fn label(&self) -> String { self.date.format("%m-%d").to_string() }
}

/// Tasks scheduled on `date`, in collection order. Done tasks are dropped
/// unless `include_completed`.
pub fn filter_by_day(tasks: &[Task], date: NaiveDate, include_completed: bool) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.date == date && (include_completed || !t.is_done()))
        .collect()
}

pub fn day_progress<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> DayProgress {
    let (completed, total) = tasks
        .into_iter()
        .fold((0, 0), |(done, all), t| (done + usize::from(t.is_done()), all + 1));
    DayProgress { completed, total, percent: percent(completed, total) }
}

/// One entry per day for the 7 days ending at `reference`, oldest first.
/// Within a week of `NaiveDate::MIN` the window starts at `MIN` instead, so
/// the 7 days stay distinct and consecutive.
pub fn weekly_summary(tasks: &[Task], reference: NaiveDate) -> [DaySummary; 7] {
    let start = reference.checked_sub_days(Days::new(6)).unwrap_or(NaiveDate::MIN);
    let mut days = start.iter_days();
    std::array::from_fn(|_| {
        // start + 6 never passes `reference`, so the iterator cannot run dry
        let date = days.next().unwrap_or(reference);
        let progress = day_progress(tasks.iter().filter(|t| t.date == date));
        DaySummary { date, total: progress.total, completed: progress.completed, percent: progress.percent }
    })
}

/// `completed / total` as a whole percentage, rounded half up; 0 when empty.
fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = (completed.min(total) * 100 + total / 2) / total;
    scaled as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{TaskId, TaskStatus};
    use chrono::Utc;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

    fn task(id: &str, date: NaiveDate, status: TaskStatus) -> Task {
        Task {
            id: TaskId::from(id),
            title: id.to_string(),
            description: String::new(),
            date,
            time: None,
            category: "Général".into(),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filter_drops_other_days_and_completed_when_asked() {
        let tasks = vec![
            task("a", day(2024, 1, 1), TaskStatus::Todo),
            task("b", day(2024, 1, 1), TaskStatus::Done),
            task("c", day(2024, 1, 2), TaskStatus::Todo),
        ];
        let visible = filter_by_day(&tasks, day(2024, 1, 1), false);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id.as_str(), "a");

        let ids: Vec<_> = filter_by_day(&tasks, day(2024, 1, 1), true).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn progress_of_nothing_is_zero() {
        assert_eq!(day_progress(&[] as &[Task]), DayProgress { completed: 0, total: 0, percent: 0 });
    }

    #[test]
    fn progress_three_of_four() {
        let d = day(2024, 1, 1);
        let tasks = vec![
            task("a", d, TaskStatus::Done),
            task("b", d, TaskStatus::Done),
            task("c", d, TaskStatus::Done),
            task("d", d, TaskStatus::Doing),
        ];
        let p = day_progress(&tasks);
        assert_eq!((p.completed, p.total, p.percent), (3, 4, 75));
        assert_eq!(p.to_string(), "3 / 4 — 75%");
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 200), 1);
        assert_eq!(percent(5, 5), 100);
    }

    #[test]
    fn weekly_summary_covers_seven_days_oldest_first() {
        let reference = day(2024, 3, 2);
        let tasks = vec![
            task("a", day(2024, 3, 2), TaskStatus::Done),
            task("b", day(2024, 3, 2), TaskStatus::Todo),
            task("c", day(2024, 2, 25), TaskStatus::Done),
            task("old", day(2024, 2, 24), TaskStatus::Done),
            task("future", day(2024, 3, 3), TaskStatus::Done),
        ];
        let week = weekly_summary(&tasks, reference);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, day(2024, 2, 25));
        assert_eq!(week[6].date, reference);
        assert_eq!((week[0].total, week[0].completed, week[0].percent), (1, 1, 100));
        assert_eq!((week[6].total, week[6].completed, week[6].percent), (2, 1, 50));
        assert_eq!(week[1].date, day(2024, 2, 26));
        assert_eq!(week[1].label(), "02-26");
        assert!(week[1..6].iter().all(|d| d.total == 0 && d.percent == 0));
        let ascending = week.windows(2).all(|w| w[0].date.succ_opt() == Some(w[1].date));
        assert!(ascending);
    }

    #[test]
    fn weekly_summary_with_no_tasks_still_has_seven_entries() {
        let week = weekly_summary(&[], day(2024, 1, 1));
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, day(2023, 12, 26));
    }

    #[test]
    fn weekly_summary_at_calendar_floor_keeps_distinct_days() {
        let reference = NaiveDate::MIN.checked_add_days(Days::new(2)).unwrap();
        let week = weekly_summary(&[], reference);
        assert_eq!(week[0].date, NaiveDate::MIN);
        assert!(week.windows(2).all(|w| w[0].date.succ_opt() == Some(w[1].date)));
    }
}
