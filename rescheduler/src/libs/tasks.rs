//! The actions the rescheduler runs on a schedule or in response to cluster events

use chrono::prelude::*;
use std::collections::BTreeMap;

use smokemini::{Conf, from_now};

/// Actions to complete at specific times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tasks {
    /// Make at most one placement decision
    Reschedule,
    /// Delete probe pods stuck on their claims
    PvcCleanup,
    /// Delete persistent volumes left behind by probe claims
    CollectVolumes,
}

impl Tasks {
    /// Setup a task queue with every periodic task
    pub fn setup_queue() -> BTreeMap<DateTime<Utc>, Tasks> {
        // create an empty map
        let mut queue = BTreeMap::default();
        // reschedule right away and spread the collector out a bit
        queue.insert(Utc::now(), Self::Reschedule);
        queue.insert(from_now!(17), Self::CollectVolumes);
        queue
    }

    /// Get the number of seconds to wait before running this task again
    ///
    /// Tasks that only run in response to events have no delay.
    ///
    /// # Arguments
    ///
    /// * `conf` - The rescheduler config
    pub fn delay(&self, conf: &Conf) -> Option<u32> {
        match self {
            Tasks::Reschedule => Some(conf.tasks.reschedule),
            Tasks::CollectVolumes => Some(conf.tasks.collect_volumes),
            Tasks::PvcCleanup => None,
        }
    }

    /// Get our task as a str
    pub fn as_str(&self) -> &'static str {
        match self {
            Tasks::Reschedule => "Reschedule",
            Tasks::PvcCleanup => "PvcCleanup",
            Tasks::CollectVolumes => "CollectVolumes",
        }
    }
}

/// A queue holding at most one pending run of each task
#[derive(Debug, Default)]
pub struct TaskQueue {
    /// The tasks to run by when to run them
    queue: BTreeMap<DateTime<Utc>, Tasks>,
}

impl TaskQueue {
    /// Create a queue with every periodic task
    pub fn new() -> Self {
        TaskQueue {
            queue: Tasks::setup_queue(),
        }
    }

    /// Get when the next task is due
    pub fn next(&self) -> Option<DateTime<Utc>> {
        self.queue.keys().next().copied()
    }

    /// Get when a task is queued for
    ///
    /// # Arguments
    ///
    /// * `task` - The task to look for
    pub fn queued(&self, task: Tasks) -> Option<DateTime<Utc>> {
        self.queue
            .iter()
            .find(|(_, queued)| **queued == task)
            .map(|(time, _)| *time)
    }

    /// Queue a task replacing any pending run of it
    ///
    /// # Arguments
    ///
    /// * `at` - When to run this task
    /// * `task` - The task to run
    pub fn add(&mut self, mut at: DateTime<Utc>, task: Tasks) {
        self.queue.retain(|_, queued| *queued != task);
        // two tasks cannot share a timestamp so bump ours until its free
        while self.queue.contains_key(&at) {
            at += chrono::Duration::milliseconds(1);
        }
        self.queue.insert(at, task);
    }

    /// Queue a task in response to an event
    ///
    /// A task already due within the debounce window is left alone so bursts of events only run
    /// it once.
    ///
    /// # Arguments
    ///
    /// * `task` - The task to run
    /// * `debounce` - How many seconds to coalesce events for
    /// * `now` - The current time
    pub fn trigger(&mut self, task: Tasks, debounce: u32, now: DateTime<Utc>) -> bool {
        let at = now + chrono::Duration::seconds(i64::from(debounce));
        if self.queued(task).is_some_and(|queued| queued <= at) {
            return false;
        }
        self.add(at, task);
        true
    }

    /// Pop every task that is due
    ///
    /// # Arguments
    ///
    /// * `now` - The current time
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<Tasks> {
        // split off everything that is not due yet
        let later = self.queue.split_off(&(now + chrono::Duration::nanoseconds(1)));
        let due = std::mem::replace(&mut self.queue, later);
        due.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn due_tasks_in_order() {
        let mut queue = TaskQueue::default();
        queue.add(at(10), Tasks::CollectVolumes);
        queue.add(at(5), Tasks::Reschedule);
        queue.add(at(60), Tasks::PvcCleanup);
        assert_eq!(queue.due(at(10)), vec![Tasks::Reschedule, Tasks::CollectVolumes]);
        assert_eq!(queue.next(), Some(at(60)));
        assert!(queue.due(at(59)).is_empty());
    }

    #[test]
    fn add_replaces_pending_run() {
        let mut queue = TaskQueue::default();
        queue.add(at(60), Tasks::Reschedule);
        queue.add(at(5), Tasks::Reschedule);
        assert_eq!(queue.queued(Tasks::Reschedule), Some(at(5)));
        assert_eq!(queue.due(at(100)), vec![Tasks::Reschedule]);
    }

    #[test]
    fn add_never_collides() {
        let mut queue = TaskQueue::default();
        queue.add(at(5), Tasks::Reschedule);
        queue.add(at(5), Tasks::PvcCleanup);
        assert_eq!(queue.due(at(6)).len(), 2);
    }

    #[test]
    fn trigger_debounces() {
        let mut queue = TaskQueue::default();
        queue.add(at(60), Tasks::Reschedule);
        // an event pulls the periodic run forward
        assert!(queue.trigger(Tasks::Reschedule, 5, at(0)));
        assert_eq!(queue.queued(Tasks::Reschedule), Some(at(5)));
        // later events in the window are coalesced
        assert!(!queue.trigger(Tasks::Reschedule, 5, at(2)));
        assert_eq!(queue.queued(Tasks::Reschedule), Some(at(5)));
        assert!(queue.trigger(Tasks::PvcCleanup, 5, at(2)));
        assert_eq!(queue.due(at(10)), vec![Tasks::Reschedule, Tasks::PvcCleanup]);
    }

    #[test]
    fn delays() {
        let conf = Conf::default();
        assert_eq!(Tasks::Reschedule.delay(&conf), Some(60));
        assert_eq!(Tasks::CollectVolumes.delay(&conf), Some(60));
        assert_eq!(Tasks::PvcCleanup.delay(&conf), None);
    }
}
