//! The scheduling capability reducers use to defer work.
//!
//! A [Store](crate::Store) never schedules anything itself. Reducers
//! capture a [Scheduler] and use it from their
//! [Continuation::WithReducers](crate::Continuation::WithReducers)
//! stage to call back into [LiveReducers](crate::LiveReducers) later.
//! [ManualScheduler] is a deterministic implementation driven by a
//! virtual clock.

use std::{
    cell::RefCell,
    collections::HashSet,
    fmt::Debug,
    rc::Rc,
    time::Duration,
};

/// Identifies a scheduled task so that it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// Schedules callbacks to run later on the same thread as the store.
pub trait Scheduler {
    /// Run `task` once, after `delay`.
    fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskHandle;

    /// Run `task` every `interval` until it is cancelled. A zero
    /// `interval` runs the task at most once per step of the clock.
    fn schedule_every(&self, interval: Duration, task: Box<dyn FnMut()>) -> TaskHandle;

    /// Stop a task from running again. Cancelling a task which has
    /// already finished does nothing.
    fn cancel(&self, handle: TaskHandle);
}

enum Task {
    Once(Box<dyn FnOnce()>),
    Every {
        interval: Duration,
        task: Box<dyn FnMut()>,
    },
}

struct Timer {
    handle: TaskHandle,
    due: Duration,
    task: Task,
}

#[derive(Default)]
struct Timers {
    now: Duration,
    next_handle: u64,
    pending: Vec<Timer>,
    /// Zero-interval periodic tasks which already ran during the current
    /// run; they become pending again once it ends.
    deferred: Vec<Timer>,
    running: Option<TaskHandle>,
    /// Periodic tasks cancelled while they were running.
    cancelled: HashSet<TaskHandle>,
}

impl Timers {
    fn insert(&mut self, due: Duration, task: Task) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push(Timer { handle, due, task });
        handle
    }

    /// Remove the earliest timer due at or before `deadline`. Timers due
    /// at the same time run in the order they were scheduled.
    fn pop_due(&mut self, deadline: Duration) -> Option<Timer> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(_, timer)| (timer.due, timer.handle))
            .map(|(index, _)| index)?;

        Some(self.pending.remove(index))
    }

    fn next_once_due(&self) -> Option<Duration> {
        self.pending
            .iter()
            .filter(|timer| matches!(timer.task, Task::Once(_)))
            .map(|timer| timer.due)
            .min()
    }
}

/// A [Scheduler] with a virtual clock which only moves when
/// [advance()](ManualScheduler::advance()) or
/// [run_all()](ManualScheduler::run_all()) are called.
///
/// Clones share the same clock and timers.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    timers: Rc<RefCell<Timers>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.timers.borrow().now
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.timers.borrow().pending.len()
    }

    /// Move the clock forward by `by`, running every task which falls
    /// due on the way, in order. Tasks may schedule and cancel tasks
    /// (themselves included) while running; new tasks run within this
    /// call if they fall due before it ends.
    pub fn advance(&self, by: Duration) {
        let deadline = self.now() + by;
        self.run_until(deadline);
        self.timers.borrow_mut().now = deadline;
    }

    /// Keep moving the clock to the next one-off task and running it
    /// until no one-off tasks remain. Periodic tasks falling due on the
    /// way run as usual, but do not on their own keep the clock going.
    pub fn run_all(&self) {
        loop {
            let next = self.timers.borrow().next_once_due();
            match next {
                Some(due) => {
                    self.run_until(due);
                    let mut timers = self.timers.borrow_mut();
                    if timers.now < due {
                        timers.now = due;
                    }
                }
                None => break,
            }
        }
    }

    fn run_until(&self, deadline: Duration) {
        self.run_due(deadline);

        let mut timers = self.timers.borrow_mut();
        let deferred = std::mem::take(&mut timers.deferred);
        timers.pending.extend(deferred);
    }

    fn run_due(&self, deadline: Duration) {
        loop {
            // The borrow must end before the task runs, tasks use the
            // scheduler too.
            let timer = self.timers.borrow_mut().pop_due(deadline);
            let timer = match timer {
                Some(timer) => timer,
                None => break,
            };

            {
                let mut timers = self.timers.borrow_mut();
                timers.now = timer.due;
                timers.running = Some(timer.handle);
            }
            log::trace!("running task {:?} at {:?}", timer.handle, timer.due);

            match timer.task {
                Task::Once(task) => {
                    task();

                    let mut timers = self.timers.borrow_mut();
                    timers.running = None;
                    timers.cancelled.remove(&timer.handle);
                }
                Task::Every { interval, mut task } => {
                    task();

                    let mut timers = self.timers.borrow_mut();
                    timers.running = None;
                    if !timers.cancelled.remove(&timer.handle) {
                        let next = Timer {
                            handle: timer.handle,
                            due: timer.due + interval,
                            task: Task::Every { interval, task },
                        };
                        if interval == Duration::from_secs(0) {
                            timers.deferred.push(next);
                        } else {
                            timers.pending.push(next);
                        }
                    }
                }
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskHandle {
        let mut timers = self.timers.borrow_mut();
        let due = timers.now + delay;
        timers.insert(due, Task::Once(task))
    }

    fn schedule_every(&self, interval: Duration, task: Box<dyn FnMut()>) -> TaskHandle {
        let mut timers = self.timers.borrow_mut();
        let due = timers.now + interval;
        timers.insert(due, Task::Every { interval, task })
    }

    fn cancel(&self, handle: TaskHandle) {
        let mut timers = self.timers.borrow_mut();
        let before = timers.pending.len();
        timers.pending.retain(|timer| timer.handle != handle);
        timers.deferred.retain(|timer| timer.handle != handle);

        // The task is running right now and must not be rescheduled.
        if timers.pending.len() == before && timers.running == Some(handle) {
            timers.cancelled.insert(handle);
        }
    }
}

impl Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let timers = self.timers.borrow();
        write!(
            f,
            "ManualScheduler {{ now: {:?}, pending: {} }}",
            timers.now,
            timers.pending.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ManualScheduler, Scheduler, TaskHandle};
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
        time::Duration,
    };

    #[test]
    fn once_runs_when_due() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let ran_copy = ran.clone();
        scheduler.schedule_after(
            Duration::from_millis(1000),
            Box::new(move || ran_copy.set(true)),
        );

        scheduler.advance(Duration::from_millis(999));
        assert!(!ran.get());
        scheduler.advance(Duration::from_millis(1));
        assert!(ran.get());
        assert_eq!(0, scheduler.pending());
        assert_eq!(Duration::from_millis(1000), scheduler.now());
    }

    #[test]
    fn tasks_run_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (delay, label) in &[(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
            let order = order.clone();
            let label = *label;
            scheduler.schedule_after(
                Duration::from_millis(*delay),
                Box::new(move || order.borrow_mut().push(label)),
            );
        }

        scheduler.advance(Duration::from_millis(30));
        assert_eq!(vec!["a", "a2", "b", "c"], *order.borrow());
    }

    #[test]
    fn periodic_task_cancels_itself() {
        let scheduler = ManualScheduler::new();
        let runs = Rc::new(Cell::new(0));
        let handle: Rc<Cell<Option<TaskHandle>>> = Rc::new(Cell::new(None));

        let task_scheduler = scheduler.clone();
        let task_runs = runs.clone();
        let task_handle = handle.clone();
        handle.set(Some(scheduler.schedule_every(
            Duration::from_millis(100),
            Box::new(move || {
                task_runs.set(task_runs.get() + 1);
                if task_runs.get() == 3 {
                    if let Some(handle) = task_handle.get() {
                        task_scheduler.cancel(handle);
                    }
                }
            }),
        )));

        scheduler.advance(Duration::from_millis(250));
        assert_eq!(2, runs.get());
        scheduler.advance(Duration::from_millis(1000));
        assert_eq!(3, runs.get());
        assert_eq!(0, scheduler.pending());
    }

    #[test]
    fn cancel_pending_task() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let ran_copy = ran.clone();
        let handle = scheduler.schedule_after(
            Duration::from_millis(10),
            Box::new(move || ran_copy.set(true)),
        );

        scheduler.cancel(handle);
        scheduler.run_all();
        assert!(!ran.get());
    }

    #[test]
    fn run_all_follows_chained_tasks() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(false));

        let inner_scheduler = scheduler.clone();
        let ran_copy = ran.clone();
        scheduler.schedule_after(
            Duration::from_millis(5),
            Box::new(move || {
                inner_scheduler.schedule_after(
                    Duration::from_millis(5),
                    Box::new(move || ran_copy.set(true)),
                );
            }),
        );

        scheduler.run_all();
        assert!(ran.get());
        assert_eq!(Duration::from_millis(10), scheduler.now());
    }

    #[test]
    fn zero_interval_runs_once_per_step() {
        let scheduler = ManualScheduler::new();
        let runs = Rc::new(Cell::new(0));
        let runs_copy = runs.clone();
        let handle = scheduler.schedule_every(
            Duration::from_secs(0),
            Box::new(move || runs_copy.set(runs_copy.get() + 1)),
        );

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(1, runs.get());
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(2, runs.get());
        assert_eq!(1, scheduler.pending());

        scheduler.cancel(handle);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(2, runs.get());
        assert_eq!(0, scheduler.pending());
    }

    #[test]
    fn once_task_cancelling_itself_is_forgotten() {
        let scheduler = ManualScheduler::new();
        let handle: Rc<Cell<Option<TaskHandle>>> = Rc::new(Cell::new(None));

        let task_scheduler = scheduler.clone();
        let task_handle = handle.clone();
        handle.set(Some(scheduler.schedule_after(
            Duration::from_millis(10),
            Box::new(move || {
                if let Some(handle) = task_handle.get() {
                    task_scheduler.cancel(handle);
                }
            }),
        )));

        scheduler.run_all();
        assert!(scheduler.timers.borrow().cancelled.is_empty());
        assert_eq!(0, scheduler.pending());
    }
}
