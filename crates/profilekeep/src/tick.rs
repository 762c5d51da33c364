//! Host tick loop registry.
//!
//! Tasks are registered under a stable name. The registry tracks, per task,
//! the time since that task last reported doing work, and hands that value
//! to the task on every tick. A task that returns `true` has its counter
//! reset. Registering a name twice swaps the task and keeps the counter.

use anyhow::Result;

/// Work driven by the host tick loop.
pub trait TickTask {
    /// Stable registration name.
    fn name(&self) -> &str;

    /// Called once per tick with seconds since this task last returned `true`
    /// (or since registration). Returns whether it did its work.
    fn on_tick(&mut self, since_last_run: f64) -> Result<bool>;
}

struct Registered {
    task: Box<dyn TickTask>,
    since_last_run: f64,
}

/// Ordered set of tick tasks keyed by name.
#[derive(Default)]
pub struct TickRegistry {
    tasks: Vec<Registered>,
}

impl TickRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Returns `true` if a task with that name was replaced.
    pub fn register(&mut self, task: Box<dyn TickTask>) -> bool {
        if let Some(slot) = self.tasks.iter_mut().find(|r| r.task.name() == task.name()) {
            tracing::debug!(task = task.name(), "re-registering tick task");
            slot.task = task;
            return true;
        }
        self.tasks.push(Registered {
            task,
            since_last_run: 0.0,
        });
        false
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|r| r.task.name()).collect()
    }

    /// Seconds accumulated for a task since it last ran.
    pub fn since_last_run(&self, name: &str) -> Option<f64> {
        self.tasks
            .iter()
            .find(|r| r.task.name() == name)
            .map(|r| r.since_last_run)
    }

    /// Advance every task by `delta_secs`. Returns the names of tasks that ran.
    ///
    /// The first task error stops the tick and is returned; tasks after it
    /// are not advanced this round.
    pub fn tick(&mut self, delta_secs: f64) -> Result<Vec<String>> {
        let mut ran = Vec::new();
        for slot in &mut self.tasks {
            slot.since_last_run += delta_secs;
            if slot.task.on_tick(slot.since_last_run)? {
                slot.since_last_run = 0.0;
                ran.push(slot.task.name().to_string());
            }
        }
        Ok(ran)
    }
}
