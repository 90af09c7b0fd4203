//! Deferred actions in simulated time
//!
//! Tasks are due at an absolute simulated time, so scaling the clock scales
//! every pending delay alike. Each task has an owner; tearing the owner down
//! cancels its tasks so they never fire on a stale object.

#[derive(Debug, Clone)]
struct Task<O, A> {
    /// Scheduling order, breaks ties between equal due times
    seq: u64,
    owner: O,
    due: f64,
    action: A,
}

/// Scheduled actions, fired in due-time order (ties in scheduling order)
#[derive(Debug, Clone)]
pub struct Scheduler<O, A> {
    tasks: Vec<Task<O, A>>,
    next_seq: u64,
}

impl<O, A> Default for Scheduler<O, A> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<O: PartialEq, A> Scheduler<O, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` once `delay` simulated seconds have passed since `now`
    pub fn schedule(&mut self, owner: O, now: f64, delay: f32, action: A) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(Task {
            seq,
            owner,
            due: now + delay.max(0.0) as f64,
            action,
        });
    }

    /// Cancel every task belonging to `owner`; returns how many were dropped
    pub fn cancel_owner(&mut self, owner: &O) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.owner != *owner);
        before - self.tasks.len()
    }

    /// Remove and return every action due at or before `now`
    pub fn take_due(&mut self, now: f64) -> Vec<A> {
        let mut due = Vec::new();
        let mut pending = Vec::with_capacity(self.tasks.len());
        for task in self.tasks.drain(..) {
            if task.due <= now {
                due.push(task);
            } else {
                pending.push(task);
            }
        }
        self.tasks = pending;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|t| t.action).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
