//! Cancelable one-shot timers on an explicit millisecond clock
//!
//! Nothing here reads wall-clock time: the owner passes `now_ms` in, so
//! the same schedule replays identically in tests and on every platform.

/// Handle to a scheduled task, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Entry<T> {
    handle: TimerHandle,
    due_ms: u64,
    task: T,
}

/// Fire-once deferred tasks, fired in due order (ties by schedule order)
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    entries: Vec<Entry<T>>,
    next_handle: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: 1,
        }
    }

    /// Schedule `task` to fire at `due_ms`
    pub fn schedule_at(&mut self, due_ms: u64, task: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        // Keep sorted by (due, handle); insertion after equal deadlines
        let idx = self.entries.partition_point(|e| e.due_ms <= due_ms);
        self.entries.insert(idx, Entry { handle, due_ms, task });
        handle
    }

    /// Schedule `task` to fire `delay_ms` after `now_ms`
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, task: T) -> TimerHandle {
        self.schedule_at(now_ms.saturating_add(delay_ms), task)
    }

    /// Cancel a pending task. Returns false if it already fired or was canceled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.entries.iter().position(|e| e.handle == handle) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether a handle is still waiting to fire
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// Deadline of a pending handle
    pub fn due_at(&self, handle: TimerHandle) -> Option<u64> {
        self.entries.iter().find(|e| e.handle == handle).map(|e| e.due_ms)
    }

    /// Remove and return every task due at or before `now_ms`, in firing order
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<(TimerHandle, T)> {
        let split = self.entries.partition_point(|e| e.due_ms <= now_ms);
        self.entries
            .drain(..split)
            .map(|e| (e.handle, e.task))
            .collect()
    }

    /// Cancel everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
