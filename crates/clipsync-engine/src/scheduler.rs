//! Frame and Timer Scheduling
//!
//! Animation-frame and timeout queues for one playback context. The host
//! drives the queues by calling `advance` with its monotonic clock (ms).

/// Handle returned by `request_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Handle returned by `set_timeout`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Timer<T> {
    id: u64,
    due: f64,
    task: T,
}

/// Frame and timer queue
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    now: f64,
    frames: Vec<(u64, T)>,
    timers: Vec<Timer<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            now: 0.0,
            frames: Vec::new(),
            timers: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last time passed to `advance` (ms)
    pub fn now(&self) -> f64 {
        self.now
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Run `task` on the next frame
    pub fn request_frame(&mut self, task: T) -> FrameHandle {
        let id = self.next_id();
        self.frames.push((id, task));
        FrameHandle(id)
    }

    pub fn cancel_frame(&mut self, handle: FrameHandle) {
        self.frames.retain(|(id, _)| *id != handle.0);
    }

    /// Run `task` once `delay_ms` has elapsed
    pub fn set_timeout(&mut self, delay_ms: f64, task: T) -> TimerHandle {
        let id = self.next_id();
        let due = self.now + delay_ms.max(0.0);
        self.timers.push(Timer { id, due, task });
        TimerHandle(id)
    }

    pub fn clear_timeout(&mut self, handle: TimerHandle) {
        self.timers.retain(|t| t.id != handle.0);
    }

    /// Move the clock to `now` and take every due task.
    ///
    /// Expired timers come first, in due order, followed by every frame
    /// callback requested before this call. Work queued while the returned
    /// tasks run waits for the next `advance`.
    pub fn advance(&mut self, now: f64) -> Vec<T> {
        self.now = self.now.max(now);

        let mut due = Vec::new();
        let mut i = 0;
        while i < self.timers.len() {
            if self.timers[i].due <= self.now {
                due.push(self.timers.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)));

        let mut tasks: Vec<T> = due.into_iter().map(|t| t.task).collect();
        tasks.extend(self.frames.drain(..).map(|(_, task)| task));
        tasks
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Drop all queued work
    pub fn clear(&mut self) {
        self.frames.clear();
        self.timers.clear();
    }
}
