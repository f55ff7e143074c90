//! Frame-driven pacing for icon renders - no clock dependency
//! Each render costs a full pipeline run, so batches are spread over frames

use std::collections::VecDeque;

pub const DEFAULT_FRAME_DELAY: u32 = 2;

/// Token bucket - refills once per frame, capped at capacity
#[derive(Debug, Clone, Copy)]
pub struct RenderThrottle {
    capacity: u32,
    tokens: u32,
}

impl RenderThrottle {
    /// Create bucket that starts full
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tokens: capacity,
        }
    }

    /// Advance one frame, adding a single permit
    pub fn tick(&mut self) {
        self.tokens = (self.tokens + 1).min(self.capacity);
    }

    /// Take a permit if one is available
    pub fn try_acquire(&mut self) -> bool {
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn available(&self) -> u32 {
        self.tokens
    }
}

impl Default for RenderThrottle {
    fn default() -> Self {
        Self::new(1)
    }
}

#[derive(Debug, Clone)]
struct Pending<T> {
    item: T,
    frames_left: u32,
}

/// Delays each request by a fixed number of frames, then releases them one permit
/// at a time in submission order
#[derive(Debug, Clone)]
pub struct RenderScheduler<T> {
    queue: VecDeque<Pending<T>>,
    throttle: RenderThrottle,
    frame_delay: u32,
}

impl<T> RenderScheduler<T> {
    pub fn new(frame_delay: u32, throttle: RenderThrottle) -> Self {
        Self {
            queue: VecDeque::new(),
            throttle,
            frame_delay,
        }
    }

    /// Queue a request; it becomes eligible after the frame delay
    pub fn submit(&mut self, item: T) {
        self.queue.push_back(Pending {
            item,
            frames_left: self.frame_delay,
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Advance one frame, returns the requests to render now
    pub fn on_frame(&mut self) -> Vec<T> {
        for pending in &mut self.queue {
            pending.frames_left = pending.frames_left.saturating_sub(1);
        }

        let mut ready = Vec::new();
        while self.queue.front().is_some_and(|p| p.frames_left == 0) {
            if !self.throttle.try_acquire() {
                break;
            }
            if let Some(pending) = self.queue.pop_front() {
                ready.push(pending.item);
            }
        }

        self.throttle.tick();
        ready
    }

    /// Run frames until the queue drains, yielding each request in order
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || {
            if self.is_empty() {
                return None;
            }
            Some(self.on_frame())
        })
        .flatten()
    }
}

impl<T> Default for RenderScheduler<T> {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_DELAY, RenderThrottle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_refills_once_per_frame() {
        let mut throttle = RenderThrottle::new(1);

        assert!(throttle.try_acquire());  // Starts full
        assert!(!throttle.try_acquire()); // Empty until next frame

        throttle.tick();
        throttle.tick();
        assert_eq!(throttle.available(), 1); // Capped at capacity
    }

    #[test]
    fn scheduler_waits_frame_delay() {
        let mut scheduler = RenderScheduler::default();
        scheduler.submit("a");

        assert!(scheduler.on_frame().is_empty()); // 1 frame left
        assert_eq!(scheduler.on_frame(), vec!["a"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn scheduler_renders_one_per_frame() {
        let mut scheduler = RenderScheduler::new(0, RenderThrottle::new(1));
        scheduler.submit(1);
        scheduler.submit(2);
        scheduler.submit(3);

        assert_eq!(scheduler.on_frame(), vec![1]);
        assert_eq!(scheduler.on_frame(), vec![2]);
        assert_eq!(scheduler.on_frame(), vec![3]);
    }

    #[test]
    fn drain_preserves_order() {
        let mut scheduler = RenderScheduler::default();
        for i in 0..4 {
            scheduler.submit(i);
        }
        let order: Vec<_> = scheduler.drain().collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}
