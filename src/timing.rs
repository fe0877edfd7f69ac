// Frame timing and the fixed-interval movement tick

use std::time::{Duration, Instant};

/// Frame counter that reports a fresh FPS figure twice per second.
pub struct FrameTiming {
    last_fps_time: Instant,
    frame_count: u32,
}

impl FrameTiming {
    pub fn new(now: Instant) -> Self {
        Self {
            last_fps_time: now,
            frame_count: 0,
        }
    }

    /// Count a frame; returns the new FPS when the half-second window closes
    pub fn update(&mut self, now: Instant) -> Option<f32> {
        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() >= 0.5 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            self.frame_count = 0;
            self.last_fps_time = now;
            return Some(fps);
        }
        None
    }
}

/// Fixed-interval scheduler for the navigation movement tick.
///
/// Polled once per frame; hands out the number of whole intervals that
/// elapsed since the previous poll, capped so a stalled frame (a blocking
/// console prompt, a window drag) does not replay seconds of movement.
pub struct TickScheduler {
    interval: Duration,
    last: Option<Instant>,
    pending: Duration,
}

const MAX_TICKS_PER_FRAME: u32 = 8;

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            last: None,
            pending: Duration::ZERO,
        }
    }

    /// Forget elapsed time, used when the tick is disarmed
    pub fn reset(&mut self) {
        self.last = None;
        self.pending = Duration::ZERO;
    }

    pub fn due(&mut self, now: Instant) -> u32 {
        let Some(last) = self.last.replace(now) else {
            return 0;
        };
        self.pending += now.saturating_duration_since(last);

        let mut ticks = 0;
        while self.pending >= self.interval && ticks < MAX_TICKS_PER_FRAME {
            self.pending -= self.interval;
            ticks += 1;
        }
        if ticks == MAX_TICKS_PER_FRAME {
            self.pending = Duration::ZERO;
        }
        ticks
    }
}
