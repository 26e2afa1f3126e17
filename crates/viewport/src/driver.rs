//! Headless hosting: an explicit frame loop for tests and the CLI.
//!
//! Stands in for a window system's per-frame callback. The loop pops one
//! scheduled request per iteration and checks the cancel token every time,
//! so it always terminates once cancelled or once the frame limit is hit.

use crate::controller::{Container, FrameOutcome, FrameScheduler, ViewportController};
use crate::error::ViewportError;
use std::time::{Duration, Instant};
use viewloop_render::Renderer;

/// Container with a size set by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessContainer {
    width: u32,
    height: u32,
    pixel_ratio: f64,
}

impl HeadlessContainer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
        }
    }

    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    /// Change the layout size. Call `resize` on the controller afterwards, as
    /// a host's resize notification would.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

impl Container for HeadlessContainer {
    fn client_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }
}

/// Counts outstanding frame requests.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: u32,
    total: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Requests made over the scheduler's lifetime.
    pub fn total_requests(&self) -> u64 {
        self.total
    }

    /// Consume one pending request. Returns false if none is queued.
    pub fn take_request(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) {
        self.pending += 1;
        self.total += 1;
    }
}

/// Source of frame timestamps in milliseconds since the loop began.
pub trait FrameClock {
    fn now_ms(&mut self) -> f64;
}

/// Deterministic clock: 0, step, 2*step, ...
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    step_ms: f64,
    next_ms: f64,
}

impl FixedStepClock {
    /// Timestamps never decrease, so `step_ms` must be finite and `>= 0`.
    pub fn new(step_ms: f64) -> Result<Self, ViewportError> {
        if !step_ms.is_finite() || step_ms < 0.0 {
            return Err(ViewportError::InvalidFrameStep(step_ms));
        }
        Ok(Self {
            step_ms,
            next_ms: 0.0,
        })
    }

    /// Roughly one 60 Hz display refresh.
    pub fn sixty_hz() -> Self {
        Self {
            step_ms: 1000.0 / 60.0,
            next_ms: 0.0,
        }
    }
}

impl FrameClock for FixedStepClock {
    fn now_ms(&mut self) -> f64 {
        let now = self.next_ms;
        self.next_ms += self.step_ms;
        now
    }
}

/// Wall-clock time since construction.
#[derive(Debug, Clone)]
pub struct RealtimeClock {
    start: Instant,
}

impl RealtimeClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl FrameClock for RealtimeClock {
    fn now_ms(&mut self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Why [`run_frames`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    FrameLimit,
    /// Nothing was scheduled.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSummary {
    pub frames: u64,
    pub stopped: StopReason,
    pub elapsed: Duration,
}

/// Drive the controller until it is cancelled, runs out of scheduled frames,
/// or has stepped `limit` frames in this call.
pub fn run_frames<C, R>(
    controller: &mut ViewportController<C, R, ManualScheduler>,
    clock: &mut impl FrameClock,
    limit: Option<u64>,
) -> LoopSummary
where
    C: Container,
    R: Renderer,
{
    let started = Instant::now();
    let mut frames = 0;

    let stopped = loop {
        if !controller.is_running() {
            break StopReason::Cancelled;
        }
        if limit.is_some_and(|max| frames >= max) {
            break StopReason::FrameLimit;
        }
        if !controller.scheduler_mut().take_request() {
            break StopReason::Idle;
        }
        match controller.frame(clock.now_ms()) {
            FrameOutcome::Rendered => frames += 1,
            FrameOutcome::Cancelled => break StopReason::Cancelled,
        }
    };

    let summary = LoopSummary {
        frames,
        stopped,
        elapsed: started.elapsed(),
    };
    tracing::debug!(frames, stopped = ?summary.stopped, "frame loop returned");
    summary
}
