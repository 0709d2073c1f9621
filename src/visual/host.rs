//! Host-side scheduling contract for the render loop.
//!
//! The renderer never owns a timer. It asks its host for the next frame from
//! inside the current one and hands the request back on teardown, the same
//! way a browser component uses `requestAnimationFrame`.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Largest backing dimension a surface will allocate (physical pixels)
pub const MAX_BACKING_DIMENSION: u32 = 16384;

/// Displayed size of the drawing surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width (logical pixels)
    pub width: f32,

    /// Height (logical pixels)
    pub height: f32,

    /// Physical pixels per logical pixel
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Pixel ratio, falling back to 1.0 when the host reports none
    pub fn effective_pixel_ratio(&self) -> f32 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    /// Backing resolution: displayed size times pixel ratio
    pub fn backing_size(&self) -> (u32, u32) {
        let dpr = self.effective_pixel_ratio();
        let side = |logical: f32| {
            let physical = (logical * dpr).round();
            if physical.is_finite() && physical > 0.0 {
                (physical as u32).min(MAX_BACKING_DIMENSION)
            } else {
                0
            }
        };
        (side(self.width), side(self.height))
    }
}

/// Handle of a scheduled frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Handle of a registered viewport-resize listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Scheduler and viewport services the renderer needs from its host
pub trait FrameHost {
    /// Ask for one frame callback; the host later delivers the returned id
    fn request_frame(&mut self) -> FrameId;

    /// Withdraw a frame request that has not fired yet
    fn cancel_frame(&mut self, id: FrameId);

    /// Start delivering viewport-resize notifications
    fn add_resize_listener(&mut self) -> ListenerId;

    /// Stop delivering viewport-resize notifications
    fn remove_resize_listener(&mut self, id: ListenerId);

    /// Current displayed size of the surface
    fn viewport(&self) -> Viewport;
}

/// Cooperative cancellation flag checked at the top of every tick
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Fixed-tick frame host: requests queue up and are released one per tick
///
/// Drives the renderer wherever no windowing system provides frame
/// callbacks (offline rendering, tests).
#[derive(Debug)]
pub struct TickScheduler {
    viewport: Viewport,
    next_id: u64,
    pending: VecDeque<FrameId>,
    listeners: BTreeSet<ListenerId>,
    requested: u64,
    cancelled: u64,
}

impl TickScheduler {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            next_id: 1,
            pending: VecDeque::new(),
            listeners: BTreeSet::new(),
            requested: 0,
            cancelled: 0,
        }
    }

    /// Release the oldest pending frame, if any
    pub fn next_due(&mut self) -> Option<FrameId> {
        self.pending.pop_front()
    }

    /// Change the viewport; returns true if any resize listener should be notified
    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        let changed = self.viewport != viewport;
        self.viewport = viewport;
        changed && !self.listeners.is_empty()
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Total frame requests received
    pub fn requested_frames(&self) -> u64 {
        self.requested
    }

    /// Total frame requests withdrawn before firing
    pub fn cancelled_frames(&self) -> u64 {
        self.cancelled
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl FrameHost for TickScheduler {
    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.next_id());
        self.pending.push_back(id);
        self.requested += 1;
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        let before = self.pending.len();
        self.pending.retain(|&pending| pending != id);
        if self.pending.len() != before {
            self.cancelled += 1;
        }
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners.insert(id);
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}
