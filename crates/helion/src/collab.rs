//! Headless collaborator implementations: call-recording stand-ins for the
//! physics, audio, and presentation seams. Used by the test suite and by
//! dedicated-server builds that simulate without rendering.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use helion_core::{AudioEngine, Entity, FrameData, PhysicsSolver};

use crate::engine::FramePresenter;

/// Physics solver that records every call instead of simulating.
#[derive(Default)]
pub struct RecordingSolver {
    spawns: AtomicU32,
    destroys: AtomicU32,
    steps: AtomicU32,
    /// Order of the calls as they arrived, for fence assertions.
    log: Mutex<Vec<&'static str>>,
}

impl RecordingSolver {
    #[must_use]
    pub fn spawns(&self) -> u32 {
        self.spawns.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn destroys(&self) -> u32 {
        self.destroys.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn steps(&self) -> u32 {
        self.steps.load(Ordering::SeqCst)
    }

    /// Appends an external marker to the call log.
    pub fn mark(&self, label: &'static str) {
        self.log.lock().push(label);
    }

    /// The call log so far.
    #[must_use]
    pub fn log(&self) -> Vec<&'static str> {
        self.log.lock().clone()
    }
}

impl PhysicsSolver for RecordingSolver {
    fn spawn(&self, _entity: &Arc<Entity>) {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("spawn");
    }

    fn destroy(&self, _entity: &Arc<Entity>) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("destroy");
    }

    fn step(&self, _dt: f32) {
        self.steps.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("step");
    }
}

/// Audio engine that counts emitter lifecycle calls and mix ticks.
#[derive(Default)]
pub struct RecordingAudio {
    added: AtomicU32,
    removed: AtomicU32,
    ticks: AtomicU32,
}

impl RecordingAudio {
    #[must_use]
    pub fn added(&self) -> u32 {
        self.added.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn removed(&self) -> u32 {
        self.removed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl AudioEngine for RecordingAudio {
    fn emitter_added(&self, _entity: &Arc<Entity>) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }

    fn emitter_removed(&self, _entity: &Arc<Entity>) {
        self.removed.fetch_add(1, Ordering::SeqCst);
    }

    fn tick(&self, _dt: f32) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}

/// Presenter that consumes published frames without a GPU: remembers the
/// last camera tick tag it saw and how many frames were presented.
pub struct HeadlessPresenter {
    extent: (u32, u32),
    frames: AtomicU64,
    last_tick_tag: AtomicU64,
}

impl HeadlessPresenter {
    #[must_use]
    pub fn new(extent: (u32, u32)) -> Self {
        Self {
            extent,
            frames: AtomicU64::new(0),
            last_tick_tag: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    /// Camera tick tag of the most recently presented frame.
    #[must_use]
    pub fn last_tick_tag(&self) -> u64 {
        self.last_tick_tag.load(Ordering::SeqCst)
    }
}

impl FramePresenter for HeadlessPresenter {
    fn surface_extent(&self) -> (u32, u32) {
        self.extent
    }

    fn present(&self, frame: &FrameData) {
        self.frames.fetch_add(1, Ordering::SeqCst);
        self.last_tick_tag.store(frame.camera().tick, Ordering::SeqCst);
    }
}
