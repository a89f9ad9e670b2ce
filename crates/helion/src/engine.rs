//! # Engine shell
//!
//! The explicit context object tying the pieces together: one shared
//! worker pool, a stack of worlds (topmost is simulated), an optional
//! presenter consuming published frame data, and frame statistics.
//!
//! There are no globals; everything an engine owns dies with it.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use helion_core::{EcsError, FrameData, World, WorldConfig};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::stats::{FrameStats, FrameStatsAccumulator};

/// Consumer of published frame data, called after every tick of a
/// rendering world. Implementations range from a GPU renderer to the
/// headless recorder in [`collab`](crate::collab).
pub trait FramePresenter: Send + Sync + 'static {
    /// Current drawable surface size in pixels, fed to camera projection.
    fn surface_extent(&self) -> (u32, u32);

    /// Consumes the frame published by the tick that just finished.
    fn present(&self, frame: &FrameData);
}

/// Top-level engine context.
pub struct Engine {
    config: EngineConfig,
    pool: Arc<rayon::ThreadPool>,
    worlds: Vec<Arc<World>>,
    presenter: Option<Arc<dyn FramePresenter>>,
    stats: FrameStatsAccumulator,
    frame: u64,
}

impl Engine {
    /// Builds an engine and its shared worker pool.
    ///
    /// # Errors
    /// [`EngineError::Ecs`] if the pool cannot be spawned.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .build()
                .map_err(|e| EcsError::WorkerPool(e.to_string()))?,
        );
        info!(
            worker_threads = config.worker_threads,
            target_fps = config.target_fps,
            "engine created"
        );
        Ok(Self {
            stats: FrameStatsAccumulator::new(config.target_fps),
            config,
            pool,
            worlds: Vec::new(),
            presenter: None,
            frame: 0,
        })
    }

    /// Builds a world on the shared pool and pushes it onto the stack,
    /// making it active.
    ///
    /// # Errors
    /// Propagates [`EngineError::Ecs`] from world construction.
    pub fn push_world(&mut self) -> Result<Arc<World>, EngineError> {
        let world = World::new(WorldConfig {
            worker_threads: 0,
            entity_capacity: self.config.entity_capacity,
            rendering: self.config.rendering,
            pool: Some(Arc::clone(&self.pool)),
        })?;
        self.worlds.push(Arc::clone(&world));
        debug!(depth = self.worlds.len(), "world pushed");
        Ok(world)
    }

    /// Pops the active world; the one beneath (if any) becomes active.
    pub fn pop_world(&mut self) -> Option<Arc<World>> {
        let world = self.worlds.pop();
        debug!(depth = self.worlds.len(), "world popped");
        world
    }

    /// The world ticks apply to, if any.
    #[must_use]
    pub fn active_world(&self) -> Option<&Arc<World>> {
        self.worlds.last()
    }

    /// Installs the presenter consuming published frames.
    pub fn set_presenter(&mut self, presenter: Arc<dyn FramePresenter>) {
        self.presenter = Some(presenter);
    }

    /// Advances the active world by `dt` seconds and presents the
    /// published frame.
    ///
    /// # Errors
    /// [`EngineError::NoWorld`] with an empty stack; core tick failures
    /// pass through as [`EngineError::Ecs`].
    pub fn tick(&mut self, dt: f32) -> Result<FrameStats, EngineError> {
        let world = Arc::clone(self.worlds.last().ok_or(EngineError::NoWorld)?);
        if let Some(presenter) = &self.presenter {
            world.set_surface_extent(presenter.surface_extent());
        }

        let tick_start = Instant::now();
        world.tick(dt)?;
        let tick_us = tick_start.elapsed().as_micros() as u64;

        let present_start = Instant::now();
        if let Some(presenter) = &self.presenter {
            presenter.present(world.frame_data().published());
        }
        let present_us = present_start.elapsed().as_micros() as u64;

        self.frame += 1;
        let stats = FrameStats {
            frame: self.frame,
            delta_time: dt,
            tick_us,
            present_us,
        };
        self.stats.record(stats);
        Ok(stats)
    }

    /// Aggregate timings since construction.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    /// The shared worker pool, for callers scheduling their own work.
    #[must_use]
    pub fn pool(&self) -> &Arc<rayon::ThreadPool> {
        &self.pool
    }

    /// Tears the engine down, dropping every world.
    pub fn shutdown(mut self) {
        let frames = self.frame;
        self.worlds.clear();
        info!(frames, "engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_without_world_fails() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        assert!(matches!(engine.tick(0.016), Err(EngineError::NoWorld)));
    }

    #[test]
    fn test_world_stack() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let first = engine.push_world().unwrap();
        let second = engine.push_world().unwrap();
        assert!(Arc::ptr_eq(engine.active_world().unwrap(), &second));

        engine.pop_world();
        assert!(Arc::ptr_eq(engine.active_world().unwrap(), &first));

        engine.tick(0.016).unwrap();
        assert_eq!(first.tick_count(), 1);
        assert_eq!(second.tick_count(), 0);
        assert_eq!(engine.stats().frames(), 1);
    }
}
