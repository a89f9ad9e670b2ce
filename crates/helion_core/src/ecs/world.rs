//! # World
//!
//! Owns the aggregate component store, the entity arena, the system
//! registry, and the frame-data double buffer, and drives the per-tick
//! task graph.
//!
//! Structural changes (spawn, destroy, attach, detach) are never applied
//! mid-tick: entity handles stage them into an MPSC command queue which
//! the world drains strictly between ticks. While the task graph runs, the
//! store's membership is frozen — worker tasks iterate snapshots taken at
//! graph-build time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, trace_span, warn};

use crate::ecs::collaborators::{
    AudioEmitter, AudioEngine, NetworkDelegate, NetworkIdentity, PhysicsBody, PhysicsSolver,
};
use crate::ecs::component::{Component, ComponentHandle, ComponentRef};
use crate::ecs::entity::{ChildEntity, Entity, EntityArena, EntityId};
use crate::ecs::error::EcsError;
use crate::ecs::schedule::{NodeId, TaskGraph};
use crate::ecs::script::{ScriptComponent, ScriptSystem};
use crate::ecs::store::SharedStore;
use crate::ecs::system::{ScheduledSystem, System, SystemRegistry};
use crate::ecs::tag::{ComponentTag, SystemTag};
use crate::render::components::{
    AmbientLight, CameraComponent, DirectionalLight, PointLight, SpotLight, StaticMesh,
};
use crate::render::frame_data::{
    FrameDataBuffers, InstanceKey, PackedAmbientLight, PackedDirectionalLight, PackedPointLight,
    PackedSpotLight,
};

/// Construction parameters for a [`World`].
pub struct WorldConfig {
    /// Worker threads for the tick pool. `0` lets rayon pick.
    pub worker_threads: usize,
    /// Arena pre-allocation hint.
    pub entity_capacity: usize,
    /// Whether the render-collection pipeline is scheduled each tick.
    pub rendering: bool,
    /// Share an existing pool instead of building one.
    pub pool: Option<Arc<rayon::ThreadPool>>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            entity_capacity: 256,
            rendering: false,
            pool: None,
        }
    }
}

/// A staged structural change, applied at the next inter-tick drain.
#[derive(Debug)]
pub(crate) enum WorldCommand {
    Spawn(Arc<Entity>),
    Destroy(EntityId),
    Attach(ComponentHandle),
    Detach(ComponentHandle),
}

type TickHook = Box<dyn Fn(f32) + Send + Sync>;

/// The simulation container. Created with [`World::new`]; always handled
/// through an `Arc` so entities can hold weak back-references.
pub struct World {
    self_weak: Weak<World>,
    store: SharedStore,
    entities: RwLock<EntityArena>,
    commands_tx: Sender<WorldCommand>,
    commands_rx: Receiver<WorldCommand>,
    registry: Mutex<SystemRegistry>,
    frame_data: FrameDataBuffers,
    pool: Arc<rayon::ThreadPool>,
    solver: RwLock<Option<Arc<dyn PhysicsSolver>>>,
    audio: RwLock<Option<Arc<dyn AudioEngine>>>,
    network: RwLock<Option<Arc<dyn NetworkDelegate>>>,
    physics_links: Mutex<Option<(SystemTag, SystemTag)>>,
    surface_extent: Mutex<(u32, u32)>,
    rendering: AtomicBool,
    tick_count: AtomicU64,
    pre_tick: Mutex<Option<TickHook>>,
    post_tick: Mutex<Option<TickHook>>,
}

impl World {
    /// Builds a world with [`ScriptSystem`] pre-registered.
    ///
    /// # Errors
    /// [`EcsError::WorkerPool`] if a dedicated thread pool was requested
    /// and could not be spawned.
    pub fn new(config: WorldConfig) -> Result<Arc<Self>, EcsError> {
        let pool = match config.pool {
            Some(pool) => pool,
            None => Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.worker_threads)
                    .build()
                    .map_err(|e| EcsError::WorkerPool(e.to_string()))?,
            ),
        };
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();

        let world = Arc::new_cyclic(|self_weak| Self {
            self_weak: self_weak.clone(),
            store: SharedStore::new(),
            entities: RwLock::new(EntityArena::with_capacity(config.entity_capacity)),
            commands_tx,
            commands_rx,
            registry: Mutex::new(SystemRegistry::new()),
            frame_data: FrameDataBuffers::default(),
            pool,
            solver: RwLock::new(None),
            audio: RwLock::new(None),
            network: RwLock::new(None),
            physics_links: Mutex::new(None),
            surface_extent: Mutex::new((1, 1)),
            rendering: AtomicBool::new(config.rendering),
            tick_count: AtomicU64::new(0),
            pre_tick: Mutex::new(None),
            post_tick: Mutex::new(None),
        });
        world.registry.lock().register(ScriptSystem);
        debug!(rendering = config.rendering, "world created");
        Ok(world)
    }

    // ---- registration ----------------------------------------------------

    /// Registers a system to run every tick.
    pub fn register_system<S: System>(&self, system: S) {
        debug!(system = SystemTag::of::<S>().name(), "register system");
        self.registry.lock().register(system);
    }

    /// Registers a system to run once per `interval` seconds of virtual
    /// time.
    pub fn register_timed_system<S: System>(&self, system: S, interval: f32) {
        debug!(
            system = SystemTag::of::<S>().name(),
            interval, "register timed system"
        );
        self.registry.lock().register_timed(system, interval);
    }

    /// Removes a system from both tables. Unknown tags are a no-op.
    pub fn unregister_system(&self, tag: SystemTag) {
        self.registry.lock().unregister(tag);
    }

    /// Registers the physics link systems and records their tags: the
    /// solver step is scheduled after every `W` task and before every `R`
    /// task each tick.
    pub fn init_physics<W: System, R: System>(&self, write: W, read: R) {
        let mut registry = self.registry.lock();
        registry.register(write);
        registry.register(read);
        *self.physics_links.lock() = Some((SystemTag::of::<W>(), SystemTag::of::<R>()));
    }

    /// Attaches the physics solver collaborator.
    pub fn attach_solver(&self, solver: Arc<dyn PhysicsSolver>) {
        *self.solver.write() = Some(solver);
    }

    /// Attaches the audio engine collaborator.
    pub fn attach_audio(&self, audio: Arc<dyn AudioEngine>) {
        *self.audio.write() = Some(audio);
    }

    /// Attaches the replication delegate.
    pub fn attach_network(&self, network: Arc<dyn NetworkDelegate>) {
        *self.network.write() = Some(network);
    }

    /// Enables or disables the render-collection pipeline.
    pub fn set_rendering(&self, rendering: bool) {
        self.rendering.store(rendering, Ordering::Relaxed);
    }

    /// Updates the surface extent the camera projection targets.
    pub fn set_surface_extent(&self, extent: (u32, u32)) {
        *self.surface_extent.lock() = extent;
    }

    /// Installs a hook invoked at the start of every [`tick`](Self::tick).
    pub fn set_pre_tick(&self, hook: impl Fn(f32) + Send + Sync + 'static) {
        *self.pre_tick.lock() = Some(Box::new(hook));
    }

    /// Installs a hook invoked at the end of every [`tick`](Self::tick).
    pub fn set_post_tick(&self, hook: impl Fn(f32) + Send + Sync + 'static) {
        *self.post_tick.lock() = Some(Box::new(hook));
    }

    // ---- structural ------------------------------------------------------

    /// Stages an entity for insertion at the next drain.
    pub fn spawn(&self, entity: &Arc<Entity>) {
        self.enqueue(WorldCommand::Spawn(Arc::clone(entity)));
    }

    /// Stages an entity for removal at the next drain. Stale ids are
    /// silently ignored at drain time.
    pub fn destroy(&self, id: EntityId) {
        self.enqueue(WorldCommand::Destroy(id));
    }

    pub(crate) fn enqueue(&self, command: WorldCommand) {
        // The receiver lives in self; send cannot observe a disconnect.
        self.commands_tx.send(command).ok();
    }

    /// Applies every staged structural command now. Called automatically at
    /// the start of each tick; expose for tests and setup code that wants
    /// spawns visible without ticking.
    pub fn flush(&self) {
        let mut applied = 0usize;
        while let Ok(command) = self.commands_rx.try_recv() {
            applied += 1;
            match command {
                WorldCommand::Spawn(entity) => self.apply_spawn(&entity),
                WorldCommand::Destroy(id) => self.apply_destroy(id),
                WorldCommand::Attach(handle) => self.apply_attach(&handle),
                WorldCommand::Detach(handle) => self.apply_detach(&handle),
            }
        }
        if applied > 0 {
            debug!(applied, "structural drain");
        }
    }

    fn apply_spawn(&self, entity: &Arc<Entity>) {
        if entity.is_in_world() {
            warn!(id = ?entity.id(), "spawn skipped: entity already in a world");
            return;
        }
        let id = self.entities.write().insert(Arc::clone(entity));
        entity.set_id(id);
        entity.set_world(&self.self_weak);

        for handle in entity.components().handles() {
            handle.set_owner(id);
            self.store.insert_handle(&handle);
            self.on_component_added(entity, &handle);
        }

        // Subtrees spawn with their root.
        for child in entity.components().components_of::<ChildEntity>() {
            let child = Arc::clone(child.read().entity());
            self.apply_spawn(&child);
        }
    }

    fn apply_destroy(&self, id: EntityId) {
        let Some(entity) = self.entities.write().remove(id) else {
            debug!(?id, "destroy skipped: stale id");
            return;
        };

        for child in entity.components().components_of::<ChildEntity>() {
            let child_id = child.read().entity().id();
            self.apply_destroy(child_id);
        }

        for handle in entity.components().handles() {
            self.on_component_removed(&entity, &handle);
            self.store.remove_handle(&handle);
        }
        entity.clear_world();
    }

    fn apply_attach(&self, handle: &ComponentHandle) {
        let Some(entity) = self.entities.read().get(handle.owner()) else {
            warn!(owner = ?handle.owner(), tag = handle.tag().name(), "attach skipped: stale owner");
            return;
        };
        self.store.insert_handle(handle);
        self.on_component_added(&entity, handle);
    }

    fn apply_detach(&self, handle: &ComponentHandle) {
        self.store.remove_handle(handle);
        // Owner may already be gone; destroy fired the hooks in that case.
        if let Some(entity) = self.entities.read().get(handle.owner()) {
            self.on_component_removed(&entity, handle);
        }
    }

    fn on_component_added(&self, entity: &Arc<Entity>, handle: &ComponentHandle) {
        if let Some(script) = handle.downcast::<ScriptComponent>() {
            script.write().fire_start(entity);
        }
        if handle.has_capability(PhysicsBody::tag()) {
            if let Some(solver) = self.solver.read().clone() {
                solver.spawn(entity);
            }
        }
        if handle.has_capability(AudioEmitter::tag()) {
            if let Some(audio) = self.audio.read().clone() {
                audio.emitter_added(entity);
            }
        }
        if let Some(identity) = handle.downcast::<NetworkIdentity>() {
            if identity.read().trigger_replication {
                if let Some(network) = self.network.read().clone() {
                    network.component_added(entity.id(), handle.tag());
                }
            }
        }
    }

    fn on_component_removed(&self, entity: &Arc<Entity>, handle: &ComponentHandle) {
        if let Some(script) = handle.downcast::<ScriptComponent>() {
            script.write().fire_stop(entity);
        }
        if handle.has_capability(PhysicsBody::tag()) {
            if let Some(solver) = self.solver.read().clone() {
                solver.destroy(entity);
            }
        }
        if handle.has_capability(AudioEmitter::tag()) {
            if let Some(audio) = self.audio.read().clone() {
                audio.emitter_removed(entity);
            }
        }
        if let Some(identity) = handle.downcast::<NetworkIdentity>() {
            if identity.read().trigger_replication {
                if let Some(network) = self.network.read().clone() {
                    network.component_removed(entity.id(), handle.tag());
                }
            }
        }
    }

    // ---- queries ---------------------------------------------------------

    /// Resolves an id, returning `None` for stale or destroyed entities.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.read().get(id)
    }

    /// Resolves an id that the caller expects to be live.
    ///
    /// # Errors
    /// [`EcsError::StaleEntity`] when the id's generation no longer matches
    /// (destroyed, recycled, or never spawned).
    pub fn resolve(&self, id: EntityId) -> Result<Arc<Entity>, EcsError> {
        self.entity(id).ok_or(EcsError::StaleEntity { id })
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First world-reachable component of type `T`.
    ///
    /// # Errors
    /// [`EcsError::NotFound`] if no entity carries one.
    pub fn get_component<T: Component>(&self) -> Result<ComponentRef<T>, EcsError> {
        self.store.get_component::<T>()
    }

    /// All world-reachable components of exactly type `T`.
    #[must_use]
    pub fn components_of<T: Component>(&self) -> Vec<ComponentRef<T>> {
        self.store.components_of::<T>()
    }

    /// Snapshot of every handle indexed under `tag`, capability index
    /// included.
    #[must_use]
    pub fn snapshot_capability(&self, tag: ComponentTag) -> Vec<ComponentHandle> {
        self.store.snapshot_capability(tag)
    }

    /// The frame-data double buffer. Renderers read
    /// [`published()`](FrameDataBuffers::published) between ticks.
    #[must_use]
    pub fn frame_data(&self) -> &FrameDataBuffers {
        &self.frame_data
    }

    /// Ticks completed so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    // ---- tick ------------------------------------------------------------

    /// Advances the simulation by `dt` seconds: pre-tick hook, structural
    /// drain, concurrent system execution, post-tick hook.
    ///
    /// # Errors
    /// [`EcsError::OrderingCycle`] if this tick's constraints are cyclic.
    /// A panicking system propagates its panic.
    pub fn tick(&self, dt: f32) -> Result<(), EcsError> {
        let tick = self.tick_count.load(Ordering::Relaxed) + 1;
        let span = trace_span!("tick", tick);
        let _entered = span.enter();

        if let Some(hook) = self.pre_tick.lock().as_ref() {
            hook(dt);
        }
        self.flush();
        self.tick_ecs(dt, tick)?;
        if let Some(hook) = self.post_tick.lock().as_ref() {
            hook(dt);
        }
        self.tick_count.store(tick, Ordering::Relaxed);
        Ok(())
    }

    /// Builds and executes this tick's task graph.
    fn tick_ecs(&self, dt: f32, tick: u64) -> Result<(), EcsError> {
        let due = self.registry.lock().due_systems(dt);

        // Memoize one snapshot per queried tag so systems sharing a query
        // iterate the same copy.
        let mut snapshots: HashMap<ComponentTag, Arc<Vec<ComponentHandle>>> = HashMap::new();
        for scheduled in &due {
            for tag in scheduled.system.queries() {
                snapshots
                    .entry(tag)
                    .or_insert_with(|| Arc::new(self.store.snapshot_capability(tag)));
            }
        }

        let mut graph = TaskGraph::new();
        let mut system_nodes: HashMap<SystemTag, Vec<NodeId>> = HashMap::new();

        for scheduled in &due {
            for tag in scheduled.system.queries() {
                let snapshot = Arc::clone(&snapshots[&tag]);
                if snapshot.is_empty() {
                    // Absent from the graph; constraints against this
                    // system are satisfied trivially.
                    continue;
                }
                let system = Arc::clone(&scheduled.system);
                let node = graph.add_node(
                    format!("{}/{}", scheduled.tag.name(), tag.name()),
                    move || {
                        snapshot.par_iter().for_each(|handle| {
                            let Some(entity) = self.entities.read().get(handle.owner()) else {
                                return;
                            };
                            system.tick(dt, &entity, handle);
                        });
                    },
                );
                system_nodes.entry(scheduled.tag).or_default().push(node);
            }
        }

        self.wire_ordering(&due, &mut graph, &system_nodes);
        self.schedule_physics(dt, &mut graph, &system_nodes);
        self.schedule_audio(dt, &mut graph);
        if self.rendering.load(Ordering::Relaxed) {
            self.schedule_render_collection(tick, &mut graph, &system_nodes);
        }

        graph.run(&self.pool)
    }

    /// Ordering edges span every node of both endpoint systems; a system
    /// split across several queries is still fully ordered.
    fn wire_ordering(
        &self,
        due: &[ScheduledSystem],
        graph: &mut TaskGraph<'_>,
        system_nodes: &HashMap<SystemTag, Vec<NodeId>>,
    ) {
        for scheduled in due {
            let Some(own) = system_nodes.get(&scheduled.tag) else {
                continue;
            };
            for target in scheduled.system.must_run_before() {
                if let Some(others) = system_nodes.get(&target) {
                    for &a in own {
                        for &b in others {
                            graph.add_edge(a, b);
                        }
                    }
                }
            }
            for target in scheduled.system.must_run_after() {
                if let Some(others) = system_nodes.get(&target) {
                    for &b in others {
                        for &a in own {
                            graph.add_edge(b, a);
                        }
                    }
                }
            }
        }
    }

    /// Solver step node, fenced between the physics write and read systems
    /// declared through [`init_physics`](Self::init_physics).
    fn schedule_physics<'t>(
        &'t self,
        dt: f32,
        graph: &mut TaskGraph<'t>,
        system_nodes: &HashMap<SystemTag, Vec<NodeId>>,
    ) {
        let Some(solver) = self.solver.read().clone() else {
            return;
        };
        let step = graph.add_node("physics/step", move || solver.step(dt));
        if let Some((write, read)) = *self.physics_links.lock() {
            if let Some(writers) = system_nodes.get(&write) {
                for &node in writers {
                    graph.add_edge(node, step);
                }
            }
            if let Some(readers) = system_nodes.get(&read) {
                for &node in readers {
                    graph.add_edge(step, node);
                }
            }
        }
    }

    /// Audio mix node. Deliberately unordered relative to component writes;
    /// a frame of skew is inaudible and the mixer double-buffers anyway.
    fn schedule_audio<'t>(&'t self, dt: f32, graph: &mut TaskGraph<'t>) {
        let Some(audio) = self.audio.read().clone() else {
            return;
        };
        graph.add_node("audio/tick", move || audio.tick(dt));
    }

    /// Render collection pipeline:
    /// clear -> camera -> geometry, clear -> lights, everything -> swap.
    /// Script nodes precede clear so collectors observe post-script state.
    fn schedule_render_collection<'t>(
        &'t self,
        tick: u64,
        graph: &mut TaskGraph<'t>,
        system_nodes: &HashMap<SystemTag, Vec<NodeId>>,
    ) {
        let frame = self.frame_data.current();
        let extent = *self.surface_extent.lock();

        let clear = graph.add_node("render/clear", move || frame.clear(tick));
        if let Some(scripts) = system_nodes.get(&SystemTag::of::<ScriptSystem>()) {
            for &node in scripts {
                graph.add_edge(node, clear);
            }
        }

        let cameras = self.store.snapshot_capability(ComponentTag::of::<CameraComponent>());
        let camera_node = graph.add_node("render/camera", move || {
            for handle in &cameras {
                let Some(camera) = handle.downcast::<CameraComponent>() else {
                    continue;
                };
                let camera = *camera.read();
                if !camera.active {
                    continue;
                }
                let Some(owner) = self.entities.read().get(handle.owner()) else {
                    continue;
                };
                let world_matrix = owner.transform().read().world_matrix();
                frame.set_camera(
                    camera.view_matrix(world_matrix),
                    camera.projection_matrix(extent),
                );
                break;
            }
        });
        graph.add_edge(clear, camera_node);

        let meshes = self.store.snapshot_capability(ComponentTag::of::<StaticMesh>());
        let geometry_node = graph.add_node("render/geometry", move || {
            meshes.par_iter().for_each(|handle| {
                let Some(mesh) = handle.downcast::<StaticMesh>() else {
                    return;
                };
                let Some(owner) = self.entities.read().get(handle.owner()) else {
                    return;
                };
                let mesh = *mesh.read();
                let key = InstanceKey {
                    mesh: mesh.mesh,
                    material: mesh.material,
                };
                let world_matrix = owner.transform().read().world_matrix();
                frame.bucket(key).lock().push(world_matrix);
            });
        });
        graph.add_edge(camera_node, geometry_node);

        let mut collectors = vec![camera_node, geometry_node];
        collectors.push(self.light_node::<DirectionalLight>(graph, "render/directional", {
            move |frame, light: DirectionalLight, world| {
                let direction = world.transform_vector3(glam::Vec3::NEG_Z).normalize_or_zero();
                frame.push_directional(PackedDirectionalLight {
                    color: [light.color.x, light.color.y, light.color.z, light.intensity],
                    direction: [direction.x, direction.y, direction.z, 0.0],
                });
            }
        }));
        collectors.push(self.light_node::<AmbientLight>(graph, "render/ambient", {
            move |frame, light: AmbientLight, _world| {
                frame.push_ambient(PackedAmbientLight {
                    color: [light.color.x, light.color.y, light.color.z, light.intensity],
                });
            }
        }));
        collectors.push(self.light_node::<SpotLight>(graph, "render/spot", {
            move |frame, light: SpotLight, world| {
                let position = world.transform_point3(glam::Vec3::ZERO);
                let direction = world.transform_vector3(glam::Vec3::NEG_Z).normalize_or_zero();
                frame.push_spot(PackedSpotLight {
                    position: [position.x, position.y, position.z, 1.0],
                    direction_cone: [
                        direction.x,
                        direction.y,
                        direction.z,
                        light.cone_deg.to_radians(),
                    ],
                    color: [light.color.x, light.color.y, light.color.z, light.intensity],
                });
            }
        }));
        collectors.push(self.light_node::<PointLight>(graph, "render/point", {
            move |frame, light: PointLight, world| {
                let position = world.transform_point3(glam::Vec3::ZERO);
                frame.push_point(PackedPointLight {
                    position: [position.x, position.y, position.z, 1.0],
                    color: [light.color.x, light.color.y, light.color.z, light.intensity],
                });
            }
        }));
        // Light collectors depend only on clear; scripts were already fenced
        // in front of it.
        for &collector in &collectors[2..] {
            graph.add_edge(clear, collector);
        }

        // The publish flip runs strictly after every collector.
        let swap = graph.add_node("render/swap", move || self.frame_data.swap());
        for &collector in &collectors {
            graph.add_edge(collector, swap);
        }
    }

    fn light_node<'t, L: Component + Copy>(
        &'t self,
        graph: &mut TaskGraph<'t>,
        name: &str,
        pack: impl Fn(&crate::render::frame_data::FrameData, L, glam::Mat4) + Send + Sync + 't,
    ) -> NodeId {
        let frame = self.frame_data.current();
        let lights = self.store.snapshot_capability(ComponentTag::of::<L>());
        graph.add_node(name.to_owned(), move || {
            for handle in &lights {
                let Some(light) = handle.downcast::<L>() else {
                    continue;
                };
                let Some(owner) = self.entities.read().get(handle.owner()) else {
                    continue;
                };
                let world_matrix = owner.transform().read().world_matrix();
                pack(frame, *light.read(), world_matrix);
            }
        })
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.len())
            .field("tick", &self.tick_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::script::ScriptBehavior;
    use std::sync::atomic::AtomicU32;

    struct Counter(u32);
    impl Component for Counter {}

    struct Increment;
    impl System for Increment {
        fn queries(&self) -> Vec<ComponentTag> {
            vec![ComponentTag::of::<Counter>()]
        }
        fn tick(&self, _dt: f32, _entity: &Arc<Entity>, component: &ComponentHandle) {
            if let Some(counter) = component.downcast::<Counter>() {
                counter.write().0 += 1;
            }
        }
    }

    fn world() -> Arc<World> {
        World::new(WorldConfig {
            worker_threads: 2,
            ..WorldConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_spawn_is_deferred_until_drain() {
        let world = world();
        let entity = Entity::new();
        entity.attach(Counter(0));

        world.spawn(&entity);
        assert_eq!(world.len(), 0);
        assert!(world.get_component::<Counter>().is_err());

        world.flush();
        assert_eq!(world.len(), 1);
        assert!(entity.is_in_world());
        assert!(world.get_component::<Counter>().is_ok());
    }

    #[test]
    fn test_system_ticks_components() {
        let world = world();
        world.register_system(Increment);
        for _ in 0..3 {
            let entity = Entity::new();
            entity.attach(Counter(0));
            world.spawn(&entity);
        }

        world.tick(1.0).unwrap();
        world.tick(1.0).unwrap();

        for counter in world.components_of::<Counter>() {
            assert_eq!(counter.read().0, 2);
        }
        assert_eq!(world.tick_count(), 2);
    }

    #[test]
    fn test_destroy_mid_run_is_deferred() {
        let world = world();
        world.register_system(Increment);
        let entity = Entity::new();
        let counter = entity.attach(Counter(0));
        world.spawn(&entity);
        world.flush();

        entity.destroy().unwrap();
        // Still present until the next drain.
        assert_eq!(world.len(), 1);
        world.tick(1.0).unwrap();
        assert_eq!(world.len(), 0);
        assert!(!entity.is_in_world());
        // Removed before systems ran this tick.
        assert_eq!(counter.read().0, 0);
        assert!(world.entity(entity.id()).is_none());
    }

    #[test]
    fn test_resolve_reports_stale_ids() {
        let world = world();
        let entity = Entity::new();
        world.spawn(&entity);
        world.flush();
        let id = entity.id();
        assert!(world.resolve(id).is_ok());

        world.destroy(id);
        world.flush();
        let err = world.resolve(id).err().unwrap();
        assert!(matches!(err, EcsError::StaleEntity { id: stale } if stale == id));
    }

    #[test]
    fn test_script_lifecycle_hooks() {
        struct Probe {
            starts: Arc<AtomicU32>,
            stops: Arc<AtomicU32>,
        }
        impl ScriptBehavior for Probe {
            fn start(&mut self, _entity: &Arc<Entity>) {
                self.starts.fetch_add(1, Ordering::SeqCst);
            }
            fn stop(&mut self, _entity: &Arc<Entity>) {
                self.stops.fetch_add(1, Ordering::SeqCst);
            }
            fn tick(&mut self, _dt: f32, _entity: &Arc<Entity>) {}
        }

        let starts = Arc::new(AtomicU32::new(0));
        let stops = Arc::new(AtomicU32::new(0));
        let world = world();
        let entity = Entity::new();
        entity.attach(ScriptComponent::new(Probe {
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
        }));

        world.spawn(&entity);
        world.flush();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        entity.destroy().unwrap();
        world.flush();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ordering_cycle_fails_fast() {
        struct A;
        impl System for A {
            fn queries(&self) -> Vec<ComponentTag> {
                vec![ComponentTag::of::<Counter>()]
            }
            fn must_run_before(&self) -> Vec<SystemTag> {
                vec![SystemTag::of::<B>()]
            }
            fn tick(&self, _dt: f32, _e: &Arc<Entity>, _c: &ComponentHandle) {}
        }
        struct B;
        impl System for B {
            fn queries(&self) -> Vec<ComponentTag> {
                vec![ComponentTag::of::<Counter>()]
            }
            fn must_run_before(&self) -> Vec<SystemTag> {
                vec![SystemTag::of::<A>()]
            }
            fn tick(&self, _dt: f32, _e: &Arc<Entity>, _c: &ComponentHandle) {}
        }

        let world = world();
        world.register_system(A);
        world.register_system(B);
        let entity = Entity::new();
        entity.attach(Counter(0));
        world.spawn(&entity);

        let err = world.tick(1.0).unwrap_err();
        assert!(matches!(err, EcsError::OrderingCycle { .. }));
    }

    #[test]
    fn test_constraint_against_empty_system_is_satisfied() {
        struct Lonely;
        impl System for Lonely {
            fn queries(&self) -> Vec<ComponentTag> {
                vec![ComponentTag::of::<Counter>()]
            }
            fn must_run_after(&self) -> Vec<SystemTag> {
                // Never registered; resolves to nothing.
                vec![SystemTag::of::<Increment>()]
            }
            fn tick(&self, _dt: f32, _e: &Arc<Entity>, component: &ComponentHandle) {
                if let Some(counter) = component.downcast::<Counter>() {
                    counter.write().0 += 10;
                }
            }
        }

        let world = world();
        world.register_system(Lonely);
        let entity = Entity::new();
        let counter = entity.attach(Counter(0));
        world.spawn(&entity);

        world.tick(1.0).unwrap();
        assert_eq!(counter.read().0, 10);
    }

    #[test]
    fn test_child_entities_follow_root() {
        let world = world();
        let child = Entity::new();
        child.attach(Counter(0));
        let root = Entity::new();
        root.attach(ChildEntity::new(Arc::clone(&child)));

        world.spawn(&root);
        world.flush();
        assert_eq!(world.len(), 2);
        assert!(child.is_in_world());

        world.destroy(root.id());
        world.flush();
        assert_eq!(world.len(), 0);
        assert!(!child.is_in_world());
    }
}
