//! Engine-level scenarios: render collection and presentation, the physics
//! fence, audio and replication hooks.

use std::sync::Arc;

use glam::Vec3;

use helion::{
    ChannelReplicator, Engine, EngineConfig, FramePresenter, HeadlessPresenter, RecordingAudio,
    RecordingSolver, ReplicationEvent,
};
use helion_core::{
    AudioEmitter, AudioEngine, CameraComponent, Component, ComponentHandle, ComponentTag,
    DirectionalLight, Entity, MaterialHandle, MeshHandle, NetworkIdentity, PhysicsBody,
    PhysicsSolver, StaticMesh, System,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn render_pipeline_publishes_tagged_frames() {
    init_tracing();

    let mut engine = Engine::new(EngineConfig {
        rendering: true,
        worker_threads: 4,
        ..EngineConfig::default()
    })
    .expect("engine");
    let presenter = Arc::new(HeadlessPresenter::new((640, 360)));
    let presenter_dyn: Arc<dyn FramePresenter> = presenter.clone();
    engine.set_presenter(presenter_dyn);
    let world = engine.push_world().expect("world");

    let camera = Entity::new();
    camera.attach(CameraComponent {
        active: true,
        ..CameraComponent::new()
    });
    camera.transform().write().translation = Vec3::new(0.0, 2.0, 5.0);
    world.spawn(&camera);

    let cube = Entity::new();
    cube.attach(StaticMesh::new(MeshHandle(1), MaterialHandle(1)));
    world.spawn(&cube);

    let sun = Entity::new();
    sun.attach(DirectionalLight {
        color: Vec3::ONE,
        intensity: 2.0,
    });
    world.spawn(&sun);

    engine.tick(1.0 / 60.0).expect("tick");

    assert_eq!(presenter.frames(), 1);
    assert_eq!(presenter.last_tick_tag(), 1);

    let frame = world.frame_data().published();
    assert!(frame.camera().active);
    assert_eq!(frame.opaque_instances().len(), 1);
    let lights = frame.directional_lights();
    assert_eq!(lights.len(), 1);
    assert!((lights[0].color[3] - 2.0).abs() < 1e-6);

    engine.tick(1.0 / 60.0).expect("tick");
    assert_eq!(presenter.last_tick_tag(), 2);
    assert_eq!(engine.stats().frames(), 2);
}

#[test]
fn frame_without_active_camera_is_inactive() {
    init_tracing();

    let mut engine = Engine::new(EngineConfig {
        rendering: true,
        ..EngineConfig::default()
    })
    .expect("engine");
    let world = engine.push_world().expect("world");
    world.spawn(&Entity::new());

    engine.tick(1.0 / 60.0).expect("tick");
    let camera = world.frame_data().published().camera();
    assert!(!camera.active);
    assert_eq!(camera.tick, 1);
}

struct BodyState {
    force: f32,
    reported: f32,
}
impl Component for BodyState {
    fn alternate_tags() -> Vec<ComponentTag> {
        vec![PhysicsBody::tag()]
    }
}

#[test]
fn solver_step_lands_between_write_and_read() {
    init_tracing();

    struct PushForces(Arc<RecordingSolver>);
    impl System for PushForces {
        fn queries(&self) -> Vec<ComponentTag> {
            vec![ComponentTag::of::<BodyState>()]
        }
        fn tick(&self, _dt: f32, _entity: &Arc<Entity>, component: &ComponentHandle) {
            if let Some(body) = component.downcast::<BodyState>() {
                body.write().force = 9.8;
            }
            self.0.mark("write");
        }
    }

    struct ReadPoses(Arc<RecordingSolver>);
    impl System for ReadPoses {
        fn queries(&self) -> Vec<ComponentTag> {
            vec![ComponentTag::of::<BodyState>()]
        }
        fn tick(&self, _dt: f32, _entity: &Arc<Entity>, component: &ComponentHandle) {
            if let Some(body) = component.downcast::<BodyState>() {
                let force = body.read().force;
                body.write().reported = force;
            }
            self.0.mark("read");
        }
    }

    let mut engine = Engine::new(EngineConfig::default()).expect("engine");
    let world = engine.push_world().expect("world");
    let solver = Arc::new(RecordingSolver::default());
    let solver_dyn: Arc<dyn PhysicsSolver> = solver.clone();
    world.attach_solver(solver_dyn);
    world.init_physics(PushForces(Arc::clone(&solver)), ReadPoses(Arc::clone(&solver)));

    let body = Entity::new();
    body.attach(BodyState {
        force: 0.0,
        reported: 0.0,
    });
    world.spawn(&body);

    engine.tick(1.0 / 60.0).expect("tick");

    assert_eq!(solver.spawns(), 1);
    assert_eq!(solver.steps(), 1);
    let log = solver.log();
    let step_at = log.iter().position(|&c| c == "step").expect("step ran");
    assert!(log.iter().position(|&c| c == "write").expect("write ran") < step_at);
    assert!(log.iter().position(|&c| c == "read").expect("read ran") > step_at);

    world.destroy(body.id());
    engine.tick(1.0 / 60.0).expect("tick");
    assert_eq!(solver.destroys(), 1);
}

struct Siren;
impl Component for Siren {
    fn alternate_tags() -> Vec<ComponentTag> {
        vec![AudioEmitter::tag()]
    }
}

#[test]
fn audio_engine_sees_emitters_and_mix_ticks() {
    init_tracing();

    let mut engine = Engine::new(EngineConfig::default()).expect("engine");
    let world = engine.push_world().expect("world");
    let audio = Arc::new(RecordingAudio::default());
    let audio_dyn: Arc<dyn AudioEngine> = audio.clone();
    world.attach_audio(audio_dyn);

    let entity = Entity::new();
    entity.attach(Siren);
    world.spawn(&entity);

    engine.tick(1.0 / 60.0).expect("tick");
    assert_eq!(audio.added(), 1);
    assert_eq!(audio.ticks(), 1);

    entity.destroy().expect("in world");
    engine.tick(1.0 / 60.0).expect("tick");
    assert_eq!(audio.removed(), 1);
    assert_eq!(audio.ticks(), 2);
}

#[test]
fn replication_reports_identity_lifecycle() {
    init_tracing();

    let mut engine = Engine::new(EngineConfig::default()).expect("engine");
    let world = engine.push_world().expect("world");
    let replicator = Arc::new(ChannelReplicator::new(64));
    let events = replicator.subscribe();
    world.attach_network(replicator);

    let announced = Entity::new();
    announced.attach(NetworkIdentity::new(7));
    world.spawn(&announced);

    let silent = Entity::new();
    silent.attach(NetworkIdentity::silent(8));
    world.spawn(&silent);

    world.flush();
    let event = events.try_recv().expect("announced identity");
    assert_eq!(
        event,
        ReplicationEvent::ComponentAdded {
            entity: announced.id(),
            tag: ComponentTag::of::<NetworkIdentity>(),
        }
    );
    assert!(events.try_recv().is_err(), "silent identity must not announce");

    let id = announced.id();
    world.destroy(id);
    world.flush();
    assert_eq!(
        events.try_recv().expect("removal"),
        ReplicationEvent::ComponentRemoved {
            entity: id,
            tag: ComponentTag::of::<NetworkIdentity>(),
        }
    );
}
