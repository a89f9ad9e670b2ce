//! # Frame data
//!
//! The snapshot handed from simulation to renderer each tick: one camera
//! block, opaque instance buckets keyed by `(mesh, material)`, and four
//! packed light arrays laid out for direct GPU upload.
//!
//! Collection runs from concurrent task-graph nodes, so every field is
//! individually locked. Buckets get their own inner mutex — two instances
//! of different meshes never contend, and order within a bucket is
//! whatever the workers produced.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::render::components::{MaterialHandle, MeshHandle};
use crate::sync::double_buffer::DoubleBuffer;
use parking_lot::Mutex;

/// Bucket key for instanced opaque drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

/// Camera matrices for the frame, tagged with the tick that produced them.
#[derive(Clone, Copy, Debug)]
pub struct CameraBlock {
    pub view: Mat4,
    pub projection: Mat4,
    /// Tick counter at collection time. A renderer seeing the same tag
    /// twice knows no new frame was published in between.
    pub tick: u64,
    /// False when no active camera existed this frame.
    pub active: bool,
}

impl Default for CameraBlock {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            tick: 0,
            active: false,
        }
    }
}

/// GPU-packed directional light: rgb + intensity, then direction.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PackedDirectionalLight {
    pub color: [f32; 4],
    pub direction: [f32; 4],
}

/// GPU-packed ambient light: rgb + intensity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PackedAmbientLight {
    pub color: [f32; 4],
}

/// GPU-packed spot light: position, direction with cone angle (radians) in
/// `w`, and rgb + intensity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PackedSpotLight {
    pub position: [f32; 4],
    pub direction_cone: [f32; 4],
    pub color: [f32; 4],
}

/// GPU-packed point light: position and rgb + intensity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PackedPointLight {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

type Bucket = Arc<Mutex<Vec<Mat4>>>;

/// One frame's collected render state.
#[derive(Default)]
pub struct FrameData {
    camera: Mutex<CameraBlock>,
    opaques: Mutex<HashMap<InstanceKey, Bucket>>,
    directional: Mutex<Vec<PackedDirectionalLight>>,
    ambient: Mutex<Vec<PackedAmbientLight>>,
    spot: Mutex<Vec<PackedSpotLight>>,
    point: Mutex<Vec<PackedPointLight>>,
}

impl FrameData {
    /// Resets all collected state for reuse, stamping the new tick tag.
    pub fn clear(&self, tick: u64) {
        {
            let mut camera = self.camera.lock();
            *camera = CameraBlock {
                tick,
                ..CameraBlock::default()
            };
        }
        self.opaques.lock().clear();
        self.directional.lock().clear();
        self.ambient.lock().clear();
        self.spot.lock().clear();
        self.point.lock().clear();
    }

    /// Records the active camera for this frame. Keeps the tick tag set by
    /// [`clear`](Self::clear).
    pub fn set_camera(&self, view: Mat4, projection: Mat4) {
        let mut camera = self.camera.lock();
        camera.view = view;
        camera.projection = projection;
        camera.active = true;
    }

    /// Copy of the camera block.
    #[must_use]
    pub fn camera(&self) -> CameraBlock {
        *self.camera.lock()
    }

    /// The instance bucket for `key`, created on first use. The outer map
    /// lock is held only for the lookup; pushes go through the returned
    /// per-bucket lock.
    #[must_use]
    pub fn bucket(&self, key: InstanceKey) -> Bucket {
        Arc::clone(self.opaques.lock().entry(key).or_default())
    }

    /// Snapshot of the opaque buckets: key plus instance transforms.
    #[must_use]
    pub fn opaque_instances(&self) -> Vec<(InstanceKey, Vec<Mat4>)> {
        self.opaques
            .lock()
            .iter()
            .map(|(key, bucket)| (*key, bucket.lock().clone()))
            .collect()
    }

    pub fn push_directional(&self, light: PackedDirectionalLight) {
        self.directional.lock().push(light);
    }

    pub fn push_ambient(&self, light: PackedAmbientLight) {
        self.ambient.lock().push(light);
    }

    pub fn push_spot(&self, light: PackedSpotLight) {
        self.spot.lock().push(light);
    }

    pub fn push_point(&self, light: PackedPointLight) {
        self.point.lock().push(light);
    }

    #[must_use]
    pub fn directional_lights(&self) -> Vec<PackedDirectionalLight> {
        self.directional.lock().clone()
    }

    #[must_use]
    pub fn ambient_lights(&self) -> Vec<PackedAmbientLight> {
        self.ambient.lock().clone()
    }

    #[must_use]
    pub fn spot_lights(&self) -> Vec<PackedSpotLight> {
        self.spot.lock().clone()
    }

    #[must_use]
    pub fn point_lights(&self) -> Vec<PackedPointLight> {
        self.point.lock().clone()
    }
}

/// The world's pair of frame-data slots. Allocated once; the final
/// collection node each tick swaps which slot is published.
pub type FrameDataBuffers = DoubleBuffer<FrameData>;
