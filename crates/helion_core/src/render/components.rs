//! Render-facing components. These carry description only — meshes and
//! materials are opaque handles resolved by whatever renderer consumes the
//! published frame data.

use glam::Mat4;
use glam::Vec3;

use crate::ecs::Component;

/// Opaque asset handle for a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Opaque asset handle for a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

/// Perspective camera. The view matrix is derived from the owning entity's
/// transform at collection time; only one active camera is collected per
/// frame.
#[derive(Clone, Copy, Debug)]
pub struct CameraComponent {
    pub active: bool,
    /// Vertical field of view, degrees.
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraComponent {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: false,
            fov_deg: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// View matrix: the inverse of the owner's local-to-world matrix.
    #[must_use]
    pub fn view_matrix(&self, owner_world: Mat4) -> Mat4 {
        owner_world.inverse()
    }

    /// Right-handed perspective projection for a surface of the given pixel
    /// extent. Degenerate extents fall back to square aspect.
    #[must_use]
    pub fn projection_matrix(&self, extent: (u32, u32)) -> Mat4 {
        let aspect = if extent.0 == 0 || extent.1 == 0 {
            1.0
        } else {
            extent.0 as f32 / extent.1 as f32
        };
        Mat4::perspective_rh(self.fov_deg.to_radians(), aspect, self.near, self.far)
    }
}

impl Default for CameraComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for CameraComponent {}

/// A drawable mesh instance. Instances sharing `(mesh, material)` are
/// bucketed together for instanced drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StaticMesh {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

impl StaticMesh {
    #[must_use]
    pub fn new(mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self { mesh, material }
    }
}

impl Component for StaticMesh {}

/// Sun-style light; direction comes from the owner transform's forward axis.
#[derive(Clone, Copy, Debug)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
}

impl Component for DirectionalLight {}

/// Unlocated fill light.
#[derive(Clone, Copy, Debug)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

impl Component for AmbientLight {}

/// Cone light at the owner's position, aimed along its forward axis.
#[derive(Clone, Copy, Debug)]
pub struct SpotLight {
    pub color: Vec3,
    pub intensity: f32,
    /// Full cone angle, degrees.
    pub cone_deg: f32,
}

impl Component for SpotLight {}

/// Omnidirectional light at the owner's position.
#[derive(Clone, Copy, Debug)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
}

impl Component for PointLight {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Transform;

    #[test]
    fn test_camera_view_inverts_owner_world() {
        let owner = Transform::from_translation(Vec3::new(0.0, 0.0, 5.0));
        let camera = CameraComponent::new();
        let view = camera.view_matrix(owner.world_matrix());
        let eye = view.transform_point3(Vec3::new(0.0, 0.0, 5.0));
        assert!(eye.length() < 1e-5);
    }

    #[test]
    fn test_projection_degenerate_extent() {
        let camera = CameraComponent::new();
        let m = camera.projection_matrix((0, 0));
        assert!(m.to_cols_array().iter().all(|v| v.is_finite()));
    }
}
