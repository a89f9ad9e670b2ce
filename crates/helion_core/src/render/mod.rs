//! Render-facing data: describable components and the per-frame snapshot
//! handed to whatever renderer consumes it. No GPU code lives here.

pub(crate) mod components;
pub(crate) mod frame_data;

pub use components::{
    AmbientLight, CameraComponent, DirectionalLight, MaterialHandle, MeshHandle, PointLight,
    SpotLight, StaticMesh,
};
pub use frame_data::{
    CameraBlock, FrameData, FrameDataBuffers, InstanceKey, PackedAmbientLight,
    PackedDirectionalLight, PackedPointLight, PackedSpotLight,
};
