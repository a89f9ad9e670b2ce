//! Synchronization primitives shared between simulation and render sides.

pub(crate) mod double_buffer;

pub use double_buffer::DoubleBuffer;
