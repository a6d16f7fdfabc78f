// # Control Plane Implementations
//
// This module provides in-process implementations of the ControlPlaneClient
// trait.

pub mod memory;

pub use memory::MemoryControlPlane;
