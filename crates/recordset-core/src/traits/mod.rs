//! Core traits for the record set controller
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ControlPlaneClient`]: Create, read, update and delete record sets on the remote DNS control plane

pub mod control_plane;

pub use control_plane::ControlPlaneClient;
