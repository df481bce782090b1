//! Extension contract, descriptors and directory.
//!
//! This module defines what an extension implements and how hosts declare
//! and order extensions. Discovery, sandboxing and scheduling stay with the
//! host.

pub mod contract;
pub mod descriptor;
pub mod directory;
