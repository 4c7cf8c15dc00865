//! Foundation types for VX_OS.
//!
//! This crate contains the platform-agnostic types shared by all VX_OS
//! crates: the error enum, configuration, the console line model, and
//! pointer input events.

pub mod config;
pub mod console;
pub mod error;
pub mod input;
