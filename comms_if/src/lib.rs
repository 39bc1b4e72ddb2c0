//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Driver station telecommands
pub mod tc;

/// Interface definitions for equipment (like the vision coprocessor)
pub mod eqpt;

/// Network module
pub mod net;
