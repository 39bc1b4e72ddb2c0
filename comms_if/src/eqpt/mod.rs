//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with equipment servers/clients.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod vision;
