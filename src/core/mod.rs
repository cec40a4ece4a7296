//! Core domain models for edaflow
//!
//! This module defines the fundamental data structures shared by every tool
//! flow: configuration settings, steps, the script buffer, checkpoint
//! collaborators, and run state.

pub mod checkpoint;
pub mod config;
pub mod script;
pub mod state;
pub mod step;

pub use checkpoint::*;
pub use config::*;
pub use script::*;
pub use state::*;
pub use step::*;
