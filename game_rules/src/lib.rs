//! # Game Rules
//!
//! The rules crate for Ashfall: character and scene data, survival meters,
//! and the combat ledger. This crate is the single source of truth for game
//! state and contains no narrative-backend logic.

pub mod config;
pub mod entities;
pub mod error;
pub mod mechanics;
pub mod world_state;

pub use config::*;
pub use entities::*;
pub use error::*;
pub use mechanics::*;
pub use world_state::*;
