//! # Narrative Core
//!
//! Everything between a resolved player action and the narrative backend.
//! This crate reads the state owned by `game_rules`, assembles the backend
//! request, validates the reply, and substitutes a canned reply when the
//! backend cannot be used.
//!
//! ## Core Components
//!
//! - **context_assembler**: Builds the system instruction and per-turn context
//! - **response**: The structured reply contract and JSON extraction
//! - **fallback**: Keyword-classified offline replies
//! - **keywords**: Ordered keyword rule tables shared by the classifiers
//! - **resolver**: Runs one turn end to end behind the `NarrativeBackend` trait
//!
//! ## Design Philosophy
//!
//! - **Mechanics first**: stat costs and combat records land before the context is built
//! - **Never fatal**: every backend failure degrades to a narratable reply
//! - **Rules as data**: classification precedence is the order of a table

pub mod config;
pub mod context_assembler;
pub mod error;
pub mod fallback;
pub mod keywords;
pub mod resolver;
pub mod response;

pub use config::*;
pub use context_assembler::*;
pub use error::*;
pub use fallback::*;
pub use resolver::*;
pub use response::*;
