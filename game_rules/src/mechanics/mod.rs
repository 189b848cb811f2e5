//! Game mechanics that mutate character and encounter state.
//!
//! - **survival**: bounded hunger/thirst/infection meters and action costs
//! - **combat_log**: the per-encounter ledger of rounds, actions, and highlights
//!
//! Both are pure over their inputs: no I/O, no narrative text generation
//! beyond short status lines.

mod combat_log;
mod survival;

pub use combat_log::*;
pub use survival::*;
