// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (anyone) → Protected (signed-in user) → Elevated (staff)
//
// Every tier reads the visitor from the `Session` extension set by
// `session_middleware`; protected and elevated handlers check it first.
pub mod public;
pub mod protected;
pub mod elevated;

pub mod utils;
