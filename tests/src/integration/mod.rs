//! End-to-end scenarios against the engine API and the orchestrator.

pub mod adversarial;
pub mod call_chain;
pub mod fundme;
