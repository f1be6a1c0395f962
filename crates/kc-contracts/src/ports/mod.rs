//! # Ports Layer (Middle Hexagon)
//!
//! - **Driving Ports (Inbound)**: `ContractEngineApi`
//! - **Driven Ports (Outbound)**: `SourceParser`, `RegistryStore`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
