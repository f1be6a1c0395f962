//! # Contract Engine Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Contract trees and service harness
//! └── integration/      # End-to-end scenarios
//!     ├── fundme.rs     # Crowdfunding contract with refunds
//!     ├── call_chain.rs # Multi-hop calls and rollback
//!     ├── structs.rs    # Struct identity and updates
//!     └── adversarial.rs# Gas exhaustion and hostile inputs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p kc-tests
//! cargo test -p kc-tests integration::call_chain::
//! cargo bench -p kc-tests
//! ```

#![allow(unused_variables)]
#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
