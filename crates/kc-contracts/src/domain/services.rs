//! # Domain Services
//!
//! Pure helper functions shared by the engine and the orchestrator.

use crate::domain::values::KEY_LENGTH;
use sha3::{Digest, Keccak256};

// =============================================================================
// CONTENT ADDRESSING
// =============================================================================

/// Keccak-256 digest.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Address of a contract: the hex encoding of the first 16 bytes of the
/// Keccak-256 digest of its source, which is [`KEY_LENGTH`] characters.
#[must_use]
pub fn contract_address(code: &[u8]) -> String {
    let digest = keccak256(code);
    hex::encode(&digest[..KEY_LENGTH / 2])
}

// =============================================================================
// TESTS
// =============================================================================
