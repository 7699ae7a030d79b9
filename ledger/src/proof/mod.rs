//! Digests: canonical JSON and domain-separated SHA-256.
//!
//! Used for state digests and scenario reports. Nothing in the ledger's
//! execution path depends on this module.

pub mod canon;
pub mod hash;
pub mod hash_domain;
