//! Member persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the storage contract the service layer depends on.
//! - Isolate SQL details from hierarchy rules and tree derivation.
//!
//! # Invariants
//! - Write paths validate records before mutating storage.
//! - Listing is ordered by ascending id in every implementation, so derived
//!   trees are reproducible.
//! - Missing rows surface as `RepoError::NotFound`, not as empty success.

pub mod member_repo;
pub mod memory_repo;
