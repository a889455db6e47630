//! Genealogy domain model.
//!
//! # Responsibility
//! - Define the canonical member record shared by storage and tree views.
//!
//! # Invariants
//! - Every member is identified by a stable positive `MemberId`.
//! - Hierarchy is expressed only through `parent_id`; derived views are never
//!   persisted.

pub mod member;
