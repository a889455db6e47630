//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and tree derivation into use-case APIs.
//! - Keep CLI and other presentation layers decoupled from storage details.

pub mod member_service;
pub mod stats;
