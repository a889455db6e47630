//! Core domain logic for the Kindred family tree.
//! This crate is the single source of truth for genealogy invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tree;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::member::{Member, MemberId, MemberValidationError, NewMember};
pub use repo::member_repo::{MemberRepository, RepoError, RepoResult, SqliteMemberRepository};
pub use repo::memory_repo::InMemoryMemberRepository;
pub use service::member_service::{
    MemberFilter, MemberService, MemberServiceError, ServiceResult,
};
pub use service::stats::{family_stats, parse_year, FamilyStats};
pub use tree::{
    build_tree, collect_descendants, find_node, find_relatives, ChildIndex, FamilyTreeNode,
    NodeAttributes, Relatives,
};

/// Minimal health-check API for integration smoke tests.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
