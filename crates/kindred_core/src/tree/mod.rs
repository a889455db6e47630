//! Tree derivation over the flat member table.
//!
//! # Responsibility
//! - Rebuild the display tree rooted at the patriarch from parent pointers.
//! - Derive parent/sibling/child sets for one member.
//! - Compute descendant reachability for cascading deletes.
//!
//! # Invariants
//! - Every function here is pure and works on a caller-owned snapshot.
//! - Child order is the input order of the member slice.
//! - A member appears at most once in any derived structure, so cyclic
//!   parent pointers cannot cause unbounded recursion.

mod index;
mod node;
mod relatives;

pub use index::{collect_descendants, ChildIndex};
pub use node::{build_tree, find_node, FamilyTreeNode, NodeAttributes};
pub use relatives::{find_relatives, Relatives};
