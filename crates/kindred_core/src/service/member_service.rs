//! Family member use-case service.
//!
//! # Responsibility
//! - Enforce hierarchy invariants above the repository layer.
//! - Expose CRUD, cascading delete, tree and relative lookups, directory
//!   filtering, statistics and bulk import.
//!
//! # Invariants
//! - At most one stored member is flagged as patriarch.
//! - A stored `parent_id` always names an existing member.
//! - Re-parenting never makes a member its own ancestor.
//!
//! Patriarch and parent checks are repeated by the repository inside its
//! write lock or transaction, so they hold under concurrent writers. The
//! ancestor-cycle check reads the whole member set first and assumes a
//! single writer re-parents at a time.
//! - Deleting a member deletes its whole subtree in one repository call.

use crate::model::member::{Member, MemberId, MemberValidationError, NewMember};
use crate::repo::member_repo::{MemberRepository, RepoError};
use crate::service::stats::{family_stats, FamilyStats};
use crate::tree::{build_tree, collect_descendants, find_relatives, FamilyTreeNode, Relatives};
use log::{debug, info};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from member service operations.
#[derive(Debug)]
pub enum MemberServiceError {
    /// Input failed field-level validation.
    Validation(MemberValidationError),
    /// Target member does not exist.
    MemberNotFound(MemberId),
    /// Referenced parent does not exist.
    ParentNotFound(MemberId),
    /// Another member already holds the patriarch flag.
    PatriarchAlreadyExists(MemberId),
    /// Parent assignment would make the member its own ancestor.
    CycleDetected {
        member_id: MemberId,
        parent_id: MemberId,
    },
    /// Import batch contains the same id twice.
    DuplicateMemberId(MemberId),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for MemberServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::MemberNotFound(id) => write!(f, "family member not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent member not found: {id}"),
            Self::PatriarchAlreadyExists(id) => {
                write!(f, "member {id} is already the patriarch")
            }
            Self::CycleDetected {
                member_id,
                parent_id,
            } => write!(
                f,
                "parent {parent_id} would make member {member_id} its own ancestor"
            ),
            Self::DuplicateMemberId(id) => write!(f, "duplicate member id in import: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MemberServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MemberServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::MemberNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::PatriarchConflict(id) => Self::PatriarchAlreadyExists(id),
            RepoError::MissingParent(id) => Self::ParentNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<MemberValidationError> for MemberServiceError {
    fn from(value: MemberValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ServiceResult<T> = Result<T, MemberServiceError>;

/// Directory filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberFilter {
    pub generation: Option<u32>,
    pub branch: Option<String>,
    /// Case-insensitive substring of the member name.
    pub name_query: Option<String>,
}

/// Family member service facade.
pub struct MemberService<R: MemberRepository> {
    repo: R,
}

impl<R: MemberRepository> MemberService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists every member by ascending id.
    pub fn list_members(&self) -> ServiceResult<Vec<Member>> {
        self.repo.list_members().map_err(Into::into)
    }

    /// Loads one member.
    pub fn get_member(&self, id: MemberId) -> ServiceResult<Option<Member>> {
        self.repo.get_member(id).map_err(Into::into)
    }

    pub fn list_by_generation(&self, generation: u32) -> ServiceResult<Vec<Member>> {
        self.repo.list_by_generation(generation).map_err(Into::into)
    }

    pub fn list_by_branch(&self, branch: &str) -> ServiceResult<Vec<Member>> {
        self.repo.list_by_branch(branch).map_err(Into::into)
    }

    /// Lists members matching every set field of `filter`.
    pub fn search_members(&self, filter: &MemberFilter) -> ServiceResult<Vec<Member>> {
        let candidates = match filter.generation {
            Some(generation) => self.repo.list_by_generation(generation)?,
            None => self.repo.list_members()?,
        };
        let needle = filter
            .name_query
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);

        Ok(candidates
            .into_iter()
            .filter(|member| match filter.branch.as_deref() {
                Some(branch) => member.branch.as_deref() == Some(branch),
                None => true,
            })
            .filter(|member| match needle.as_deref() {
                Some(needle) => member.name.to_lowercase().contains(needle),
                None => true,
            })
            .collect())
    }

    /// Creates one member under an existing parent (or as a root).
    pub fn create_member(&self, member: NewMember) -> ServiceResult<Member> {
        let member = normalize(member)?;
        if let Some(parent_id) = member.parent_id {
            self.ensure_member_exists(parent_id, MemberServiceError::ParentNotFound)?;
        }
        if member.is_patriarch {
            self.ensure_no_other_patriarch(None)?;
        }

        let created = self.repo.create_member(&member)?;
        info!(
            "event=member_create module=service status=ok member_id={} generation={} has_parent={}",
            created.id,
            created.generation,
            created.parent_id.is_some()
        );
        Ok(created)
    }

    /// Replaces every field of an existing member.
    pub fn update_member(&self, id: MemberId, member: NewMember) -> ServiceResult<Member> {
        let member = normalize(member)?;
        self.ensure_member_exists(id, MemberServiceError::MemberNotFound)?;

        if let Some(parent_id) = member.parent_id {
            if parent_id == id {
                return Err(MemberServiceError::CycleDetected {
                    member_id: id,
                    parent_id,
                });
            }
            self.ensure_member_exists(parent_id, MemberServiceError::ParentNotFound)?;

            let members = self.repo.list_members()?;
            if collect_descendants(id, &members).contains(&parent_id) {
                return Err(MemberServiceError::CycleDetected {
                    member_id: id,
                    parent_id,
                });
            }
        }
        if member.is_patriarch {
            self.ensure_no_other_patriarch(Some(id))?;
        }

        let updated = self.repo.update_member(id, &member)?;
        info!("event=member_update module=service status=ok member_id={id}");
        Ok(updated)
    }

    /// Deletes a member together with every descendant.
    ///
    /// Returns deleted ids, the target first, in preorder.
    pub fn delete_member(&self, id: MemberId) -> ServiceResult<Vec<MemberId>> {
        let members = self.repo.list_members()?;
        if !members.iter().any(|member| member.id == id) {
            return Err(MemberServiceError::MemberNotFound(id));
        }

        let doomed = collect_descendants(id, &members);
        let removed = self.repo.delete_members(&doomed)?;
        info!(
            "event=member_delete module=service status=ok member_id={id} removed={removed}"
        );
        Ok(doomed)
    }

    /// Builds the display tree from the current member set.
    ///
    /// An empty vec means no patriarch is stored.
    pub fn family_tree(&self) -> ServiceResult<Vec<FamilyTreeNode>> {
        let started_at = Instant::now();
        let members = self.repo.list_members()?;
        let tree = build_tree(&members);
        let placed = tree.iter().map(FamilyTreeNode::size).sum::<usize>();
        debug!(
            "event=tree_build module=service status=ok members={} placed={} unreachable={} duration_ms={}",
            members.len(),
            placed,
            members.len().saturating_sub(placed),
            started_at.elapsed().as_millis()
        );
        Ok(tree)
    }

    /// Parent, siblings and children of a stored member.
    pub fn relatives_of(&self, id: MemberId) -> ServiceResult<Relatives> {
        let members = self.repo.list_members()?;
        let member = members
            .iter()
            .find(|member| member.id == id)
            .ok_or(MemberServiceError::MemberNotFound(id))?;
        Ok(find_relatives(member, &members))
    }

    /// Summary statistics over the current member set.
    pub fn stats(&self) -> ServiceResult<FamilyStats> {
        let members = self.repo.list_members()?;
        Ok(family_stats(&members))
    }

    /// Replaces the whole member set with `members`, keeping their ids.
    ///
    /// The batch must be self-contained: unique ids, at most one patriarch,
    /// every parent inside the batch and no ancestor cycles.
    pub fn import_members(&self, members: Vec<Member>) -> ServiceResult<usize> {
        let mut ids = HashSet::with_capacity(members.len());
        let mut patriarch: Option<MemberId> = None;
        for member in &members {
            member.validate()?;
            if !ids.insert(member.id) {
                return Err(MemberServiceError::DuplicateMemberId(member.id));
            }
            if member.is_patriarch {
                if let Some(existing) = patriarch {
                    return Err(MemberServiceError::PatriarchAlreadyExists(existing));
                }
                patriarch = Some(member.id);
            }
        }

        for member in &members {
            if let Some(parent_id) = member.parent_id {
                if !ids.contains(&parent_id) {
                    return Err(MemberServiceError::ParentNotFound(parent_id));
                }
            }
        }
        ensure_acyclic(&members)?;

        let imported = self.repo.replace_all_members(&members)?;
        info!(
            "event=members_import module=service status=ok imported={imported} has_patriarch={}",
            patriarch.is_some()
        );
        Ok(imported)
    }

    fn ensure_member_exists(
        &self,
        id: MemberId,
        missing: fn(MemberId) -> MemberServiceError,
    ) -> ServiceResult<()> {
        match self.repo.get_member(id)? {
            Some(_) => Ok(()),
            None => Err(missing(id)),
        }
    }

    fn ensure_no_other_patriarch(&self, allowed: Option<MemberId>) -> ServiceResult<()> {
        let members = self.repo.list_members()?;
        match members
            .iter()
            .find(|member| member.is_patriarch && Some(member.id) != allowed)
        {
            Some(existing) => Err(MemberServiceError::PatriarchAlreadyExists(existing.id)),
            None => Ok(()),
        }
    }
}

fn normalize(mut member: NewMember) -> ServiceResult<NewMember> {
    member.name = member.name.trim().to_string();
    member.validate()?;
    Ok(member)
}

// With every parent present, a member is on a cycle exactly when no root
// reaches it.
fn ensure_acyclic(members: &[Member]) -> ServiceResult<()> {
    let mut reached = HashSet::with_capacity(members.len());
    for root in members.iter().filter(|member| member.parent_id.is_none()) {
        reached.extend(collect_descendants(root.id, members));
    }

    match members.iter().find(|member| !reached.contains(&member.id)) {
        Some(member) => Err(MemberServiceError::CycleDetected {
            member_id: member.id,
            parent_id: member.parent_id.unwrap_or(member.id),
        }),
        None => Ok(()),
    }
}
