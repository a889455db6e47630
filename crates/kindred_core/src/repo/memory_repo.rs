//! In-memory member store.
//!
//! # Responsibility
//! - Provide a process-local `MemberRepository` for tests, demos and
//!   database-less runs.
//!
//! # Invariants
//! - The store is an explicit object; callers construct one and pass it by
//!   reference. There is no global instance.
//! - The id counter only moves forward; deleted ids are never handed out
//!   again. Once `MemberId::MAX` is taken, creation fails instead of
//!   wrapping.
//! - Parent and patriarch checks on single-row writes run under the same
//!   lock as the write. Bulk replace trusts the caller's batch validation.

use super::member_repo::{MemberRepository, RepoError, RepoResult};
use crate::model::member::{Member, MemberId, NewMember};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct MemoryState {
    members: BTreeMap<MemberId, Member>,
    /// `None` once the id space is exhausted.
    next_id: Option<MemberId>,
}

impl MemoryState {
    fn take_next_id(&mut self) -> RepoResult<MemberId> {
        let id = self.next_id.ok_or(RepoError::IdSpaceExhausted)?;
        self.next_id = id.checked_add(1);
        Ok(id)
    }

    fn advance_past(&mut self, id: MemberId) {
        if let Some(next) = self.next_id {
            if id >= next {
                self.next_id = id.checked_add(1);
            }
        }
    }

    fn check_hierarchy(&self, own_id: Option<MemberId>, member: &NewMember) -> RepoResult<()> {
        if let Some(parent_id) = member.parent_id {
            if !self.members.contains_key(&parent_id) {
                return Err(RepoError::MissingParent(parent_id));
            }
        }
        if member.is_patriarch {
            if let Some(existing) = self
                .members
                .values()
                .find(|stored| stored.is_patriarch && Some(stored.id) != own_id)
            {
                return Err(RepoError::PatriarchConflict(existing.id));
            }
        }
        Ok(())
    }
}

/// Mutex-guarded id → member map with a monotonic id counter.
#[derive(Debug)]
pub struct InMemoryMemberRepository {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryMemberRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMemberRepository {
    /// Creates an empty store whose first assigned id is 1.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                members: BTreeMap::new(),
                next_id: Some(1),
            }),
        }
    }

    /// Creates a store pre-populated with records that already carry ids.
    ///
    /// The counter starts after the highest seeded id.
    pub fn with_members(members: Vec<Member>) -> RepoResult<Self> {
        let store = Self::new();
        store.replace_all_members(&members)?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Every mutation completes before the guard drops, so a poisoned
        // state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemberRepository for InMemoryMemberRepository {
    fn list_members(&self) -> RepoResult<Vec<Member>> {
        Ok(self.lock().members.values().cloned().collect())
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        Ok(self.lock().members.get(&id).cloned())
    }

    fn list_by_generation(&self, generation: u32) -> RepoResult<Vec<Member>> {
        Ok(self
            .lock()
            .members
            .values()
            .filter(|member| member.generation == generation)
            .cloned()
            .collect())
    }

    fn list_by_branch(&self, branch: &str) -> RepoResult<Vec<Member>> {
        Ok(self
            .lock()
            .members
            .values()
            .filter(|member| member.branch.as_deref() == Some(branch))
            .cloned()
            .collect())
    }

    fn create_member(&self, member: &NewMember) -> RepoResult<Member> {
        member.validate()?;

        let mut state = self.lock();
        state.check_hierarchy(None, member)?;
        let id = state.take_next_id()?;

        let mut stored = Member::from_new(id, member.clone());
        stored.name = stored.name.trim().to_string();
        state.members.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_member(&self, id: MemberId, member: &NewMember) -> RepoResult<Member> {
        member.validate()?;

        let mut state = self.lock();
        if !state.members.contains_key(&id) {
            return Err(RepoError::NotFound(id));
        }
        state.check_hierarchy(Some(id), member)?;
        let slot = state.members.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        let mut updated = Member::from_new(id, member.clone());
        updated.name = updated.name.trim().to_string();
        *slot = updated.clone();
        Ok(updated)
    }

    fn delete_members(&self, ids: &[MemberId]) -> RepoResult<usize> {
        let mut state = self.lock();
        Ok(ids
            .iter()
            .filter(|id| state.members.remove(*id).is_some())
            .count())
    }

    fn replace_all_members(&self, members: &[Member]) -> RepoResult<usize> {
        for member in members {
            member.validate()?;
        }

        let mut state = self.lock();
        state.members.clear();
        for member in members {
            let mut stored = member.clone();
            stored.name = stored.name.trim().to_string();
            state.advance_past(stored.id);
            state.members.insert(stored.id, stored);
        }
        Ok(state.members.len())
    }
}
