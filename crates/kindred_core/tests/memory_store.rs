use kindred_core::{
    InMemoryMemberRepository, Member, MemberId, MemberRepository, MemberService,
    MemberServiceError, NewMember, RepoResult,
};
use std::sync::{Barrier, Mutex};
use std::thread;

/// Records every batched delete so tests can assert it happens once.
struct RecordingRepository {
    inner: InMemoryMemberRepository,
    delete_calls: Mutex<Vec<Vec<MemberId>>>,
}

impl RecordingRepository {
    fn new(inner: InMemoryMemberRepository) -> Self {
        Self {
            inner,
            delete_calls: Mutex::new(Vec::new()),
        }
    }
}

impl MemberRepository for RecordingRepository {
    fn list_members(&self) -> RepoResult<Vec<Member>> {
        self.inner.list_members()
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        self.inner.get_member(id)
    }

    fn list_by_generation(&self, generation: u32) -> RepoResult<Vec<Member>> {
        self.inner.list_by_generation(generation)
    }

    fn list_by_branch(&self, branch: &str) -> RepoResult<Vec<Member>> {
        self.inner.list_by_branch(branch)
    }

    fn create_member(&self, member: &NewMember) -> RepoResult<Member> {
        self.inner.create_member(member)
    }

    fn update_member(&self, id: MemberId, member: &NewMember) -> RepoResult<Member> {
        self.inner.update_member(id, member)
    }

    fn delete_members(&self, ids: &[MemberId]) -> RepoResult<usize> {
        self.delete_calls.lock().unwrap().push(ids.to_vec());
        self.inner.delete_members(ids)
    }

    fn replace_all_members(&self, members: &[Member]) -> RepoResult<usize> {
        self.inner.replace_all_members(members)
    }
}

fn seeded_store() -> InMemoryMemberRepository {
    InMemoryMemberRepository::with_members(vec![
        Member::from_new(1, NewMember::patriarch("Onaga")),
        Member::from_new(2, NewMember::new("Otuomu", 2, Some(1))),
        Member::from_new(3, NewMember::new("Okoji", 2, Some(1))),
        Member::from_new(4, NewMember::new("Nwobu", 3, Some(3))),
        Member::from_new(5, NewMember::new("Nwachukwu", 4, Some(4))),
        Member::from_new(6, NewMember::new("Obi", 3, Some(2))),
    ])
    .unwrap()
}

#[test]
fn cascade_delete_issues_one_batched_call() {
    let repo = RecordingRepository::new(seeded_store());
    let service = MemberService::new(&repo);

    let removed = service.delete_member(3).unwrap();
    assert_eq!(removed, vec![3, 4, 5]);

    let calls = repo.delete_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], vec![3, 4, 5]);
    drop(calls);

    let remaining: Vec<_> = service
        .list_members()
        .unwrap()
        .iter()
        .map(|member| member.id)
        .collect();
    assert_eq!(remaining, vec![1, 2, 6]);
}

#[test]
fn services_share_one_store_by_reference() {
    let store = InMemoryMemberRepository::new();
    let writer = MemberService::new(&store);
    let reader = MemberService::new(&store);

    let root = writer.create_member(NewMember::patriarch("Onaga")).unwrap();
    writer
        .create_member(NewMember::new("Otuomu", 2, Some(root.id)))
        .unwrap();

    let tree = reader.family_tree().unwrap();
    assert_eq!(tree[0].id, root.id);
    assert_eq!(tree[0].size(), 2);
}

#[test]
fn ids_are_not_reused_after_cascade_delete() {
    let store = seeded_store();
    let service = MemberService::new(&store);

    service.delete_member(2).unwrap();
    let created = service
        .create_member(NewMember::new("Okafor", 2, Some(1)))
        .unwrap();
    assert_eq!(created.id, 7);
}

#[test]
fn service_checks_parents_even_without_foreign_keys() {
    let store = seeded_store();
    let service = MemberService::new(&store);

    let err = service
        .create_member(NewMember::new("Stray", 2, Some(99)))
        .unwrap_err();
    assert!(matches!(err, MemberServiceError::ParentNotFound(99)));
    assert_eq!(store.list_members().unwrap().len(), 6);
}

#[test]
fn relatives_and_tree_agree_on_memory_store() {
    let store = seeded_store();
    let service = MemberService::new(&store);

    let relatives = service.relatives_of(4).unwrap();
    assert_eq!(relatives.parents[0].id, 3);
    assert!(relatives.siblings.is_empty());
    assert_eq!(relatives.children[0].id, 5);

    let tree = service.family_tree().unwrap();
    let okoji = tree[0].find(3).unwrap();
    let child_ids: Vec<_> = okoji.children.iter().map(|node| node.id).collect();
    let relative_ids: Vec<_> = service
        .relatives_of(3)
        .unwrap()
        .children
        .iter()
        .map(|member| member.id)
        .collect();
    assert_eq!(child_ids, relative_ids);
}

#[test]
fn concurrent_services_keep_a_single_patriarch() {
    const WRITERS: usize = 6;
    let store = InMemoryMemberRepository::new();
    let barrier = Barrier::new(WRITERS);

    // Err(true) marks a rejection reported as a patriarch conflict.
    let outcomes: Vec<Result<MemberId, bool>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|n| {
                let store = &store;
                let barrier = &barrier;
                scope.spawn(move || {
                    let service = MemberService::new(store);
                    barrier.wait();
                    service
                        .create_member(NewMember::patriarch(format!("Founder {n}")))
                        .map(|member| member.id)
                        .map_err(|err| {
                            matches!(err, MemberServiceError::PatriarchAlreadyExists(_))
                        })
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.err())
        .all(|is_conflict| is_conflict));
    assert_eq!(MemberService::new(&store).family_tree().unwrap().len(), 1);
}

#[test]
fn import_at_highest_id_then_create_fails_cleanly() {
    let store = InMemoryMemberRepository::new();
    let service = MemberService::new(&store);

    let imported = service
        .import_members(vec![Member::from_new(
            MemberId::MAX,
            NewMember::patriarch("Onaga"),
        )])
        .unwrap();
    assert_eq!(imported, 1);

    let err = service
        .create_member(NewMember::new("Otuomu", 2, Some(MemberId::MAX)))
        .unwrap_err();
    assert!(matches!(
        err,
        MemberServiceError::Repo(kindred_core::RepoError::IdSpaceExhausted)
    ));
}
