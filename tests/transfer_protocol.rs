use deckbucket::{
    card::{CardEntry, Stack},
    config::OrganizerConfig,
    core::{
        store::{Bucket, BucketStore, StoreError, StoreSnapshotV1},
        transfer::{Destination, TransferError, TransferOutcome, TransferRequest},
    },
    op::Gesture,
    persist::{self, RecordSlot, StateStore, memory::MemoryStateStore},
    session::{Effect, Organizer, Rejection},
    types::{CardStatus, OWNED_BUCKET_ID, UNOWNED_BUCKET_ID},
};

fn stack(id: &str, name: &str, owned: u32, unowned: u32, is_owned: bool) -> Stack {
    Stack {
        id: id.to_string(),
        name: name.to_string(),
        owned_count: owned,
        unowned_count: unowned,
        image_url: None,
        rarity: None,
        is_owned,
        price_usd: None,
    }
}

fn bucket(id: &str, cards: Vec<Stack>) -> Bucket {
    let mut b = Bucket::new(id, id);
    b.cards = cards;
    b
}

fn store_of(buckets: Vec<Bucket>) -> BucketStore {
    BucketStore::from_snapshot(StoreSnapshotV1 {
        buckets,
        next_bucket_seq: 1,
        next_split_seq: 1,
    })
    .expect("valid buckets")
}

/// Opens an organizer whose saved state is exactly `buckets`.
fn organizer_with(buckets: Vec<Bucket>) -> Organizer {
    let mut mem = MemoryStateStore::new();
    let payload = persist::encode_buckets(&store_of(buckets).export_snapshot()).expect("encode");
    mem.write("deck", RecordSlot::Buckets, &payload).expect("write");
    Organizer::open("deck", &[], Some(Box::new(mem)), OrganizerConfig::default())
}

fn ids(bucket: &Bucket) -> Vec<&str> {
    bucket.cards.iter().map(|s| s.id.as_str()).collect()
}

#[test]
fn dragging_selected_stacks_onto_same_name_merges_them() {
    let mut org = organizer_with(vec![
        bucket(OWNED_BUCKET_ID, vec![stack("A", "Gate", 1, 0, true)]),
        bucket(UNOWNED_BUCKET_ID, vec![stack("B", "Gate", 0, 2, false)]),
        bucket("bucket-1", vec![stack("T", "Gate", 0, 1, false)]),
    ]);
    assert!(org.toggle_selection("A").is_change());
    assert!(org.toggle_selection("B").is_change());

    let payload = org.drag_payload("A").expect("payload");
    assert_eq!(payload.ids, ["A".to_string(), "B".to_string()]);
    assert!(!payload.collapse_selection);

    let outcome = org.drop_payload(payload, Destination::Stack("T".to_string()));
    assert_eq!(
        outcome.effect,
        Effect::Transfer(TransferOutcome::Merged {
            target: "T".to_string(),
            absorbed: vec!["A".to_string(), "B".to_string()],
        })
    );

    let target = org.store().stack("T").expect("target");
    assert_eq!((target.owned_count, target.unowned_count), (1, 3));
    assert!(!org.store().contains_stack("A"));
    assert!(!org.store().contains_stack("B"));
    assert!(org.store().bucket(OWNED_BUCKET_ID).expect("owned").cards.is_empty());
    assert!(org.selection().is_empty(), "destroyed stacks leave the selection");
}

#[test]
fn merge_keeps_target_position_and_removes_sources_from_its_bucket() {
    let mut store = store_of(vec![
        bucket(
            OWNED_BUCKET_ID,
            vec![
                stack("x", "Gate", 1, 0, true),
                stack("other", "Wall", 1, 0, true),
                stack("t", "Gate", 2, 0, true),
                stack("tail", "Moat", 1, 0, true),
            ],
        ),
        bucket(UNOWNED_BUCKET_ID, vec![]),
    ]);

    let req = TransferRequest::new(["x"], Destination::Stack("t".to_string())).expect("request");
    store.transfer(&req).expect("merge");

    let owned = store.bucket(OWNED_BUCKET_ID).expect("owned");
    assert_eq!(ids(owned), ["other", "t", "tail"]);
    assert_eq!(owned.cards[1].owned_count, 3);
}

#[test]
fn different_names_degrade_to_a_move_into_the_target_bucket() {
    let mut store = store_of(vec![
        bucket(OWNED_BUCKET_ID, vec![stack("w", "Wall", 1, 0, true)]),
        bucket(UNOWNED_BUCKET_ID, vec![]),
        bucket("bucket-1", vec![stack("g", "Gate", 1, 0, true)]),
    ]);

    let req = TransferRequest::new(["w"], Destination::Stack("g".to_string())).expect("request");
    let outcome = store.transfer(&req).expect("move");

    assert_eq!(
        outcome,
        TransferOutcome::Moved {
            bucket: "bucket-1".to_string(),
            moved: vec!["w".to_string()],
        }
    );
    assert_eq!(ids(store.bucket("bucket-1").expect("bucket")), ["g", "w"]);
    assert_eq!(store.stack("g").map(|s| s.owned_count), Some(1));
}

#[test]
fn move_to_bucket_appends_and_skips_stacks_already_there() {
    let mut store = store_of(vec![
        bucket(OWNED_BUCKET_ID, vec![stack("a", "A", 1, 0, true), stack("b", "B", 1, 0, true)]),
        bucket(UNOWNED_BUCKET_ID, vec![stack("c", "C", 0, 1, false)]),
    ]);

    let req = TransferRequest::new(["c", "a"], Destination::Bucket(UNOWNED_BUCKET_ID.to_string()))
        .expect("request");
    let outcome = store.transfer(&req).expect("move");
    assert_eq!(
        outcome,
        TransferOutcome::Moved {
            bucket: UNOWNED_BUCKET_ID.to_string(),
            moved: vec!["a".to_string()],
        }
    );
    assert_eq!(ids(store.bucket(UNOWNED_BUCKET_ID).expect("unowned")), ["c", "a"]);

    // A repeated drop event changes nothing.
    assert_eq!(store.transfer(&req).expect("repeat"), TransferOutcome::Unchanged);
}

#[test]
fn stale_ids_reject_the_whole_batch() {
    let mut store = store_of(vec![
        bucket(OWNED_BUCKET_ID, vec![stack("a", "A", 1, 0, true)]),
        bucket(UNOWNED_BUCKET_ID, vec![]),
        bucket("bucket-1", vec![]),
    ]);
    let before = store.clone();

    let req = TransferRequest::new(["a", "gone"], Destination::Bucket("bucket-1".to_string()))
        .expect("request");
    assert_eq!(store.transfer(&req), Err(TransferError::StaleStack("gone".to_string())));
    assert_eq!(store, before);

    let req = TransferRequest::new(["a"], Destination::Bucket("bucket-9".to_string())).expect("request");
    assert_eq!(store.transfer(&req), Err(TransferError::StaleBucket("bucket-9".to_string())));

    let req = TransferRequest::new(["a"], Destination::Stack("gone".to_string())).expect("request");
    assert_eq!(store.transfer(&req), Err(TransferError::StaleStack("gone".to_string())));
    assert_eq!(store, before);
}

#[test]
fn malformed_drag_data_is_a_reported_no_op() {
    let entries = vec![CardEntry {
        name: "Gate".to_string(),
        required_quantity: 2,
        owned_quantity: 2,
        net_needed_quantity: 0,
        status: CardStatus::Complete,
        image_url: None,
        rarity: None,
        price_usd: None,
    }];
    let mut org = Organizer::open("deck", &entries, None, OrganizerConfig::default());
    let before = org.buckets().to_vec();

    let outcome = org.apply(Gesture::DropData {
        data: "not json".to_string(),
        destination: Destination::Bucket(UNOWNED_BUCKET_ID.to_string()),
    });
    assert!(matches!(
        outcome.rejected,
        Some(Rejection::Transfer(TransferError::Malformed(_)))
    ));
    assert!(!outcome.is_change());
    assert_eq!(org.buckets(), before.as_slice());

    let outcome = org.apply(Gesture::DropData {
        data: r#"["Gate-owned"]"#.to_string(),
        destination: Destination::Bucket(UNOWNED_BUCKET_ID.to_string()),
    });
    assert!(outcome.buckets_changed);
    assert_eq!(org.store().bucket_of("Gate-owned").map(|b| b.id.as_str()), Some(UNOWNED_BUCKET_ID));
}

#[test]
fn split_peels_one_copy_into_an_adjacent_stack() {
    let mut store = store_of(vec![
        bucket(
            OWNED_BUCKET_ID,
            vec![stack("Gate-owned", "Gate", 2, 0, true), stack("Wall-owned", "Wall", 1, 0, true)],
        ),
        bucket(UNOWNED_BUCKET_ID, vec![]),
    ]);

    let outcome = store.split("Gate-owned").expect("split");
    let TransferOutcome::Split { created, original_removed, .. } = outcome else {
        panic!("expected a split");
    };
    assert!(!original_removed);

    let owned = store.bucket(OWNED_BUCKET_ID).expect("owned");
    assert_eq!(ids(owned), ["Gate-owned", created.as_str(), "Wall-owned"]);
    assert_eq!((owned.cards[0].owned_count, owned.cards[0].unowned_count), (1, 0));
    assert_eq!((owned.cards[1].owned_count, owned.cards[1].unowned_count), (1, 0));
    assert_eq!(owned.cards[1].name, "Gate");
    assert!(owned.cards[1].is_owned);
}

#[test]
fn split_ids_never_collide() {
    let mut store = store_of(vec![
        bucket(
            OWNED_BUCKET_ID,
            vec![stack("a", "A", 5, 0, true), stack("a-split-1", "A", 1, 0, true)],
        ),
        bucket(UNOWNED_BUCKET_ID, vec![]),
    ]);

    let mut created = Vec::new();
    for _ in 0..3 {
        match store.split("a").expect("split") {
            TransferOutcome::Split { created: id, .. } => created.push(id),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(created, ["a-split-2", "a-split-3", "a-split-4"]);
    store.validate().expect("ids stay unique");
}

#[test]
fn singleton_split_is_a_no_op() {
    let mut store = store_of(vec![
        bucket(OWNED_BUCKET_ID, vec![stack("a", "A", 1, 0, true)]),
        bucket(UNOWNED_BUCKET_ID, vec![]),
    ]);
    let before = store.clone();
    assert_eq!(store.split("a"), Ok(TransferOutcome::Unchanged));
    assert_eq!(store, before);
}

#[test]
fn owned_stack_holding_only_unowned_copies_splits_from_unowned() {
    let mut store = store_of(vec![
        bucket(OWNED_BUCKET_ID, vec![stack("a", "A", 0, 2, true)]),
        bucket(UNOWNED_BUCKET_ID, vec![]),
    ]);
    store.split("a").expect("split");

    let owned = store.bucket(OWNED_BUCKET_ID).expect("owned");
    assert_eq!((owned.cards[0].owned_count, owned.cards[0].unowned_count), (0, 1));
    assert_eq!((owned.cards[1].owned_count, owned.cards[1].unowned_count), (0, 1));
}

#[test]
fn deleting_a_bucket_returns_stacks_home_by_partition() {
    let mut org = organizer_with(vec![
        bucket(OWNED_BUCKET_ID, vec![stack("o1", "A", 1, 0, true)]),
        bucket(UNOWNED_BUCKET_ID, vec![stack("u1", "B", 0, 1, false)]),
        bucket(
            "bucket-1",
            vec![stack("o2", "A", 2, 0, true), stack("u2", "B", 0, 3, false), stack("o3", "C", 1, 1, true)],
        ),
    ]);
    let total_before = org.store().total_cards();

    let outcome = org.delete_bucket("bucket-1");
    assert_eq!(
        outcome.effect,
        Effect::BucketDeleted {
            id: "bucket-1".to_string(),
            redistributed: 3,
        }
    );
    assert_eq!(org.buckets().len(), 2);
    assert_eq!(ids(org.store().bucket(OWNED_BUCKET_ID).expect("owned")), ["o1", "o2", "o3"]);
    assert_eq!(ids(org.store().bucket(UNOWNED_BUCKET_ID).expect("unowned")), ["u1", "u2"]);
    assert_eq!(org.store().total_cards(), total_before);
}

#[test]
fn reserved_buckets_cannot_be_deleted() {
    let mut org = organizer_with(vec![bucket(OWNED_BUCKET_ID, vec![]), bucket(UNOWNED_BUCKET_ID, vec![])]);

    for reserved in [OWNED_BUCKET_ID, UNOWNED_BUCKET_ID] {
        let outcome = org.delete_bucket(reserved);
        assert_eq!(
            outcome.rejected,
            Some(Rejection::Store(StoreError::ReservedBucket(reserved.to_string())))
        );
    }
    assert_eq!(org.buckets().len(), 2);
}

#[test]
fn created_buckets_append_and_rename_without_uniqueness() {
    let mut org = organizer_with(vec![bucket(OWNED_BUCKET_ID, vec![]), bucket(UNOWNED_BUCKET_ID, vec![])]);

    let Effect::BucketCreated(first) = org.create_bucket("Print").effect else {
        panic!("bucket not created");
    };
    let Effect::BucketCreated(second) = org.create_bucket("Print").effect else {
        panic!("bucket not created");
    };
    assert_ne!(first, second);
    assert_eq!(org.buckets().last().map(|b| b.id.as_str()), Some(second.as_str()));

    assert!(org.rename_bucket(OWNED_BUCKET_ID, "Print").is_change());
    let names: Vec<&str> = org.buckets().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["Print", UNOWNED_BUCKET_ID, "Print", "Print"]);

    let outcome = org.rename_bucket("bucket-77", "Nope");
    assert!(outcome.rejected.is_some());
}
