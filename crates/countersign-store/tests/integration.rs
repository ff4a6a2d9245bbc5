use std::sync::Arc;

use countersign_canonical::UserId;
use countersign_core::{
    actions, generate, hash_secret, import_public, open, seal, Algorithm, AuditEntry, KdfParams,
};
use countersign_journal::AuditJournalReader;
use countersign_store::{
    ActionFilter, AndFilter, AuditReader, AuditSink, FileKeyStore, FilteredReader,
    JournalAuditSink, KeyRecord, KeyStore, MemoryAuditSink, MemoryKeyStore, ReadMode,
    StoreError, TimeRangeFilter, UserFilter, WriteOptions,
};
use tempfile::TempDir;

fn record(user: &str) -> KeyRecord {
    let params = KdfParams::insecure_for_tests();
    let pair = generate(Algorithm::Es256).unwrap();
    KeyRecord {
        user_id: UserId::parse(user).unwrap(),
        algorithm: pair.algorithm,
        public_key: pair.public.clone(),
        sealed_private_key: seal(&pair.private, b"pw", &params).unwrap(),
        secret_verifier: hash_secret(b"pw", &params).unwrap(),
        created_at_ms: 1_700_000_000_000,
    }
}

fn exercise_store(store: &dyn KeyStore) {
    let alice = UserId::parse("alice").unwrap();
    let bob = UserId::parse("bob").unwrap();
    assert!(store.public_key(&alice).unwrap().is_none());
    assert!(store.sealed_private_key(&alice).unwrap().is_none());

    let original = record("alice");
    store.insert(original.clone()).unwrap();

    let public = store.public_key(&alice).unwrap().unwrap();
    assert_eq!(import_public(&public).unwrap().to_jwk(), original.public_key);

    let material = store.sealed_private_key(&alice).unwrap().unwrap();
    assert_eq!(material.sealed, original.sealed_private_key);
    assert!(open(&material.sealed, b"pw").is_ok());

    assert!(matches!(
        store.insert(record("alice")),
        Err(StoreError::Exists(id)) if id == alice
    ));
    // The first record is untouched by the refused insert.
    assert_eq!(
        store.sealed_private_key(&alice).unwrap().unwrap().sealed,
        original.sealed_private_key
    );

    assert!(store.public_key(&bob).unwrap().is_none());
    assert!(store.remove(&alice).unwrap());
    assert!(!store.remove(&alice).unwrap());
    assert!(store.public_key(&alice).unwrap().is_none());
}

#[test]
fn memory_store_contract() {
    let store = MemoryKeyStore::new();
    exercise_store(&store);
    assert!(store.is_empty());
}

#[test]
fn file_store_contract() {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::open(dir.path().join("keys")).unwrap();
    exercise_store(&store);
}

#[test]
fn file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let alice = UserId::parse("alice").unwrap();
    let original = record("alice");
    FileKeyStore::open(dir.path()).unwrap().insert(original.clone()).unwrap();

    let reopened = FileKeyStore::open(dir.path()).unwrap();
    let material = reopened.sealed_private_key(&alice).unwrap().unwrap();
    assert_eq!(material.secret_verifier, original.secret_verifier);
}

#[test]
fn corrupt_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::open(dir.path()).unwrap();
    std::fs::write(dir.path().join("alice.json"), b"{ not json").unwrap();
    let alice = UserId::parse("alice").unwrap();
    assert!(matches!(
        store.public_key(&alice),
        Err(StoreError::Corrupt { .. })
    ));
}

#[test]
fn failed_insert_leaves_no_record() {
    let dir = TempDir::new().unwrap();
    let keys = dir.path().join("keys");
    let store = FileKeyStore::open(&keys).unwrap();
    std::fs::remove_dir(&keys).unwrap();

    assert!(matches!(store.insert(record("alice")), Err(StoreError::Io(_))));

    std::fs::create_dir(&keys).unwrap();
    let alice = UserId::parse("alice").unwrap();
    assert!(store.public_key(&alice).unwrap().is_none());
    store.insert(record("alice")).unwrap();
    assert!(store.public_key(&alice).unwrap().is_some());
}

#[test]
fn stray_staging_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::open(dir.path()).unwrap();
    // Debris of a write that died half way.
    std::fs::write(dir.path().join(".alice.json.tmp"), b"{ \"user_id\": ").unwrap();

    store.insert(record("alice")).unwrap();
    let alice = UserId::parse("alice").unwrap();
    assert!(store.public_key(&alice).unwrap().is_some());

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec![".alice.json.tmp", "alice.json"]);
}

#[test]
fn stores_work_behind_arc() {
    let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());
    store.insert(record("carol")).unwrap();
    let alice = UserId::parse("carol").unwrap();
    assert!(store.public_key(&alice).unwrap().is_some());
}

#[test]
fn journal_sink_and_filters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.csa");
    let sink = JournalAuditSink::open(&path, WriteOptions::default()).unwrap();

    let alice = UserId::parse("alice").unwrap();
    let bob = UserId::parse("bob").unwrap();
    let entries = [
        (Some(&alice), actions::PURCHASE_RECEIVED, 100),
        (Some(&alice), actions::SIGNATURE_INVALID, 110),
        (Some(&bob), actions::PURCHASE_RECEIVED, 120),
        (Some(&bob), actions::PURCHASE_SUCCESS, 130),
        (None, actions::PURCHASE_ATTEMPT_INVALID_DATA, 140),
    ];
    for (user, action, ts) in entries {
        sink.record(AuditEntry::new(action, "", ts).with_user(user.cloned()))
            .unwrap();
    }
    drop(sink);

    let reader = AuditJournalReader::open(&path, ReadMode::Strict).unwrap();
    let mut filtered = FilteredReader::new(reader, UserFilter { user_id: bob });
    let mut seen = Vec::new();
    while let Some(record) = filtered.read_next().unwrap() {
        seen.push(record.entry.action);
    }
    assert_eq!(seen, vec!["PURCHASE_RECEIVED", "PURCHASE_SUCCESS"]);

    let reader = AuditJournalReader::open(&path, ReadMode::Strict).unwrap();
    let filter = AndFilter {
        filters: vec![
            Box::new(ActionFilter {
                action: actions::PURCHASE_RECEIVED.into(),
            }),
            Box::new(TimeRangeFilter {
                after: Some(105),
                before: None,
            }),
        ],
    };
    let mut filtered = FilteredReader::new(reader, filter);
    let record = filtered.read_next().unwrap().unwrap();
    assert_eq!(record.seq, 2);
    assert!(filtered.read_next().unwrap().is_none());
}

#[test]
fn paired_sinks_both_receive_entries() {
    let a = MemoryAuditSink::new();
    let b = MemoryAuditSink::new();
    let both = (&a, &b);
    both.record(AuditEntry::new(actions::KEYS_PROVISIONED, "", 1))
        .unwrap();
    assert_eq!(a.actions(), vec!["KEYS_PROVISIONED"]);
    assert_eq!(b.actions(), vec!["KEYS_PROVISIONED"]);
}
