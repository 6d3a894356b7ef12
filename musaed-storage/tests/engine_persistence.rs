use std::fs;
use std::sync::Arc;
use std::thread;

use musaed_core::{EngineConfig, Outcome, QuestionStore, ResolutionEngine, Tier};
use musaed_storage::Storage;

fn engine_over(storage: &Arc<Storage>) -> ResolutionEngine {
    ResolutionEngine::new(EngineConfig::default(), storage.clone(), storage.clone()).unwrap()
}

const MOLD: &str = "my ceiling has mold and a bad smell";

#[test]
fn learning_loop_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        let engine = engine_over(&storage);
        let reply = engine.respond("alice", "Alice", MOLD);
        assert!(matches!(reply.outcome, Outcome::NotFound { .. }));
        engine.answer_pending(MOLD, "Use an anti-fungal primer.").unwrap();
        engine.promote(MOLD).unwrap();
    }

    let storage = Arc::new(Storage::open(dir.path()).unwrap());
    assert!(storage.pending_questions().unwrap().is_empty());
    assert_eq!(storage.learned_answers().unwrap().len(), 1);

    let engine = engine_over(&storage);
    let reply = engine.respond("bob", "Bob", "bad smell and mold in my ceiling");
    assert_eq!(reply.outcome.tier(), Some(Tier::Learned));
    assert_eq!(reply.text, "Hey Bob, Use an anti-fungal primer.");

    // alice's unanswered question was logged before the restart
    let log = storage.recent_conversations(10).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].user_id, "alice");
    assert_eq!(log[1].user_id, "bob");
    assert_eq!(log[1].response, "Hey Bob, Use an anti-fungal primer.");
}

#[test]
fn concurrent_identical_questions_coalesce() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(Storage::open(dir.path()).unwrap());
    let engine = Arc::new(engine_over(&storage));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.resolve(&format!("user-{i}"), "Guest", MOLD))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(storage.pending_questions().unwrap().len(), 1);
    assert_eq!(storage.recent_conversations(100).unwrap().len(), 8);

    let reopened = Storage::open(dir.path()).unwrap();
    assert_eq!(reopened.pending_questions().unwrap().len(), 1);
}

#[test]
fn compaction_preserves_state() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(Storage::open(dir.path()).unwrap());
    let engine = engine_over(&storage);
    for message in [MOLD, "do you polish marble floors", "gypsum board thickness"] {
        engine.resolve("u", "Guest", message);
    }
    engine.answer_pending("gypsum board thickness", "12.5 mm").unwrap();
    engine.promote("gypsum board thickness").unwrap();
    engine.discard("do you polish marble floors").unwrap();
    engine.teach("warranty period", "One year.", false).unwrap();
    engine.teach("warranty period", "Two years.", false).unwrap();

    let written = storage.compact().unwrap();
    assert_eq!(written, 3);
    let wal = fs::read_to_string(dir.path().join("questions.wal.jsonl")).unwrap();
    assert_eq!(wal.lines().count(), 3);

    let reopened = Storage::open(dir.path()).unwrap();
    let learned = reopened.learned_answers().unwrap();
    assert_eq!(learned.len(), 2);
    assert!(learned.iter().any(|a| a.answer == "Two years."));
    let pending = reopened.pending_questions().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].question, MOLD);
}

#[test]
fn backup_copies_data_files() {
    let data = tempfile::tempdir().unwrap();
    let backups = tempfile::tempdir().unwrap();
    let storage = Arc::new(Storage::open(data.path()).unwrap());
    let engine = engine_over(&storage);
    engine.resolve("u", "Guest", MOLD);

    let first = storage.backup(backups.path()).unwrap();
    let second = storage.backup(backups.path()).unwrap();
    assert_ne!(first, second);
    assert!(first
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("backup_")));

    let restored = Storage::open(&first).unwrap();
    assert_eq!(restored.pending_questions().unwrap().len(), 1);
    assert_eq!(restored.recent_conversations(10).unwrap().len(), 1);
}
