//! File-backed persistence for the assistant.
//!
//! Layout under the data root:
//! - `questions.wal.jsonl`: write-ahead log of learned/pending operations,
//!   replayed into memory on open
//! - `conversations.jsonl`: append-only conversation log
//!
//! Every write is appended and flushed to the log before it becomes visible
//! in memory.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use musaed_core::{
    ConversationLog, ConversationRecord, LearnedAnswer, PendingQuestion, QuestionCatalog,
    QuestionStore, StoreError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const WAL_FILE: &str = "questions.wal.jsonl";
const CONVERSATIONS_FILE: &str = "conversations.jsonl";
const COMPACT_SUFFIX: &str = "compact";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("storage lock poisoned")]
    Poisoned,
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Store(inner) => inner,
            StorageError::Poisoned => StoreError::Unavailable(err.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WalOp {
    PutLearned(LearnedAnswer),
    PutPending(PendingQuestion),
    RemovePending(String),
    /// Learned answer written directly by an operator.
    Teach(LearnedAnswer),
    /// Learned answer taken from a pending row; removes the row on replay.
    Promote(LearnedAnswer),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalEntry {
    pub op: WalOp,
}

fn apply(catalog: &mut QuestionCatalog, op: WalOp) {
    match op {
        WalOp::PutLearned(answer) => catalog.put_learned(answer),
        WalOp::PutPending(row) => catalog.put_pending(row),
        WalOp::RemovePending(question) => {
            catalog.remove_pending(&question);
        }
        WalOp::Teach(answer) | WalOp::Promote(answer) => catalog.teach(answer),
    }
}

#[derive(Debug)]
pub struct Storage {
    root: PathBuf,
    catalog: RwLock<QuestionCatalog>,
    conversations: Mutex<()>,
}

impl Storage {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let catalog = Self::replay_wal(&root.join(WAL_FILE))?;
        let storage = Self {
            root,
            catalog: RwLock::new(catalog),
            conversations: Mutex::new(()),
        };
        if let Ok(catalog) = storage.catalog.read() {
            info!(
                root = %storage.root.display(),
                learned = catalog.learned_count(),
                pending = catalog.pending_count(),
                "storage opened"
            );
            record_catalog_metrics(&catalog);
        }
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn wal_path(&self) -> PathBuf {
        self.root.join(WAL_FILE)
    }

    fn conversations_path(&self) -> PathBuf {
        self.root.join(CONVERSATIONS_FILE)
    }

    /// Rebuild the catalog from the log. A torn final entry is cut off and
    /// a missing final newline restored, so later appends start on a fresh
    /// line.
    fn replay_wal(wal_path: &Path) -> Result<QuestionCatalog, StorageError> {
        let mut catalog = QuestionCatalog::new();
        if !wal_path.exists() {
            return Ok(catalog);
        }
        let mut reader = BufReader::new(File::open(wal_path)?);
        let mut line = Vec::new();
        let mut good_len = 0u64;
        let mut replayed = 0usize;
        let mut torn = false;
        let mut unterminated = false;
        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            let at_end = reader.fill_buf()?.is_empty();
            if line.iter().all(u8::is_ascii_whitespace) {
                good_len += read as u64;
                continue;
            }
            match serde_json::from_slice::<WalEntry>(&line) {
                Ok(entry) => {
                    apply(&mut catalog, entry.op);
                    replayed += 1;
                    good_len += read as u64;
                    unterminated = !line.ends_with(b"\n");
                }
                // a crash mid-append leaves a torn final line
                Err(err) if at_end => {
                    warn!(error = %err, offset = good_len, "truncating torn last wal entry");
                    torn = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
        drop(reader);

        if torn {
            let file = OpenOptions::new().write(true).open(wal_path)?;
            file.set_len(good_len)?;
            file.sync_all()?;
        } else if unterminated {
            let mut file = OpenOptions::new().append(true).open(wal_path)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        debug!(entries = replayed, "wal replayed");
        Ok(catalog)
    }

    fn append_wal(&self, entry: &WalEntry) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.wal_path())?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        counter!("musaed_wal_appends_total").increment(1);
        Ok(())
    }

    fn write_catalog(&self) -> Result<RwLockWriteGuard<'_, QuestionCatalog>, StorageError> {
        self.catalog.write().map_err(|_| StorageError::Poisoned)
    }

    /// Log `op`, then apply it. Callers hold the write guard so log order
    /// matches apply order.
    fn commit(&self, catalog: &mut QuestionCatalog, op: WalOp) -> Result<(), StorageError> {
        let entry = WalEntry { op };
        self.append_wal(&entry)?;
        apply(catalog, entry.op);
        record_catalog_metrics(catalog);
        Ok(())
    }

    pub fn learned_count(&self) -> Result<usize, StorageError> {
        let catalog = self.catalog.read().map_err(|_| StorageError::Poisoned)?;
        Ok(catalog.learned_count())
    }

    pub fn pending_count(&self) -> Result<usize, StorageError> {
        let catalog = self.catalog.read().map_err(|_| StorageError::Poisoned)?;
        Ok(catalog.pending_count())
    }

    /// Rewrite the write-ahead log as the minimal set of entries that
    /// rebuilds the current state. Returns the number of entries written.
    pub fn compact(&self) -> Result<usize, StorageError> {
        let catalog = self.write_catalog()?;
        let tmp_path = self.wal_path().with_extension(COMPACT_SUFFIX);
        let mut written = 0usize;
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            let entries = catalog
                .learned()
                .cloned()
                .map(WalOp::PutLearned)
                .chain(catalog.pending().cloned().map(WalOp::PutPending));
            for op in entries {
                serde_json::to_writer(&mut writer, &WalEntry { op })?;
                writer.write_all(b"\n")?;
                written += 1;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, self.wal_path())?;
        info!(entries = written, "wal compacted");
        Ok(written)
    }

    /// Copy the data directory into `dir/backup_<timestamp>/`. Writers are
    /// held off for the duration of the copy.
    pub fn backup(&self, dir: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let dir = dir.canonicalize()?;
        let root = self.root.canonicalize()?;
        if dir.starts_with(&root) {
            return Err(StorageError::InvalidPath(format!(
                "backup directory {} is inside the data directory",
                dir.display()
            )));
        }

        let _catalog = self.write_catalog()?;
        let _conversations = self.conversations.lock().map_err(|_| StorageError::Poisoned)?;

        let target = unique_backup_dir(&dir, Utc::now());
        copy_dir_recursively(&root, &target)?;
        info!(target = %target.display(), "backup created");
        Ok(target)
    }

    /// The last `limit` conversation records, oldest first.
    pub fn recent_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, StorageError> {
        let mut records = self.read_conversations(|_| true)?;
        let skip = records.len().saturating_sub(limit);
        Ok(records.split_off(skip))
    }

    pub fn conversations_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, StorageError> {
        let mut records = self.read_conversations(|record| record.user_id == user_id)?;
        let skip = records.len().saturating_sub(limit);
        Ok(records.split_off(skip))
    }

    fn read_conversations(
        &self,
        keep: impl Fn(&ConversationRecord) -> bool,
    ) -> Result<Vec<ConversationRecord>, StorageError> {
        let _guard = self.conversations.lock().map_err(|_| StorageError::Poisoned)?;
        let path = self.conversations_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ConversationRecord>(&line) {
                Ok(record) if keep(&record) => records.push(record),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "skipping unreadable conversation record"),
            }
        }
        Ok(records)
    }

    fn append_conversation(&self, record: &ConversationRecord) -> Result<(), StorageError> {
        let _guard = self.conversations.lock().map_err(|_| StorageError::Poisoned)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.conversations_path())?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        counter!("musaed_conversations_logged_total").increment(1);
        Ok(())
    }
}

fn record_catalog_metrics(catalog: &QuestionCatalog) {
    gauge!("musaed_learned_answers").set(catalog.learned_count() as f64);
    gauge!("musaed_pending_questions").set(catalog.pending_count() as f64);
}

fn unique_backup_dir(dir: &Path, at: DateTime<Utc>) -> PathBuf {
    let stamp = at.format("%Y%m%d_%H%M%S");
    let base = dir.join(format!("backup_{stamp}"));
    if !base.exists() {
        return base;
    }
    (1..)
        .map(|n| dir.join(format!("backup_{stamp}_{n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}

fn copy_dir_recursively(src: &Path, dst: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| StorageError::InvalidPath(e.to_string()))?;
        let dest_path = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry.path().extension().is_some_and(|ext| ext == COMPACT_SUFFIX) {
            continue;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest_path)?;
        }
    }
    Ok(())
}

impl QuestionStore for Storage {
    fn learned_answers(&self) -> Result<Vec<LearnedAnswer>, StoreError> {
        let catalog = self.catalog.read().map_err(|_| StorageError::Poisoned)?;
        Ok(catalog.learned().cloned().collect())
    }

    fn pending_questions(&self) -> Result<Vec<PendingQuestion>, StoreError> {
        let catalog = self.catalog.read().map_err(|_| StorageError::Poisoned)?;
        Ok(catalog.pending().cloned().collect())
    }

    fn upsert_pending(
        &self,
        question: &str,
        original: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PendingQuestion, StoreError> {
        let mut catalog = self.write_catalog()?;
        let row = catalog.refreshed_pending(question, original, user_id, at);
        self.commit(&mut catalog, WalOp::PutPending(row.clone()))?;
        Ok(row)
    }

    fn answer_pending(&self, question: &str, answer: &str) -> Result<PendingQuestion, StoreError> {
        let mut catalog = self.write_catalog()?;
        let row = catalog.answered_pending(question, answer)?;
        self.commit(&mut catalog, WalOp::PutPending(row.clone()))?;
        Ok(row)
    }

    fn promote_pending(
        &self,
        question: &str,
        at: DateTime<Utc>,
    ) -> Result<LearnedAnswer, StoreError> {
        let mut catalog = self.write_catalog()?;
        let learned = catalog.promotion(question, at)?;
        self.commit(&mut catalog, WalOp::Promote(learned.clone()))?;
        Ok(learned)
    }

    fn teach(&self, answer: LearnedAnswer) -> Result<(), StoreError> {
        let mut catalog = self.write_catalog()?;
        self.commit(&mut catalog, WalOp::Teach(answer))?;
        Ok(())
    }

    fn remove_pending(&self, question: &str) -> Result<bool, StoreError> {
        let mut catalog = self.write_catalog()?;
        if catalog.pending_question(question).is_none() {
            return Ok(false);
        }
        self.commit(&mut catalog, WalOp::RemovePending(question.to_string()))?;
        Ok(true)
    }
}

impl ConversationLog for Storage {
    fn append(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        Ok(self.append_conversation(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, message: &str) -> ConversationRecord {
        ConversationRecord {
            user_id: user.into(),
            user_name: "Guest".into(),
            message: message.into(),
            response: "ok".into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn wal_replay_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        {
            let storage = Storage::open(dir.path()).unwrap();
            storage.upsert_pending("marble polishing", "Marble polishing?", "alice", now).unwrap();
            storage.upsert_pending("gypsum board", "gypsum board", "bob", now).unwrap();
            storage.answer_pending("marble polishing", "Yes.").unwrap();
            storage.remove_pending("gypsum board").unwrap();
        }

        let storage = Storage::open(dir.path()).unwrap();
        let pending = storage.pending_questions().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].question, "marble polishing");
        assert_eq!(pending[0].original, "Marble polishing?");
        assert_eq!(pending[0].admin_response.as_deref(), Some("Yes."));
    }

    #[test]
    fn promotion_is_a_single_log_line() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        storage.upsert_pending("q", "Q", "u", Utc::now()).unwrap();
        storage.answer_pending("q", "a").unwrap();
        let before = fs::read_to_string(dir.path().join(WAL_FILE)).unwrap().lines().count();

        storage.promote_pending("q", Utc::now()).unwrap();
        let content = fs::read_to_string(dir.path().join(WAL_FILE)).unwrap();
        assert_eq!(content.lines().count(), before + 1);
        let last: WalEntry = serde_json::from_str(content.lines().last().unwrap()).unwrap();
        assert!(matches!(last.op, WalOp::Promote(_)));
    }

    #[test]
    fn failed_write_leaves_no_log_entry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let err = storage.promote_pending("missing", Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!storage.remove_pending("missing").unwrap());
        assert!(!dir.path().join(WAL_FILE).exists());
    }

    #[test]
    fn torn_last_line_is_cut_before_new_writes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Storage::open(dir.path()).unwrap();
            storage.upsert_pending("q", "Q", "u", Utc::now()).unwrap();
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(WAL_FILE))
            .unwrap();
        write!(file, "{{\"op\":{{\"PutPend").unwrap();
        drop(file);

        {
            let storage = Storage::open(dir.path()).unwrap();
            assert_eq!(storage.pending_count().unwrap(), 1);
            storage.upsert_pending("a", "A", "u", Utc::now()).unwrap();
            storage.upsert_pending("b", "B", "u", Utc::now()).unwrap();
        }

        let storage = Storage::open(dir.path()).unwrap();
        assert_eq!(storage.pending_count().unwrap(), 3);
        let wal = fs::read_to_string(dir.path().join(WAL_FILE)).unwrap();
        assert_eq!(wal.lines().count(), 3);
    }

    #[test]
    fn torn_multibyte_tail_is_cut() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Storage::open(dir.path()).unwrap();
            storage.upsert_pending("سعر", "سعر", "u", Utc::now()).unwrap();
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(WAL_FILE))
            .unwrap();
        // first byte of a two-byte arabic letter
        file.write_all(b"{\"op\":{\"RemovePending\":\"\xd8").unwrap();
        drop(file);

        {
            let storage = Storage::open(dir.path()).unwrap();
            storage.upsert_pending("مكان", "مكان", "u", Utc::now()).unwrap();
        }
        let storage = Storage::open(dir.path()).unwrap();
        assert_eq!(storage.pending_count().unwrap(), 2);
    }

    #[test]
    fn unterminated_last_entry_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Storage::open(dir.path()).unwrap();
            storage.upsert_pending("q", "Q", "u", Utc::now()).unwrap();
        }
        let path = dir.path().join(WAL_FILE);
        let wal = fs::read_to_string(&path).unwrap();
        fs::write(&path, wal.trim_end()).unwrap();

        {
            let storage = Storage::open(dir.path()).unwrap();
            assert_eq!(storage.pending_count().unwrap(), 1);
            storage.remove_pending("q").unwrap();
        }
        let storage = Storage::open(dir.path()).unwrap();
        assert_eq!(storage.pending_count().unwrap(), 0);
    }

    #[test]
    fn corrupt_middle_line_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(WAL_FILE), "garbage\n{\"op\":{\"RemovePending\":\"q\"}}\n")
            .unwrap();
        assert!(matches!(
            Storage::open(dir.path()),
            Err(StorageError::Serde(_))
        ));
    }

    #[test]
    fn conversation_reads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        for (user, message) in [("a", "one"), ("b", "two"), ("a", "three"), ("a", "four")] {
            storage.append(&record(user, message)).unwrap();
        }

        let recent = storage.recent_conversations(2).unwrap();
        let messages: Vec<_> = recent.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["three", "four"]);

        let for_a = storage.conversations_for_user("a", 10).unwrap();
        assert_eq!(for_a.len(), 3);
        assert!(storage.conversations_for_user("nobody", 10).unwrap().is_empty());
    }

    #[test]
    fn backup_dir_inside_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let err = storage.backup(dir.path().join("backups")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[test]
    fn storage_error_maps_to_store_error() {
        let err: StoreError = StorageError::Store(StoreError::NotAnswered("q".into())).into();
        assert!(matches!(err, StoreError::NotAnswered(_)));
        let err: StoreError = StorageError::Poisoned.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
        let err: StoreError =
            StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk")).into();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
