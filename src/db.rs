use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::models::{JobStatus, Posting, Preferences, StatusEntry, StoredDigest};

const PREFS_KEY: &str = "preferences";
const LEDGER_KEY: &str = "statuses";
const SAVED_KEY: &str = "saved";

fn digest_key(day_key: &str) -> String {
    format!("digest:{}", day_key)
}

/// Durable key-value store backing preferences, the status ledger, the
/// saved-set, and digest snapshots. One JSON value per concern, written
/// whole; last write wins per key.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open_at(path)
    }

    pub fn open_at(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        Ok(Self { conn, path })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            Ok(proj_dirs.data_dir().join("jobtrack.db"))
        } else {
            Ok(PathBuf::from("jobtrack.db"))
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        debug!(path = %self.path.display(), "store initialized");
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='kv'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Store not initialized. Run 'jobtrack init' first."));
        }
        Ok(())
    }

    // --- Raw key-value access ---

    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// A record that fails to decode is treated as absent, never as a fault.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key, %err, "discarding malformed record");
                Ok(None)
            }
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.put_raw(key, &serde_json::to_string(value)?)
    }

    // --- Preference operations ---

    pub fn load_preferences(&self) -> Result<Option<Preferences>> {
        self.get_json(PREFS_KEY)
    }

    /// Overwrites the whole record; there is no partial update.
    pub fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        self.put_json(PREFS_KEY, prefs)?;
        debug!("preferences saved");
        Ok(())
    }

    /// Whether a preferences record has ever been saved, regardless of its
    /// contents. Saving defaults counts; a malformed record does not.
    pub fn has_preferences(&self) -> Result<bool> {
        Ok(self.load_preferences()?.is_some())
    }

    // --- Status ledger operations ---

    pub fn load_ledger(&self) -> Result<HashMap<String, StatusEntry>> {
        Ok(self.get_json(LEDGER_KEY)?.unwrap_or_default())
    }

    pub fn get_status(&self, id: &str) -> Result<JobStatus> {
        Ok(self
            .load_ledger()?
            .get(id)
            .map(|entry| entry.status)
            .unwrap_or_default())
    }

    /// Upsert with `updatedAt = now`. Setting the same status again still
    /// refreshes the timestamp; there are no transition restrictions.
    pub fn set_status(&self, id: &str, status: JobStatus) -> Result<StatusEntry> {
        self.set_status_at(id, status, Utc::now())
    }

    fn set_status_at(
        &self,
        id: &str,
        status: JobStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusEntry> {
        let mut ledger = self.load_ledger()?;
        let entry = StatusEntry { status, updated_at };
        ledger.insert(id.to_string(), entry.clone());
        self.put_json(LEDGER_KEY, &ledger)?;
        debug!(id, %status, "status updated");
        Ok(entry)
    }

    /// The `n` most recently updated entries whose status is not
    /// `Not Applied`, newest first, resolved against the catalog. Entries
    /// whose posting no longer resolves are excluded.
    pub fn recent_updates<'a>(
        &self,
        n: usize,
        catalog: &'a Catalog,
    ) -> Result<Vec<(&'a Posting, StatusEntry)>> {
        let ledger = self.load_ledger()?;
        let mut updates: Vec<(&Posting, StatusEntry)> = ledger
            .into_iter()
            .filter(|(_, entry)| entry.status != JobStatus::NotApplied)
            .filter_map(|(id, entry)| catalog.get(&id).map(|p| (p, entry)))
            .collect();
        updates.sort_by(|a, b| b.1.updated_at.cmp(&a.1.updated_at));
        updates.truncate(n);
        Ok(updates)
    }

    // --- Saved-set operations ---

    pub fn saved_ids(&self) -> Result<Vec<String>> {
        Ok(self.get_json(SAVED_KEY)?.unwrap_or_default())
    }

    pub fn is_saved(&self, id: &str) -> Result<bool> {
        Ok(self.saved_ids()?.iter().any(|saved| saved == id))
    }

    /// Toggle membership; returns true when the posting is saved afterwards.
    /// Insertion order is kept for display.
    pub fn toggle_saved(&self, id: &str) -> Result<bool> {
        let mut ids = self.saved_ids()?;
        let now_saved = if let Some(pos) = ids.iter().position(|saved| saved == id) {
            ids.remove(pos);
            false
        } else {
            ids.push(id.to_string());
            true
        };
        self.put_json(SAVED_KEY, &ids)?;
        Ok(now_saved)
    }

    /// Saved postings resolved against the catalog, in insertion order.
    /// Ids that no longer resolve are silently dropped.
    pub fn saved_postings<'a>(&self, catalog: &'a Catalog) -> Result<Vec<&'a Posting>> {
        Ok(self
            .saved_ids()?
            .iter()
            .filter_map(|id| catalog.get(id))
            .collect())
    }

    // --- Digest snapshot operations ---

    pub fn load_digest(&self, day_key: &str) -> Result<Option<StoredDigest>> {
        self.get_json(&digest_key(day_key))
    }

    pub fn save_digest(&self, digest: &StoredDigest) -> Result<()> {
        self.put_json(&digest_key(&digest.date), digest)?;
        debug!(date = %digest.date, entries = digest.entries.len(), "digest stored");
        Ok(())
    }
}
