//! Record persistence.
//!
//! The dashboard treats the store as an external collaborator: every read is
//! a fresh snapshot, writes are plain appends, and nothing is cached between
//! calls. Stored documents are schema-less JSON and are validated into typed
//! [`Record`]s on the way out.

use crate::error::{DashboardError, Result};
use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, create_dir_all};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Collection holding conversion records
pub const RECORDS_COLLECTION: &str = "ethanol_data";

const PROFILES_FILE: &str = "profiles.json";

/// Profile document written on signup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence operations the dashboard needs
///
/// Listings are ordered newest first. Implementations must not merge or
/// deduplicate concurrent appends.
pub trait RecordStore: Send + Sync {
    /// Append a record to a collection.
    fn add_record(&self, collection: &str, record: &Record) -> Result<()>;

    /// Append several records in order
    ///
    /// The default appends one at a time. Both bundled stores override it
    /// so the batch lands in a single write.
    fn add_records(&self, collection: &str, records: &[Record]) -> Result<()> {
        for record in records {
            self.add_record(collection, record)?;
        }
        Ok(())
    }

    /// All records in a collection, newest first.
    fn list_records(&self, collection: &str) -> Result<Vec<Record>>;

    /// Records submitted under one user name (exact match), newest first.
    fn list_records_for_user(&self, collection: &str, user: &str) -> Result<Vec<Record>> {
        Ok(self
            .list_records(collection)?
            .into_iter()
            .filter(|record| record.user == user)
            .collect())
    }

    /// Insert or replace the profile keyed by its email.
    fn put_profile(&self, profile: &Profile) -> Result<()>;

    fn get_profile(&self, email: &str) -> Result<Option<Profile>>;

    fn list_profiles(&self) -> Result<Vec<Profile>>;
}

/// Order a collection newest first; later inserts win ties.
fn newest_first(mut records: Vec<Record>) -> Vec<Record> {
    records.reverse();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}

fn poisoned<T>(_: T) -> DashboardError {
    DashboardError::Store("store lock poisoned".to_string())
}

/// JSON-file store rooted at a data directory
///
/// Each collection lives in `<dir>/<collection>.json` as an array of
/// documents; profiles live in `<dir>/profiles.json` keyed by email.
pub struct FileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store in `dir`
    ///
    /// # Errors
    /// * `Store` if the directory or the profiles file cannot be created
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            create_dir_all(&dir)?;
        }

        let profiles_path = dir.join(PROFILES_FILE);
        if !profiles_path.exists() {
            let mut file = File::create(&profiles_path)?;
            file.write_all(b"{}")?;
        }

        Ok(FileStore {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(DashboardError::Store(format!(
                "invalid collection name: {:?}",
                collection
            )));
        }
        Ok(self.dir.join(format!("{}.json", collection)))
    }

    fn read_documents(path: &Path) -> Result<Vec<Value>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn read_profiles(&self) -> Result<BTreeMap<String, Profile>> {
        let contents = fs::read_to_string(self.dir.join(PROFILES_FILE))?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl RecordStore for FileStore {
    fn add_record(&self, collection: &str, record: &Record) -> Result<()> {
        self.add_records(collection, std::slice::from_ref(record))
    }

    fn add_records(&self, collection: &str, records: &[Record]) -> Result<()> {
        let path = self.collection_path(collection)?;
        let _guard = self.lock.lock().map_err(poisoned)?;

        let mut documents = Self::read_documents(&path)?;
        for record in records {
            documents.push(serde_json::to_value(record)?);
        }
        fs::write(&path, serde_json::to_string_pretty(&documents)?)?;
        Ok(())
    }

    fn list_records(&self, collection: &str) -> Result<Vec<Record>> {
        let path = self.collection_path(collection)?;
        let documents = {
            let _guard = self.lock.lock().map_err(poisoned)?;
            Self::read_documents(&path)?
        };

        let records = documents
            .iter()
            .map(Record::from_document)
            .collect::<Result<Vec<_>>>()?;
        Ok(newest_first(records))
    }

    fn put_profile(&self, profile: &Profile) -> Result<()> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut profiles = self.read_profiles()?;
        profiles.insert(profile.email.clone(), profile.clone());
        fs::write(
            self.dir.join(PROFILES_FILE),
            serde_json::to_string_pretty(&profiles)?,
        )?;
        Ok(())
    }

    fn get_profile(&self, email: &str) -> Result<Option<Profile>> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        Ok(self.read_profiles()?.remove(email))
    }

    fn list_profiles(&self) -> Result<Vec<Profile>> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        Ok(self.read_profiles()?.into_values().collect())
    }
}

/// In-memory store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    profiles: RwLock<BTreeMap<String, Profile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn add_record(&self, collection: &str, record: &Record) -> Result<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn add_records(&self, collection: &str, records: &[Record]) -> Result<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .entry(collection.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    fn list_records(&self, collection: &str) -> Result<Vec<Record>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let records = collections.get(collection).cloned().unwrap_or_default();
        Ok(newest_first(records))
    }

    fn put_profile(&self, profile: &Profile) -> Result<()> {
        let mut profiles = self.profiles.write().map_err(poisoned)?;
        profiles.insert(profile.email.clone(), profile.clone());
        Ok(())
    }

    fn get_profile(&self, email: &str) -> Result<Option<Profile>> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        Ok(profiles.get(email).cloned())
    }

    fn list_profiles(&self) -> Result<Vec<Profile>> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        Ok(profiles.values().cloned().collect())
    }
}
