use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};

use crate::error::{DashboardError, Result};
use crate::record::Record;
use crate::store::{Profile, RECORDS_COLLECTION, RecordStore};

/// Full copy of the store's records and profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub records: Vec<Record>,
    pub profiles: Vec<Profile>,
}

/// What an import actually wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub records_added: usize,
    pub profiles_added: usize,
}

pub fn export_snapshot(store: &dyn RecordStore) -> Result<Snapshot> {
    Ok(Snapshot {
        records: store.list_records(RECORDS_COLLECTION)?,
        profiles: store.list_profiles()?,
    })
}

/// Append a snapshot's records and add any profiles the store lacks
///
/// Every record is validated before anything is written; one bad record
/// rejects the whole snapshot and leaves the store untouched. Records then
/// go in as a single batch, followed by the missing profiles one by one, so
/// an I/O failure while writing profiles can leave the records imported
/// without them.
///
/// Records are append-only, so importing the same snapshot twice
/// duplicates them. Existing profiles are left as they are.
///
/// # Errors
/// * `InvalidInput` naming the first record that fails validation
/// * `Store` if the underlying store cannot be written
pub fn import_snapshot(store: &dyn RecordStore, snapshot: &Snapshot) -> Result<ImportReport> {
    for (index, record) in snapshot.records.iter().enumerate() {
        record.validate().map_err(|e| {
            DashboardError::InvalidInput(format!("backup record {} rejected: {}", index + 1, e))
        })?;
    }

    // Oldest first, so insertion order matches creation order.
    let records: Vec<Record> = snapshot.records.iter().rev().cloned().collect();
    store.add_records(RECORDS_COLLECTION, &records)?;

    let mut report = ImportReport {
        records_added: records.len(),
        profiles_added: 0,
    };
    for profile in &snapshot.profiles {
        if store.get_profile(&profile.email)?.is_none() {
            store.put_profile(profile)?;
            report.profiles_added += 1;
        }
    }

    Ok(report)
}

/// Serialize a snapshot as gzip-compressed bincode.
pub fn save_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let encoder = GzEncoder::new(&mut buffer, Compression::default());
        let mut writer = BufWriter::new(encoder);

        serialize_into(&mut writer, snapshot)
            .map_err(|e| DashboardError::Store(format!("failed to encode backup: {}", e)))?;

        let encoder = writer
            .into_inner()
            .map_err(|e| DashboardError::Store(e.to_string()))?;
        encoder.finish()?.flush()?;
    }
    Ok(buffer)
}

pub fn load_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    let decoder = GzDecoder::new(bytes);
    let mut reader = BufReader::new(decoder);

    deserialize_from(&mut reader)
        .map_err(|e| DashboardError::Store(format!("invalid backup file: {}", e)))
}
