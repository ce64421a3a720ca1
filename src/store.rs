//! The owned, persisted list of records.
//!
//! [`RecordStore`] is the only writer. Every mutation re-serializes the whole list
//! under a single key; a failed write is logged and otherwise ignored, mirroring
//! how a browser's local storage behaves.

use std::sync::Arc;

use time::{OffsetDateTime, Time};

use crate::records::{new_record_id, Record, RecordDraft, RecordPatch};
use crate::storage::KeyValueStore;
use crate::timeline::{days_since, Clock};

pub struct RecordStore<S: KeyValueStore> {
    kv: S,
    key: String,
    clock: Arc<dyn Clock>,
    records: Vec<Record>,
}

impl<S: KeyValueStore> std::fmt::Debug for RecordStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("key", &self.key)
            .field("records", &self.records.len())
            .finish()
    }
}

impl<S: KeyValueStore> RecordStore<S> {
    pub fn open(kv: S, key: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let key = key.into();
        let records = load_records(&kv, &key, clock.as_ref());
        tracing::info!(count = records.len(), key = %key, "loaded records");
        Self {
            kv,
            key,
            clock,
            records,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn add(&mut self, draft: RecordDraft) -> &Record {
        let now = self.clock.now();
        let record = draft.into_record(new_record_id(), now.date(), minute_of(now));
        tracing::info!(record_id = %record.id, "record added");
        self.records.push(record);
        self.persist();
        let idx = self.records.len() - 1;
        &self.records[idx]
    }

    /// Returns false, without touching anything, when `id` is unknown.
    pub fn update(&mut self, id: &str, patch: RecordPatch) -> bool {
        let today = self.clock.today();
        let Some(record) = self.records.iter_mut().find(|record| record.id == id) else {
            tracing::debug!(record_id = %id, "update skipped, record not found");
            return false;
        };
        record.apply(patch);
        record.days_since_added = days_since(record.date_added, today);
        self.persist();
        true
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        let removed = self.records.len() != before;
        if removed {
            tracing::info!(record_id = %id, "record deleted");
        }
        self.persist();
        removed
    }

    /// Appends as-is; identities are not checked against existing records.
    pub fn import_many(&mut self, records: Vec<Record>) -> usize {
        let count = records.len();
        self.records.extend(records);
        tracing::info!(count, "records imported");
        self.persist();
        count
    }

    pub fn clear(&mut self) {
        self.records.clear();
        tracing::info!("records cleared");
        self.persist();
    }

    /// Recomputes every record's day count against the current date.
    pub fn refresh_derived(&mut self) {
        let today = self.clock.today();
        for record in &mut self.records {
            record.days_since_added = days_since(record.date_added, today);
        }
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.records) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(?err, "failed to serialize records");
                return;
            }
        };
        if let Err(err) = self.kv.set(&self.key, &json) {
            tracing::warn!(?err, key = %self.key, "failed to persist records");
        }
    }
}

fn load_records(kv: &impl KeyValueStore, key: &str, clock: &dyn Clock) -> Vec<Record> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            tracing::warn!(?err, key, "failed to read persisted records");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<Record>>(&raw) {
        Ok(mut records) => {
            let today = clock.today();
            for record in &mut records {
                record.days_since_added = days_since(record.date_added, today);
            }
            records
        }
        Err(err) => {
            let backup_key = format!("{key}.corrupt-{}", clock.now().unix_timestamp());
            tracing::warn!(?err, key, backup_key = %backup_key, "persisted records unreadable, starting empty");
            if let Err(err) = kv.set(&backup_key, &raw) {
                tracing::warn!(?err, "failed to keep a copy of unreadable records");
            }
            Vec::new()
        }
    }
}

fn minute_of(now: OffsetDateTime) -> Time {
    Time::from_hms(now.hour(), now.minute(), 0).unwrap_or(Time::MIDNIGHT)
}
