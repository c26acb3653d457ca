//! In-memory stores for exercises and document records.
//!
//! These stand in for the relational layer and expose only the narrow
//! surface the core needs: find-or-create, save, lookup, delete. All
//! mutations take the write lock for a single map operation; nothing holds a
//! lock across an await of the generation backend.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::domain::{DocumentRecord, DocumentStatus, DocumentType, Exercise};

/// Exercises with their intake questions, keyed by id.
#[derive(Clone, Default)]
pub struct ExerciseStore {
    by_id: Arc<RwLock<HashMap<String, Exercise>>>,
}

impl ExerciseStore {
    #[instrument(level = "debug", skip(self, exercise), fields(id = %exercise.id))]
    pub async fn insert(&self, exercise: Exercise) {
        self.by_id.write().await.insert(exercise.id.clone(), exercise);
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get(&self, id: &str) -> Option<Exercise> {
        self.by_id.read().await.get(id).cloned()
    }

    /// Replace an exercise wholesale, stamping `updated_at`.
    #[instrument(level = "debug", skip(self, exercise), fields(id = %exercise.id))]
    pub async fn save(&self, mut exercise: Exercise) -> Exercise {
        exercise.updated_at = Utc::now();
        self.by_id.write().await.insert(exercise.id.clone(), exercise.clone());
        exercise
    }

    /// All exercises, most recently created first.
    #[instrument(level = "debug", skip(self))]
    pub async fn list(&self) -> Vec<Exercise> {
        let mut all: Vec<Exercise> = self.by_id.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn delete(&self, id: &str) -> Option<Exercise> {
        self.by_id.write().await.remove(id)
    }
}

/// Document records, at most one per (exercise, document type) pair.
#[derive(Clone, Default)]
pub struct DocumentStore {
    by_pair: Arc<RwLock<HashMap<(String, DocumentType), DocumentRecord>>>,
}

impl DocumentStore {
    /// Find-or-create the record for a pair and move it into GENERATING.
    /// The transitional state is visible to readers before any backend work
    /// starts. Existing content fields are kept as-is; only status and
    /// `updated_at` change here.
    #[instrument(level = "debug", skip(self), fields(%exercise_id, document_type = document_type.as_str()))]
    pub async fn upsert_generating(
        &self,
        exercise_id: &str,
        document_type: DocumentType,
    ) -> DocumentRecord {
        let key = (exercise_id.to_string(), document_type);
        let mut map = self.by_pair.write().await;
        let record = map
            .entry(key)
            .or_insert_with(|| DocumentRecord::new(exercise_id, document_type));
        record.status = DocumentStatus::Generating;
        record.updated_at = Utc::now();
        record.clone()
    }

    /// Persist a record's current state (terminal transitions included).
    #[instrument(level = "debug", skip(self, record), fields(id = %record.id))]
    pub async fn save(&self, mut record: DocumentRecord) -> DocumentRecord {
        record.updated_at = Utc::now();
        let key = (record.exercise_id.clone(), record.document_type);
        self.by_pair.write().await.insert(key, record.clone());
        record
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get(&self, id: &str) -> Option<DocumentRecord> {
        self.by_pair.read().await.values().find(|r| r.id == id).cloned()
    }

    #[instrument(level = "debug", skip(self), fields(%exercise_id, document_type = document_type.as_str()))]
    pub async fn get_pair(
        &self,
        exercise_id: &str,
        document_type: DocumentType,
    ) -> Option<DocumentRecord> {
        self.by_pair.read().await.get(&(exercise_id.to_string(), document_type)).cloned()
    }

    /// Records for one exercise, in declared document-type order.
    #[instrument(level = "debug", skip(self), fields(%exercise_id))]
    pub async fn list_for_exercise(&self, exercise_id: &str) -> Vec<DocumentRecord> {
        let map = self.by_pair.read().await;
        DocumentType::ALL
            .iter()
            .filter_map(|t| map.get(&(exercise_id.to_string(), *t)).cloned())
            .collect()
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn delete(&self, id: &str) -> Option<DocumentRecord> {
        let mut map = self.by_pair.write().await;
        let key = map.iter().find(|(_, r)| r.id == id).map(|(k, _)| k.clone())?;
        map.remove(&key)
    }

    /// Cascade path for exercise deletion. Returns the removed records so the
    /// caller can clean up rendered files.
    #[instrument(level = "debug", skip(self), fields(%exercise_id))]
    pub async fn delete_for_exercise(&self, exercise_id: &str) -> Vec<DocumentRecord> {
        let mut map = self.by_pair.write().await;
        let keys: Vec<(String, DocumentType)> =
            map.keys().filter(|(eid, _)| eid == exercise_id).cloned().collect();
        keys.into_iter().filter_map(|k| map.remove(&k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_generating_reuses_the_existing_record() {
        let store = DocumentStore::default();
        let first = store.upsert_generating("ex1", DocumentType::ScenarioBrief).await;

        let mut completed = first.clone();
        completed.status = DocumentStatus::Completed;
        completed.content = Some("body".into());
        store.save(completed).await;

        let second = store.upsert_generating("ex1", DocumentType::ScenarioBrief).await;
        assert_eq!(second.id, first.id);
        assert_eq!(second.status, DocumentStatus::Generating);
        assert_eq!(second.content.as_deref(), Some("body"));

        assert_eq!(store.list_for_exercise("ex1").await.len(), 1);
    }

    #[tokio::test]
    async fn listing_follows_declared_type_order() {
        let store = DocumentStore::default();
        store.upsert_generating("ex1", DocumentType::AfterActionTemplate).await;
        store.upsert_generating("ex1", DocumentType::ScenarioBrief).await;
        store.upsert_generating("ex2", DocumentType::InjectCards).await;

        let listed = store.list_for_exercise("ex1").await;
        assert_eq!(
            listed.iter().map(|r| r.document_type).collect::<Vec<_>>(),
            vec![DocumentType::ScenarioBrief, DocumentType::AfterActionTemplate]
        );
    }

    #[tokio::test]
    async fn cascade_delete_removes_all_pairs_for_an_exercise() {
        let store = DocumentStore::default();
        store.upsert_generating("ex1", DocumentType::ScenarioBrief).await;
        store.upsert_generating("ex1", DocumentType::InjectCards).await;
        store.upsert_generating("ex2", DocumentType::InjectCards).await;

        let removed = store.delete_for_exercise("ex1").await;
        assert_eq!(removed.len(), 2);
        assert!(store.list_for_exercise("ex1").await.is_empty());
        assert_eq!(store.list_for_exercise("ex2").await.len(), 1);
    }

    #[tokio::test]
    async fn delete_by_id_targets_one_record() {
        let store = DocumentStore::default();
        let rec = store.upsert_generating("ex1", DocumentType::ScenarioBrief).await;
        store.upsert_generating("ex1", DocumentType::InjectCards).await;

        assert!(store.delete(&rec.id).await.is_some());
        assert!(store.get(&rec.id).await.is_none());
        assert_eq!(store.list_for_exercise("ex1").await.len(), 1);
    }
}
