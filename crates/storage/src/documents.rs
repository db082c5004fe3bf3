use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use learn_core::model::{CourseId, CourseInteraction, CourseProgress};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::repository::{
    InteractionRepository, KeyLayout, KeyValueStore, ProgressRepository, Revision, StorageError,
    StoredValue, Versioned, WriteMode,
};

/// Storage key for course progress documents.
pub const PROGRESS_NAMESPACE: &str = "courseProgress";
/// Storage key for course interaction documents.
pub const INTERACTIONS_NAMESPACE: &str = "courseInteractions";

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// JSON documents per course on top of a `KeyValueStore`.
#[derive(Clone)]
pub struct DocumentRepository {
    kv: Arc<dyn KeyValueStore>,
    layout: KeyLayout,
}

impl DocumentRepository {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, layout: KeyLayout) -> Self {
        Self { kv, layout }
    }

    fn course_key(namespace: &str, course: &CourseId) -> String {
        format!("{namespace}/{course}")
    }

    async fn load<T: DeserializeOwned>(
        &self,
        namespace: &str,
        course: &CourseId,
    ) -> Result<Versioned<Option<T>>, StorageError> {
        let key = match self.layout {
            KeyLayout::PerCourse => Self::course_key(namespace, course),
            KeyLayout::SharedBlob => namespace.to_owned(),
        };
        let Some(stored) = self.kv.get(&key).await? else {
            return Ok(Versioned {
                value: None,
                revision: None,
            });
        };

        let value = match self.layout {
            KeyLayout::PerCourse => Some(serde_json::from_str(&stored.value).map_err(ser)?),
            KeyLayout::SharedBlob => parse_blob(&stored)?
                .remove(course.as_str())
                .map(serde_json::from_value)
                .transpose()
                .map_err(ser)?,
        };
        Ok(Versioned {
            value,
            revision: Some(stored.revision),
        })
    }

    async fn save<T: Serialize + Sync>(
        &self,
        namespace: &str,
        course: &CourseId,
        document: &T,
        mode: WriteMode,
    ) -> Result<Revision, StorageError> {
        match self.layout {
            KeyLayout::PerCourse => {
                let key = Self::course_key(namespace, course);
                let body = serde_json::to_string(document).map_err(ser)?;
                match mode {
                    WriteMode::Overwrite => self.kv.put(&key, &body).await,
                    WriteMode::IfRevision(expected) => {
                        self.kv.compare_and_swap(&key, expected, &body).await
                    }
                }
            }
            KeyLayout::SharedBlob => {
                let stored = self.kv.get(namespace).await?;
                let current = stored.as_ref().map(|s| s.revision);
                if let WriteMode::IfRevision(expected) = mode {
                    if expected != current {
                        return Err(StorageError::Conflict);
                    }
                }

                let mut map = match stored.as_ref().map(parse_blob).transpose() {
                    Ok(map) => map.unwrap_or_default(),
                    Err(err) => {
                        warn!(namespace, error = %err, "discarding unreadable storage blob");
                        Map::new()
                    }
                };
                map.insert(
                    course.as_str().to_owned(),
                    serde_json::to_value(document).map_err(ser)?,
                );
                let body = serde_json::to_string(&map).map_err(ser)?;
                self.kv.compare_and_swap(namespace, current, &body).await
            }
        }
    }

    async fn delete(&self, namespace: &str, course: &CourseId) -> Result<(), StorageError> {
        match self.layout {
            KeyLayout::PerCourse => self.kv.delete(&Self::course_key(namespace, course)).await,
            KeyLayout::SharedBlob => {
                let Some(stored) = self.kv.get(namespace).await? else {
                    return Ok(());
                };
                let mut map = parse_blob(&stored)?;
                if map.remove(course.as_str()).is_none() {
                    return Ok(());
                }
                let body = serde_json::to_string(&map).map_err(ser)?;
                self.kv
                    .compare_and_swap(namespace, Some(stored.revision), &body)
                    .await?;
                Ok(())
            }
        }
    }

    async fn list<T: DeserializeOwned>(
        &self,
        namespace: &str,
    ) -> Result<BTreeMap<CourseId, T>, StorageError> {
        let mut out = BTreeMap::new();
        match self.layout {
            KeyLayout::PerCourse => {
                let prefix = format!("{namespace}/");
                for key in self.kv.keys_with_prefix(&prefix).await? {
                    let Some(stored) = self.kv.get(&key).await? else {
                        continue;
                    };
                    let raw_id = &key[prefix.len()..];
                    match (
                        CourseId::new(raw_id),
                        serde_json::from_str::<T>(&stored.value),
                    ) {
                        (Ok(id), Ok(value)) => {
                            out.insert(id, value);
                        }
                        _ => warn!(key = %key, "skipping unreadable stored document"),
                    }
                }
            }
            KeyLayout::SharedBlob => {
                let Some(stored) = self.kv.get(namespace).await? else {
                    return Ok(out);
                };
                for (raw_id, entry) in parse_blob(&stored)? {
                    match (CourseId::new(raw_id.as_str()), serde_json::from_value::<T>(entry)) {
                        (Ok(id), Ok(value)) => {
                            out.insert(id, value);
                        }
                        _ => warn!(namespace, course = %raw_id, "skipping unreadable blob entry"),
                    }
                }
            }
        }
        Ok(out)
    }
}

fn parse_blob(stored: &StoredValue) -> Result<Map<String, Value>, StorageError> {
    match serde_json::from_str::<Value>(&stored.value).map_err(ser)? {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::Serialization(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl ProgressRepository for DocumentRepository {
    async fn load_progress(
        &self,
        course: &CourseId,
    ) -> Result<Versioned<Option<CourseProgress>>, StorageError> {
        self.load(PROGRESS_NAMESPACE, course).await
    }

    async fn save_progress(
        &self,
        course: &CourseId,
        progress: &CourseProgress,
        mode: WriteMode,
    ) -> Result<Revision, StorageError> {
        self.save(PROGRESS_NAMESPACE, course, progress, mode).await
    }

    async fn delete_progress(&self, course: &CourseId) -> Result<(), StorageError> {
        self.delete(PROGRESS_NAMESPACE, course).await
    }
}

#[async_trait]
impl InteractionRepository for DocumentRepository {
    async fn load_interactions(
        &self,
        course: &CourseId,
    ) -> Result<Versioned<Option<CourseInteraction>>, StorageError> {
        self.load(INTERACTIONS_NAMESPACE, course).await
    }

    async fn save_interactions(
        &self,
        course: &CourseId,
        interactions: &CourseInteraction,
        mode: WriteMode,
    ) -> Result<Revision, StorageError> {
        self.save(INTERACTIONS_NAMESPACE, course, interactions, mode)
            .await
    }

    async fn list_interactions(&self) -> Result<BTreeMap<CourseId, CourseInteraction>, StorageError> {
        self.list(INTERACTIONS_NAMESPACE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKeyValueStore;
    use learn_core::model::InteractionKind;
    use learn_core::time::fixed_now;

    fn course(id: &str) -> CourseId {
        CourseId::new(id).unwrap()
    }

    fn repo(layout: KeyLayout) -> (Arc<InMemoryKeyValueStore>, DocumentRepository) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let dyn_kv: Arc<dyn KeyValueStore> = kv.clone();
        (kv, DocumentRepository::new(dyn_kv, layout))
    }

    fn sample_progress() -> CourseProgress {
        let mut p = CourseProgress::new();
        p.mark_lesson_complete(0);
        p.set_current_lesson(1);
        p.add_time_spent(42);
        p
    }

    #[tokio::test]
    async fn per_course_layout_uses_one_key_per_course() {
        let (kv, repo) = repo(KeyLayout::PerCourse);
        repo.save_progress(&course("a"), &sample_progress(), WriteMode::Overwrite)
            .await
            .unwrap();
        repo.save_progress(&course("b"), &CourseProgress::new(), WriteMode::Overwrite)
            .await
            .unwrap();

        let keys = kv.keys_with_prefix("courseProgress").await.unwrap();
        assert_eq!(keys, vec!["courseProgress/a", "courseProgress/b"]);

        let loaded = repo.load_progress(&course("a")).await.unwrap();
        assert_eq!(loaded.value, Some(sample_progress()));
        assert_eq!(loaded.revision, Some(Revision::new(1)));
    }

    #[tokio::test]
    async fn shared_blob_layout_keeps_all_courses_in_one_key() {
        let (kv, repo) = repo(KeyLayout::SharedBlob);
        repo.save_progress(&course("a"), &sample_progress(), WriteMode::Overwrite)
            .await
            .unwrap();
        let rev = repo
            .save_progress(&course("b"), &CourseProgress::new(), WriteMode::Overwrite)
            .await
            .unwrap();
        assert_eq!(rev, Revision::new(2));

        let blob = kv.get("courseProgress").await.unwrap().unwrap();
        let json: Value = serde_json::from_str(&blob.value).unwrap();
        assert_eq!(json["a"]["currentLessonIndex"], 1);
        assert_eq!(json["b"]["totalTimeSpent"], 0);

        let loaded = repo.load_progress(&course("a")).await.unwrap();
        assert_eq!(loaded.value, Some(sample_progress()));

        let missing = repo.load_progress(&course("zzz")).await.unwrap();
        assert!(missing.value.is_none());
        assert_eq!(missing.revision, Some(rev));
    }

    #[tokio::test]
    async fn shared_blob_replaces_unreadable_blob_on_save() {
        let (kv, repo) = repo(KeyLayout::SharedBlob);
        kv.put("courseProgress", "not json").await.unwrap();

        assert!(matches!(
            repo.load_progress(&course("a")).await,
            Err(StorageError::Serialization(_))
        ));
        repo.save_progress(&course("a"), &sample_progress(), WriteMode::Overwrite)
            .await
            .unwrap();
        let loaded = repo.load_progress(&course("a")).await.unwrap();
        assert_eq!(loaded.value, Some(sample_progress()));
    }

    #[tokio::test]
    async fn conditional_save_detects_concurrent_writer() {
        for layout in [KeyLayout::PerCourse, KeyLayout::SharedBlob] {
            let (_kv, repo) = repo(layout);
            let id = course("a");
            let first = repo
                .save_progress(&id, &CourseProgress::new(), WriteMode::IfRevision(None))
                .await
                .unwrap();
            repo.save_progress(&id, &sample_progress(), WriteMode::Overwrite)
                .await
                .unwrap();

            let stale = repo
                .save_progress(&id, &CourseProgress::new(), WriteMode::IfRevision(Some(first)))
                .await;
            assert!(matches!(stale, Err(StorageError::Conflict)), "{layout:?}");
        }
    }

    #[tokio::test]
    async fn shared_blob_conditional_save_for_new_course_uses_blob_revision() {
        let (_kv, repo) = repo(KeyLayout::SharedBlob);
        let mut log = CourseInteraction::new();
        log.record(InteractionKind::View, fixed_now());
        repo.save_interactions(&course("a"), &log, WriteMode::IfRevision(None))
            .await
            .unwrap();

        let read = repo.load_interactions(&course("b")).await.unwrap();
        assert!(read.value.is_none());
        repo.save_interactions(&course("b"), &log, WriteMode::IfRevision(read.revision))
            .await
            .unwrap();

        let all = repo.list_interactions().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_only_that_course() {
        for layout in [KeyLayout::PerCourse, KeyLayout::SharedBlob] {
            let (_kv, repo) = repo(layout);
            for id in ["a", "b"] {
                repo.save_progress(&course(id), &sample_progress(), WriteMode::Overwrite)
                    .await
                    .unwrap();
            }
            repo.delete_progress(&course("a")).await.unwrap();
            repo.delete_progress(&course("never-saved")).await.unwrap();
            assert!(repo.load_progress(&course("a")).await.unwrap().value.is_none());
            assert!(repo.load_progress(&course("b")).await.unwrap().value.is_some());
        }
    }

    #[tokio::test]
    async fn lists_interactions_and_skips_garbage() {
        for layout in [KeyLayout::PerCourse, KeyLayout::SharedBlob] {
            let (kv, repo) = repo(layout);
            let mut log = CourseInteraction::new();
            log.record(InteractionKind::View, fixed_now());
            repo.save_interactions(&course("a"), &log, WriteMode::Overwrite)
                .await
                .unwrap();

            match layout {
                KeyLayout::PerCourse => {
                    kv.put("courseInteractions/b", "{broken").await.unwrap();
                }
                KeyLayout::SharedBlob => {
                    let blob = kv.get("courseInteractions").await.unwrap().unwrap();
                    let mut map: Map<String, Value> = serde_json::from_str(&blob.value).unwrap();
                    map.insert("b".into(), Value::String("nope".into()));
                    kv.put("courseInteractions", &serde_json::to_string(&map).unwrap())
                        .await
                        .unwrap();
                }
            }

            let all = repo.list_interactions().await.unwrap();
            assert_eq!(all.len(), 1, "{layout:?}");
            assert_eq!(all[&course("a")].views(), 1);
        }
    }
}
