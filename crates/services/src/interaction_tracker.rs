use std::collections::BTreeMap;
use std::sync::Arc;

use learn_core::model::{CourseId, CourseInteraction, InteractionKind};
use storage::repository::{InteractionRepository, StorageError, WriteMode};
use tracing::{debug, warn};

use crate::Clock;

const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Local per-course view counts and recent activity.
#[derive(Clone)]
pub struct InteractionTracker {
    clock: Clock,
    repo: Arc<dyn InteractionRepository>,
}

impl InteractionTracker {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn InteractionRepository>) -> Self {
        Self { clock, repo }
    }

    /// Records one interaction and returns the updated log.
    ///
    /// Writes are conditional on the revision that was read; a concurrent
    /// writer causes a re-read, up to `MAX_WRITE_ATTEMPTS` times. Storage
    /// failures are logged and the in-memory log is returned.
    pub async fn record(&self, course: &CourseId, kind: InteractionKind) -> CourseInteraction {
        let mut latest = CourseInteraction::new();

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (mut log, mode) = match self.repo.load_interactions(course).await {
                Ok(saved) => (
                    saved.value.unwrap_or_default(),
                    WriteMode::IfRevision(saved.revision),
                ),
                Err(err) => {
                    warn!(course = %course, error = %err, "unreadable interaction log, starting fresh");
                    (CourseInteraction::new(), WriteMode::Overwrite)
                }
            };
            log.trim();
            log.record(kind, self.clock.now());

            match self.repo.save_interactions(course, &log, mode).await {
                Ok(_) => return log,
                Err(StorageError::Conflict) => {
                    debug!(course = %course, attempt, "interaction log changed underneath, retrying");
                    latest = log;
                }
                Err(err) => {
                    warn!(course = %course, error = %err, "failed to persist interaction");
                    return log;
                }
            }
        }

        warn!(course = %course, "giving up on interaction write after repeated conflicts");
        latest
    }

    /// Interaction log for a single course (empty if none).
    pub async fn get(&self, course: &CourseId) -> CourseInteraction {
        match self.repo.load_interactions(course).await {
            Ok(saved) => saved.value.unwrap_or_default(),
            Err(err) => {
                warn!(course = %course, error = %err, "failed to load interaction log");
                CourseInteraction::new()
            }
        }
    }

    /// Every recorded course, for display.
    pub async fn get_all(&self) -> BTreeMap<CourseId, CourseInteraction> {
        match self.repo.list_interactions().await {
            Ok(all) => all,
            Err(err) => {
                warn!(error = %err, "failed to list interaction logs");
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;
    use learn_core::model::MAX_INTERACTIONS;
    use learn_core::time::{fixed_clock, fixed_now};
    use storage::repository::{KeyLayout, Revision, Storage, Versioned};

    fn id(raw: &str) -> CourseId {
        CourseId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn eleven_records_keep_the_latest_ten() {
        let storage = Storage::in_memory(KeyLayout::PerCourse);
        let mut clock = fixed_clock();
        for _ in 0..11 {
            let tracker = InteractionTracker::new(clock, Arc::clone(&storage.interactions));
            tracker.record(&id("c1"), InteractionKind::View).await;
            clock.advance(Duration::seconds(1));
        }

        let tracker = InteractionTracker::new(clock, Arc::clone(&storage.interactions));
        let log = tracker.get(&id("c1")).await;
        assert_eq!(log.views(), 11);
        assert_eq!(log.interactions().len(), MAX_INTERACTIONS);
        assert_eq!(
            log.interactions().front().unwrap().timestamp,
            fixed_now() + Duration::seconds(1)
        );
        assert_eq!(log.last_viewed(), Some(fixed_now() + Duration::seconds(10)));
    }

    #[tokio::test]
    async fn get_all_returns_every_course() {
        for layout in [KeyLayout::PerCourse, KeyLayout::SharedBlob] {
            let storage = Storage::in_memory(layout);
            let tracker = InteractionTracker::new(fixed_clock(), storage.interactions);
            tracker.record(&id("a"), InteractionKind::View).await;
            tracker.record(&id("b"), InteractionKind::QuizStarted).await;
            tracker.record(&id("b"), InteractionKind::QuizSubmitted).await;

            let all = tracker.get_all().await;
            assert_eq!(all.len(), 2, "{layout:?}");
            assert_eq!(all[&id("a")].views(), 1, "{layout:?}");
            assert_eq!(all[&id("b")].views(), 2, "{layout:?}");
            assert_eq!(tracker.get(&id("a")).await.views(), 1, "{layout:?}");
        }
    }

    /// Fails the first save with a conflict, then behaves normally.
    struct RacingRepo {
        inner: Arc<dyn InteractionRepository>,
        conflicts_left: AtomicU32,
    }

    #[async_trait]
    impl InteractionRepository for RacingRepo {
        async fn load_interactions(
            &self,
            course: &CourseId,
        ) -> Result<Versioned<Option<CourseInteraction>>, StorageError> {
            self.inner.load_interactions(course).await
        }

        async fn save_interactions(
            &self,
            course: &CourseId,
            interactions: &CourseInteraction,
            mode: WriteMode,
        ) -> Result<Revision, StorageError> {
            if self.conflicts_left.load(Ordering::SeqCst) > 0 {
                self.conflicts_left.fetch_sub(1, Ordering::SeqCst);
                // Another tab sneaks in a write.
                let mut other = self
                    .inner
                    .load_interactions(course)
                    .await?
                    .value
                    .unwrap_or_default();
                other.record(InteractionKind::View, fixed_now());
                self.inner
                    .save_interactions(course, &other, WriteMode::Overwrite)
                    .await?;
                return Err(StorageError::Conflict);
            }
            self.inner.save_interactions(course, interactions, mode).await
        }

        async fn list_interactions(
            &self,
        ) -> Result<BTreeMap<CourseId, CourseInteraction>, StorageError> {
            self.inner.list_interactions().await
        }
    }

    #[tokio::test]
    async fn conflicting_writer_is_not_lost() {
        let storage = Storage::in_memory(KeyLayout::PerCourse);
        let repo = RacingRepo {
            inner: Arc::clone(&storage.interactions),
            conflicts_left: AtomicU32::new(1),
        };
        let tracker = InteractionTracker::new(fixed_clock(), Arc::new(repo));

        let log = tracker.record(&id("c1"), InteractionKind::LessonCompleted).await;
        assert_eq!(log.views(), 2);
        assert_eq!(
            log.interactions().back().unwrap().kind,
            InteractionKind::LessonCompleted
        );
    }
}
