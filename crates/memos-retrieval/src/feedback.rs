//! Per-user relevance feedback store backing the optional reranking step
//! (§4.2 Feedback reranking).

use crate::model::{FeedbackSignal, RelevanceFeedback};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use memos_core::{MemoryId, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;

#[async_trait]
pub trait FeedbackRepo: Send + Sync {
    async fn record(&self, feedback: RelevanceFeedback);

    /// Most recent feedback for `(user_id, memory_id)` within `window`, if any.
    async fn most_recent(
        &self,
        user_id: UserId,
        memory_id: MemoryId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Option<FeedbackSignal>;
}

#[derive(Default)]
pub struct InMemoryFeedbackRepo {
    rows: Mutex<HashMap<(UserId, MemoryId), Vec<RelevanceFeedback>>>,
}

#[async_trait]
impl FeedbackRepo for InMemoryFeedbackRepo {
    async fn record(&self, feedback: RelevanceFeedback) {
        self.rows
            .lock()
            .entry((feedback.user_id, feedback.memory_id))
            .or_default()
            .push(feedback);
    }

    async fn most_recent(
        &self,
        user_id: UserId,
        memory_id: MemoryId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Option<FeedbackSignal> {
        let rows = self.rows.lock();
        let entries = rows.get(&(user_id, memory_id))?;
        entries
            .iter()
            .filter(|f| now - f.recorded_at <= window)
            .max_by_key(|f| f.recorded_at)
            .map(|f| f.signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::new_id;

    #[tokio::test]
    async fn only_most_recent_within_window_counts() {
        let repo = InMemoryFeedbackRepo::default();
        let user = new_id();
        let memory = new_id();
        let now = Utc::now();

        repo.record(RelevanceFeedback {
            memory_id: memory,
            user_id: user,
            signal: FeedbackSignal::Negative,
            recorded_at: now - Duration::days(10),
        })
        .await;
        repo.record(RelevanceFeedback {
            memory_id: memory,
            user_id: user,
            signal: FeedbackSignal::Positive,
            recorded_at: now - Duration::hours(1),
        })
        .await;

        let signal = repo
            .most_recent(user, memory, now, Duration::days(1))
            .await;
        assert_eq!(signal, Some(FeedbackSignal::Positive));

        let none = repo
            .most_recent(user, memory, now, Duration::minutes(1))
            .await;
        assert_eq!(none, None);
    }
}
