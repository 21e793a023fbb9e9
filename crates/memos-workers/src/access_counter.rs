//! Access-counter update (§4.5). Idempotency is not required here — counter
//! increments are inherently monotonic — so unlike the agent pipeline there
//! is no inputs-hash short-circuit.

use crate::error::{with_retry, WorkerError};
use chrono::Utc;
use memos_core::MemoryId;
use memos_store::ActivationRepo;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 50;

pub async fn bump_access_counter(
    repo: &dyn ActivationRepo,
    memory_id: MemoryId,
) -> Result<(), WorkerError> {
    with_retry(MAX_ATTEMPTS, BASE_DELAY_MS, || async {
        let mut state = repo.get_or_default(memory_id).await?;
        state.access_count += 1;
        state.last_accessed_at = Some(Utc::now());
        repo.upsert(state).await?;
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::new_id;
    use memos_store::InMemoryActivationRepo;

    #[tokio::test]
    async fn bump_increments_count_and_stamps_last_accessed() {
        let repo = InMemoryActivationRepo::default();
        let memory_id = new_id();

        bump_access_counter(&repo, memory_id).await.unwrap();
        bump_access_counter(&repo, memory_id).await.unwrap();

        let state = repo.get_or_default(memory_id).await.unwrap();
        assert_eq!(state.access_count, 2);
        assert!(state.last_accessed_at.is_some());
    }
}
