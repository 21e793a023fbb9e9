//! Evidence-link proposal flows (§4.6). The registered extension point is
//! an LLM-backed proposer; a deterministic tag-overlap heuristic only runs
//! as an internal fallback when that path errors or isn't configured.

use crate::model::{LinkType, LinkedBy};
use async_trait::async_trait;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
pub struct ProposalConfig {
    pub confidence_threshold: f64,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self { confidence_threshold: 0.6 }
    }
}

#[derive(Debug, Clone)]
pub struct ProposedLink {
    pub link_type: LinkType,
    pub linked_by: LinkedBy,
    pub confidence: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("LLM proposer unavailable: {0}")]
    Unavailable(String),
}

/// The registered proposal path. A real implementation calls out to a
/// language model with the goal and memory content; callers inject their
/// own implementation.
#[async_trait]
pub trait LlmGoalProposer: Send + Sync {
    async fn propose(&self, goal_tags: &[String], memory_tags: &[String], memory_content: &str) -> Result<ProposedLink, ProposalError>;
}

/// Tries the LLM path first; falls back to tag-overlap heuristics only when
/// the LLM path is unavailable. Either path's output is discarded if its
/// confidence doesn't clear `config.confidence_threshold`.
pub async fn propose_link(
    proposer: &dyn LlmGoalProposer,
    config: &ProposalConfig,
    goal_tags: &[String],
    memory_tags: &[String],
    memory_content: &str,
) -> Option<ProposedLink> {
    let proposed = match proposer.propose(goal_tags, memory_tags, memory_content).await {
        Ok(link) => link,
        Err(_) => tag_overlap_fallback(goal_tags, memory_tags)?,
    };

    if proposed.confidence < config.confidence_threshold {
        return None;
    }
    Some(proposed)
}

/// Deterministic, non-registered fallback: overlap of size `k` between
/// goal and memory tags gives `confidence = min(1.0, 0.55 + 0.1 * k)`.
fn tag_overlap_fallback(goal_tags: &[String], memory_tags: &[String]) -> Option<ProposedLink> {
    let goal_set: HashSet<&str> = goal_tags.iter().map(String::as_str).collect();
    let overlap = memory_tags.iter().filter(|t| goal_set.contains(t.as_str())).count();
    if overlap == 0 {
        return None;
    }

    let link_type = if memory_tags.iter().any(|t| t == "progress" || t == "milestone") {
        LinkType::Progress
    } else {
        LinkType::Evidence
    };

    Some(ProposedLink {
        link_type,
        linked_by: LinkedBy::Auto,
        confidence: (0.55 + 0.1 * overlap as f64).min(1.0),
    })
}
