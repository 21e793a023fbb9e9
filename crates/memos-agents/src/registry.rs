//! Concrete deterministic agents (§4.3). Each is stateless and derives its
//! output only from `AgentRunInputs`; none hold state between calls.

use crate::agent::{Agent, AgentError};
use crate::model::{AgentName, AgentResult, AgentRunInputs, AgentRunStatus};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn tokenize(content: &str) -> Vec<String> {
    content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "on", "for", "is", "it", "this", "that",
];

pub struct ClassificationAgent;

#[async_trait]
impl Agent for ClassificationAgent {
    fn name(&self) -> &'static str {
        AgentName::Classification.as_str()
    }
    fn version(&self) -> &'static str {
        "v1"
    }

    async fn run(&self, inputs: &AgentRunInputs) -> Result<AgentResult, AgentError> {
        if inputs.content.trim().is_empty() {
            return Err(AgentError::Execution("no content to classify".into()));
        }
        let lower = inputs.content.to_lowercase();
        let (label, confidence) = if lower.contains("error") || lower.contains("bug") || lower.contains("incident") {
            ("incident", 0.85)
        } else if lower.contains("plan") || lower.contains("goal") || lower.contains("milestone") {
            ("planning", 0.8)
        } else if lower.contains("decision") || lower.contains("decided") {
            ("decision", 0.75)
        } else {
            ("general", 0.55)
        };

        Ok(AgentResult {
            status: AgentRunStatus::Success,
            confidence,
            outputs: HashMap::from([("classification".to_string(), json!(label))]),
            warnings: vec![],
            errors: vec![],
            provenance: json!({"method": "keyword_heuristic"}),
        })
    }

    fn validate_outputs(&self, result: &AgentResult) -> Result<(), AgentError> {
        if !result.outputs.contains_key("classification") {
            return Err(AgentError::Validation("missing classification output".into()));
        }
        Ok(())
    }
}

pub struct MetadataAgent;

#[async_trait]
impl Agent for MetadataAgent {
    fn name(&self) -> &'static str {
        AgentName::Metadata.as_str()
    }
    fn version(&self) -> &'static str {
        "v1"
    }

    async fn run(&self, inputs: &AgentRunInputs) -> Result<AgentResult, AgentError> {
        let words = tokenize(&inputs.content);
        let summary: String = inputs.content.chars().take(140).collect();

        Ok(AgentResult {
            status: AgentRunStatus::Success,
            confidence: 0.95,
            outputs: HashMap::from([
                ("summary".to_string(), json!(summary)),
                ("word_count".to_string(), json!(words.len())),
            ]),
            warnings: vec![],
            errors: vec![],
            provenance: json!({"method": "truncation"}),
        })
    }

    fn validate_outputs(&self, result: &AgentResult) -> Result<(), AgentError> {
        if !result.outputs.contains_key("summary") {
            return Err(AgentError::Validation("missing summary output".into()));
        }
        Ok(())
    }
}

pub struct TopicAgent;

#[async_trait]
impl Agent for TopicAgent {
    fn name(&self) -> &'static str {
        AgentName::Topic.as_str()
    }
    fn version(&self) -> &'static str {
        "v1"
    }

    async fn run(&self, inputs: &AgentRunInputs) -> Result<AgentResult, AgentError> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for word in tokenize(&inputs.content) {
            if word.len() > 4 && !STOPWORDS.contains(&word.as_str()) {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<_> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let topics: Vec<Value> = ranked.into_iter().take(3).map(|(word, _)| json!(word)).collect();
        let confidence = (topics.len() as f64 / 3.0).min(1.0);

        Ok(AgentResult {
            status: AgentRunStatus::Success,
            confidence,
            outputs: HashMap::from([("topics".to_string(), json!(topics))]),
            warnings: vec![],
            errors: vec![],
            provenance: json!({"method": "term_frequency"}),
        })
    }

    fn validate_outputs(&self, result: &AgentResult) -> Result<(), AgentError> {
        if !result.outputs.contains_key("topics") {
            return Err(AgentError::Validation("missing topics output".into()));
        }
        Ok(())
    }
}

pub struct PatternAgent;

#[async_trait]
impl Agent for PatternAgent {
    fn name(&self) -> &'static str {
        AgentName::Pattern.as_str()
    }
    fn version(&self) -> &'static str {
        "v1"
    }

    async fn run(&self, inputs: &AgentRunInputs) -> Result<AgentResult, AgentError> {
        let words = tokenize(&inputs.content);
        let mut bigram_counts: HashMap<(String, String), usize> = HashMap::new();
        for pair in words.windows(2) {
            *bigram_counts.entry((pair[0].clone(), pair[1].clone())).or_insert(0) += 1;
        }
        let patterns: Vec<Value> = bigram_counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|((a, b), count)| json!({"phrase": format!("{a} {b}"), "count": count}))
            .collect();

        Ok(AgentResult {
            status: AgentRunStatus::Success,
            confidence: if patterns.is_empty() { 0.3 } else { 0.7 },
            outputs: HashMap::from([("patterns".to_string(), json!(patterns))]),
            warnings: vec![],
            errors: vec![],
            provenance: json!({"method": "repeated_bigram"}),
        })
    }

    fn validate_outputs(&self, result: &AgentResult) -> Result<(), AgentError> {
        if !result.outputs.contains_key("patterns") {
            return Err(AgentError::Validation("missing patterns output".into()));
        }
        Ok(())
    }
}

/// Cross-checks the single-memory `PatternAgent` output already attached in
/// `prior_enrichment` and decides whether it is worth persisting graph-wide.
pub struct PatternDetectionAgent;

#[async_trait]
impl Agent for PatternDetectionAgent {
    fn name(&self) -> &'static str {
        AgentName::PatternDetection.as_str()
    }
    fn version(&self) -> &'static str {
        "v1"
    }

    async fn run(&self, inputs: &AgentRunInputs) -> Result<AgentResult, AgentError> {
        let prior_patterns = inputs
            .prior_enrichment
            .get("patterns")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let confirmed: Vec<Value> = prior_patterns
            .into_iter()
            .filter(|p| p.get("count").and_then(Value::as_u64).unwrap_or(0) >= 2)
            .collect();

        Ok(AgentResult {
            status: AgentRunStatus::Success,
            confidence: if confirmed.is_empty() { 0.4 } else { 0.8 },
            outputs: HashMap::from([("patterns".to_string(), json!(confirmed))]),
            warnings: vec![],
            errors: vec![],
            provenance: json!({"method": "sibling_confirmation"}),
        })
    }

    fn validate_outputs(&self, result: &AgentResult) -> Result<(), AgentError> {
        if !result.outputs.contains_key("patterns") {
            return Err(AgentError::Validation("missing patterns output".into()));
        }
        Ok(())
    }
}

pub struct GraphLinkingAgent;

#[async_trait]
impl Agent for GraphLinkingAgent {
    fn name(&self) -> &'static str {
        AgentName::GraphLinking.as_str()
    }
    fn version(&self) -> &'static str {
        "v1"
    }

    async fn run(&self, inputs: &AgentRunInputs) -> Result<AgentResult, AgentError> {
        let related: Vec<Value> = inputs
            .prior_enrichment
            .get("related_memory_ids")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let unique: HashSet<String> = related
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        Ok(AgentResult {
            status: AgentRunStatus::Success,
            confidence: if unique.is_empty() { 0.2 } else { 0.6 },
            outputs: HashMap::from([(
                "related_memory_ids".to_string(),
                json!(unique.into_iter().collect::<Vec<_>>()),
            )]),
            warnings: vec![],
            errors: vec![],
            provenance: json!({"method": "sibling_enrichment_passthrough"}),
        })
    }

    fn validate_outputs(&self, result: &AgentResult) -> Result<(), AgentError> {
        if !result.outputs.contains_key("related_memory_ids") {
            return Err(AgentError::Validation("missing related_memory_ids output".into()));
        }
        Ok(())
    }
}

pub struct FeedbackLearningAgent;

#[async_trait]
impl Agent for FeedbackLearningAgent {
    fn name(&self) -> &'static str {
        AgentName::FeedbackLearning.as_str()
    }
    fn version(&self) -> &'static str {
        "v1"
    }

    async fn run(&self, inputs: &AgentRunInputs) -> Result<AgentResult, AgentError> {
        if inputs.feedback_fingerprint.starts_with("0:") {
            return Ok(AgentResult {
                status: AgentRunStatus::Skipped,
                confidence: 0.0,
                outputs: HashMap::from([("config_diff".to_string(), json!({}))]),
                warnings: vec!["no unapplied feedback".to_string()],
                errors: vec![],
                provenance: json!({"method": "no_op"}),
            });
        }

        Ok(AgentResult {
            status: AgentRunStatus::Success,
            confidence: 0.7,
            outputs: HashMap::from([(
                "config_diff".to_string(),
                json!({"thresholds": {"min_confidence": 0.2}}),
            )]),
            warnings: vec![],
            errors: vec![],
            provenance: json!({"method": "fingerprint_driven", "fingerprint": inputs.feedback_fingerprint}),
        })
    }

    fn validate_outputs(&self, result: &AgentResult) -> Result<(), AgentError> {
        if !result.outputs.contains_key("config_diff") {
            return Err(AgentError::Validation("missing config_diff output".into()));
        }
        Ok(())
    }
}

pub struct LogseqExportAgent;

#[async_trait]
impl Agent for LogseqExportAgent {
    fn name(&self) -> &'static str {
        AgentName::LogseqExport.as_str()
    }
    fn version(&self) -> &'static str {
        "v1"
    }

    async fn run(&self, inputs: &AgentRunInputs) -> Result<AgentResult, AgentError> {
        let markdown = format!(
            "- classification:: {}\n- {}",
            inputs.classification,
            inputs.content.lines().next().unwrap_or_default()
        );

        Ok(AgentResult {
            status: AgentRunStatus::Success,
            confidence: 1.0,
            outputs: HashMap::from([("export_markdown".to_string(), json!(markdown))]),
            warnings: vec![],
            errors: vec![],
            provenance: json!({"method": "markdown_template"}),
        })
    }

    fn validate_outputs(&self, result: &AgentResult) -> Result<(), AgentError> {
        if !result.outputs.contains_key("export_markdown") {
            return Err(AgentError::Validation("missing export_markdown output".into()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AgentRegistry {
    agents: HashMap<AgentName, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn get(&self, name: AgentName) -> Option<Arc<dyn Agent>> {
        self.agents.get(&name).cloned()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        let mut agents: HashMap<AgentName, Arc<dyn Agent>> = HashMap::new();
        agents.insert(AgentName::Classification, Arc::new(ClassificationAgent));
        agents.insert(AgentName::Metadata, Arc::new(MetadataAgent));
        agents.insert(AgentName::Topic, Arc::new(TopicAgent));
        agents.insert(AgentName::Pattern, Arc::new(PatternAgent));
        agents.insert(AgentName::GraphLinking, Arc::new(GraphLinkingAgent));
        agents.insert(AgentName::PatternDetection, Arc::new(PatternDetectionAgent));
        agents.insert(AgentName::FeedbackLearning, Arc::new(FeedbackLearningAgent));
        agents.insert(AgentName::LogseqExport, Arc::new(LogseqExportAgent));
        Self { agents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::{new_id, Scope};

    fn inputs(content: &str) -> AgentRunInputs {
        AgentRunInputs {
            organization_id: new_id(),
            memory_id: new_id(),
            storage_tier: "long_term".into(),
            content: content.to_string(),
            classification: "general".into(),
            scope: Scope::Personal,
            scope_id: None,
            prior_enrichment: json!({}),
            feedback_fingerprint: "0:".into(),
        }
    }

    #[tokio::test]
    async fn classification_agent_rejects_empty_content_as_execution_error() {
        let agent = ClassificationAgent;
        let err = agent.run(&inputs("")).await.unwrap_err();
        assert!(matches!(err, AgentError::Execution(_)));
    }

    #[tokio::test]
    async fn classification_agent_labels_incident_keywords() {
        let agent = ClassificationAgent;
        let result = agent.run(&inputs("there was a bug in production")).await.unwrap();
        assert_eq!(result.outputs.get("classification").unwrap(), "incident");
    }

    #[tokio::test]
    async fn feedback_learning_agent_skips_when_no_pending_feedback() {
        let agent = FeedbackLearningAgent;
        let result = agent.run(&inputs("x")).await.unwrap();
        assert_eq!(result.status, AgentRunStatus::Skipped);
    }

    #[test]
    fn registry_resolves_all_eight_agents() {
        let registry = AgentRegistry::default();
        for name in [
            AgentName::Classification,
            AgentName::Metadata,
            AgentName::Topic,
            AgentName::Pattern,
            AgentName::GraphLinking,
            AgentName::PatternDetection,
            AgentName::FeedbackLearning,
            AgentName::LogseqExport,
        ] {
            assert!(registry.get(name).is_some());
        }
    }
}
