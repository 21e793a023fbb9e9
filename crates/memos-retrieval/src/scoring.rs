//! The eight-component activation scorer (§4.2 Activation scoring).

use crate::model::{ActivationComponents, ContextAffinities};
use chrono::{DateTime, Utc};
use memos_core::config::ActivationWeights;
use memos_store::ActivationState;

/// Exponential recency decay from `reference_at`, using the scorer-owned
/// half-life (distinct from the mode-driven temporal decay applied to the
/// hybrid raw score).
pub fn recency_component(reference_at: Option<DateTime<Utc>>, now: DateTime<Utc>, half_life_days: f64) -> f64 {
    let Some(reference_at) = reference_at else {
        return 0.0;
    };
    let age_days = (now - reference_at).num_milliseconds() as f64 / 86_400_000.0;
    if half_life_days <= 0.0 {
        return 0.0;
    }
    0.5f64.powf(age_days.max(0.0) / half_life_days)
}

pub fn frequency_component(access_count: i64, alpha: f64) -> f64 {
    1.0 - (-alpha * access_count as f64).exp()
}

pub fn confidence_component(confidence: f64, contradicted: bool, contradicted_penalty: f64) -> f64 {
    let penalty = if contradicted { contradicted_penalty } else { 0.0 };
    (confidence * (1.0 - penalty)).clamp(0.0, 1.0)
}

pub fn provenance_component(evidence_link_count: i64, beta: f64) -> f64 {
    1.0 - (-beta * evidence_link_count as f64).exp()
}

pub fn inverse_risk_component(risk_factor: f64) -> f64 {
    (1.0 - risk_factor).clamp(0.0, 1.0)
}

pub struct ScoringInputs<'a> {
    pub hybrid_raw: f64,
    pub activation_state: &'a ActivationState,
    pub context: &'a ContextAffinities,
    pub neighbor_boost: Option<f64>,
    pub now: DateTime<Utc>,
}

/// Computes all eight components plus the final clamped weighted sum.
pub fn score(weights: &ActivationWeights, inputs: &ScoringInputs<'_>) -> (ActivationComponents, f64) {
    let components = ActivationComponents {
        rel: inputs.hybrid_raw.clamp(0.0, 1.0),
        rec: recency_component(
            inputs.activation_state.last_accessed_at,
            inputs.now,
            weights.recency_half_life_days,
        ),
        freq: frequency_component(inputs.activation_state.access_count, weights.freq_alpha),
        imp: inputs.activation_state.base_importance.clamp(0.0, 1.0),
        conf: confidence_component(
            inputs.activation_state.confidence,
            inputs.activation_state.contradicted,
            weights.contradicted_penalty,
        ),
        ctx: inputs.context.mean(),
        prov: provenance_component(inputs.activation_state.evidence_link_count, weights.provenance_beta),
        risk: inverse_risk_component(inputs.activation_state.risk_factor),
        nbr: inputs.neighbor_boost,
    };

    let mut total = weights.weight_rel * components.rel
        + weights.weight_rec * components.rec
        + weights.weight_freq * components.freq
        + weights.weight_imp * components.imp
        + weights.weight_conf * components.conf
        + weights.weight_ctx * components.ctx
        + weights.weight_prov * components.prov
        + weights.weight_risk * components.risk;
    if let Some(nbr) = components.nbr {
        total += weights.weight_nbr * nbr;
    }

    (components, total.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::new_id;

    #[test]
    fn low_confidence_and_contradiction_lowers_activation() {
        let weights = ActivationWeights::default();
        let now = Utc::now();
        let mut nominal = ActivationState::default_for(new_id());
        nominal.confidence = 0.9;
        nominal.contradicted = false;
        let mut low_confidence = nominal.clone();
        low_confidence.confidence = 0.3;
        low_confidence.contradicted = true;

        let context = ContextAffinities::default();
        let (_, nominal_activation) = score(
            &weights,
            &ScoringInputs {
                hybrid_raw: 0.8,
                activation_state: &nominal,
                context: &context,
                neighbor_boost: None,
                now,
            },
        );
        let (_, low_activation) = score(
            &weights,
            &ScoringInputs {
                hybrid_raw: 0.8,
                activation_state: &low_confidence,
                context: &context,
                neighbor_boost: None,
                now,
            },
        );
        assert!(low_activation < nominal_activation);
    }

    #[test]
    fn activation_is_always_clamped() {
        let mut weights = ActivationWeights::default();
        weights.weight_rel = 10.0; // deliberately pathological
        let now = Utc::now();
        let state = ActivationState::default_for(new_id());
        let context = ContextAffinities::default();
        let (_, activation) = score(
            &weights,
            &ScoringInputs {
                hybrid_raw: 1.0,
                activation_state: &state,
                context: &context,
                neighbor_boost: None,
                now,
            },
        );
        assert!((0.0..=1.0).contains(&activation));
    }

    #[test]
    fn frequency_component_saturates_toward_one() {
        let low = frequency_component(1, 0.2);
        let high = frequency_component(1000, 0.2);
        assert!(high > low);
        assert!(high < 1.0);
    }
}
