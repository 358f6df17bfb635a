//! Alert normalization
//!
//! Every detector emits [`AlertDraft`]s; this module stamps them into the
//! uniform output shape consumers rely on: unique id, serialized timestamps,
//! initial acknowledgment state, household id, and the run's policy context.
//! Alerts are immutable once normalized; lifecycle changes belong downstream.

use uuid::Uuid;

use crate::config::DetectionConfig;
use crate::types::{AckStatus, Alert, AlertDraft, PolicyContext};
use crate::ENGINE_VERSION;

/// Normalizer carrying the run-level fields stamped onto every alert.
pub struct AlertNormalizer {
    household_id: String,
    policy: PolicyContext,
}

impl AlertNormalizer {
    pub fn new(config: &DetectionConfig, household_id: &str) -> Self {
        Self {
            household_id: household_id.to_string(),
            policy: PolicyContext {
                quiet_hours: config.quiet_hours_label(),
                engine_version: ENGINE_VERSION.to_string(),
            },
        }
    }

    /// Normalize one draft into the universal alert shape.
    pub fn normalize(&self, draft: AlertDraft) -> Alert {
        Alert {
            id: Uuid::new_v4().to_string(),
            ts_start: draft.ts_start.to_rfc3339(),
            ts_end: draft.ts_end.to_rfc3339(),
            kind: draft.kind,
            label: draft.label,
            score: draft.score,
            features: draft.features,
            explanations: draft.explanations,
            snoozed_until: None,
            ack_status: AckStatus::New,
            household_id: self.household_id.clone(),
            policy_context: self.policy.clone(),
        }
    }

    /// Normalize a batch, preserving order.
    pub fn normalize_all(&self, drafts: Vec<AlertDraft>) -> Vec<Alert> {
        drafts.into_iter().map(|d| self.normalize(d)).collect()
    }
}
