//! Incident grouping
//!
//! Candidate windows arrive time-ordered and dense (hop-spaced); one
//! behavioral episode usually spans several of them. Consecutive candidates
//! within the merge gap collapse into a single incident alert spanning the
//! episode, labeled from its peak-scoring window.

use std::collections::BTreeMap;

use crate::config::DetectionConfig;
use crate::types::{AlertDraft, AlertType, ScoredWindow};

/// Merge time-ordered candidates into incident alerts.
///
/// A gap at or below `incident_merge_gap_minutes` joins the current incident;
/// one minute more starts a new one.
pub fn group_incidents(candidates: &[ScoredWindow], config: &DetectionConfig) -> Vec<AlertDraft> {
    let mut groups: Vec<Vec<&ScoredWindow>> = Vec::new();

    for window in candidates {
        let starts_new = match groups.last() {
            Some(group) => {
                let last_ts = group[group.len() - 1].feature.ts_end;
                (window.feature.ts_end - last_ts).num_minutes() > config.incident_merge_gap_minutes
            }
            None => true,
        };

        if starts_new {
            groups.push(vec![window]);
        } else if let Some(group) = groups.last_mut() {
            group.push(window);
        }
    }

    groups
        .into_iter()
        .map(|group| incident_alert(&group, config))
        .collect()
}

fn incident_alert(group: &[&ScoredWindow], config: &DetectionConfig) -> AlertDraft {
    let start = group[0].feature.ts_end;
    let end = group[group.len() - 1].feature.ts_end;

    // First window with the maximal score represents the incident.
    let mut peak = group[0];
    for window in &group[1..] {
        if window.score > peak.score {
            peak = window;
        }
    }
    let f = &peak.feature;

    let wandering = f.is_quiet && f.room_transitions >= config.wandering_transitions;
    let label = if wandering {
        "night_wandering"
    } else {
        "unusual_activity"
    };

    AlertDraft {
        ts_start: start,
        ts_end: end,
        kind: AlertType::Anomaly,
        label: label.to_string(),
        score: Some(peak.score),
        features: BTreeMap::from([
            ("motion_sum".to_string(), f.motion_sum),
            ("unique_rooms".to_string(), f.unique_rooms as f64),
            ("room_transitions".to_string(), f.room_transitions as f64),
            ("appliance_on_frac".to_string(), f.appliance_on_frac),
            ("is_quiet".to_string(), if f.is_quiet { 1.0 } else { 0.0 }),
        ]),
        explanations: vec![
            if f.is_quiet {
                "High motion during quiet hours".to_string()
            } else {
                "Unusual activity vs routine".to_string()
            },
            if wandering {
                "Frequent room transitions".to_string()
            } else {
                "Activity spike".to_string()
            },
        ],
    }
}
