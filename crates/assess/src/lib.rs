use model::{ActorState, Status, ThreatCandidate, ThresholdConfig};
use tracing::debug;

/// Lane width assumed when the map has no answer at the ego position.
pub const DEFAULT_LANE_WIDTH: f64 = 3.5;

/// Up to `k` other actors ordered by 3D distance from the ego, ascending.
///
/// The ego itself is excluded by id. Ties keep the input enumeration order
/// (stable sort). An empty input yields an empty output.
pub fn nearest_vehicles(
    ego: &ActorState,
    others: &[ActorState],
    k: usize,
) -> Vec<(ActorState, f64)> {
    let mut ranked: Vec<(ActorState, f64)> = others
        .iter()
        .filter(|other| other.id != ego.id)
        .map(|other| (*other, ego.position.distance(other.position)))
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(k);
    ranked
}

/// Outcome of one frame of threat assessment. The surviving candidates are
/// kept around just long enough for diagnostics, then dropped with the frame.
#[derive(Debug, Clone)]
pub struct ThreatAssessment {
    pub status: Status,
    pub min_ttc: Option<f64>,
    pub candidates: Vec<ThreatCandidate>,
}

/// Classify the collision risk of the ego against `others`.
///
/// `lane_width` comes from the caller's map query; `None` falls back to
/// [`DEFAULT_LANE_WIDTH`]. Deterministic given its inputs.
pub fn classify(
    ego: &ActorState,
    others: &[ActorState],
    lane_width: Option<f64>,
    cfg: &ThresholdConfig,
) -> ThreatAssessment {
    if others.is_empty() {
        return ThreatAssessment {
            status: Status::Activated,
            min_ttc: None,
            candidates: Vec::new(),
        };
    }

    let forward = ego.orientation.forward().normalized();
    let right = ego.orientation.right().normalized();
    let lane_width = lane_width.unwrap_or(DEFAULT_LANE_WIDTH);
    let lateral_limit = 0.5 * lane_width + cfg.lateral_margin;

    let mut candidates = Vec::with_capacity(others.len());
    for other in others {
        let rel = other.position - ego.position;
        let longitudinal = rel.dot(forward);
        // Behind or overlapping the ego.
        if longitudinal <= 0.0 {
            continue;
        }
        let lateral = rel.dot(right);
        // Not in (roughly) the same lane.
        if lateral.abs() > lateral_limit {
            continue;
        }
        let closing_speed = (ego.velocity - other.velocity).dot(forward);
        // Not closing, or closing negligibly.
        if closing_speed <= cfg.min_closing_speed {
            continue;
        }
        let ttc = longitudinal / closing_speed;
        debug!(
            other = other.id,
            longitudinal, lateral, closing_speed, ttc, "ttc candidate"
        );
        candidates.push(ThreatCandidate {
            actor_id: other.id,
            longitudinal,
            lateral,
            closing_speed,
            ttc,
        });
    }

    let min_ttc = candidates
        .iter()
        .map(|c| c.ttc)
        .fold(f64::INFINITY, f64::min);
    if candidates.is_empty() {
        return ThreatAssessment {
            status: Status::Activated,
            min_ttc: None,
            candidates,
        };
    }
    ThreatAssessment {
        status: classify_ttc(min_ttc, cfg),
        min_ttc: Some(min_ttc),
        candidates,
    }
}

/// Map a minimum TTC onto a status level. Comparisons are strict, so a TTC
/// sitting exactly on a threshold classifies into the milder band.
pub fn classify_ttc(ttc: f64, cfg: &ThresholdConfig) -> Status {
    if ttc < cfg.ttc_strong_braking {
        Status::StrongBraking
    } else if ttc < cfg.ttc_mild_braking {
        Status::MildBraking
    } else if ttc < cfg.ttc_warning {
        Status::Warning
    } else {
        Status::Activated
    }
}
