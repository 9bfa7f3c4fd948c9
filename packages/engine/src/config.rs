use chrono::Duration;

use crate::domains::requests::models::Urgency;

/// Weights for the composite match score.
///
/// Tuning happens here, not in the scorer: the score is a weighted sum of
/// inverse distance, skill overlap, urgency boost and normalized rating.
/// Defaults let skill overlap dominate distance so a skilled volunteer a bit
/// further out beats an unskilled one next door.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchWeights {
    pub distance: f64,
    pub skills: f64,
    pub urgency: f64,
    pub rating: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            distance: 0.3,
            skills: 0.4,
            urgency: 0.2,
            rating: 0.1,
        }
    }
}

/// How long a volunteer has to answer a pending offer, per urgency level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseDeadlines {
    pub critical: Duration,
    pub high: Duration,
    pub medium: Duration,
    pub low: Duration,
}

impl Default for ResponseDeadlines {
    fn default() -> Self {
        Self {
            critical: Duration::minutes(2),
            high: Duration::minutes(5),
            medium: Duration::minutes(15),
            low: Duration::hours(1),
        }
    }
}

impl ResponseDeadlines {
    pub fn for_urgency(&self, urgency: Urgency) -> Duration {
        match urgency {
            Urgency::Critical => self.critical,
            Urgency::High => self.high,
            Urgency::Medium => self.medium,
            Urgency::Low => self.low,
        }
    }
}

/// Engine-wide matching configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub weights: MatchWeights,
    pub deadlines: ResponseDeadlines,
    /// Radius multiplier applied to every volunteer's service radius for
    /// SOS requests.
    pub sos_radius_multiplier: f64,
    /// A volunteer who declined (or let expire) an offer for a request is
    /// not re-offered that request within this window, unless nobody else
    /// is left.
    pub rejection_cooldown: Duration,
    /// Internal retries of `offer()` on a benign concurrent-write conflict.
    pub offer_conflict_retries: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            weights: MatchWeights::default(),
            deadlines: ResponseDeadlines::default(),
            sos_radius_multiplier: 1.5,
            rejection_cooldown: Duration::minutes(30),
            offer_conflict_retries: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_let_skills_dominate_distance() {
        let w = MatchWeights::default();
        assert!(w.skills > w.distance);
    }

    #[test]
    fn deadlines_scale_inversely_with_urgency() {
        let d = ResponseDeadlines::default();
        assert!(d.for_urgency(Urgency::Critical) < d.for_urgency(Urgency::High));
        assert!(d.for_urgency(Urgency::High) < d.for_urgency(Urgency::Medium));
        assert!(d.for_urgency(Urgency::Medium) < d.for_urgency(Urgency::Low));
        assert_eq!(d.for_urgency(Urgency::Critical), Duration::minutes(2));
    }
}
