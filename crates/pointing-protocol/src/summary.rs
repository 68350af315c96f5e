//! Estimation scale and per-round statistics.

use serde::{Deserialize, Serialize};

use crate::GameState;

/// The fixed set of point values players may vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstimationScale(Vec<u32>);

impl EstimationScale {
    /// Builds a scale from arbitrary values. Zero is dropped, the rest is
    /// sorted and deduplicated.
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        let mut values: Vec<u32> = values.into();
        values.retain(|v| *v > 0);
        values.sort_unstable();
        values.dedup();
        Self(values)
    }

    pub fn values(&self) -> &[u32] {
        &self.0
    }

    pub fn contains(&self, points: u32) -> bool {
        self.0.binary_search(&points).is_ok()
    }

    /// The scale value nearest to `value`. Ties go to the smaller value.
    pub fn closest(&self, value: f64) -> Option<u32> {
        self.0.iter().copied().fold(None, |best, candidate| match best {
            Some(b) if (f64::from(b) - value).abs() <= (f64::from(candidate) - value).abs() => {
                Some(b)
            }
            _ => Some(candidate),
        })
    }
}

impl Default for EstimationScale {
    fn default() -> Self {
        Self(vec![1, 2, 3, 5, 8, 13])
    }
}

/// Statistics for the current round.
///
/// Only point votes count toward the average and distribution; abstain
/// and unset rows are tallied separately. Whether to show any of this
/// while votes are hidden is the caller's call.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    /// Players with a point vote.
    pub voted: usize,
    /// Players who abstained.
    pub abstained: usize,
    /// Players who have not voted yet.
    pub waiting: usize,
    /// Mean of point votes, rounded to one decimal place.
    pub average: Option<f64>,
    /// Scale value closest to `average`.
    pub closest: Option<u32>,
    /// `(scale value, number of votes)` for every value on the scale.
    /// Votes off the scale are counted in `voted` but not here.
    pub distribution: Vec<(u32, usize)>,
}

impl RoundSummary {
    /// Summarizes `state` against `scale`.
    pub fn of(state: &GameState, scale: &EstimationScale) -> Self {
        let points: Vec<u32> = state
            .players
            .values()
            .filter_map(|entry| entry.vote.points())
            .collect();
        let abstained = state
            .players
            .values()
            .filter(|entry| matches!(entry.vote, crate::Vote::Abstain))
            .count();
        let waiting = state.player_count() - points.len() - abstained;

        let average = if points.is_empty() {
            None
        } else {
            let sum: u64 = points.iter().map(|p| u64::from(*p)).sum();
            let mean = sum as f64 / points.len() as f64;
            Some((mean * 10.0).round() / 10.0)
        };
        let closest = average.and_then(|avg| scale.closest(avg));
        let distribution = scale
            .values()
            .iter()
            .map(|value| (*value, points.iter().filter(|p| *p == value).count()))
            .collect();

        Self {
            voted: points.len(),
            abstained,
            waiting,
            average,
            closest,
            distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlayerEntry, PlayerId, Vote};

    fn state_with(votes: &[Vote]) -> GameState {
        let mut state = GameState::default();
        for (i, vote) in votes.iter().enumerate() {
            state.players.insert(
                PlayerId(format!("p{i}")),
                PlayerEntry {
                    name: format!("player {i}"),
                    vote: *vote,
                },
            );
        }
        state
    }

    #[test]
    fn test_scale_default_values() {
        assert_eq!(EstimationScale::default().values(), &[1, 2, 3, 5, 8, 13]);
    }

    #[test]
    fn test_scale_new_sorts_dedups_and_drops_zero() {
        let scale = EstimationScale::new(vec![8, 0, 3, 3, 1]);
        assert_eq!(scale.values(), &[1, 3, 8]);
        assert!(scale.contains(3));
        assert!(!scale.contains(0));
    }

    #[test]
    fn test_scale_closest_prefers_smaller_on_tie() {
        let scale = EstimationScale::default();
        assert_eq!(scale.closest(4.0), Some(3));
        assert_eq!(scale.closest(4.1), Some(5));
        assert_eq!(scale.closest(100.0), Some(13));
        assert_eq!(EstimationScale::new(Vec::new()).closest(1.0), None);
    }

    #[test]
    fn test_summary_matches_mock_round() {
        // Holly 3, Flynn 5, Marie 5, Mike 2.
        let state = state_with(&[
            Vote::Points(3),
            Vote::Points(5),
            Vote::Points(5),
            Vote::Points(2),
        ]);

        let summary = RoundSummary::of(&state, &EstimationScale::default());

        assert_eq!(summary.voted, 4);
        assert_eq!(summary.average, Some(3.8));
        assert_eq!(summary.closest, Some(3));
        assert_eq!(
            summary.distribution,
            vec![(1, 0), (2, 1), (3, 1), (5, 2), (8, 0), (13, 0)]
        );
    }

    #[test]
    fn test_summary_excludes_abstain_and_unset() {
        let state = state_with(&[Vote::Points(8), Vote::Abstain, Vote::Unset]);

        let summary = RoundSummary::of(&state, &EstimationScale::default());

        assert_eq!(summary.voted, 1);
        assert_eq!(summary.abstained, 1);
        assert_eq!(summary.waiting, 1);
        assert_eq!(summary.average, Some(8.0));
        assert_eq!(summary.closest, Some(8));
    }

    #[test]
    fn test_summary_of_empty_round() {
        let summary = RoundSummary::of(&state_with(&[Vote::Unset]), &EstimationScale::default());
        assert_eq!(summary.average, None);
        assert_eq!(summary.closest, None);
        assert_eq!(summary.waiting, 1);
    }
}
