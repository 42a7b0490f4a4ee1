//! Single-player missions layered on top of a normal game.
//!
//! A challenge is played by the first player of the roster. It can end the
//! game early (a score target), cap its length (a year limit) and grades the
//! result with stars when the game ends.

use serde::{Deserialize, Serialize};

/// Mission parameters, evaluated at the end of every round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub key: String,
    /// Replaces the ruleset's starting funds for every player.
    #[serde(default)]
    pub initial_funds: Option<i32>,
    /// The game ends once this year is over.
    #[serde(default)]
    pub max_years: Option<i16>,
    /// The challenger wins as soon as its score reaches this value.
    #[serde(default)]
    pub target_score: Option<i32>,
    /// Ascending score thresholds; one star per threshold reached.
    #[serde(default)]
    pub stars: Vec<i32>,
}

impl Challenge {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_owned(),
            initial_funds: None,
            max_years: None,
            target_score: None,
            stars: Vec::new(),
        }
    }

    pub fn target_reached(&self, score: i32) -> bool {
        self.target_score.is_some_and(|target| score >= target)
    }

    /// Whether the calendar has run past the year limit.
    pub fn out_of_time(&self, year: i16) -> bool {
        self.max_years.is_some_and(|max| year > max)
    }

    /// Stars earned by a final score.
    pub fn stars_for(&self, score: i32) -> u8 {
        let earned = self.stars.iter().filter(|threshold| score >= **threshold).count();
        earned.min(u8::MAX as usize) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_count_thresholds_reached() {
        let challenge = Challenge {
            stars: vec![5, 10, 20],
            ..Challenge::new("tutorial")
        };
        assert_eq!(challenge.stars_for(0), 0);
        assert_eq!(challenge.stars_for(10), 2);
        assert_eq!(challenge.stars_for(99), 3);
    }

    #[test]
    fn limits_are_optional() {
        let challenge: Challenge = serde_json::from_str(r#"{"key":"open"}"#).unwrap();
        assert!(!challenge.target_reached(i32::MAX));
        assert!(!challenge.out_of_time(i16::MAX));

        let timed = Challenge {
            max_years: Some(3),
            target_score: Some(12),
            ..challenge
        };
        assert!(timed.out_of_time(4));
        assert!(!timed.out_of_time(3));
        assert!(timed.target_reached(12));
    }
}
