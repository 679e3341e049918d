//! High score and play count

use serde::{Deserialize, Serialize};

use super::KeyValueStore;
use crate::error::StoreError;

pub const HIGH_SCORE_KEY: &str = "2048_highScore";
pub const GAMES_PLAYED_KEY: &str = "2048_gamesPlayed";

/// What the player keeps between sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecords {
    pub high_score: u64,
    pub games_played: u64,
}

impl PlayerRecords {
    /// Read both records. Missing, unreadable, or garbled values read as 0.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let records = Self {
            high_score: read_count(store, HIGH_SCORE_KEY),
            games_played: read_count(store, GAMES_PLAYED_KEY),
        };
        log::info!(
            "Loaded records: high score {}, {} games played",
            records.high_score,
            records.games_played
        );
        records
    }

    pub fn save_high_score(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        store.set(HIGH_SCORE_KEY, &self.high_score.to_string())
    }

    pub fn save_games_played(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        store.set(GAMES_PLAYED_KEY, &self.games_played.to_string())
    }
}

fn read_count(store: &dyn KeyValueStore, key: &str) -> u64 {
    match store.get(key) {
        Ok(Some(raw)) => parse_count(&raw),
        Ok(None) => 0,
        Err(e) => {
            log::warn!("Failed to read {}: {}", key, e);
            0
        }
    }
}

/// Lenient numeric parse: integers, or the whole part of a non-negative float
fn parse_count(raw: &str) -> u64 {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => n.floor() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_missing_records_are_zero() {
        let store = MemoryStore::new();
        assert_eq!(PlayerRecords::load(&store), PlayerRecords::default());
    }

    #[test]
    fn test_save_and_load() {
        let mut store = MemoryStore::new();
        let records = PlayerRecords {
            high_score: 4096,
            games_played: 7,
        };
        records.save_high_score(&mut store).unwrap();
        records.save_games_played(&mut store).unwrap();

        assert_eq!(store.get(HIGH_SCORE_KEY).unwrap().as_deref(), Some("4096"));
        assert_eq!(PlayerRecords::load(&store), records);
    }

    #[test]
    fn test_garbled_values_read_as_zero() {
        let mut store = MemoryStore::new();
        store.set(HIGH_SCORE_KEY, "lots").unwrap();
        store.set(GAMES_PLAYED_KEY, "-3").unwrap();
        assert_eq!(PlayerRecords::load(&store), PlayerRecords::default());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(" 42 "), 42);
        assert_eq!(parse_count("12.9"), 12);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("NaN"), 0);
        assert_eq!(parse_count("inf"), 0);
    }
}
