use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::KeywordDictionary;

/// Floor for the minutes divisor so zero-length videos do not divide by zero
pub const RATE_EPSILON_MINUTES: f64 = 1e-6;

/// Primary category of a video without any keyword hit
pub const NO_CATEGORY: &str = "none";

/// Raw hit count for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMatch {
    pub category: String,
    pub count: usize,
    pub matched: bool,
}

/// Count plus duration-normalized rate for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub name: String,
    pub count: usize,
    pub per_minute: f64,
}

/// Scores of one video, in dictionary order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub scores: Vec<CategoryScore>,
}

impl ScoreRow {
    pub fn get(&self, name: &str) -> Option<&CategoryScore> {
        self.scores.iter().find(|s| s.name == name)
    }
}

/// Per-minute rate of `count` hits over `duration_seconds`
pub fn per_minute_rate(count: usize, duration_seconds: u64) -> f64 {
    let minutes = (duration_seconds as f64 / 60.0).max(RATE_EPSILON_MINUTES);
    count as f64 / minutes
}

/// Duration-normalized keyword scoring over a fixed dictionary
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    dictionary: Arc<KeywordDictionary>,
    threshold: f64,
}

impl KeywordScorer {
    pub fn new(dictionary: Arc<KeywordDictionary>, threshold: f64) -> Self {
        Self { dictionary, threshold }
    }

    pub fn dictionary(&self) -> &KeywordDictionary {
        &self.dictionary
    }

    /// Configured classification threshold. No scoring rule consults it.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn classify(&self, text: &str) -> Vec<CategoryMatch> {
        self.dictionary
            .categories()
            .iter()
            .map(|category| {
                let count = category.count_in(text);
                CategoryMatch {
                    category: category.name.clone(),
                    count,
                    matched: count > 0,
                }
            })
            .collect()
    }

    pub fn score(&self, text: &str, duration_seconds: u64) -> ScoreRow {
        ScoreRow {
            scores: self
                .classify(text)
                .into_iter()
                .map(|m| CategoryScore {
                    per_minute: per_minute_rate(m.count, duration_seconds),
                    name: m.category,
                    count: m.count,
                })
                .collect(),
        }
    }

    /// Category with the highest rate; the earliest wins a tie.
    /// [`NO_CATEGORY`] when nothing scored above zero.
    pub fn primary_category(row: &ScoreRow) -> String {
        let mut best: Option<&CategoryScore> = None;
        for score in &row.scores {
            if best.map_or(true, |b| score.per_minute > b.per_minute) {
                best = Some(score);
            }
        }

        match best {
            Some(score) if score.per_minute > 0.0 => score.name.clone(),
            _ => NO_CATEGORY.to_string(),
        }
    }
}
