//! Keyword categories and duration-normalized scoring

pub mod dictionary;
pub mod scorer;

pub use dictionary::{KeywordCategory, KeywordDictionary, KeywordDictionaryStats};
pub use scorer::{
    per_minute_rate, CategoryMatch, CategoryScore, KeywordScorer, ScoreRow, NO_CATEGORY, RATE_EPSILON_MINUTES,
};
