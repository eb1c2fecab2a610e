use std::collections::BTreeMap;
use std::fmt;

/// Result type for analyzer operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Error types for the acquisition and scoring pipeline
#[derive(thiserror::Error, Debug)]
pub enum AnalyzerError {
    /// Network, timeout or HTTP failure on a single batch, page or caption request
    #[error("Transient fetch error: {0}")]
    TransientFetch(String),

    /// Response did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Malformed duration: {0:?}")]
    MalformedDuration(String),

    /// Missing credential, empty seed set and similar; fatal before any external call
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for AnalyzerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AnalyzerError::MalformedResponse(err.to_string())
        } else {
            AnalyzerError::TransientFetch(err.to_string())
        }
    }
}

/// Pipeline stage a skipped unit of work belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureStage {
    SeedBatch,
    SeedItem,
    ListingPage,
    ListingItem,
    DetailBatch,
    DetailItem,
    Duration,
    Caption,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureStage::SeedBatch => "seed batches",
            FailureStage::SeedItem => "seed items",
            FailureStage::ListingPage => "listing pages",
            FailureStage::ListingItem => "listing items",
            FailureStage::DetailBatch => "detail batches",
            FailureStage::DetailItem => "detail items",
            FailureStage::Duration => "durations",
            FailureStage::Caption => "captions",
        };
        f.write_str(label)
    }
}

/// Counts of units skipped during a run, reported once at the end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureTally {
    counts: BTreeMap<FailureStage, usize>,
}

impl FailureTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: FailureStage) {
        self.record_many(stage, 1);
    }

    pub fn record_many(&mut self, stage: FailureStage, count: usize) {
        if count > 0 {
            *self.counts.entry(stage).or_insert(0) += count;
        }
    }

    pub fn count(&self, stage: FailureStage) -> usize {
        self.counts.get(&stage).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for FailureTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no failures");
        }
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(stage, count)| format!("{} {}", count, stage))
            .collect();
        write!(f, "failed: {}", parts.join(", "))
    }
}
