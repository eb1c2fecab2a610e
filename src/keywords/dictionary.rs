use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{AnalyzerError, Result};

/// A named keyword set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

impl KeywordCategory {
    /// Occurrences of every keyword in `text`, summed.
    ///
    /// Matching is a literal, case-sensitive substring search. Each keyword
    /// counts its own non-overlapping hits; hits of different keywords may
    /// overlap and are all counted.
    pub fn count_in(&self, text: &str) -> usize {
        self.keywords
            .iter()
            .filter(|keyword| !keyword.is_empty())
            .map(|keyword| text.matches(keyword.as_str()).count())
            .sum()
    }
}

/// On-disk layout: a list of `[[category]]` tables
#[derive(Debug, Deserialize, Serialize)]
struct CategoryFile {
    #[serde(default)]
    category: Vec<KeywordCategory>,
}

/// Ordered keyword categories; order decides ties between equal scores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordDictionary {
    categories: Vec<KeywordCategory>,
}

impl KeywordDictionary {
    /// Built-in categories
    pub fn new() -> Self {
        let defaults = [
            (
                "medical",
                vec![
                    "医師", "医者", "病院", "病気", "診断", "治療", "手術", "入院", "患者", "重症",
                    "症状", "看護師", "救急", "薬", "感染", "検査",
                ],
            ),
            (
                "legal",
                vec![
                    "逮捕", "裁判", "弁護士", "容疑者", "殺人", "事件", "警察", "判決", "起訴", "勝訴",
                    "敗訴", "訴訟", "犯人", "刑務所", "違法", "詐欺",
                ],
            ),
            (
                "daily_surprising",
                vec![
                    "奇跡", "行方不明", "見つかった", "意外", "驚き", "まさか", "信じられない", "偶然",
                    "不思議", "衝撃",
                ],
            ),
        ];

        Self {
            categories: defaults
                .into_iter()
                .map(|(name, keywords)| KeywordCategory {
                    name: name.to_string(),
                    keywords: keywords.into_iter().map(String::from).collect(),
                })
                .collect(),
        }
    }

    /// Build from explicit categories, keeping their order.
    ///
    /// Duplicate keywords inside a category are dropped. Blank or repeated
    /// category names are rejected.
    pub fn from_categories(categories: Vec<KeywordCategory>) -> Result<Self> {
        if categories.is_empty() {
            return Err(AnalyzerError::Configuration("no keyword categories defined".into()));
        }

        let mut names = HashSet::new();
        let mut cleaned = Vec::with_capacity(categories.len());

        for category in categories {
            let name = category.name.trim().to_string();
            if name.is_empty() {
                return Err(AnalyzerError::Configuration("keyword category with empty name".into()));
            }
            if !names.insert(name.clone()) {
                return Err(AnalyzerError::Configuration(format!(
                    "keyword category '{}' defined twice",
                    name
                )));
            }

            let mut seen = HashSet::new();
            let keywords: Vec<String> = category
                .keywords
                .into_iter()
                .filter(|k| !k.is_empty())
                .filter(|k| seen.insert(k.clone()))
                .collect();

            debug!("Category {}: {} keywords", name, keywords.len());
            cleaned.push(KeywordCategory { name, keywords });
        }

        Ok(Self { categories: cleaned })
    }

    /// Parse `[[category]]` tables from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CategoryFile = toml::from_str(content)
            .map_err(|e| AnalyzerError::Configuration(format!("keyword file: {}", e)))?;
        Self::from_categories(file.category)
    }

    /// Load categories from a TOML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let dictionary = Self::from_toml_str(&content)?;
        info!(
            "📚 Loaded {} keyword categories from: {}",
            dictionary.categories.len(),
            path.as_ref().display()
        );
        Ok(dictionary)
    }

    /// Serialize back into the file layout
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(&CategoryFile {
            category: self.categories.clone(),
        })
        .map_err(|e| AnalyzerError::Configuration(format!("keyword file: {}", e)))
    }

    pub fn categories(&self) -> &[KeywordCategory] {
        &self.categories
    }

    /// Category names in tie-break order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&KeywordCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Keyword hits for one category; 0 for an unknown name
    pub fn count_in_category(&self, text: &str, name: &str) -> usize {
        self.get(name).map_or(0, |c| c.count_in(text))
    }

    /// Whether `text` mentions any keyword of the category
    pub fn is_category(&self, text: &str, name: &str) -> bool {
        self.count_in_category(text, name) > 0
    }

    /// Names of every category with at least one hit, in dictionary order
    pub fn classify_text(&self, text: &str) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|c| c.count_in(text) > 0)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn get_stats(&self) -> KeywordDictionaryStats {
        KeywordDictionaryStats {
            total_categories: self.categories.len(),
            total_keywords: self.categories.iter().map(|c| c.keywords.len()).sum(),
            category_counts: self
                .categories
                .iter()
                .map(|c| (c.name.clone(), c.keywords.len()))
                .collect(),
        }
    }
}

impl Default for KeywordDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the keyword dictionary
#[derive(Debug, Clone)]
pub struct KeywordDictionaryStats {
    pub total_categories: usize,
    pub total_keywords: usize,
    pub category_counts: Vec<(String, usize)>,
}

impl KeywordDictionaryStats {
    pub fn summary(&self) -> String {
        let counts: Vec<String> = self
            .category_counts
            .iter()
            .map(|(name, n)| format!("{}={}", name, n))
            .collect();
        format!(
            "Keyword Dictionary Statistics:\n\
            - Categories: {}\n\
            - Total keywords: {}\n\
            - Per category: {}",
            self.total_categories,
            self.total_keywords,
            counts.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories() {
        let dict = KeywordDictionary::new();
        let names: Vec<&str> = dict.names().collect();
        assert_eq!(names, vec!["medical", "legal", "daily_surprising"]);

        let stats = dict.get_stats();
        assert_eq!(stats.total_categories, 3);
        assert_eq!(stats.total_keywords, 42);
        assert!(stats.summary().contains("medical=16"));
    }

    #[test]
    fn test_counting_is_substring_based() {
        let dict = KeywordDictionary::new();
        // 医師 twice, 病院 once
        let text = "医師が病院で別の医師と話した";
        assert_eq!(dict.count_in_category(text, "medical"), 3);
        assert_eq!(dict.count_in_category(text, "legal"), 0);
        assert_eq!(dict.count_in_category(text, "unknown"), 0);
        assert!(dict.is_category(text, "medical"));
        assert_eq!(dict.classify_text(text), vec!["medical"]);
    }

    #[test]
    fn test_distinct_keywords_may_overlap() {
        let dict = KeywordDictionary::from_categories(vec![KeywordCategory {
            name: "x".into(),
            keywords: vec!["ab".into(), "abc".into()],
        }])
        .unwrap();
        assert_eq!(dict.count_in_category("abcabc", "x"), 4);
        assert_eq!(dict.count_in_category("ABC", "x"), 0);
    }

    #[test]
    fn test_from_toml() {
        let content = r#"
            [[category]]
            name = "sports"
            keywords = ["goal", "match", "goal"]

            [[category]]
            name = "weather"
            keywords = ["rain"]
        "#;

        let dict = KeywordDictionary::from_toml_str(content).unwrap();
        assert_eq!(dict.categories().len(), 2);
        assert_eq!(dict.get("sports").unwrap().keywords, vec!["goal", "match"]);

        let round_trip = KeywordDictionary::from_toml_str(&dict.to_toml_string().unwrap()).unwrap();
        assert_eq!(round_trip, dict);
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let dup = r#"
            [[category]]
            name = "a"
            keywords = ["x"]
            [[category]]
            name = "a"
            keywords = ["y"]
        "#;
        assert!(matches!(
            KeywordDictionary::from_toml_str(dup),
            Err(AnalyzerError::Configuration(_))
        ));
        assert!(KeywordDictionary::from_toml_str("").is_err());
        assert!(KeywordDictionary::from_toml_str("[[category]]\nname = \" \"\nkeywords = []").is_err());
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.toml");
        std::fs::write(&path, "[[category]]\nname = \"medical\"\nkeywords = [\"手術\"]\n").unwrap();

        let dict = KeywordDictionary::from_file(&path).await.unwrap();
        assert!(dict.is_category("緊急手術", "medical"));

        assert!(KeywordDictionary::from_file(dir.path().join("missing.toml")).await.is_err());
    }
}
