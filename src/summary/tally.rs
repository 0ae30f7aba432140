use std::collections::HashMap;
use std::time::Instant;

use indexmap::IndexMap;
use serde_json::Value;

/// Counts of written records, merged from every producer.
#[derive(Debug, Default, Clone)]
pub struct Tally {
    /// Records per input source (file stem or `stdin`)
    pub by_source: HashMap<String, usize>,

    /// Records per category; `None` collects records without one
    pub by_category: HashMap<Option<String>, usize>,

    /// Input files abandoned at a value that was not valid JSON
    pub malformed_inputs: usize,

    pub started: Option<Instant>,
    pub final_elapsed_secs: Option<f64>,
}

impl Tally {
    pub fn new() -> Self {
        Self {
            started: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Count one committed record.
    pub fn record(&mut self, source: &str, category: Option<String>) {
        *self.by_source.entry(source.to_string()).or_default() += 1;
        *self.by_category.entry(category).or_default() += 1;
    }

    /// Fold a partial tally from one producer into this one.
    pub fn merge(&mut self, other: Self) {
        for (source, count) in other.by_source {
            *self.by_source.entry(source).or_default() += count;
        }
        for (category, count) in other.by_category {
            *self.by_category.entry(category).or_default() += count;
        }
        self.malformed_inputs += other.malformed_inputs;
    }

    pub fn written(&self) -> usize {
        self.by_source.values().sum()
    }

    pub fn uncategorized(&self) -> usize {
        self.by_category.get(&None).copied().unwrap_or(0)
    }

    /// Sources sorted by name.
    pub fn sources(&self) -> IndexMap<String, usize> {
        let mut sources: Vec<_> = self
            .by_source
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        sources.sort();
        sources.into_iter().collect()
    }

    /// Categories sorted by name, without the uncategorized bucket.
    pub fn categories(&self) -> IndexMap<String, usize> {
        let mut categories: Vec<_> = self
            .by_category
            .iter()
            .filter_map(|(name, count)| name.clone().map(|n| (n, *count)))
            .collect();
        categories.sort();
        categories.into_iter().collect()
    }

    /// Freeze the elapsed time
    pub fn mark_complete(&mut self) {
        self.final_elapsed_secs = Some(self.started.map_or(0.0, |s| s.elapsed().as_secs_f64()));
    }

    pub fn elapsed_secs(&self) -> f64 {
        if let Some(frozen) = self.final_elapsed_secs {
            return frozen;
        }
        self.started.map_or(0.0, |s| s.elapsed().as_secs_f64())
    }
}

/// Reads the category of a record from `key`. Only strings and numbers count.
pub fn category_of(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === record() / merge() tests ===

    #[test]
    fn test_record_counts_source_and_category() {
        let mut tally = Tally::new();
        tally.record("aad", Some("user".to_string()));
        tally.record("aad", Some("group".to_string()));
        tally.record("arm", Some("user".to_string()));

        assert_eq!(tally.written(), 3);
        assert_eq!(tally.by_source["aad"], 2);
        assert_eq!(tally.by_category[&Some("user".to_string())], 2);
    }

    #[test]
    fn test_merge_adds_counts() {
        let mut total = Tally::new();
        total.record("a", Some("x".to_string()));

        let mut part = Tally::default();
        part.record("a", Some("x".to_string()));
        part.record("b", None);
        part.malformed_inputs = 1;

        total.merge(part);

        assert_eq!(total.written(), 3);
        assert_eq!(total.by_source["a"], 2);
        assert_eq!(total.uncategorized(), 1);
        assert_eq!(total.malformed_inputs, 1);
    }

    // === sources() / categories() tests ===

    #[test]
    fn test_categories_exclude_missing() {
        let mut tally = Tally::new();
        tally.record("s", None);
        tally.record("s", Some("vm".to_string()));

        let categories = tally.categories();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories["vm"], 1);
        assert_eq!(tally.uncategorized(), 1);
    }

    #[test]
    fn test_sources_sorted_by_name() {
        let mut tally = Tally::new();
        for source in ["zeta", "alpha", "mid"] {
            tally.record(source, None);
        }
        let sources = tally.sources();
        let names: Vec<&str> = sources.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_empty_tally() {
        let tally = Tally::new();
        assert_eq!(tally.written(), 0);
        assert!(tally.sources().is_empty());
        assert!(tally.categories().is_empty());
    }

    // === elapsed tests ===

    #[test]
    fn test_elapsed_frozen_when_complete() {
        let mut tally = Tally::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        tally.mark_complete();
        let frozen = tally.elapsed_secs();

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!((frozen - tally.elapsed_secs()).abs() < f64::EPSILON);
        assert!(frozen >= 0.01);
    }

    // === category_of() tests ===

    #[test]
    fn test_category_of_string() {
        let record = json!({"type": "storageAccount"});
        assert_eq!(category_of(&record, "type"), Some("storageAccount".to_string()));
    }

    #[test]
    fn test_category_of_number() {
        assert_eq!(category_of(&json!({"kind": 7}), "kind"), Some("7".to_string()));
    }

    #[test]
    fn test_category_of_missing_or_unusable() {
        assert_eq!(category_of(&json!({"other": "x"}), "type"), None);
        assert_eq!(category_of(&json!({"type": null}), "type"), None);
        assert_eq!(category_of(&json!({"type": ""}), "type"), None);
        assert_eq!(category_of(&json!({"type": ["a"]}), "type"), None);
        assert_eq!(category_of(&json!([1, 2, 3]), "type"), None);
    }
}
