//! In-memory context store implementation

use async_trait::async_trait;
use praytell_core::{ContextStore, NearTextQuery, NewRecord, RecordFields, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Stored record with pre-computed word set
#[derive(Debug, Clone)]
struct StoredRecord {
    id: String,
    fields: RecordFields,
    /// Pre-computed set of words for keyword matching
    words: HashSet<String>,
}

/// Category name -> records in insertion order
type RecordStore = HashMap<String, Vec<StoredRecord>>;

/// In-memory implementation of the context store.
///
/// "Nearest" is approximated by keyword overlap between the query concepts
/// and the string fields of each record; ties keep insertion order. Suitable
/// for tests and local development. For semantic search, use the Weaviate
/// store.
///
/// Thread-safe.
#[derive(Clone, Default)]
pub struct InMemoryContextStore {
    store: Arc<RwLock<RecordStore>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert arbitrary fields under a category, e.g. to seed a collection
    /// whose schema differs from persisted turns.
    pub fn insert_fields(&self, category: &str, fields: RecordFields) -> String {
        let id = Uuid::new_v4().to_string();

        let mut words = HashSet::new();
        for value in fields.values() {
            if let Some(text) = value.as_str() {
                words.extend(extract_words(text));
            }
        }

        let mut store = self.store.write().unwrap();
        store.entry(category.to_string()).or_default().push(StoredRecord {
            id: id.clone(),
            fields,
            words,
        });

        id
    }

    /// Number of records held under a category
    pub fn len(&self, category: &str) -> usize {
        self.store
            .read()
            .unwrap()
            .get(category)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, category: &str) -> bool {
        self.len(category) == 0
    }

    /// Look up a record's fields by id
    pub fn get(&self, category: &str, id: &str) -> Option<RecordFields> {
        let store = self.store.read().unwrap();
        store
            .get(category)?
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.fields.clone())
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn insert(&self, record: NewRecord) -> Result<String> {
        Ok(self.insert_fields(&record.category, record.properties))
    }

    async fn nearest_text(&self, query: NearTextQuery) -> Result<Vec<RecordFields>> {
        let mut query_words = HashSet::new();
        for concept in &query.concepts {
            query_words.extend(extract_words(concept));
        }

        let store = self.store.read().unwrap();

        let records = match store.get(&query.category) {
            Some(records) => records,
            None => return Ok(vec![]),
        };

        let mut scored: Vec<(usize, &StoredRecord)> = records
            .iter()
            .map(|record| (count_word_overlap(&record.words, &query_words), record))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(query.limit)
            .map(|(_, record)| project(&record.fields, &query.fields))
            .collect())
    }
}

/// Keep only the requested fields, as a store query would
fn project(fields: &RecordFields, requested: &[String]) -> RecordFields {
    requested
        .iter()
        .filter_map(|name| fields.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}

/// Extract words from text for keyword matching.
///
/// Words are:
/// - Split by whitespace
/// - Stripped of surrounding punctuation
/// - Converted to lowercase
/// - Non-empty
fn extract_words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Count the words two sets share, iterating over the smaller set.
fn count_word_overlap(words1: &HashSet<String>, words2: &HashSet<String>) -> usize {
    let (smaller, larger) = if words1.len() < words2.len() {
        (words1, words2)
    } else {
        (words2, words1)
    };

    smaller.iter().filter(|word| larger.contains(*word)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use praytell_core::CategoryConfig;
    use serde_json::json;

    fn turn(body: &str) -> NewRecord {
        NewRecord {
            category: "Praytell2".to_string(),
            properties: CategoryConfig::chat_turns().turn_fields(
                body,
                "user",
                "New York, USA",
                "2024-01-01T00:00:00Z",
            ),
        }
    }

    fn query(text: &str, limit: usize) -> NearTextQuery {
        NearTextQuery {
            category: "Praytell2".to_string(),
            fields: vec!["body".to_string(), "location".to_string(), "datetime".to_string()],
            concepts: vec![text.to_string()],
            limit,
        }
    }

    #[test]
    fn test_extract_words() {
        let words = extract_words("What time is the Service?");
        assert_eq!(words.len(), 5);
        assert!(words.contains("service"));
        assert!(words.contains("what"));
    }

    #[test]
    fn test_word_overlap() {
        let a = extract_words("hello big world");
        let b = extract_words("world hello");
        assert_eq!(count_word_overlap(&a, &b), 2);
        assert_eq!(count_word_overlap(&a, &HashSet::new()), 0);
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let store = InMemoryContextStore::new();
        let first = store.insert(turn("one")).await.unwrap();
        let second = store.insert(turn("two")).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.len("Praytell2"), 2);
        assert_eq!(store.get("Praytell2", &first).unwrap()["body"], "one");
    }

    #[tokio::test]
    async fn test_ranking_and_limit() {
        let store = InMemoryContextStore::new();
        store.insert(turn("the weather is nice")).await.unwrap();
        store.insert(turn("service starts at 9am every sunday")).await.unwrap();
        store.insert(turn("what time is the evening service")).await.unwrap();

        let hits = store.nearest_text(query("What time is the service?", 2)).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0]["body"], "what time is the evening service");
        assert_eq!(hits[1]["body"], "the weather is nice");
    }

    #[tokio::test]
    async fn test_projects_requested_fields_only() {
        let store = InMemoryContextStore::new();
        store.insert(turn("morning service")).await.unwrap();

        let mut q = query("service", 3);
        q.fields = vec!["body".to_string()];
        let hits = store.nearest_text(q).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].len(), 1);
        assert!(hits[0].get("role").is_none());
    }

    #[tokio::test]
    async fn test_categories_are_isolated() {
        let store = InMemoryContextStore::new();
        store.insert(turn("service times")).await.unwrap();
        store.insert_fields(
            "Message",
            json!({ "content": "service times" }).as_object().cloned().unwrap(),
        );

        let mut q = query("service", 3);
        q.category = "Message".to_string();
        q.fields = vec!["content".to_string()];
        let hits = store.nearest_text(q).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["content"], "service times");
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = InMemoryContextStore::new();
        let hits = store.nearest_text(query("anything", 3)).await.unwrap();
        assert!(hits.is_empty());
    }
}
