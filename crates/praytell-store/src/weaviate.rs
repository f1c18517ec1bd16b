//! Weaviate context store
//!
//! Inserts go through the REST objects endpoint, similarity search through
//! a GraphQL `Get` query with a `nearText` filter.

use async_trait::async_trait;
use praytell_core::{ContextStore, Error, NearTextQuery, NewRecord, RecordFields, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Weaviate connection settings
#[derive(Clone, Debug)]
pub struct WeaviateConfig {
    /// Base endpoint, scheme://host[:port]
    pub endpoint: Url,
    pub api_key: Option<String>,
    /// Bound on every request to the store
    pub timeout: Duration,
}

impl WeaviateConfig {
    /// Parse an endpoint such as `http://192.168.1.10:8080`.
    ///
    /// A bare `host:port` is taken as plain http.
    pub fn from_endpoint(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        let with_scheme = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| Error::config_error(format!("Invalid store URL '{}': {}", endpoint, e)))?;

        if url.host_str().is_none() {
            return Err(Error::config_error(format!(
                "Store URL '{}' has no host",
                endpoint
            )));
        }

        Ok(Self {
            endpoint: url,
            api_key: None,
            timeout,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

pub struct WeaviateStore {
    client: Client,
    config: WeaviateConfig,
}

#[derive(Debug, Deserialize)]
struct ObjectResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

impl WeaviateStore {
    pub fn new(config: WeaviateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.as_str().trim_end_matches('/'),
            path
        )
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(self.endpoint(path));
        match self.config.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn describe(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::store(format!(
                "Request timed out after {:?}",
                self.config.timeout
            ))
        } else {
            Error::store(format!("Request failed: {}", err))
        }
    }
}

#[async_trait]
impl ContextStore for WeaviateStore {
    fn name(&self) -> &str {
        "weaviate"
    }

    async fn insert(&self, record: NewRecord) -> Result<String> {
        validate_identifier(&record.category)?;

        let body = json!({
            "class": record.category,
            "properties": record.properties,
        });

        let response = self
            .post("v1/objects")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.describe(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::store(format!(
                "Weaviate API error {}: {}",
                status, error_text
            )));
        }

        let created: ObjectResponse = response
            .json()
            .await
            .map_err(|e| Error::store(format!("Failed to parse insert response: {}", e)))?;

        Ok(created.id)
    }

    async fn nearest_text(&self, query: NearTextQuery) -> Result<Vec<RecordFields>> {
        let graphql = build_near_text_query(&query)?;

        let response = self
            .post("v1/graphql")
            .json(&json!({ "query": graphql }))
            .send()
            .await
            .map_err(|e| self.describe(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::store(format!(
                "Weaviate API error {}: {}",
                status, error_text
            )));
        }

        let parsed: GraphQLResponse = response
            .json()
            .await
            .map_err(|e| Error::store(format!("Failed to parse search response: {}", e)))?;

        extract_hits(parsed, &query.category)
    }
}

/// Build `{ Get { Class(nearText: {concepts: [...]}, limit: N) { fields } } }`
fn build_near_text_query(query: &NearTextQuery) -> Result<String> {
    validate_identifier(&query.category)?;
    for field in &query.fields {
        validate_identifier(field)?;
    }
    if query.fields.is_empty() {
        return Err(Error::store("At least one field must be requested"));
    }

    // JSON string literals are valid GraphQL string literals
    let concepts = query
        .concepts
        .iter()
        .map(|c| serde_json::to_string(c))
        .collect::<std::result::Result<Vec<_>, _>>()?
        .join(", ");

    Ok(format!(
        "{{ Get {{ {}(nearText: {{concepts: [{}]}}, limit: {}) {{ {} }} }} }}",
        query.category,
        concepts,
        query.limit,
        query.fields.join(" ")
    ))
}

fn extract_hits(response: GraphQLResponse, category: &str) -> Result<Vec<RecordFields>> {
    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::store(format!(
            "GraphQL query failed: {}",
            messages.join("; ")
        )));
    }

    let hits = response
        .data
        .as_ref()
        .and_then(|d| d.get("Get"))
        .and_then(|g| g.get(category))
        .ok_or_else(|| Error::store(format!("Missing Get.{} in search response", category)))?;

    match hits {
        serde_json::Value::Null => Ok(vec![]),
        serde_json::Value::Array(items) => Ok(items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect()),
        _ => Err(Error::store(format!(
            "Unexpected Get.{} shape in search response",
            category
        ))),
    }
}

/// Class and property names are spliced into GraphQL text, so only plain
/// identifiers are accepted.
fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::store(format!("Invalid identifier '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use praytell_core::CategoryConfig;
    use std::sync::{Arc, Mutex};

    /// Authorization header and JSON body of every request served
    type Seen = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    /// Serve `reply` on `path` after `delay`, recording each request
    async fn serve(
        path: &'static str,
        status: StatusCode,
        reply: serde_json::Value,
        delay: Duration,
    ) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let recorder = seen.clone();
        let app = Router::new().route(
            path,
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let recorder = recorder.clone();
                let reply = reply.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    recorder.lock().unwrap().push((auth, body));
                    tokio::time::sleep(delay).await;
                    (status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", address), seen)
    }

    fn client(url: &str, timeout: Duration) -> WeaviateStore {
        let config = WeaviateConfig::from_endpoint(url, timeout)
            .unwrap()
            .with_api_key("secret-key");
        WeaviateStore::new(config).unwrap()
    }

    fn turn() -> NewRecord {
        NewRecord {
            category: "Praytell2".to_string(),
            properties: CategoryConfig::chat_turns().turn_fields(
                "Service is at 9am",
                "user",
                "NYC",
                "2024-01-01T00:00:00Z",
            ),
        }
    }

    #[tokio::test]
    async fn test_insert_posts_object() {
        let (url, seen) = serve(
            "/v1/objects",
            StatusCode::OK,
            json!({ "id": "3f2c1e4a-0000-4000-8000-000000000001", "class": "Praytell2" }),
            Duration::ZERO,
        )
        .await;

        let id = client(&url, Duration::from_secs(5)).insert(turn()).await.unwrap();
        assert_eq!(id, "3f2c1e4a-0000-4000-8000-000000000001");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_deref(), Some("Bearer secret-key"));
        assert_eq!(
            seen[0].1,
            json!({
                "class": "Praytell2",
                "properties": {
                    "body": "Service is at 9am",
                    "role": "user",
                    "location": "NYC",
                    "datetime": "2024-01-01T00:00:00Z"
                }
            })
        );
    }

    #[tokio::test]
    async fn test_insert_error_status_is_store_error() {
        let (url, _) = serve(
            "/v1/objects",
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": [{ "message": "class Praytell2 not found" }] }),
            Duration::ZERO,
        )
        .await;

        let err = client(&url, Duration::from_secs(5)).insert(turn()).await.unwrap_err();
        match err {
            Error::Store(message) => {
                assert!(message.contains("422"));
                assert!(message.contains("class Praytell2 not found"));
            }
            other => panic!("expected store error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insert_without_id_is_store_error() {
        let (url, _) = serve("/v1/objects", StatusCode::OK, json!({}), Duration::ZERO).await;

        let err = client(&url, Duration::from_secs(5)).insert(turn()).await.unwrap_err();
        assert!(matches!(err, Error::Store(ref m) if m.contains("insert response")));
    }

    #[tokio::test]
    async fn test_nearest_text_posts_graphql() {
        let (url, seen) = serve(
            "/v1/graphql",
            StatusCode::OK,
            json!({ "data": { "Get": { "Praytell2": [
                { "body": "Service is at 9am", "location": "NYC", "datetime": "2024-01-01T00:00:00Z" }
            ] } } }),
            Duration::ZERO,
        )
        .await;

        let hits = client(&url, Duration::from_secs(5))
            .nearest_text(query("service time"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["body"], "Service is at 9am");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0.as_deref(), Some("Bearer secret-key"));
        assert_eq!(
            seen[0].1,
            json!({
                "query": "{ Get { Praytell2(nearText: {concepts: [\"service time\"]}, limit: 3) { body location datetime } } }"
            })
        );
    }

    #[tokio::test]
    async fn test_nearest_text_graphql_errors() {
        let (url, _) = serve(
            "/v1/graphql",
            StatusCode::OK,
            json!({
                "data": { "Get": { "Praytell2": null } },
                "errors": [{ "message": "nearText needs a vectorizer" }]
            }),
            Duration::ZERO,
        )
        .await;

        let err = client(&url, Duration::from_secs(5))
            .nearest_text(query("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(ref m) if m.contains("vectorizer")));
    }

    #[tokio::test]
    async fn test_nearest_text_error_status() {
        let (url, _) = serve(
            "/v1/graphql",
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "error": "down" }),
            Duration::ZERO,
        )
        .await;

        let err = client(&url, Duration::from_secs(5))
            .nearest_text(query("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let (url, _) = serve(
            "/v1/graphql",
            StatusCode::OK,
            json!({ "data": { "Get": { "Praytell2": [] } } }),
            Duration::from_secs(2),
        )
        .await;

        let err = client(&url, Duration::from_millis(100))
            .nearest_text(query("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(ref m) if m.contains("timed out")));
    }

    #[test]
    fn test_no_auth_header_without_key() {
        let config =
            WeaviateConfig::from_endpoint("http://localhost:8080", Duration::from_secs(1)).unwrap();
        let store = WeaviateStore::new(config).unwrap();
        let request = store.post("v1/graphql").build().unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    fn query(concept: &str) -> NearTextQuery {
        NearTextQuery {
            category: "Praytell2".to_string(),
            fields: vec!["body".to_string(), "location".to_string(), "datetime".to_string()],
            concepts: vec![concept.to_string()],
            limit: 3,
        }
    }

    #[test]
    fn test_endpoint_parsing() {
        let config =
            WeaviateConfig::from_endpoint("http://192.168.252.60:8080/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(config.endpoint.scheme(), "http");
        assert_eq!(config.endpoint.host_str(), Some("192.168.252.60"));
        assert_eq!(config.endpoint.port(), Some(8080));

        let bare = WeaviateConfig::from_endpoint("localhost:8080", Duration::from_secs(5)).unwrap();
        assert_eq!(bare.endpoint.scheme(), "http");
        assert_eq!(bare.endpoint.host_str(), Some("localhost"));
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        let result = WeaviateConfig::from_endpoint("http://exa mple.com", Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let config =
            WeaviateConfig::from_endpoint("https://store.example.com", Duration::from_secs(5))
                .unwrap();
        let store = WeaviateStore::new(config).unwrap();
        assert_eq!(
            store.endpoint("v1/graphql"),
            "https://store.example.com/v1/graphql"
        );
    }

    #[test]
    fn test_near_text_query_shape() {
        let graphql = build_near_text_query(&query("What time is the service?")).unwrap();
        assert_eq!(
            graphql,
            "{ Get { Praytell2(nearText: {concepts: [\"What time is the service?\"]}, limit: 3) { body location datetime } } }"
        );
    }

    #[test]
    fn test_near_text_query_escapes_concepts() {
        let graphql = build_near_text_query(&query("say \"hi\"\n}")).unwrap();
        assert!(graphql.contains(r#"concepts: ["say \"hi\"\n}"]"#));
    }

    #[test]
    fn test_rejects_injected_identifiers() {
        let mut q = query("x");
        q.category = "Praytell2) { secret }".to_string();
        assert!(build_near_text_query(&q).is_err());

        let mut q = query("x");
        q.fields = vec!["body location".to_string()];
        assert!(build_near_text_query(&q).is_err());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("9lives").is_err());
        assert!(validate_identifier("_private").is_ok());
    }

    #[test]
    fn test_extract_hits() {
        let response: GraphQLResponse = serde_json::from_value(json!({
            "data": { "Get": { "Praytell2": [
                { "body": "first", "location": "NYC", "datetime": "2024-01-01T00:00:00Z" },
                { "body": "second", "location": "NYC", "datetime": "2024-01-02T00:00:00Z" }
            ] } }
        }))
        .unwrap();

        let hits = extract_hits(response, "Praytell2").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0]["body"], "first");
        assert_eq!(hits[1]["body"], "second");
    }

    #[test]
    fn test_extract_hits_surfaces_graphql_errors() {
        let response: GraphQLResponse = serde_json::from_value(json!({
            "data": { "Get": { "Praytell2": null } },
            "errors": [ { "message": "no module with name text2vec" } ]
        }))
        .unwrap();

        let err = extract_hits(response, "Praytell2").unwrap_err();
        assert!(err.to_string().contains("text2vec"));
    }

    #[test]
    fn test_extract_hits_null_class_is_empty() {
        let response: GraphQLResponse =
            serde_json::from_value(json!({ "data": { "Get": { "Praytell2": null } } })).unwrap();
        assert!(extract_hits(response, "Praytell2").unwrap().is_empty());
    }
}
