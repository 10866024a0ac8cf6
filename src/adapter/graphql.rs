//! GraphQLAdapter — the query model as GraphQL variables
//!
//! Documents are generated from a configured type name (any of them
//! individually overridable), variables are mapped from the query, and the
//! response envelope is unwrapped by locating the first payload key. Errors
//! are classified by the first entry's `extensions.code`; the full error
//! list rides along as details.

use crate::adapter::traits::{DataAdapter, Operation};
use crate::error::{AdapterError, AdapterResult};
use crate::query::{DataQuery, DataResponse, Record, RecordKey};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TYPE_NAME: &str = "Item";

/// Caller-supplied operation documents; unset entries fall back to the
/// generated defaults.
#[derive(Debug, Clone, Default)]
pub struct GraphQLDocuments {
    pub fetch: Option<String>,
    pub create: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
    pub bulk_delete: Option<String>,
}

/// Replaces the default variable mapping wholesale.
pub type VariablesTransform = Arc<dyn Fn(&DataQuery) -> Map<String, Value> + Send + Sync>;

/// GraphQL-backed adapter.
pub struct GraphQLAdapter {
    client: Client,
    endpoint: String,
    type_name: String,
    documents: GraphQLDocuments,
    headers: BTreeMap<String, String>,
    auth_token: RwLock<Option<String>>,
    timeout: Duration,
    transform_variables: Option<VariablesTransform>,
}

impl GraphQLAdapter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            type_name: DEFAULT_TYPE_NAME.to_string(),
            documents: GraphQLDocuments::default(),
            headers: BTreeMap::new(),
            auth_token: RwLock::new(None),
            timeout: DEFAULT_TIMEOUT,
            transform_variables: None,
        }
    }

    /// The GraphQL type the generated documents are named after.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_documents(mut self, documents: GraphQLDocuments) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_auth_token(self, token: impl Into<String>) -> Self {
        *self.auth_token.write().expect("auth token lock") = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_variables_transform(mut self, transform: VariablesTransform) -> Self {
        self.transform_variables = Some(transform);
        self
    }

    pub fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().expect("auth token lock") = token;
    }

    fn fetch_document(&self) -> String {
        self.documents
            .fetch
            .clone()
            .unwrap_or_else(|| default_fetch_document(&self.type_name))
    }

    fn mutation_document(&self, operation: Operation) -> String {
        let override_doc = match operation {
            Operation::Create => &self.documents.create,
            Operation::Update => &self.documents.update,
            Operation::Delete => &self.documents.delete,
            Operation::BulkDelete => &self.documents.bulk_delete,
            Operation::Subscribe => &None,
        };
        override_doc
            .clone()
            .unwrap_or_else(|| default_mutation_document(&self.type_name, operation))
    }

    fn fetch_variables(&self, query: &DataQuery) -> Map<String, Value> {
        if let Some(transform) = &self.transform_variables {
            return transform(query);
        }
        default_variables(query)
    }

    fn request_headers(&self) -> AdapterResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                AdapterError::adapter(format!("invalid header name {name}: {err}"), "BAD_CONFIG")
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| {
                AdapterError::adapter(format!("invalid header value: {err}"), "BAD_CONFIG")
            })?;
            headers.insert(name, value);
        }
        if let Some(token) = self.auth_token.read().expect("auth token lock").as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
                AdapterError::adapter(format!("invalid auth token: {err}"), "BAD_CONFIG")
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// POST `{query, variables}`, classify errors, unwrap the payload.
    async fn execute(&self, document: String, variables: Value) -> AdapterResult<Value> {
        let body = json!({ "query": document, "variables": variables });

        tracing::debug!(endpoint = %self.endpoint, "graphql request");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .headers(self.request_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AdapterError::network(format!(
                        "request timed out after {:?}",
                        self.timeout
                    ))
                } else {
                    AdapterError::network(format!("network request failed: {err}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::network(format!(
                "graphql endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let envelope: Value = response.json().await.map_err(|err| {
            AdapterError::network(format!("failed to decode graphql response: {err}"))
        })?;

        if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(classify_graphql_errors(errors));
            }
        }

        let data = match envelope.get("data") {
            Some(data) if !data.is_null() => data.clone(),
            _ => {
                return Err(AdapterError::adapter(
                    "graphql response has no data",
                    "GRAPHQL_NO_DATA",
                ))
            }
        };

        unwrap_payload(data)
    }
}

#[async_trait]
impl DataAdapter for GraphQLAdapter {
    async fn fetch(&self, query: &DataQuery) -> AdapterResult<DataResponse> {
        let variables = Value::Object(self.fetch_variables(query));
        let payload = self.execute(self.fetch_document(), variables).await?;
        normalize_payload(payload, query)
    }

    fn supports(&self, operation: Operation) -> bool {
        !matches!(operation, Operation::Subscribe)
    }

    async fn create(&self, item: Record) -> AdapterResult<Option<Record>> {
        let variables = json!({ "input": item });
        let payload = self
            .execute(self.mutation_document(Operation::Create), variables)
            .await?;
        Ok(payload_record(payload))
    }

    async fn update(&self, key: &RecordKey, patch: Record) -> AdapterResult<Option<Record>> {
        let variables = json!({ "id": key.to_value(), "input": patch });
        let payload = self
            .execute(self.mutation_document(Operation::Update), variables)
            .await?;
        Ok(payload_record(payload))
    }

    async fn delete(&self, key: &RecordKey) -> AdapterResult<()> {
        let variables = json!({ "id": key.to_value() });
        self.execute(self.mutation_document(Operation::Delete), variables)
            .await?;
        Ok(())
    }

    async fn bulk_delete(&self, keys: &[RecordKey]) -> AdapterResult<()> {
        let ids: Vec<Value> = keys.iter().map(RecordKey::to_value).collect();
        let variables = json!({ "ids": ids });
        self.execute(self.mutation_document(Operation::BulkDelete), variables)
            .await?;
        Ok(())
    }
}

/// Collection field for the generated fetch document: `User` → `users`.
fn collection_field(type_name: &str) -> String {
    let mut chars = type_name.chars();
    let field = match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };
    format!("{field}s")
}

pub(crate) fn default_fetch_document(type_name: &str) -> String {
    let field = collection_field(type_name);
    let args = "page: $page, pageSize: $pageSize, sort: $sort, filters: $filters, search: $search";
    format!(
        "query FetchData($page: Int, $pageSize: Int, $sort: [SortInput!], $filters: JSON, $search: String) {{\n  {field}({args}) {{\n    data\n    total\n    page\n    pageSize\n  }}\n}}"
    )
}

pub(crate) fn default_mutation_document(type_name: &str, operation: Operation) -> String {
    match operation {
        Operation::Create => format!(
            "mutation Create{type_name}($input: {type_name}Input!) {{\n  create{type_name}(input: $input)\n}}"
        ),
        Operation::Update => format!(
            "mutation Update{type_name}($id: ID!, $input: {type_name}Input!) {{\n  update{type_name}(id: $id, input: $input)\n}}"
        ),
        Operation::Delete => format!(
            "mutation Delete{type_name}($id: ID!) {{\n  delete{type_name}(id: $id)\n}}"
        ),
        Operation::BulkDelete => format!(
            "mutation BulkDelete{type_name}($ids: [ID!]!) {{\n  bulkDelete{type_name}(ids: $ids)\n}}"
        ),
        Operation::Subscribe => String::new(),
    }
}

/// The default variable mapping: names carry over 1:1, sort entries become
/// `{field, direction}` pairs with the direction upper-cased, `params`
/// merge in as extra variables.
pub(crate) fn default_variables(query: &DataQuery) -> Map<String, Value> {
    let mut variables = Map::new();
    if let Some(page) = query.page {
        variables.insert("page".to_string(), json!(page));
    }
    if let Some(page_size) = query.page_size {
        variables.insert("pageSize".to_string(), json!(page_size));
    }
    if !query.sort.is_empty() {
        let sort: Vec<Value> = query
            .sort
            .iter()
            .map(|entry| {
                json!({
                    "field": entry.column,
                    "direction": entry.direction.as_str().to_uppercase(),
                })
            })
            .collect();
        variables.insert("sort".to_string(), Value::Array(sort));
    }
    if !query.filters.is_empty() {
        let filters: Map<String, Value> = query
            .filters
            .iter()
            .map(|(field, filter)| (field.clone(), filter.to_value()))
            .collect();
        variables.insert("filters".to_string(), Value::Object(filters));
    }
    if let Some(needle) = query.search_needle() {
        variables.insert("search".to_string(), json!(needle));
    }
    for (key, value) in &query.params {
        variables.insert(key.clone(), value.clone());
    }
    variables
}

/// Classify `errors[]` by the first entry's `extensions.code`.
pub(crate) fn classify_graphql_errors(errors: &[Value]) -> AdapterError {
    let first = errors.first();
    let message = first
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("graphql request failed")
        .to_string();
    let code = first
        .and_then(|e| e.get("extensions"))
        .and_then(|ext| ext.get("code"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let details = Value::Array(errors.to_vec());

    match code {
        "UNAUTHENTICATED" | "FORBIDDEN" => AdapterError::authentication_with(message, details),
        "BAD_USER_INPUT" => AdapterError::validation_with(message, details),
        other => {
            let tag = if other.is_empty() {
                "GRAPHQL_ERROR".to_string()
            } else {
                other.to_string()
            };
            AdapterError::adapter_with(message, tag, details)
        }
    }
}

/// GraphQL nests the result under the operation's field name; take the
/// first key that isn't `__typename`.
pub(crate) fn unwrap_payload(data: Value) -> AdapterResult<Value> {
    let map = match data {
        Value::Object(map) => map,
        other => {
            return Err(AdapterError::adapter(
                format!("graphql data is not an object: {other}"),
                "GRAPHQL_NO_DATA",
            ))
        }
    };
    map.into_iter()
        .find(|(key, _)| key != "__typename")
        .map(|(_, value)| value)
        .ok_or_else(|| AdapterError::adapter("graphql data has no payload field", "GRAPHQL_NO_DATA"))
}

fn normalize_payload(payload: Value, query: &DataQuery) -> AdapterResult<DataResponse> {
    // Servers answer either the shared envelope or a bare row list
    crate::adapter::rest::normalize_response(payload, query)
}

fn payload_record(payload: Value) -> Option<Record> {
    match payload {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterValue, SortEntry};

    #[test]
    fn generated_fetch_document_names_the_collection() {
        let doc = default_fetch_document("User");
        assert!(doc.starts_with("query FetchData("));
        assert!(doc.contains("users(page: $page"));
        assert!(doc.contains("pageSize"));
    }

    #[test]
    fn generated_mutations_are_named_after_the_type() {
        assert!(default_mutation_document("User", Operation::Create)
            .contains("mutation CreateUser($input: UserInput!)"));
        assert!(default_mutation_document("User", Operation::Update).contains("updateUser(id:"));
        assert!(default_mutation_document("User", Operation::Delete).contains("deleteUser(id:"));
        assert!(default_mutation_document("User", Operation::BulkDelete)
            .contains("bulkDeleteUser(ids:"));
    }

    #[test]
    fn variables_map_one_to_one_with_uppercased_directions() {
        let query = DataQuery::new()
            .with_page(2)
            .with_page_size(10)
            .with_search("bolt")
            .with_sort(SortEntry::desc("qty"))
            .with_filter("category", FilterValue::list(["fastener", "seal"]));

        let variables = default_variables(&query);
        assert_eq!(variables["page"], json!(2));
        assert_eq!(variables["pageSize"], json!(10));
        assert_eq!(variables["search"], json!("bolt"));
        assert_eq!(
            variables["sort"],
            json!([{"field": "qty", "direction": "DESC"}])
        );
        assert_eq!(
            variables["filters"]["category"],
            json!(["fastener", "seal"])
        );
    }

    #[test]
    fn params_merge_into_variables() {
        let query = DataQuery::new().with_param("tenant", json!("acme"));
        let variables = default_variables(&query);
        assert_eq!(variables["tenant"], json!("acme"));
    }

    #[test]
    fn errors_classify_by_extension_code() {
        let auth = classify_graphql_errors(&[json!({
            "message": "no token",
            "extensions": {"code": "UNAUTHENTICATED"},
        })]);
        assert_eq!(auth.code(), "AUTH_ERROR");

        let validation = classify_graphql_errors(&[json!({
            "message": "bad qty",
            "extensions": {"code": "BAD_USER_INPUT"},
        })]);
        assert_eq!(validation.code(), "VALIDATION_ERROR");
        assert_eq!(validation.message(), "bad qty");

        let generic = classify_graphql_errors(&[json!({"message": "boom"})]);
        assert_eq!(generic.code(), "GRAPHQL_ERROR");
    }

    #[test]
    fn only_the_first_error_drives_classification() {
        let err = classify_graphql_errors(&[
            json!({"message": "first", "extensions": {"code": "BAD_USER_INPUT"}}),
            json!({"message": "second", "extensions": {"code": "UNAUTHENTICATED"}}),
        ]);
        assert_eq!(err.code(), "VALIDATION_ERROR");
        // ...but the whole list is preserved for diagnostics
        assert_eq!(err.details().unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn payload_is_the_first_non_typename_key() {
        let payload = unwrap_payload(json!({
            "__typename": "Query",
            "users": {"data": [], "total": 0},
        }))
        .unwrap();
        assert_eq!(payload["total"], json!(0));
    }

    #[test]
    fn non_object_data_is_structural() {
        let err = unwrap_payload(json!(42)).unwrap_err();
        assert_eq!(err.code(), "GRAPHQL_NO_DATA");
    }
}
