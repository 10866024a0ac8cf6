//! RestAdapter — the query model over HTTP
//!
//! Translates a [`DataQuery`] into URL query parameters against a base URL
//! plus per-operation endpoint templates, and normalizes the three common
//! response conventions (bare array, envelope, JSON:API) into
//! [`DataResponse`]. HTTP statuses are classified into the shared error
//! taxonomy; timeouts surface as network errors naming the configured
//! limit.

use crate::adapter::traits::{DataAdapter, Operation};
use crate::error::{AdapterError, AdapterResult};
use crate::query::{DataQuery, DataResponse, FilterValue, Record, RecordKey};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-operation path templates appended to the base URL.
///
/// `:id` is substituted with the record key for update/delete.
#[derive(Debug, Clone)]
pub struct RestEndpoints {
    pub fetch: String,
    pub create: String,
    pub update: String,
    pub delete: String,
    pub bulk_delete: String,
}

impl Default for RestEndpoints {
    fn default() -> Self {
        Self {
            fetch: String::new(),
            create: String::new(),
            update: "/:id".to_string(),
            delete: "/:id".to_string(),
            bulk_delete: "/bulk-delete".to_string(),
        }
    }
}

/// Names used for the standard query parameters, each independently
/// renameable to fit the server's dialect.
#[derive(Debug, Clone)]
pub struct QueryParamNames {
    pub page: String,
    pub page_size: String,
    pub sort: String,
    pub search: String,
}

impl Default for QueryParamNames {
    fn default() -> Self {
        Self {
            page: "page".to_string(),
            page_size: "pageSize".to_string(),
            sort: "sort".to_string(),
            search: "search".to_string(),
        }
    }
}

/// Wire convention the server speaks.
#[derive(Debug, Clone, Default)]
pub enum RestConvention {
    /// Bare arrays and `{data,total,page,pageSize}` envelopes, detected by
    /// response shape.
    #[default]
    Standard,
    /// JSON:API: `{data:[{id,type,attributes}], meta:{...}}` responses and
    /// `{data:{type,attributes}}` mutation bodies.
    JsonApi { resource_type: String },
}

/// Replaces the default query-parameter mapping wholesale.
pub type QueryTransform = Arc<dyn Fn(&DataQuery) -> Vec<(String, String)> + Send + Sync>;

/// Replaces the default response normalization wholesale.
pub type ResponseTransform =
    Arc<dyn Fn(Value, &DataQuery) -> AdapterResult<DataResponse> + Send + Sync>;

/// HTTP-backed adapter.
pub struct RestAdapter {
    client: Client,
    base_url: String,
    endpoints: RestEndpoints,
    param_names: QueryParamNames,
    convention: RestConvention,
    headers: BTreeMap<String, String>,
    auth_token: RwLock<Option<String>>,
    timeout: Duration,
    transform_query: Option<QueryTransform>,
    transform_response: Option<ResponseTransform>,
}

impl RestAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            endpoints: RestEndpoints::default(),
            param_names: QueryParamNames::default(),
            convention: RestConvention::default(),
            headers: BTreeMap::new(),
            auth_token: RwLock::new(None),
            timeout: DEFAULT_TIMEOUT,
            transform_query: None,
            transform_response: None,
        }
    }

    pub fn with_endpoints(mut self, endpoints: RestEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_param_names(mut self, param_names: QueryParamNames) -> Self {
        self.param_names = param_names;
        self
    }

    pub fn with_convention(mut self, convention: RestConvention) -> Self {
        self.convention = convention;
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

    pub fn with_query_transform(mut self, transform: QueryTransform) -> Self {
        self.transform_query = Some(transform);
        self
    }

    pub fn with_response_transform(mut self, transform: ResponseTransform) -> Self {
        self.transform_response = Some(transform);
        self
    }

    /// Swap the bearer token (e.g. after a refresh upstream).
    pub fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().expect("auth token lock") = token;
    }

    fn endpoint_url(&self, template: &str, key: Option<&RecordKey>) -> String {
        let path = match key {
            Some(key) => template.replace(":id", &key.to_string()),
            None => template.to_string(),
        };
        format!("{}{}", self.base_url, path)
    }

    fn query_pairs(&self, query: &DataQuery) -> Vec<(String, String)> {
        if let Some(transform) = &self.transform_query {
            return transform(query);
        }
        default_query_pairs(query, &self.param_names)
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

    /// One HTTP round trip. `Ok(None)` means the server answered without a
    /// body (204 or empty), which is never an error here.
    async fn send(
        &self,
        method: Method,
        url: String,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> AdapterResult<Option<Value>> {
        let mut request = self
            .client
            .request(method.clone(), &url)
            .timeout(self.timeout)
            .headers(self.request_headers()?);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, %url, "rest request");

        let response = request
            .send()
            .await
            .map_err(|err| classify_transport_error(&err, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| AdapterError::network(format!("failed to read response body: {err}")))?;

        if !status.is_success() {
            let body: Option<Value> = serde_json::from_str(&text).ok();
            return Err(classify_status(status, body));
        }

        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|err| {
                AdapterError::adapter(
                    format!("response is not valid JSON: {err}"),
                    "INVALID_RESPONSE",
                )
            })
    }

    fn normalize_fetch(&self, body: Value, query: &DataQuery) -> AdapterResult<DataResponse> {
        if let Some(transform) = &self.transform_response {
            return transform(body, query);
        }
        normalize_response(body, query)
    }

    fn mutation_body(&self, item: &Record) -> Value {
        match &self.convention {
            RestConvention::Standard => Value::Object(item.clone()),
            RestConvention::JsonApi { resource_type } => json!({
                "data": {
                    "type": resource_type,
                    "attributes": item,
                }
            }),
        }
    }

    fn unwrap_record(&self, body: Option<Value>) -> AdapterResult<Option<Record>> {
        let Some(body) = body else {
            return Ok(None);
        };
        let record = match &self.convention {
            RestConvention::Standard => as_record(body)?,
            RestConvention::JsonApi { .. } => jsonapi_record(body)?,
        };
        Ok(Some(record))
    }
}

#[async_trait]
impl DataAdapter for RestAdapter {
    async fn fetch(&self, query: &DataQuery) -> AdapterResult<DataResponse> {
        let url = self.endpoint_url(&self.endpoints.fetch, None);
        let pairs = self.query_pairs(query);
        let body = self
            .send(Method::GET, url, &pairs, None)
            .await?
            .ok_or_else(|| {
                AdapterError::adapter("fetch returned an empty body", "INVALID_RESPONSE")
            })?;
        self.normalize_fetch(body, query)
    }

    fn supports(&self, operation: Operation) -> bool {
        !matches!(operation, Operation::Subscribe)
    }

    async fn create(&self, item: Record) -> AdapterResult<Option<Record>> {
        let url = self.endpoint_url(&self.endpoints.create, None);
        let body = self.mutation_body(&item);
        let response = self.send(Method::POST, url, &[], Some(&body)).await?;
        self.unwrap_record(response)
    }

    async fn update(&self, key: &RecordKey, patch: Record) -> AdapterResult<Option<Record>> {
        let url = self.endpoint_url(&self.endpoints.update, Some(key));
        let body = self.mutation_body(&patch);
        let response = self.send(Method::PUT, url, &[], Some(&body)).await?;
        self.unwrap_record(response)
    }

    async fn delete(&self, key: &RecordKey) -> AdapterResult<()> {
        let url = self.endpoint_url(&self.endpoints.delete, Some(key));
        self.send(Method::DELETE, url, &[], None).await?;
        Ok(())
    }

    async fn bulk_delete(&self, keys: &[RecordKey]) -> AdapterResult<()> {
        let url = self.endpoint_url(&self.endpoints.bulk_delete, None);
        let ids: Vec<Value> = keys.iter().map(RecordKey::to_value).collect();
        let body = json!({ "ids": ids });
        self.send(Method::POST, url, &[], Some(&body)).await?;
        Ok(())
    }
}

/// The default query-parameter mapping.
pub(crate) fn default_query_pairs(
    query: &DataQuery,
    names: &QueryParamNames,
) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(page) = query.page {
        pairs.push((names.page.clone(), page.to_string()));
    }
    if let Some(page_size) = query.page_size {
        pairs.push((names.page_size.clone(), page_size.to_string()));
    }
    if !query.sort.is_empty() {
        let sort = query
            .sort
            .iter()
            .map(|entry| format!("{}:{}", entry.column, entry.direction))
            .collect::<Vec<_>>()
            .join(",");
        pairs.push((names.sort.clone(), sort));
    }
    if let Some(needle) = query.search_needle() {
        pairs.push((names.search.clone(), needle.to_string()));
    }
    for (field, filter) in &query.filters {
        pairs.push((format!("filter[{field}]"), filter_param(filter)));
    }
    for (key, value) in &query.params {
        pairs.push((key.clone(), param_value(value)));
    }
    pairs
}

fn filter_param(filter: &FilterValue) -> String {
    match filter {
        FilterValue::Scalar(scalar) => scalar.to_query_string(),
        FilterValue::List(items) => items
            .iter()
            .map(|item| item.to_query_string())
            .collect::<Vec<_>>()
            .join(","),
        // Ranges keep their object form; servers that understand them
        // parse the JSON back out of the parameter.
        FilterValue::NumberRange(_) | FilterValue::DateRange(_) => {
            serde_json::to_string(filter).unwrap_or_default()
        }
    }
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn classify_transport_error(err: &reqwest::Error, timeout: Duration) -> AdapterError {
    if err.is_timeout() {
        AdapterError::network(format!("request timed out after {timeout:?}"))
    } else {
        AdapterError::network(format!("network request failed: {err}"))
    }
}

/// HTTP status → error taxonomy. The body's `message` field, when
/// present, becomes the error message.
pub(crate) fn classify_status(status: StatusCode, body: Option<Value>) -> AdapterError {
    let message = body
        .as_ref()
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("error")
            )
        });

    match status {
        StatusCode::BAD_REQUEST => match body {
            Some(details) => AdapterError::validation_with(message, details),
            None => AdapterError::validation(message),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => match body {
            Some(details) => AdapterError::authentication_with(message, details),
            None => AdapterError::authentication(message),
        },
        StatusCode::NOT_FOUND => match body {
            Some(details) => AdapterError::not_found_with(message, details),
            None => AdapterError::not_found(message),
        },
        other => {
            let code = format!("HTTP_{}", other.as_u16());
            match body {
                Some(details) => AdapterError::adapter_with(message, code, details),
                None => AdapterError::adapter(message, code),
            }
        }
    }
}

/// Shape-detected normalization for the standard conventions.
pub(crate) fn normalize_response(body: Value, query: &DataQuery) -> AdapterResult<DataResponse> {
    match body {
        Value::Array(rows) => {
            let data = rows
                .into_iter()
                .map(as_record)
                .collect::<AdapterResult<Vec<_>>>()?;
            let total = data.len() as u64;
            Ok(DataResponse {
                page: query.page.unwrap_or(1),
                page_size: query.page_size.unwrap_or(total as u32),
                data,
                total,
                metadata: None,
            })
        }
        Value::Object(map) => {
            if map.contains_key("data") && map.contains_key("meta") {
                return normalize_meta_envelope(map, query);
            }
            if map.contains_key("data") && map.contains_key("total") {
                let mut response: DataResponse = serde_json::from_value(Value::Object(map))
                    .map_err(|err| {
                        AdapterError::adapter(
                            format!("malformed response envelope: {err}"),
                            "INVALID_RESPONSE",
                        )
                    })?;
                if response.page_size == 0 {
                    response.page_size =
                        query.page_size.unwrap_or(response.data.len() as u32);
                }
                return Ok(response);
            }
            Err(AdapterError::adapter(
                "unrecognized response shape",
                "INVALID_RESPONSE",
            ))
        }
        other => Err(AdapterError::adapter(
            format!("unrecognized response shape: {other}"),
            "INVALID_RESPONSE",
        )),
    }
}

/// `{data: [...], meta: {total, page, pageSize}}` (JSON:API and friends).
fn normalize_meta_envelope(
    mut map: Map<String, Value>,
    query: &DataQuery,
) -> AdapterResult<DataResponse> {
    let rows = match map.remove("data") {
        Some(Value::Array(rows)) => rows,
        _ => {
            return Err(AdapterError::adapter(
                "meta envelope without a data array",
                "INVALID_RESPONSE",
            ))
        }
    };
    let data = rows
        .into_iter()
        .map(|row| {
            if row.get("attributes").is_some() {
                jsonapi_record(row)
            } else {
                as_record(row)
            }
        })
        .collect::<AdapterResult<Vec<_>>>()?;

    let meta = map.remove("meta").unwrap_or(Value::Null);
    let get_u64 = |key: &str| meta.get(key).and_then(Value::as_u64);
    let total = get_u64("total").unwrap_or(data.len() as u64);
    Ok(DataResponse {
        page: get_u64("page").map(|p| p as u32).or(query.page).unwrap_or(1),
        page_size: get_u64("pageSize")
            .map(|p| p as u32)
            .or(query.page_size)
            .unwrap_or(data.len() as u32),
        data,
        total,
        metadata: meta.as_object().cloned(),
    })
}

fn as_record(value: Value) -> AdapterResult<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AdapterError::adapter(
            format!("expected a record object, got {other}"),
            "INVALID_RESPONSE",
        )),
    }
}

/// Flatten a JSON:API resource: `attributes` merged with its `id`.
fn jsonapi_record(value: Value) -> AdapterResult<Record> {
    let mut resource = as_record(value)?;
    // Single-record responses nest the resource under `data`
    if let Some(inner) = resource.remove("data") {
        resource = as_record(inner)?;
    }
    let id = resource.remove("id");
    let mut record = match resource.remove("attributes") {
        Some(attributes) => as_record(attributes)?,
        None => resource,
    };
    if let Some(id) = id {
        record.insert("id".to_string(), id);
    }
    Ok(record)
}
