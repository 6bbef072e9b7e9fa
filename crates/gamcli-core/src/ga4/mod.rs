//! GA4 reporting client
//!
//! One `runReport` call against the analytics data API, flattened into
//! dimension/metric string rows for the presenter.

pub mod filter;
pub mod oauth;

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};

use crate::auth;
use crate::error::CoreError;

pub const GA4_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
const ENDPOINT_BASE: &str = "https://analyticsdata.googleapis.com/v1beta";

/// One report request as assembled from CLI options.
#[derive(Debug, Clone)]
pub struct Ga4Query {
    pub property: String,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub start: String,
    pub end: String,
    pub limit: u32,
    pub filter: Option<String>,
    pub order_by: Option<String>,
}

/// One result row: dimension values then metric values, in request order.
#[derive(Debug, Clone)]
pub struct Ga4Row {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Ga4Report {
    pub rows: Vec<Ga4Row>,
    pub row_count: u64,
}

pub struct Ga4Client {
    http: reqwest::Client,
    credentials_file: Option<PathBuf>,
}

impl Ga4Client {
    pub fn new(credentials_file: Option<PathBuf>) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CoreError::Http {
                endpoint: ENDPOINT_BASE.to_string(),
                source: e,
            })?;
        Ok(Self {
            http,
            credentials_file,
        })
    }

    pub async fn run_report(&self, query: &Ga4Query) -> Result<Ga4Report, CoreError> {
        let token = auth::access_token_for(&self.http, self.credentials_file.as_deref()).await?;
        let url = format!(
            "{}/properties/{}:runReport",
            ENDPOINT_BASE, query.property
        );
        let request = build_request(query)?;

        tracing::debug!(property = %query.property, "Running GA4 report");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::Http {
                endpoint: url.clone(),
                source: e,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CoreError::Http {
            endpoint: url,
            source: e,
        })?;
        if !status.is_success() {
            return Err(CoreError::HttpStatus {
                service: "ga4".to_string(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: Value =
            serde_json::from_str(&body).map_err(|e| CoreError::MalformedResponse {
                service: "ga4".to_string(),
                message: format!("invalid JSON: {}", e),
            })?;
        Ok(parse_report(&parsed))
    }
}

/// Split a comma-separated option list, dropping empty entries.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a `metric:asc|desc` ordering into an OrderBy value.
pub fn parse_order_by(input: &str) -> Result<Value, CoreError> {
    let (metric, direction) = input.split_once(':').ok_or(CoreError::InvalidArgument {
        message: "--order-by must be formatted as 'metric:desc' or 'metric:asc'".to_string(),
    })?;

    Ok(json!({
        "metric": {"metricName": metric.trim()},
        "desc": direction.trim().eq_ignore_ascii_case("desc"),
    }))
}

/// Build the runReport request body.
pub fn build_request(query: &Ga4Query) -> Result<Value, CoreError> {
    let mut request = json!({
        "dimensions": query.dimensions.iter().map(|d| json!({"name": d})).collect::<Vec<_>>(),
        "metrics": query.metrics.iter().map(|m| json!({"name": m})).collect::<Vec<_>>(),
        "dateRanges": [{"startDate": query.start, "endDate": query.end}],
        "limit": query.limit,
    });

    if let Some(filter) = query.filter.as_deref() {
        if let Some(expression) = filter::parse_filter(filter) {
            request["dimensionFilter"] = expression;
        }
    }
    if let Some(order_by) = query.order_by.as_deref() {
        request["orderBys"] = json!([parse_order_by(order_by)?]);
    }

    Ok(request)
}

/// Flatten a runReport response into string rows.
pub fn parse_report(body: &Value) -> Ga4Report {
    let cell_values = |row: &Value, key: &str| -> Vec<String> {
        row.get(key)
            .and_then(Value::as_array)
            .map(|cells| {
                cells
                    .iter()
                    .map(|c| {
                        c.get("value")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default()
    };

    let rows = body
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| Ga4Row {
                    dimensions: cell_values(row, "dimensionValues"),
                    metrics: cell_values(row, "metricValues"),
                })
                .collect()
        })
        .unwrap_or_default();

    Ga4Report {
        rows,
        row_count: body.get("rowCount").and_then(Value::as_u64).unwrap_or(0),
    }
}
