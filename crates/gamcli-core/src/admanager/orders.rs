//! Orders lister
//!
//! The vendor has no "currently delivering" status, so that filter is an
//! explicit client-side predicate over the order's flight window applied
//! after an over-fetched APPROVED query.

use chrono::Utc;
use serde_json::{json, Value};

use super::soap;
use super::statement::Statement;
use super::{entity_name, AdManager};
use crate::dates;
use crate::error::CoreError;
use crate::normalize::{attr, attr_flag, Record};

const MS_PER_YEAR: i64 = (365.25 * 24.0 * 60.0 * 60.0 * 1000.0) as i64;

/// User-facing status words mapped onto the vendor's order statuses.
pub fn canonical_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "delivering" | "approved" | "active" => "APPROVED".to_string(),
        "draft" => "DRAFT".to_string(),
        "pending_approval" => "PENDING_APPROVAL".to_string(),
        "disapproved" => "DISAPPROVED".to_string(),
        "paused" => "PAUSED".to_string(),
        "canceled" | "cancelled" => "CANCELED".to_string(),
        "deleted" => "DELETED".to_string(),
        other => other.to_uppercase(),
    }
}

/// Statuses that trigger the client-side delivering filter.
pub fn wants_delivering(status: Option<&str>) -> bool {
    matches!(
        status.map(str::to_lowercase).as_deref(),
        Some("delivering") | Some("approved") | Some("active")
    )
}

/// An order is delivering when its flight started, has not ended (or never
/// ends), and started less than roughly a year ago.
pub fn is_delivering(
    start_ms: Option<i64>,
    end_ms: Option<i64>,
    unlimited_end: bool,
    now_ms: i64,
) -> bool {
    let Some(start) = start_ms else {
        return false;
    };
    if start > now_ms {
        return false;
    }
    if !unlimited_end {
        match end_ms {
            Some(end) if end >= now_ms => {}
            _ => return false,
        }
    }
    start >= now_ms - MS_PER_YEAR
}

/// Over-fetch budget for the delivering filter. Heuristic: if fewer than
/// `limit` qualifying orders exist among the first 500 fetched, the listing
/// returns fewer rows than requested.
pub fn overfetch_limit(limit: u32) -> u32 {
    limit.saturating_mul(10).min(500)
}

/// Flatten one raw order into a display record. A forced `DELIVERING`
/// status marks rows that passed the client-side window filter.
pub fn order_record(order: &Value, delivering: bool) -> Record {
    let status_cell = if delivering {
        Value::String("DELIVERING".to_string())
    } else {
        attr(order, "status")
    };

    let mut rec = Record::new();
    rec.insert("id".to_string(), attr(order, "id"));
    rec.insert("name".to_string(), Value::String(entity_name(order)));
    rec.insert("status".to_string(), status_cell);
    rec.insert(
        "startDate".to_string(),
        Value::String(dates::format_display(Some(&attr(order, "startDateTime")))),
    );
    rec.insert(
        "endDate".to_string(),
        Value::String(dates::format_display(Some(&attr(order, "endDateTime")))),
    );
    rec.insert("currency".to_string(), attr(order, "currencyCode"));
    rec.insert("advertiserId".to_string(), attr(order, "advertiserId"));
    rec.insert("impressions".to_string(), json!(0));
    rec.insert("clicks".to_string(), json!(0));
    rec
}

/// Id cell in string form, skipping the absent sentinel.
pub(crate) fn record_id(rec: &Record) -> Option<String> {
    match rec.get("id") {
        Some(Value::String(s)) if s != crate::normalize::NOT_AVAILABLE => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl AdManager {
    /// List orders, optionally filtered by status, enriched with 90-day
    /// impression/click totals.
    pub async fn orders(&self, limit: u32, status: Option<&str>) -> Result<Vec<Record>, CoreError> {
        let delivering = wants_delivering(status);

        let mut stmt = Statement::new().where_clause("id > 0").order_by("id", false);
        if let Some(status) = status {
            stmt = stmt.where_clause(format!("status = '{}'", canonical_status(status)));
        }
        let fetch_limit = if delivering {
            overfetch_limit(limit)
        } else {
            limit
        };
        let stmt = stmt.limit(fetch_limit);

        let page = self
            .soap()
            .call("OrderService", "getOrdersByStatement", &stmt.to_payload())
            .await?;
        let results = soap::results_array(&page);

        let now_ms = Utc::now().timestamp_millis();
        let mut records: Vec<Record> = Vec::new();
        for order in &results {
            if delivering {
                let start_ms = dates::to_epoch_millis(&attr(order, "startDateTime"));
                let end_ms = dates::to_epoch_millis(&attr(order, "endDateTime"));
                let unlimited = attr_flag(order, "unlimitedEndTime")
                    || attr_flag(order, "unlimited_end_time");
                if !is_delivering(start_ms, end_ms, unlimited, now_ms) {
                    continue;
                }
            }

            records.push(order_record(order, delivering));

            if records.len() >= limit as usize {
                break;
            }
        }

        let ids: Vec<String> = records.iter().filter_map(record_id).collect();
        if !ids.is_empty() {
            let metrics = self.report().order_metrics(&ids).await;
            for rec in &mut records {
                if let Some(id) = record_id(rec) {
                    let m = metrics.get(&id).copied().unwrap_or_default();
                    rec.insert("impressions".to_string(), json!(m.impressions));
                    rec.insert("clicks".to_string(), json!(m.clicks));
                }
            }
        }

        Ok(records)
    }
}
