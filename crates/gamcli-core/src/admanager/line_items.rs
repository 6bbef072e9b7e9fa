//! Line items lister
//!
//! Adds derived delivery columns on top of the raw listing: CTR over the
//! 90-day metrics window, and goal progress against the primary goal.

use serde_json::{json, Value};

use super::orders::record_id;
use super::soap;
use super::statement::Statement;
use super::{entity_name, AdManager};
use crate::dates;
use crate::error::CoreError;
use crate::normalize::{attr, attr_i64, attr_str, Record};

/// Primary goal fields, extracted leniently: a malformed units value means
/// "no goal", a missing unit type means impressions.
fn extract_goal(line_item: &Value) -> (Option<i64>, String) {
    let goal = attr(line_item, "primaryGoal");
    if !goal.is_object() {
        return (None, "IMPRESSIONS".to_string());
    }

    let units = attr_i64(&goal, "units");
    let unit_type = match attr_str(&goal, "unitType", "") {
        s if s.is_empty() || s == crate::normalize::NOT_AVAILABLE => "IMPRESSIONS".to_string(),
        s => s,
    };
    (units, unit_type)
}

/// Click-through rate cell, `-` without impressions.
pub fn ctr_display(impressions: u64, clicks: u64) -> String {
    if impressions > 0 {
        format!("{:.2}%", clicks as f64 / impressions as f64 * 100.0)
    } else {
        "-".to_string()
    }
}

/// Goal progress cell. Delivered units are clicks for click goals
/// (unit type contains `CLICKS`, any case), impressions otherwise; `-`
/// when there is no goal or no impressions yet.
pub fn progress_display(
    goal_units: Option<i64>,
    goal_unit_type: &str,
    impressions: u64,
    clicks: u64,
) -> String {
    let Some(goal) = goal_units.filter(|g| *g > 0) else {
        return "-".to_string();
    };
    if impressions == 0 {
        return "-".to_string();
    }

    let delivered = if goal_unit_type.to_uppercase().contains("CLICKS") {
        clicks
    } else {
        impressions
    };
    format!("{:.1}%", delivered as f64 / goal as f64 * 100.0)
}

/// Flatten one raw line item into a display record. Metrics columns start
/// zeroed; enrichment fills them after the report query.
pub fn line_item_record(li: &Value) -> Record {
    let (goal_units, goal_unit_type) = extract_goal(li);

    let mut rec = Record::new();
    rec.insert("id".to_string(), attr(li, "id"));
    rec.insert("name".to_string(), Value::String(entity_name(li)));
    rec.insert("orderId".to_string(), attr(li, "orderId"));
    rec.insert("status".to_string(), attr(li, "status"));
    rec.insert("lineItemType".to_string(), attr(li, "lineItemType"));
    rec.insert(
        "startDate".to_string(),
        Value::String(dates::format_display(Some(&attr(li, "startDateTime")))),
    );
    rec.insert(
        "endDate".to_string(),
        Value::String(dates::format_display(Some(&attr(li, "endDateTime")))),
    );
    rec.insert(
        "goalUnits".to_string(),
        goal_units.map(|u| json!(u)).unwrap_or(Value::Null),
    );
    rec.insert("goalUnitType".to_string(), json!(goal_unit_type));
    rec.insert("impressions".to_string(), json!(0));
    rec.insert("clicks".to_string(), json!(0));
    rec.insert("ctr".to_string(), json!("-"));
    rec.insert("progress".to_string(), json!("-"));
    rec
}

impl AdManager {
    /// List line items, optionally scoped to one order, enriched with
    /// 90-day metrics and derived CTR/progress columns.
    pub async fn line_items(
        &self,
        order_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Record>, CoreError> {
        let stmt = match order_id {
            Some(oid) => Statement::new().where_clause(format!("orderId = {}", oid)),
            None => Statement::new().where_clause("id > 0"),
        }
        .order_by("id", false)
        .limit(limit);

        let page = self
            .soap()
            .call(
                "LineItemService",
                "getLineItemsByStatement",
                &stmt.to_payload(),
            )
            .await?;
        let results = soap::results_array(&page);

        let mut records: Vec<Record> = results.iter().map(line_item_record).collect();

        let ids: Vec<String> = records.iter().filter_map(record_id).collect();
        if !ids.is_empty() {
            let metrics = self.report().line_item_metrics(&ids).await;
            for rec in &mut records {
                let Some(id) = record_id(rec) else {
                    continue;
                };
                let m = metrics.get(&id).copied().unwrap_or_default();
                let goal_units = rec.get("goalUnits").and_then(Value::as_i64);
                let goal_unit_type = rec
                    .get("goalUnitType")
                    .and_then(Value::as_str)
                    .unwrap_or("IMPRESSIONS")
                    .to_string();

                rec.insert("impressions".to_string(), json!(m.impressions));
                rec.insert("clicks".to_string(), json!(m.clicks));
                rec.insert(
                    "ctr".to_string(),
                    json!(ctr_display(m.impressions, m.clicks)),
                );
                rec.insert(
                    "progress".to_string(),
                    json!(progress_display(
                        goal_units,
                        &goal_unit_type,
                        m.impressions,
                        m.clicks
                    )),
                );
            }
        }

        Ok(records)
    }
}
