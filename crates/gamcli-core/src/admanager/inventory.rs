//! Inventory forecasts
//!
//! Availability forecasts for a synthetic prospective line item per preset,
//! and the network-wide traffic forecast variant. A failing preset yields a
//! dash row instead of aborting the listing.

use chrono::{Local, NaiveDate};
use serde_json::{json, Value};

use super::soap::{self, value_to_xml};
use super::AdManager;
use crate::dates::to_vendor_datetime;
use crate::error::CoreError;
use crate::normalize::{attr, attr_i64, Fields, Record};
use crate::presets::{self, InventoryPreset};
use crate::render::fmt_thousands;

/// Outcome of one availability forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastResult {
    pub matched: i64,
    pub available: i64,
    pub reserved: i64,
}

impl ForecastResult {
    pub fn new(matched: i64, available: i64) -> Self {
        Self {
            matched,
            available,
            reserved: matched - available,
        }
    }

    /// Sell-through rate cell, `-` when nothing matched.
    pub fn saturation_display(&self) -> String {
        if self.matched > 0 {
            format!(
                "{:.1}%",
                self.reserved as f64 / self.matched as f64 * 100.0
            )
        } else {
            "-".to_string()
        }
    }
}

/// Forecast rows plus the resolved date window.
#[derive(Debug, Clone)]
pub struct InventoryListing {
    pub rows: Vec<Record>,
    pub start: String,
    pub end: String,
}

const LIFETIME_GOAL_UNITS: u64 = 1_000_000;

impl AdManager {
    async fn availability_forecast(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        sizes: Option<&[(u32, u32)]>,
    ) -> Result<ForecastResult, CoreError> {
        let root_ad_unit_id = self.root_ad_unit_id().await?;

        let creative_placeholders: Vec<Value> = match sizes {
            Some(sizes) => sizes
                .iter()
                .map(|(w, h)| {
                    json!({"size": {"width": w, "height": h, "isAspectRatio": false}})
                })
                .collect(),
            None => vec![json!({"size": {"width": 300, "height": 250, "isAspectRatio": false}})],
        };

        let prospective = json!({
            "lineItem": {
                "targeting": {
                    "inventoryTargeting": {
                        "targetedAdUnits": [{
                            "adUnitId": root_ad_unit_id,
                            "includeDescendants": true,
                        }]
                    }
                },
                "startDateTime": to_vendor_datetime(start, 0),
                "endDateTime": to_vendor_datetime(end, 23),
                "lineItemType": "STANDARD",
                "costType": "CPM",
                "creativePlaceholders": creative_placeholders,
                "primaryGoal": {
                    "goalType": "LIFETIME",
                    "unitType": "IMPRESSIONS",
                    "units": LIFETIME_GOAL_UNITS,
                },
            }
        });
        let options = json!({
            "includeContendingLineItems": true,
            "includeTargetingCriteriaBreakdown": true,
        });

        let payload = format!(
            "{}{}",
            value_to_xml("lineItem", &prospective),
            value_to_xml("forecastOptions", &options)
        );

        let forecast = self
            .soap()
            .call("ForecastService", "getAvailabilityForecast", &payload)
            .await?;

        let matched =
            attr_i64(&forecast, "matchedUnits").ok_or_else(|| CoreError::MalformedResponse {
                service: "ForecastService".to_string(),
                message: "missing matchedUnits".to_string(),
            })?;
        let available =
            attr_i64(&forecast, "availableUnits").ok_or_else(|| CoreError::MalformedResponse {
                service: "ForecastService".to_string(),
                message: "missing availableUnits".to_string(),
            })?;

        Ok(ForecastResult::new(matched, available))
    }

    /// Forecast availability for one preset or the whole catalog over the
    /// given window (defaults: today through +30 days).
    pub async fn inventory(
        &self,
        preset: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> InventoryListing {
        let today = Local::now().date_naive();
        let start = start.unwrap_or(today);
        let end = end.unwrap_or(today + chrono::Duration::days(30));

        let mut rows = Vec::new();
        for preset in presets::selected(preset) {
            match self.availability_forecast(start, end, preset.sizes).await {
                Ok(result) => rows.push(forecast_row(preset, Some(result))),
                Err(e) => {
                    tracing::warn!(preset = preset.key, error = %e, "Forecast failed");
                    rows.push(forecast_row(preset, None));
                }
            }
        }

        InventoryListing {
            rows,
            start: start.format("%Y-%m-%d").to_string(),
            end: end.format("%Y-%m-%d").to_string(),
        }
    }

    /// Network-wide forecasted impressions over a window, via the traffic
    /// data endpoint (Ad Manager 360 only). `None` when the vendor returns
    /// no forecasted series.
    pub async fn traffic_forecast(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<i64>, CoreError> {
        let root_ad_unit_id = self.root_ad_unit_id().await?;

        let request = json!({
            "targeting": {
                "inventoryTargeting": {
                    "targetedAdUnits": [{
                        "includeDescendants": true,
                        "adUnitId": root_ad_unit_id,
                    }]
                }
            },
            "requestedDateRange": {
                "startDate": plain_date(start),
                "endDate": plain_date(end),
            },
        });

        let data = self
            .soap()
            .call(
                "ForecastService",
                "getTrafficData",
                &value_to_xml("trafficDataRequest", &request),
            )
            .await?;

        let series = attr(&data, "forecastedTimeSeries");
        let values = match series.field("values") {
            Some(v) => soap::as_items(v),
            None => return Ok(None),
        };
        if values.is_empty() {
            return Ok(None);
        }

        let total: i64 = values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => s.trim().parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            })
            .sum();
        Ok(Some(total))
    }
}

fn plain_date(date: NaiveDate) -> Value {
    use chrono::Datelike;
    json!({"year": date.year(), "month": date.month(), "day": date.day()})
}

fn forecast_row(preset: &InventoryPreset, result: Option<ForecastResult>) -> Record {
    let mut rec = Record::new();
    rec.insert("preset".to_string(), json!(preset.key));
    rec.insert("label".to_string(), json!(preset.label));
    rec.insert("sizes".to_string(), json!(preset.sizes_label()));
    match result {
        Some(f) => {
            rec.insert("available".to_string(), json!(fmt_thousands(f.available)));
            rec.insert("forecasted".to_string(), json!(fmt_thousands(f.matched)));
            rec.insert("reserved".to_string(), json!(fmt_thousands(f.reserved)));
            rec.insert("str".to_string(), json!(f.saturation_display()));
        }
        None => {
            rec.insert("available".to_string(), json!("-"));
            rec.insert("forecasted".to_string(), json!("-"));
            rec.insert("reserved".to_string(), json!("-"));
            rec.insert("str".to_string(), json!("-"));
        }
    }
    rec
}
