//! Ad Manager service facade
//!
//! One `AdManager` per invocation, wrapping the SOAP transport for the
//! entity listers and the report client for the metrics side channel.

pub mod inventory;
pub mod line_items;
pub mod orders;
pub mod soap;
pub mod statement;

use serde_json::Value;

use crate::auth;
use crate::config::{self, GamConfig};
use crate::error::CoreError;
use crate::normalize::{attr, attr_str, Record};
use crate::report::ReportClient;

use self::soap::SoapClient;
use self::statement::Statement;

pub struct AdManager {
    soap: SoapClient,
    report: ReportClient,
}

impl AdManager {
    /// Build the facade from a loaded config.
    pub fn from_config(config: &GamConfig) -> Result<Self, CoreError> {
        let network_code = config
            .network_code()
            .ok_or(CoreError::MissingConfigKey {
                key: "ad_manager.network_code",
            })?;
        let config_dir = config::config_dir()?;
        let credentials = auth::resolve_report_credentials(
            config.ad_manager.path_to_private_key_file.as_deref(),
            &config_dir,
        );

        let soap = SoapClient::new(
            network_code.clone(),
            config.application_name().to_string(),
            credentials.clone(),
        )?;
        let report = ReportClient::new(network_code, credentials)?;

        Ok(Self { soap, report })
    }

    pub(crate) fn soap(&self) -> &SoapClient {
        &self.soap
    }

    pub(crate) fn report(&self) -> &ReportClient {
        &self.report
    }

    /// Current API user, flattened for display.
    pub async fn current_user(&self) -> Result<Record, CoreError> {
        let me = self.soap.call("UserService", "getCurrentUser", "").await?;

        let mut rec = Record::new();
        rec.insert(
            "displayName".to_string(),
            Value::String(first_non_empty(&me, &["displayName", "name"])),
        );
        rec.insert(
            "email".to_string(),
            Value::String(attr_str(&me, "email", "")),
        );
        rec.insert("id".to_string(), Value::String(attr_str(&me, "id", "")));
        rec.insert(
            "roleName".to_string(),
            Value::String(first_non_empty(&me, &["roleName", "role"])),
        );
        Ok(rec)
    }

    /// All networks the credentials can see.
    pub async fn networks(&self) -> Result<Vec<Record>, CoreError> {
        let rval = self
            .soap
            .call("NetworkService", "getAllNetworks", "")
            .await?;

        Ok(soap::as_items(&rval)
            .iter()
            .map(|n| {
                let mut rec = Record::new();
                rec.insert("networkCode".to_string(), attr(n, "networkCode"));
                rec.insert("displayName".to_string(), attr(n, "displayName"));
                rec.insert("propertyCode".to_string(), attr(n, "propertyCode"));
                rec
            })
            .collect())
    }

    /// Newest creatives, id descending.
    pub async fn creatives(&self, limit: u32) -> Result<Vec<Record>, CoreError> {
        let stmt = Statement::new()
            .where_clause("id > 0")
            .order_by("id", false)
            .limit(limit);
        let page = self
            .soap
            .call("CreativeService", "getCreativesByStatement", &stmt.to_payload())
            .await?;

        Ok(soap::results_array(&page)
            .iter()
            .map(|c| {
                let mut rec = Record::new();
                rec.insert("id".to_string(), attr(c, "id"));
                rec.insert("name".to_string(), Value::String(entity_name(c)));
                rec.insert("advertiserId".to_string(), attr(c, "advertiserId"));
                rec
            })
            .collect())
    }

    /// Root ad unit of the current network, for run-of-network targeting.
    pub(crate) async fn root_ad_unit_id(&self) -> Result<String, CoreError> {
        let network = self
            .soap
            .call("NetworkService", "getCurrentNetwork", "")
            .await?;
        let id = attr_str(&network, "effectiveRootAdUnitId", "");
        if id.is_empty() {
            return Err(CoreError::MalformedResponse {
                service: "NetworkService".to_string(),
                message: "missing effectiveRootAdUnitId".to_string(),
            });
        }
        Ok(id)
    }
}

/// First non-empty of the given fields, as a string.
fn first_non_empty(obj: &Value, keys: &[&str]) -> String {
    for key in keys {
        let v = attr_str(obj, key, "");
        if !v.is_empty() {
            return v;
        }
    }
    String::new()
}

/// Entity display name (`name`, falling back to `displayName`), clipped to
/// 40 characters like the table columns expect.
pub(crate) fn entity_name(obj: &Value) -> String {
    first_non_empty(obj, &["name", "displayName"])
        .chars()
        .take(40)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_name_fallback_and_clip() {
        assert_eq!(entity_name(&json!({"name": "Order A"})), "Order A");
        assert_eq!(
            entity_name(&json!({"name": "", "displayName": "Fallback"})),
            "Fallback"
        );
        assert_eq!(entity_name(&json!({})), "");

        let long = "x".repeat(60);
        assert_eq!(entity_name(&json!({ "name": long })).len(), 40);
    }

    #[test]
    fn test_first_non_empty_order() {
        let obj = json!({"roleName": "Admin", "role": "ignored"});
        assert_eq!(first_non_empty(&obj, &["roleName", "role"]), "Admin");

        let obj = json!({"role": "Trafficker"});
        assert_eq!(first_non_empty(&obj, &["roleName", "role"]), "Trafficker");
    }
}
