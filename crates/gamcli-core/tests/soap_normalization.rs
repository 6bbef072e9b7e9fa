//! End-to-end normalization: SOAP response XML through the value tree,
//! record mapping, and the table renderer. No network involved.

use gamcli_core::admanager::line_items::line_item_record;
use gamcli_core::admanager::orders::order_record;
use gamcli_core::admanager::soap::{find_key, results_array, xml_to_value};
use gamcli_core::render::{cell, format_table};

const ORDERS_ENVELOPE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <getOrdersByStatementResponse xmlns="https://www.google.com/apis/ads/publisher/v202511">
      <rval>
        <totalResultSetSize>2</totalResultSetSize>
        <startIndex>0</startIndex>
        <results>
          <id>987654</id>
          <name>Spring Campaign</name>
          <status>APPROVED</status>
          <startDateTime>
            <date><year>2026</year><month>3</month><day>1</day></date>
            <hour>0</hour>
          </startDateTime>
          <endDateTime>
            <date><year>2026</year><month>4</month><day>1</day></date>
            <hour>23</hour>
          </endDateTime>
          <currencyCode>EUR</currencyCode>
          <advertiserId>555</advertiserId>
        </results>
        <results>
          <id>987653</id>
          <name>Untimed House Ads</name>
          <status>DRAFT</status>
          <unlimitedEndTime>true</unlimitedEndTime>
        </results>
      </rval>
    </getOrdersByStatementResponse>
  </soap:Body>
</soap:Envelope>"#;

const LINE_ITEMS_ENVELOPE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <getLineItemsByStatementResponse xmlns="https://www.google.com/apis/ads/publisher/v202511">
      <rval>
        <totalResultSetSize>1</totalResultSetSize>
        <results>
          <id>111222</id>
          <orderId>987654</orderId>
          <name>Homepage ATF 300x250</name>
          <status>DELIVERING</status>
          <lineItemType>STANDARD</lineItemType>
          <primaryGoal>
            <goalType>LIFETIME</goalType>
            <unitType>CLICKS</unitType>
            <units>1000</units>
          </primaryGoal>
        </results>
      </rval>
    </getLineItemsByStatementResponse>
  </soap:Body>
</soap:Envelope>"#;

#[test]
fn orders_envelope_flattens_to_records() {
    let doc = xml_to_value(ORDERS_ENVELOPE).unwrap();
    let page = find_key(&doc, "getOrdersByStatementResponse")
        .and_then(|r| r.get("rval"))
        .unwrap();
    let results = results_array(page);
    assert_eq!(results.len(), 2);

    let first = order_record(&results[0], false);
    assert_eq!(cell(&first, "id"), "987654");
    assert_eq!(cell(&first, "name"), "Spring Campaign");
    assert_eq!(cell(&first, "status"), "APPROVED");
    assert_eq!(cell(&first, "startDate"), "2026-03-01");
    assert_eq!(cell(&first, "endDate"), "2026-04-01");
    assert_eq!(cell(&first, "currency"), "EUR");

    // Sparse row: missing dates degrade to the accessor sentinel, not an
    // error or an aborted row.
    let second = order_record(&results[1], false);
    assert_eq!(cell(&second, "id"), "987653");
    assert_eq!(cell(&second, "startDate"), "N/A");
    assert_eq!(cell(&second, "currency"), "N/A");

    // Forced display status for the delivering filter
    let forced = order_record(&results[1], true);
    assert_eq!(cell(&forced, "status"), "DELIVERING");
}

#[test]
fn line_items_envelope_carries_goal_fields() {
    let doc = xml_to_value(LINE_ITEMS_ENVELOPE).unwrap();
    let page = find_key(&doc, "getLineItemsByStatementResponse")
        .and_then(|r| r.get("rval"))
        .unwrap();
    let results = results_array(page);
    assert_eq!(results.len(), 1);

    let rec = line_item_record(&results[0]);
    assert_eq!(cell(&rec, "id"), "111222");
    assert_eq!(cell(&rec, "orderId"), "987654");
    assert_eq!(rec["goalUnits"], serde_json::json!(1000));
    assert_eq!(cell(&rec, "goalUnitType"), "CLICKS");
    // Metrics columns start zeroed with dash placeholders
    assert_eq!(cell(&rec, "ctr"), "-");
    assert_eq!(cell(&rec, "progress"), "-");
}

#[test]
fn records_render_as_aligned_table() {
    let doc = xml_to_value(ORDERS_ENVELOPE).unwrap();
    let page = find_key(&doc, "getOrdersByStatementResponse")
        .and_then(|r| r.get("rval"))
        .unwrap();
    let rows: Vec<Vec<String>> = results_array(page)
        .iter()
        .map(|o| {
            let rec = order_record(o, false);
            vec![cell(&rec, "id"), cell(&rec, "name"), cell(&rec, "status")]
        })
        .collect();

    let table = format_table(&["ID", "Name", "Status"], &rows);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("ID"));
    assert!(lines[1].chars().all(|c| c == '-'));
    assert!(lines[2].contains("Spring Campaign"));
    // Every data line padded to the same width
    assert_eq!(lines[2].len(), lines[3].len());
}

#[test]
fn fault_envelope_surfaces_faultstring() {
    let fault = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
      <soap:Body>
        <soap:Fault>
          <faultcode>soap:Server</faultcode>
          <faultstring>[AuthenticationError.NETWORK_NOT_FOUND @ networkCode]</faultstring>
        </soap:Fault>
      </soap:Body>
    </soap:Envelope>"#;

    let doc = xml_to_value(fault).unwrap();
    let message = find_key(&doc, "faultstring").unwrap();
    assert_eq!(
        message,
        &serde_json::json!("[AuthenticationError.NETWORK_NOT_FOUND @ networkCode]")
    );
}
