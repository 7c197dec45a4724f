//! Fixture-driven ingestion test against a captured sheets API payload.

use std::path::{Path, PathBuf};

use edizo_core::Duration;
use edizo_sheets::{parse_internship_sheet, CouponCodeTable};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ValuesFixture {
    values: Vec<Vec<String>>,
}

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join("fixtures/internships/values.json")
}

#[test]
fn captured_payload_parses_into_records() {
    let text = std::fs::read_to_string(fixture_path()).expect("read fixture");
    let fixture: ValuesFixture = serde_json::from_str(&text).expect("parse fixture");

    let parsed = parse_internship_sheet(&fixture.values, &CouponCodeTable::builtin());
    assert_eq!(parsed.records.len(), 2);
    assert_eq!(parsed.skipped.len(), 1);

    let web = &parsed.records[0];
    assert_eq!(web.id, "web-dev");
    assert_eq!(web.price_for(Duration::OneMonth), 2600);
    assert_eq!(web.discount_for(Duration::OneMonth), 10);
    assert_eq!(web.coupon_discount_for(Duration::ThreeMonths), 10);
    assert_eq!(web.available_coupons.len(), 2);
    assert_eq!(web.syllabus_for(Duration::OneMonth).len(), 4);

    let uiux = &parsed.records[1];
    assert_eq!(uiux.id, "ui-ux");
    assert_eq!(uiux.mode, edizo_core::DeliveryMode::Offline);
    assert_eq!(uiux.rating, 4.4);
}
