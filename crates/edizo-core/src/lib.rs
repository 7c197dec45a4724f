//! Core domain model and pricing rules for the Edizo internship catalog.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "edizo-core";

/// The four fixed internship-length buckets. Totally ordered as listed;
/// every duration-indexed map in the catalog is keyed by this type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Duration {
    #[serde(rename = "15-days")]
    FifteenDays,
    #[serde(rename = "1-month")]
    OneMonth,
    #[serde(rename = "2-months")]
    TwoMonths,
    #[serde(rename = "3-months")]
    ThreeMonths,
}

impl Duration {
    pub const ALL: [Duration; 4] = [
        Duration::FifteenDays,
        Duration::OneMonth,
        Duration::TwoMonths,
        Duration::ThreeMonths,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Duration::FifteenDays => "15-days",
            Duration::OneMonth => "1-month",
            Duration::TwoMonths => "2-months",
            Duration::ThreeMonths => "3-months",
        }
    }

    pub fn parse_label(label: &str) -> Option<Duration> {
        Duration::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeliveryMode {
    #[default]
    Online,
    Offline,
}

impl DeliveryMode {
    /// Sheet cells default to Online unless the cell literally says Offline.
    pub fn from_cell(cell: &str) -> DeliveryMode {
        if cell.trim().eq_ignore_ascii_case("offline") {
            DeliveryMode::Offline
        } else {
            DeliveryMode::Online
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeliveryMode::Online => "Online",
            DeliveryMode::Offline => "Offline",
        }
    }
}

/// Sink for computation guards. Price math never panics on bad inputs; it
/// clamps and reports through this interface so tests can assert on the
/// warnings instead of scraping log output.
pub trait Diagnostics: Send + Sync {
    fn warn(&self, message: &str);
}

/// Default sink that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// `round(original × (1 − percent/100))`. A percentage above 100 is reported
/// and leaves the price unchanged; zero short-circuits.
pub fn final_price(original: u32, percent: u8, diagnostics: &dyn Diagnostics) -> u32 {
    if percent == 0 {
        return original;
    }
    if percent > 100 {
        diagnostics.warn(&format!(
            "discount percent {percent} out of range for price {original}; ignoring"
        ));
        return original;
    }
    (f64::from(original) * (1.0 - f64::from(percent) / 100.0)).round() as u32
}

/// Amount saved between an original and a final price, never negative.
pub fn savings(original: u32, final_price: u32) -> u32 {
    original.saturating_sub(final_price)
}

/// Effective percentage between an original and a discounted price;
/// zero when there is no original price to discount against.
pub fn discount_percent_between(original: u32, discounted: u32) -> u8 {
    if original == 0 {
        return 0;
    }
    let saved = f64::from(original.saturating_sub(discounted));
    (saved * 100.0 / f64::from(original)).round() as u8
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CouponError {
    #[error("percentage coupon {code} has value {value} greater than 100")]
    PercentOutOfRange { code: String, value: u8 },
}

/// Discount shape. Percentage values above 100 are rejected at construction,
/// so the evaluator never has to re-validate the variant it is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponKind {
    Percentage {
        value: u8,
        #[serde(default)]
        cap: Option<u32>,
    },
    Fixed {
        amount: u32,
        #[serde(default)]
        cap: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub kind: CouponKind,
    pub is_active: bool,
    /// `None` means the coupon applies to every duration.
    #[serde(default)]
    pub applicable_durations: Option<BTreeSet<Duration>>,
    #[serde(default)]
    pub min_order_amount: Option<u32>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
}

impl Coupon {
    pub fn percentage(code: impl Into<String>, value: u8) -> Result<Coupon, CouponError> {
        let code = code.into();
        if value > 100 {
            return Err(CouponError::PercentOutOfRange { code, value });
        }
        Ok(Coupon {
            code,
            kind: CouponKind::Percentage { value, cap: None },
            is_active: true,
            applicable_durations: None,
            min_order_amount: None,
            valid_from: None,
            valid_until: None,
            usage_limit: None,
            used_count: 0,
        })
    }

    pub fn fixed(code: impl Into<String>, amount: u32) -> Coupon {
        Coupon {
            code: code.into(),
            kind: CouponKind::Fixed { amount, cap: None },
            is_active: true,
            applicable_durations: None,
            min_order_amount: None,
            valid_from: None,
            valid_until: None,
            usage_limit: None,
            used_count: 0,
        }
    }

    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    pub fn applies_to(&self, duration: Duration) -> bool {
        match &self.applicable_durations {
            Some(durations) => durations.contains(&duration),
            None => true,
        }
    }

    fn window_and_usage_ok(&self, now: DateTime<Utc>) -> bool {
        if self.valid_from.is_some_and(|from| from > now) {
            return false;
        }
        if self.valid_until.is_some_and(|until| until < now) {
            return false;
        }
        !self
            .usage_limit
            .is_some_and(|limit| self.used_count >= limit)
    }
}

/// Why a coupon was refused. The `Display` strings are user-facing and fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Coupon is not active")]
    Inactive,
    #[error("Coupon is not yet valid")]
    NotYetValid,
    #[error("Coupon has expired")]
    Expired,
    #[error("Coupon usage limit reached")]
    UsageLimitReached,
}

/// Successful coupon application against a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponQuote {
    pub code: String,
    pub original_price: u32,
    pub discount_amount: u32,
    pub final_price: u32,
}

/// Validates the coupon (first failure wins, in the order active → window →
/// usage) and computes the discounted price. The final price never goes
/// negative, whatever the coupon claims.
pub fn evaluate_coupon_at(
    original_price: u32,
    coupon: &Coupon,
    now: DateTime<Utc>,
) -> Result<CouponQuote, CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if coupon.valid_from.is_some_and(|from| from > now) {
        return Err(CouponRejection::NotYetValid);
    }
    if coupon.valid_until.is_some_and(|until| until < now) {
        return Err(CouponRejection::Expired);
    }
    if coupon
        .usage_limit
        .is_some_and(|limit| coupon.used_count >= limit)
    {
        return Err(CouponRejection::UsageLimitReached);
    }

    let discount_amount = match coupon.kind {
        CouponKind::Percentage { value, cap } => {
            let amount =
                (f64::from(original_price) * f64::from(value) / 100.0).round() as u32;
            cap.map_or(amount, |cap| amount.min(cap))
        }
        CouponKind::Fixed { amount, cap } => {
            let amount = amount.min(original_price);
            cap.map_or(amount, |cap| amount.min(cap))
        }
    };

    Ok(CouponQuote {
        code: coupon.code.clone(),
        original_price,
        discount_amount,
        final_price: original_price.saturating_sub(discount_amount),
    })
}

pub fn evaluate_coupon(
    original_price: u32,
    coupon: &Coupon,
) -> Result<CouponQuote, CouponRejection> {
    evaluate_coupon_at(original_price, coupon, Utc::now())
}

/// Case-insensitive lookup of a usable coupon for a duration. Unlike
/// [`evaluate_coupon_at`] this collapses every failure to `None`: callers
/// asking "is there a coupon for this code" do not get a reason.
pub fn find_valid_coupon_at<'a>(
    coupons: &'a [Coupon],
    code: &str,
    duration: Duration,
    now: DateTime<Utc>,
) -> Option<&'a Coupon> {
    coupons.iter().find(|coupon| {
        coupon.matches_code(code)
            && coupon.is_active
            && coupon.applies_to(duration)
            && coupon.window_and_usage_ok(now)
    })
}

pub fn find_valid_coupon<'a>(
    coupons: &'a [Coupon],
    code: &str,
    duration: Duration,
) -> Option<&'a Coupon> {
    find_valid_coupon_at(coupons, code, duration, Utc::now())
}

/// One internship listing as parsed from the sheet. Constructed once per raw
/// row and replaced wholesale on refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternshipRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub mode: DeliveryMode,
    pub company: String,
    pub image: String,
    pub rating: f32,
    pub description: String,
    pub why_choose_edizo: Vec<String>,
    pub benefits: Vec<String>,
    pub syllabus: BTreeMap<Duration, Vec<String>>,
    pub pricing: BTreeMap<Duration, u32>,
    pub discount: BTreeMap<Duration, u8>,
    #[serde(default)]
    pub available_coupons: Vec<Coupon>,
    #[serde(default)]
    pub coupon_discounts: BTreeMap<Duration, u8>,
}

impl InternshipRecord {
    // Missing duration keys resolve to 0/empty rather than poking holes in
    // the pricing grid.

    pub fn price_for(&self, duration: Duration) -> u32 {
        self.pricing.get(&duration).copied().unwrap_or(0)
    }

    pub fn discount_for(&self, duration: Duration) -> u8 {
        self.discount.get(&duration).copied().unwrap_or(0)
    }

    pub fn coupon_discount_for(&self, duration: Duration) -> u8 {
        self.coupon_discounts.get(&duration).copied().unwrap_or(0)
    }

    pub fn syllabus_for(&self, duration: Duration) -> &[String] {
        self.syllabus
            .get(&duration)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn max_discount(&self) -> u8 {
        Duration::ALL
            .into_iter()
            .map(|d| self.discount_for(d))
            .max()
            .unwrap_or(0)
    }
}

/// Sheet-backed team member listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub role: String,
    pub image: String,
    pub bio: String,
    pub linkedin: String,
    pub github: String,
}

/// Derived per-duration pricing summary. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTier {
    pub duration: Duration,
    pub label: String,
    pub original_price: u32,
    /// Base sheet discount, before any coupon layer.
    pub discount_percent: u8,
    pub final_price: u32,
    pub savings: u32,
    pub description: String,
    pub features: Vec<String>,
    pub is_popular: bool,
    pub applied_coupon: Option<String>,
}

// Static marketing copy per duration; deliberately not derived from the
// record so every listing presents the same tier framing.
fn tier_copy(duration: Duration) -> (&'static str, &'static [&'static str]) {
    match duration {
        Duration::FifteenDays => (
            "Fast-track essentials with one guided mini project.",
            &[
                "Live mentor sessions",
                "1 mini project",
                "Certificate of completion",
            ],
        ),
        Duration::OneMonth => (
            "Fundamentals plus a portfolio project with a personal review.",
            &[
                "Live mentor sessions",
                "2 guided projects",
                "Portfolio review",
                "Certificate of completion",
            ],
        ),
        Duration::TwoMonths => (
            "Deep-dive track with team projects and interview preparation.",
            &[
                "Live mentor sessions",
                "3 team projects",
                "Mock interview",
                "Letter of recommendation",
                "Certificate of completion",
            ],
        ),
        Duration::ThreeMonths => (
            "Full industry simulation ending in a client-style capstone.",
            &[
                "Live mentor sessions",
                "Capstone project",
                "1:1 career guidance",
                "Mock interview",
                "Letter of recommendation",
                "Certificate of completion",
            ],
        ),
    }
}

/// Builds the four pricing tiers for a record, layering at most one coupon
/// source per tier. A user-supplied coupon wins over the sheet-embedded
/// coupon discount; either one compounds on the already-discounted base
/// price, and savings are recomputed from the end result so stacked layers
/// cannot double-count.
pub fn pricing_tiers_at(
    record: &InternshipRecord,
    applied: Option<&Coupon>,
    diagnostics: &dyn Diagnostics,
    now: DateTime<Utc>,
) -> Vec<PricingTier> {
    Duration::ALL
        .into_iter()
        .map(|duration| {
            let original_price = record.price_for(duration);
            let discount_percent = record.discount_for(duration);
            let base_price = final_price(original_price, discount_percent, diagnostics);

            let user_quote = applied
                .filter(|coupon| coupon.applies_to(duration))
                .and_then(|coupon| {
                    evaluate_coupon_at(base_price, coupon, now)
                        .ok()
                        .map(|quote| (coupon.code.clone(), quote))
                });
            let (end_price, applied_coupon) = match user_quote {
                Some((code, quote)) => (quote.final_price, Some(code)),
                None => {
                    let sheet_percent = record.coupon_discount_for(duration);
                    (final_price(base_price, sheet_percent, diagnostics), None)
                }
            };

            let (description, features) = tier_copy(duration);
            PricingTier {
                duration,
                label: duration.label().to_string(),
                original_price,
                discount_percent,
                final_price: end_price,
                savings: savings(original_price, end_price),
                description: description.to_string(),
                features: features.iter().map(|f| f.to_string()).collect(),
                is_popular: duration == Duration::OneMonth,
                applied_coupon,
            }
        })
        .collect()
}

pub fn pricing_tiers(
    record: &InternshipRecord,
    applied: Option<&Coupon>,
    diagnostics: &dyn Diagnostics,
) -> Vec<PricingTier> {
    pricing_tiers_at(record, applied, diagnostics, Utc::now())
}

/// Minimum positive tier price across durations, with sheet discounts and
/// sheet-embedded coupons applied. `None` when no duration has a price.
pub fn cheapest_price_at(
    record: &InternshipRecord,
    diagnostics: &dyn Diagnostics,
    now: DateTime<Utc>,
) -> Option<u32> {
    pricing_tiers_at(record, None, diagnostics, now)
        .into_iter()
        .map(|tier| tier.final_price)
        .filter(|price| *price > 0)
        .min()
}

pub fn cheapest_price(record: &InternshipRecord, diagnostics: &dyn Diagnostics) -> Option<u32> {
    cheapest_price_at(record, diagnostics, Utc::now())
}

fn is_filter_noop(term: &str) -> bool {
    let term = term.trim();
    term.is_empty() || term.eq_ignore_ascii_case("all")
}

pub fn filter_by_category(records: &[InternshipRecord], category: &str) -> Vec<InternshipRecord> {
    if is_filter_noop(category) {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| r.category.eq_ignore_ascii_case(category.trim()))
        .cloned()
        .collect()
}

pub fn filter_by_mode(records: &[InternshipRecord], mode: &str) -> Vec<InternshipRecord> {
    if is_filter_noop(mode) {
        return records.to_vec();
    }
    let wanted = DeliveryMode::from_cell(mode);
    records
        .iter()
        .filter(|r| r.mode == wanted)
        .cloned()
        .collect()
}

pub fn filter_by_search(records: &[InternshipRecord], term: &str) -> Vec<InternshipRecord> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| {
            [&r.title, &r.category, &r.company, &r.description]
                .into_iter()
                .any(|field| field.to_lowercase().contains(&term))
        })
        .cloned()
        .collect()
}

/// Filters on the cheapest final price. Records without a positive price are
/// dropped once either bound is present.
pub fn filter_by_price_range(
    records: &[InternshipRecord],
    min: Option<u32>,
    max: Option<u32>,
    diagnostics: &dyn Diagnostics,
) -> Vec<InternshipRecord> {
    if min.is_none() && max.is_none() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| match cheapest_price(r, diagnostics) {
            Some(price) => {
                min.is_none_or(|min| price >= min) && max.is_none_or(|max| price <= max)
            }
            None => false,
        })
        .cloned()
        .collect()
}

pub fn sort_by_rating(records: &[InternshipRecord], ascending: bool) -> Vec<InternshipRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        let ord = a.rating.total_cmp(&b.rating);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    sorted
}

pub fn sort_by_discount(records: &[InternshipRecord], ascending: bool) -> Vec<InternshipRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        let ord = a.max_discount().cmp(&b.max_discount());
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    sorted
}

/// Sorts on the cheapest final price per record; records with no positive
/// price go last regardless of direction.
pub fn sort_by_price(
    records: &[InternshipRecord],
    ascending: bool,
    diagnostics: &dyn Diagnostics,
) -> Vec<InternshipRecord> {
    let mut keyed: Vec<(Option<u32>, InternshipRecord)> = records
        .iter()
        .map(|r| (cheapest_price(r, diagnostics), r.clone()))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.cmp(b);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    keyed.into_iter().map(|(_, r)| r).collect()
}
