//! Axum JSON API over the cached internship catalog.

use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use edizo_catalog::{CatalogConfig, CatalogService, DataOrigin, RefreshSummary};
use edizo_core::{
    evaluate_coupon, filter_by_category, filter_by_mode, filter_by_price_range, filter_by_search,
    final_price, pricing_tiers, sort_by_discount, sort_by_price, sort_by_rating, CouponQuote,
    Diagnostics, Duration, InternshipRecord, PricingTier, TeamMember, TracingDiagnostics,
};
use edizo_sheets::{SheetsClient, SheetsConfig};
use edizo_storage::{BackoffPolicy, HttpClientConfig};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub const CRATE_NAME: &str = "edizo-web";

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub diagnostics: Arc<dyn Diagnostics>,
}

impl AppState {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self {
            catalog,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct InternshipsQuery {
    category: Option<String>,
    mode: Option<String>,
    search: Option<String>,
    min_price: Option<u32>,
    max_price: Option<u32>,
    sort: Option<String>,
    ascending: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct PricingQuery {
    coupon: Option<String>,
}

#[derive(Serialize)]
struct ListMeta {
    fetched_at: DateTime<Utc>,
    stale: bool,
    origin: DataOrigin,
    count: usize,
}

#[derive(Serialize)]
struct InternshipsResponse {
    internships: Vec<InternshipRecord>,
    meta: ListMeta,
}

#[derive(Serialize)]
struct TeamResponse {
    team: Vec<TeamMember>,
    meta: ListMeta,
}

#[derive(Serialize)]
struct CouponOutcome {
    code: String,
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize)]
struct PricingResponse {
    id: String,
    tiers: Vec<PricingTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    coupon: Option<CouponOutcome>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/internships", get(internships_handler))
        .route("/api/internships/{id}", get(internship_detail_handler))
        .route("/api/internships/{id}/pricing", get(pricing_handler))
        .route("/api/coupons/validate", post(validate_coupon_handler))
        .route("/api/team", get(team_handler))
        .route("/api/refresh", post(refresh_handler))
        .with_state(state)
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    serve(None).await
}

/// Runs the API server. An explicit port wins over `EDIZO_WEB_PORT`.
pub async fn serve(port_override: Option<u16>) -> anyhow::Result<()> {
    let port = resolve_port(port_override, std::env::var("EDIZO_WEB_PORT").ok());

    let catalog_config = CatalogConfig::from_env();
    let sheets_config = SheetsConfig::from_env()?;
    let http = HttpClientConfig {
        timeout: catalog_config.http_timeout,
        user_agent: Some(catalog_config.user_agent.clone()),
        backoff: BackoffPolicy::default(),
    };
    let source = Arc::new(SheetsClient::new(sheets_config, http)?);
    let catalog = Arc::new(CatalogService::new(source, &catalog_config));
    let _scheduler = match catalog.maybe_build_scheduler(&catalog_config).await? {
        Some(scheduler) => {
            scheduler.start().await?;
            Some(scheduler)
        }
        None => None,
    };

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "edizo web API listening");
    axum::serve(listener, app(AppState::new(catalog))).await?;
    Ok(())
}

fn resolve_port(port_override: Option<u16>, env_value: Option<String>) -> u16 {
    port_override
        .or_else(|| env_value.and_then(|v| v.parse().ok()))
        .unwrap_or(8000)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": CRATE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn internships_handler(
    State(state): State<AppState>,
    Query(query): Query<InternshipsQuery>,
) -> Response {
    let view = match state.catalog.internships().await {
        Ok(view) => view,
        Err(err) => return server_error(err),
    };
    let mut rows = view.data;
    if let Some(category) = &query.category {
        rows = filter_by_category(&rows, category);
    }
    if let Some(mode) = &query.mode {
        rows = filter_by_mode(&rows, mode);
    }
    if let Some(term) = &query.search {
        rows = filter_by_search(&rows, term);
    }
    if query.min_price.is_some() || query.max_price.is_some() {
        rows = filter_by_price_range(
            &rows,
            query.min_price,
            query.max_price,
            &*state.diagnostics,
        );
    }
    let ascending = query.ascending.unwrap_or(true);
    rows = match query.sort.as_deref() {
        Some("rating") => sort_by_rating(&rows, ascending),
        Some("discount") => sort_by_discount(&rows, ascending),
        Some("price") => sort_by_price(&rows, ascending, &*state.diagnostics),
        _ => rows,
    };
    let meta = ListMeta {
        fetched_at: view.fetched_at,
        stale: view.stale,
        origin: view.origin,
        count: rows.len(),
    };
    let stale = view.stale;
    let mut resp = Json(InternshipsResponse {
        internships: rows,
        meta,
    })
    .into_response();
    mark_staleness(&mut resp, stale);
    resp
}

async fn internship_detail_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let view = match state.catalog.internships().await {
        Ok(view) => view,
        Err(err) => return server_error(err),
    };
    let stale = view.stale;
    match view.data.into_iter().find(|record| record.id == id) {
        Some(record) => {
            let mut resp = Json(record).into_response();
            mark_staleness(&mut resp, stale);
            resp
        }
        None => not_found("internship not found"),
    }
}

/// Tiers for one internship, optionally with a coupon code applied. A coupon
/// that does not validate still yields the tiers, priced with the
/// sheet-embedded coupon discount, plus the rejection reason.
async fn pricing_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<PricingQuery>,
) -> Response {
    let view = match state.catalog.internships().await {
        Ok(view) => view,
        Err(err) => return server_error(err),
    };
    let stale = view.stale;
    let Some(record) = view.data.into_iter().find(|record| record.id == id) else {
        return not_found("internship not found");
    };

    let mut applied = None;
    let coupon_outcome = query.coupon.as_deref().map(|code| {
        match record
            .available_coupons
            .iter()
            .find(|coupon| coupon.matches_code(code))
        {
            None => CouponOutcome {
                code: code.trim().to_uppercase(),
                accepted: false,
                message: Some("Coupon code not found".to_string()),
            },
            Some(coupon) => match evaluate_coupon(record.price_for(coupon_probe_duration()), coupon)
            {
                Ok(_) => {
                    applied = Some(coupon.clone());
                    CouponOutcome {
                        code: coupon.code.clone(),
                        accepted: true,
                        message: None,
                    }
                }
                Err(rejection) => CouponOutcome {
                    code: coupon.code.clone(),
                    accepted: false,
                    message: Some(rejection.to_string()),
                },
            },
        }
    });

    let tiers = pricing_tiers(&record, applied.as_ref(), &*state.diagnostics);
    let mut resp = Json(PricingResponse {
        id: record.id,
        tiers,
        coupon: coupon_outcome,
    })
    .into_response();
    mark_staleness(&mut resp, stale);
    resp
}

// Validity does not depend on price, so any duration works for the probe.
fn coupon_probe_duration() -> Duration {
    Duration::OneMonth
}

#[derive(Debug, Deserialize)]
struct ValidateCouponRequest {
    internship_id: String,
    code: String,
    duration: Duration,
}

#[derive(Serialize)]
struct ValidateCouponResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote: Option<CouponQuote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Validates a coupon for one internship and duration, quoting against the
/// already-discounted base price the way the tier builder layers coupons.
async fn validate_coupon_handler(
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> Response {
    let view = match state.catalog.internships().await {
        Ok(view) => view,
        Err(err) => return server_error(err),
    };
    let Some(record) = view
        .data
        .into_iter()
        .find(|record| record.id == request.internship_id)
    else {
        return not_found("internship not found");
    };

    let Some(coupon) = record
        .available_coupons
        .iter()
        .find(|coupon| coupon.matches_code(&request.code))
    else {
        return Json(ValidateCouponResponse {
            valid: false,
            quote: None,
            message: Some("Coupon code not found".to_string()),
        })
        .into_response();
    };
    if !coupon.applies_to(request.duration) {
        return Json(ValidateCouponResponse {
            valid: false,
            quote: None,
            message: Some("Coupon is not valid for the selected duration".to_string()),
        })
        .into_response();
    }

    let base_price = final_price(
        record.price_for(request.duration),
        record.discount_for(request.duration),
        &*state.diagnostics,
    );
    match evaluate_coupon(base_price, coupon) {
        Ok(quote) => Json(ValidateCouponResponse {
            valid: true,
            quote: Some(quote),
            message: None,
        })
        .into_response(),
        Err(rejection) => Json(ValidateCouponResponse {
            valid: false,
            quote: None,
            message: Some(rejection.to_string()),
        })
        .into_response(),
    }
}

async fn team_handler(State(state): State<AppState>) -> Response {
    match state.catalog.team().await {
        Ok(view) => {
            let meta = ListMeta {
                fetched_at: view.fetched_at,
                stale: view.stale,
                origin: view.origin,
                count: view.data.len(),
            };
            let stale = view.stale;
            let mut resp = Json(TeamResponse {
                team: view.data,
                meta,
            })
            .into_response();
            mark_staleness(&mut resp, stale);
            resp
        }
        Err(err) => server_error(err),
    }
}

/// Freshness is also surfaced as a header so proxies and clients can see it
/// without parsing the body.
fn mark_staleness(resp: &mut Response, stale: bool) {
    resp.headers_mut().insert(
        header::HeaderName::from_static("x-catalog-stale"),
        header::HeaderValue::from_static(if stale { "true" } else { "false" }),
    );
}

async fn refresh_handler(State(state): State<AppState>) -> Response {
    match state.catalog.refresh_all().await {
        Ok(summary) => Json::<RefreshSummary>(summary).into_response(),
        Err(err) => server_error(err),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    tracing::error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use edizo_core::{Coupon, DeliveryMode, Duration};
    use edizo_sheets::{CatalogSource, ParsedSheet};
    use http_body_util::BodyExt;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    struct FixtureSource;

    fn mk_record(id: &str, category: &str, rating: f32) -> InternshipRecord {
        let mut pricing = BTreeMap::new();
        let mut discount = BTreeMap::new();
        for duration in Duration::ALL {
            pricing.insert(duration, 3500);
            discount.insert(duration, 20);
        }
        InternshipRecord {
            id: id.to_string(),
            title: format!("{category} Internship"),
            category: category.to_string(),
            mode: DeliveryMode::Online,
            company: "Edizo".to_string(),
            image: String::new(),
            rating,
            description: String::new(),
            why_choose_edizo: Vec::new(),
            benefits: Vec::new(),
            syllabus: BTreeMap::new(),
            pricing,
            discount,
            available_coupons: vec![Coupon::percentage("EDIZOCOP", 20).unwrap()],
            coupon_discounts: BTreeMap::new(),
        }
    }

    #[async_trait]
    impl CatalogSource for FixtureSource {
        async fn fetch_internships(&self) -> anyhow::Result<ParsedSheet<InternshipRecord>> {
            Ok(ParsedSheet {
                records: vec![
                    mk_record("web-dev", "Development", 4.8),
                    mk_record("ui-ux", "Design", 4.2),
                ],
                skipped: Vec::new(),
            })
        }

        async fn fetch_team(&self) -> anyhow::Result<ParsedSheet<TeamMember>> {
            Ok(ParsedSheet {
                records: vec![TeamMember {
                    id: "1".to_string(),
                    name: "Asha".to_string(),
                    role: "Founder".to_string(),
                    image: String::new(),
                    bio: String::new(),
                    linkedin: String::new(),
                    github: String::new(),
                }],
                skipped: Vec::new(),
            })
        }
    }

    fn test_app() -> Router {
        let config = CatalogConfig {
            snapshot_dir: None,
            ..CatalogConfig::from_env()
        };
        let catalog = Arc::new(CatalogService::new(Arc::new(FixtureSource), &config));
        app(AppState::new(catalog))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn port_override_beats_environment() {
        assert_eq!(resolve_port(Some(9000), Some("7000".to_string())), 9000);
        assert_eq!(resolve_port(None, Some("7000".to_string())), 7000);
        assert_eq!(resolve_port(None, Some("not-a-port".to_string())), 8000);
        assert_eq!(resolve_port(None, None), 8000);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get_json(test_app(), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn internships_list_with_meta() {
        let (status, body) = get_json(test_app(), "/api/internships").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["count"], 2);
        assert_eq!(body["meta"]["origin"], "network");
        assert_eq!(body["internships"][0]["id"], "web-dev");
    }

    #[tokio::test]
    async fn internships_filter_and_sort() {
        let (_, body) = get_json(test_app(), "/api/internships?category=Design").await;
        assert_eq!(body["meta"]["count"], 1);
        assert_eq!(body["internships"][0]["id"], "ui-ux");

        let (_, body) =
            get_json(test_app(), "/api/internships?sort=rating&ascending=false").await;
        assert_eq!(body["internships"][0]["id"], "web-dev");
    }

    async fn post_json(
        app: Router,
        uri: &str,
        payload: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn coupon_validation_quotes_against_discounted_base() {
        let (status, body) = post_json(
            test_app(),
            "/api/coupons/validate",
            serde_json::json!({
                "internship_id": "web-dev",
                "code": "EDIZOCOP",
                "duration": "1-month",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        // 3500 at 20% sheet discount is 2800; the 20% coupon quotes on that.
        assert_eq!(body["quote"]["original_price"], 2800);
        assert_eq!(body["quote"]["discount_amount"], 560);
        assert_eq!(body["quote"]["final_price"], 2240);
    }

    #[tokio::test]
    async fn coupon_validation_rejects_unknown_codes() {
        let (status, body) = post_json(
            test_app(),
            "/api/coupons/validate",
            serde_json::json!({
                "internship_id": "web-dev",
                "code": "NOSUCH",
                "duration": "1-month",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert_eq!(body["message"], "Coupon code not found");
    }

    #[tokio::test]
    async fn list_reports_freshness_header() {
        let resp = test_app()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/internships")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.headers()["x-catalog-stale"], "false");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn detail_and_pricing_report_staleness() {
        use chrono::TimeDelta;
        use edizo_catalog::{CacheEntry, CacheService, MemoryCache};

        let config = CatalogConfig {
            snapshot_dir: None,
            ..CatalogConfig::from_env()
        };
        let cache: Arc<MemoryCache<Vec<InternshipRecord>>> = Arc::new(MemoryCache::new());
        cache.set(CacheEntry {
            data: vec![mk_record("web-dev", "Development", 4.8)],
            fetched_at: Utc::now() - TimeDelta::minutes(10),
        });
        let catalog = Arc::new(CatalogService::with_caches(
            Arc::new(FixtureSource),
            &config,
            cache,
            Arc::new(MemoryCache::new()),
        ));
        let app = app(AppState::new(catalog));

        for uri in ["/api/internships/web-dev", "/api/internships/web-dev/pricing"] {
            let resp = app
                .clone()
                .oneshot(
                    axum::http::Request::builder()
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(resp.headers()["x-catalog-stale"], "true", "{uri}");
        }
    }

    #[tokio::test]
    async fn detail_404_for_unknown_id() {
        let (status, body) = get_json(test_app(), "/api/internships/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "internship not found");
    }

    #[tokio::test]
    async fn pricing_applies_known_coupon() {
        let (status, body) =
            get_json(test_app(), "/api/internships/web-dev/pricing?coupon=edizocop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["coupon"]["accepted"], true);
        assert_eq!(body["tiers"].as_array().unwrap().len(), 4);
        // 3500 with 20% sheet discount, then 20% coupon on top.
        assert_eq!(body["tiers"][1]["final_price"], 2240);
        assert_eq!(body["tiers"][1]["applied_coupon"], "EDIZOCOP");
    }

    #[tokio::test]
    async fn pricing_rejects_unknown_coupon_but_returns_tiers() {
        let (status, body) =
            get_json(test_app(), "/api/internships/web-dev/pricing?coupon=BOGUS").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["coupon"]["accepted"], false);
        assert_eq!(body["coupon"]["message"], "Coupon code not found");
        assert_eq!(body["tiers"][1]["final_price"], 2800);
    }

    #[tokio::test]
    async fn team_list() {
        let (status, body) = get_json(test_app(), "/api/team").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["team"][0]["name"], "Asha");
        assert_eq!(body["meta"]["count"], 1);
    }

    #[tokio::test]
    async fn refresh_returns_summary() {
        let app = test_app();
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let summary: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary["internships"], 2);
        assert_eq!(summary["team_members"], 1);
    }
}
