//! Spreadsheet ingestion: typed column layout, row → record transformation,
//! coupon code table, and the sheets API client.

use std::collections::HashMap;

use async_trait::async_trait;
use edizo_core::{Coupon, DeliveryMode, Duration, InternshipRecord, TeamMember};
use edizo_storage::{FetchError, HttpClientConfig, HttpFetcher};
use serde::Deserialize;
use thiserror::Error;

pub const CRATE_NAME: &str = "edizo-sheets";

/// Fixed positional layout of one internship row. Block columns
/// (`*Start`) run for one cell per highlight slot or per [`Duration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Column {
    Id = 0,
    Title = 1,
    Category = 2,
    Mode = 3,
    Company = 4,
    Image = 5,
    Rating = 6,
    Description = 7,
    WhyChooseStart = 8,
    BenefitsStart = 15,
    SyllabusStart = 22,
    PricingStart = 26,
    DiscountStart = 30,
    CouponCodes = 34,
    CouponDiscountStart = 35,
}

impl Column {
    /// Cells per highlight block (why-choose, benefits).
    pub const HIGHLIGHT_CELLS: usize = 7;

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Rows narrower than this cannot carry the listing metadata and are skipped.
pub const METADATA_WIDTH: usize = 8;
/// Width of a row without the coupon block.
pub const BASIC_WIDTH: usize = 34;
/// Width of a row including coupon codes and per-duration coupon discounts.
pub const COUPON_WIDTH: usize = 39;

fn duration_slot(duration: Duration) -> usize {
    Duration::ALL
        .iter()
        .position(|d| *d == duration)
        .expect("Duration::ALL covers every variant")
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

/// Blank or garbage amount cells parse to zero, never an error; currency
/// symbols and thousands separators are tolerated.
pub fn parse_amount(cell: &str) -> u32 {
    let digits: String = cell.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Percent cells default to zero and clamp to 100.
pub fn parse_percent(cell: &str) -> u8 {
    let digits: String = cell.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u32>().unwrap_or(0).min(100) as u8
}

/// Rating cells default to zero and clamp to the 0–5 scale.
pub fn parse_rating(cell: &str) -> f32 {
    cell.trim().parse::<f32>().unwrap_or(0.0).clamp(0.0, 5.0)
}

/// Comma-separated cell → trimmed, non-empty tokens.
pub fn split_list(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Maps raw coupon code strings from the sheet to percentage discounts.
/// Unrecognized codes fall back to a default percentage by design: the sheet
/// frequently carries campaign codes before this table learns about them.
#[derive(Debug, Clone)]
pub struct CouponCodeTable {
    percents: HashMap<String, u8>,
    default_percent: u8,
}

#[derive(Debug, Deserialize)]
struct CouponTableFile {
    #[allow(dead_code)]
    version: u32,
    default_percent: u8,
    #[serde(default)]
    codes: HashMap<String, u8>,
}

impl Default for CouponCodeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CouponCodeTable {
    pub fn builtin() -> Self {
        let percents = HashMap::from([
            ("EDIZOCOP".to_string(), 20),
            ("SAVE10".to_string(), 10),
            ("WELCOME15".to_string(), 15),
            ("INTERN25".to_string(), 25),
            ("FESTIVE30".to_string(), 30),
        ]);
        Self {
            percents,
            default_percent: 10,
        }
    }

    /// Optional YAML override, same framing as the builtin table.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let file: CouponTableFile = serde_yaml::from_str(text)?;
        Ok(Self {
            percents: file
                .codes
                .into_iter()
                .map(|(code, percent)| (code.to_uppercase(), percent.min(100)))
                .collect(),
            default_percent: file.default_percent.min(100),
        })
    }

    pub fn percent_for(&self, code: &str) -> u8 {
        self.percents
            .get(&code.trim().to_uppercase())
            .copied()
            .unwrap_or(self.default_percent)
    }

    pub fn coupon_for(&self, code: &str) -> Coupon {
        let code = code.trim().to_uppercase();
        let percent = self.percent_for(&code);
        Coupon::percentage(code, percent).expect("table percents are clamped to 100")
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowParseError {
    #[error("row {row} has {len} cells, fewer than the {METADATA_WIDTH} listing metadata needs")]
    TooShort { row: usize, len: usize },
    #[error("row {row} has a blank id cell")]
    BlankId { row: usize },
}

/// Transforms one raw sheet row into an [`InternshipRecord`]. Only rows that
/// cannot identify a listing fail; every numeric cell degrades to zero and
/// every missing block to empty, so one ragged row never poisons a batch.
pub fn parse_internship_row(
    row_index: usize,
    row: &[String],
    coupon_table: &CouponCodeTable,
) -> Result<InternshipRecord, RowParseError> {
    if row.len() < METADATA_WIDTH {
        return Err(RowParseError::TooShort {
            row: row_index,
            len: row.len(),
        });
    }
    let id = cell(row, Column::Id.index());
    if id.is_empty() {
        return Err(RowParseError::BlankId { row: row_index });
    }

    let highlight_block = |start: usize| -> Vec<String> {
        (start..start + Column::HIGHLIGHT_CELLS)
            .map(|i| cell(row, i))
            .filter(|c| !c.is_empty())
            .map(ToString::to_string)
            .collect()
    };

    let mut syllabus = std::collections::BTreeMap::new();
    let mut pricing = std::collections::BTreeMap::new();
    let mut discount = std::collections::BTreeMap::new();
    let mut coupon_discounts = std::collections::BTreeMap::new();
    for duration in Duration::ALL {
        let slot = duration_slot(duration);
        syllabus.insert(
            duration,
            split_list(cell(row, Column::SyllabusStart.index() + slot)),
        );
        pricing.insert(
            duration,
            parse_amount(cell(row, Column::PricingStart.index() + slot)),
        );
        discount.insert(
            duration,
            parse_percent(cell(row, Column::DiscountStart.index() + slot)),
        );
        coupon_discounts.insert(
            duration,
            parse_percent(cell(row, Column::CouponDiscountStart.index() + slot)),
        );
    }

    let available_coupons = split_list(cell(row, Column::CouponCodes.index()))
        .iter()
        .map(|code| coupon_table.coupon_for(code))
        .collect();

    Ok(InternshipRecord {
        id: id.to_string(),
        title: cell(row, Column::Title.index()).to_string(),
        category: cell(row, Column::Category.index()).to_string(),
        mode: DeliveryMode::from_cell(cell(row, Column::Mode.index())),
        company: cell(row, Column::Company.index()).to_string(),
        image: cell(row, Column::Image.index()).to_string(),
        rating: parse_rating(cell(row, Column::Rating.index())),
        description: cell(row, Column::Description.index()).to_string(),
        why_choose_edizo: highlight_block(Column::WhyChooseStart.index()),
        benefits: highlight_block(Column::BenefitsStart.index()),
        syllabus,
        pricing,
        discount,
        available_coupons,
        coupon_discounts,
    })
}

/// Team rows: id, name, role, image, bio, linkedin, github.
pub fn parse_team_member_row(
    row_index: usize,
    row: &[String],
) -> Result<TeamMember, RowParseError> {
    if row.len() < 3 {
        return Err(RowParseError::TooShort {
            row: row_index,
            len: row.len(),
        });
    }
    let id = cell(row, 0);
    if id.is_empty() {
        return Err(RowParseError::BlankId { row: row_index });
    }
    Ok(TeamMember {
        id: id.to_string(),
        name: cell(row, 1).to_string(),
        role: cell(row, 2).to_string(),
        image: cell(row, 3).to_string(),
        bio: cell(row, 4).to_string(),
        linkedin: cell(row, 5).to_string(),
        github: cell(row, 6).to_string(),
    })
}

/// Parse result for a whole sheet: good rows plus the reasons bad rows were
/// skipped. Skipping is per-row; the batch always survives.
#[derive(Debug, Clone)]
pub struct ParsedSheet<T> {
    pub records: Vec<T>,
    pub skipped: Vec<RowParseError>,
}

fn parse_sheet<T>(
    values: &[Vec<String>],
    mut parse: impl FnMut(usize, &[String]) -> Result<T, RowParseError>,
) -> ParsedSheet<T> {
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    // Row 0 is the header.
    for (row_index, row) in values.iter().enumerate().skip(1) {
        match parse(row_index, row) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!("skipping sheet row: {err}");
                skipped.push(err);
            }
        }
    }
    ParsedSheet { records, skipped }
}

pub fn parse_internship_sheet(
    values: &[Vec<String>],
    coupon_table: &CouponCodeTable,
) -> ParsedSheet<InternshipRecord> {
    parse_sheet(values, |row_index, row| {
        parse_internship_row(row_index, row, coupon_table)
    })
}

pub fn parse_team_sheet(values: &[Vec<String>]) -> ParsedSheet<TeamMember> {
    parse_sheet(values, parse_team_member_row)
}

pub const ENV_SHEET_ID: &str = "EDIZO_SHEET_ID";
pub const ENV_API_KEY: &str = "EDIZO_SHEETS_API_KEY";
pub const ENV_ENDPOINT: &str = "EDIZO_SHEETS_ENDPOINT";
pub const ENV_INTERNSHIPS_RANGE: &str = "EDIZO_INTERNSHIPS_RANGE";
pub const ENV_TEAM_RANGE: &str = "EDIZO_TEAM_RANGE";

const DEFAULT_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_INTERNSHIPS_RANGE: &str = "Internships!A1:AM1000";
const DEFAULT_TEAM_RANGE: &str = "Team!A1:G200";

#[derive(Debug, Error)]
pub enum SheetsConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<&'static str>),
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub endpoint: String,
    pub sheet_id: String,
    pub api_key: String,
    pub internships_range: String,
    pub team_range: String,
}

impl SheetsConfig {
    /// Reads configuration from the environment, failing before any I/O with
    /// a message that enumerates every missing variable at once.
    pub fn from_env() -> Result<Self, SheetsConfigError> {
        let mut missing = Vec::new();
        let sheet_id = std::env::var(ENV_SHEET_ID).unwrap_or_default();
        if sheet_id.trim().is_empty() {
            missing.push(ENV_SHEET_ID);
        }
        let api_key = std::env::var(ENV_API_KEY).unwrap_or_default();
        if api_key.trim().is_empty() {
            missing.push(ENV_API_KEY);
        }
        if !missing.is_empty() {
            return Err(SheetsConfigError::MissingEnv(missing));
        }
        Ok(Self {
            endpoint: std::env::var(ENV_ENDPOINT)
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            sheet_id,
            api_key,
            internships_range: std::env::var(ENV_INTERNSHIPS_RANGE)
                .unwrap_or_else(|_| DEFAULT_INTERNSHIPS_RANGE.to_string()),
            team_range: std::env::var(ENV_TEAM_RANGE)
                .unwrap_or_else(|_| DEFAULT_TEAM_RANGE.to_string()),
        })
    }
}

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("sheets api error: {0}")]
    Remote(String),
    #[error("sheet returned no data rows")]
    NoData,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("decoding sheets response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Best-effort extraction of the Google-style `error.message` from a non-2xx
/// body; falls back to the bare status.
fn remote_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| format!("http status {status}"))
}

/// Read-only client for the spreadsheet-backed catalog API.
#[derive(Debug)]
pub struct SheetsClient {
    fetcher: HttpFetcher,
    config: SheetsConfig,
    coupon_table: CouponCodeTable,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig, http: HttpClientConfig) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(http)?,
            config,
            coupon_table: CouponCodeTable::builtin(),
        })
    }

    pub fn with_coupon_table(mut self, coupon_table: CouponCodeTable) -> Self {
        self.coupon_table = coupon_table;
        self
    }

    pub fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}?key={}",
            self.config.endpoint, self.config.sheet_id, range, self.config.api_key
        )
    }

    async fn fetch_values(
        &self,
        resource: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.values_url(range);
        let response = match self.fetcher.fetch_bytes(resource, &url).await {
            Ok(response) => response,
            Err(FetchError::HttpStatus { status, body, .. }) => {
                return Err(SheetsError::Remote(remote_error_message(status, &body)));
            }
            Err(err) => return Err(SheetsError::Fetch(err)),
        };
        let range: ValueRange = serde_json::from_slice(&response.body)?;
        // A header row alone carries no listings.
        if range.values.len() <= 1 {
            return Err(SheetsError::NoData);
        }
        Ok(range.values)
    }
}

/// Seam between the catalog service and the remote sheet, so tests can swap
/// in canned sources.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_internships(&self) -> anyhow::Result<ParsedSheet<InternshipRecord>>;
    async fn fetch_team(&self) -> anyhow::Result<ParsedSheet<TeamMember>>;
}

#[async_trait]
impl CatalogSource for SheetsClient {
    async fn fetch_internships(&self) -> anyhow::Result<ParsedSheet<InternshipRecord>> {
        let values = self
            .fetch_values("internships", &self.config.internships_range)
            .await?;
        Ok(parse_internship_sheet(&values, &self.coupon_table))
    }

    async fn fetch_team(&self) -> anyhow::Result<ParsedSheet<TeamMember>> {
        let values = self.fetch_values("team", &self.config.team_range).await?;
        Ok(parse_team_sheet(&values))
    }
}
