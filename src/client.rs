use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use reqwest::Method;
use reqwest::blocking::multipart;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::query::TransactionQuery;
use crate::summary::CategorySummary;
use crate::types::{BillId, ExportKind, Frequency, TransactionId, TransactionKind};

#[derive(Debug, Clone)]
pub enum ClientMode {
    Http { base_url: String },
    Fixtures(PathBuf),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{method} {path} failed with HTTP {status}{}", format_detail(.detail))]
    Status {
        method: Method,
        path: String,
        status: u16,
        detail: Option<String>,
    },

    #[error("{method} {path}: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected {operation} response shape: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("fixture {}: {source}", .path.display())]
    Fixture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

fn format_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Blocking client for the Finance Dashboard API.
///
/// In fixtures mode every operation reads `<operation>.json` from a directory instead
/// of touching the network.
#[derive(Debug, Clone)]
pub struct FinanceClient {
    mode: ClientMode,
}

impl FinanceClient {
    pub fn new(mode: ClientMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> &ClientMode {
        &self.mode
    }

    pub fn list_transactions(&self, query: &TransactionQuery) -> ApiResult<TransactionsPage> {
        let body = self.call(
            "ListTransactions",
            Method::GET,
            "/transactions",
            &query.to_params(),
            None,
        )?;
        let page: TransactionsBody = decode("ListTransactions", body)?;
        Ok(match page {
            TransactionsBody::Paged {
                transactions,
                total,
            } => TransactionsPage {
                transactions,
                total,
            },
            TransactionsBody::Bare(transactions) => TransactionsPage {
                transactions,
                total: None,
            },
        })
    }

    pub fn get_transaction(&self, id: TransactionId) -> ApiResult<Transaction> {
        let body = self.call(
            "GetTransaction",
            Method::GET,
            &format!("/transactions/{id}"),
            &[],
            None,
        )?;
        decode("GetTransaction", body)
    }

    pub fn create_transaction(&self, draft: &TransactionDraft) -> ApiResult<Transaction> {
        let body = self.call(
            "CreateTransaction",
            Method::POST,
            "/transactions",
            &[],
            Some(to_body(draft)),
        )?;
        decode("CreateTransaction", body)
    }

    pub fn update_transaction(
        &self,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> ApiResult<Transaction> {
        let body = self.call(
            "UpdateTransaction",
            Method::PUT,
            &format!("/transactions/{id}"),
            &[],
            Some(to_body(patch)),
        )?;
        decode("UpdateTransaction", body)
    }

    pub fn delete_transaction(&self, id: TransactionId) -> ApiResult<DeleteResult> {
        let body = self.call(
            "DeleteTransaction",
            Method::DELETE,
            &format!("/transactions/{id}"),
            &[],
            None,
        )?;
        decode_or_default("DeleteTransaction", body)
    }

    pub fn list_bills(&self, query: &BillQuery) -> ApiResult<Vec<Bill>> {
        let body = self.call("ListBills", Method::GET, "/bills", &query.to_params(), None)?;
        decode("ListBills", body)
    }

    pub fn get_bill(&self, id: BillId) -> ApiResult<Bill> {
        let body = self.call("GetBill", Method::GET, &format!("/bills/{id}"), &[], None)?;
        decode("GetBill", body)
    }

    pub fn create_bill(&self, draft: &BillDraft) -> ApiResult<Bill> {
        let body = self.call(
            "CreateBill",
            Method::POST,
            "/bills",
            &[],
            Some(to_body(draft)),
        )?;
        decode("CreateBill", body)
    }

    /// The API replaces the whole bill on update, so this takes a full draft.
    pub fn update_bill(&self, id: BillId, draft: &BillDraft) -> ApiResult<Bill> {
        let body = self.call(
            "UpdateBill",
            Method::PUT,
            &format!("/bills/{id}"),
            &[],
            Some(to_body(draft)),
        )?;
        decode("UpdateBill", body)
    }

    pub fn delete_bill(&self, id: BillId) -> ApiResult<DeleteResult> {
        let body = self.call(
            "DeleteBill",
            Method::DELETE,
            &format!("/bills/{id}"),
            &[],
            None,
        )?;
        decode_or_default("DeleteBill", body)
    }

    pub fn category_summary(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<CategorySummary> {
        let body = self.call(
            "CategorySummary",
            Method::GET,
            "/statistics/category-summary",
            &[
                ("start_date", start_date.to_string()),
                ("end_date", end_date.to_string()),
            ],
            None,
        )?;
        decode("CategorySummary", body)
    }

    pub fn monthly_stats(&self, year: i32, month: Option<u32>) -> ApiResult<MonthlyStats> {
        let mut params = vec![("year", year.to_string())];
        if let Some(m) = month {
            params.push(("month", m.to_string()));
        }
        let body = self.call(
            "MonthlyStats",
            Method::GET,
            "/statistics/monthly",
            &params,
            None,
        )?;
        decode("MonthlyStats", body)
    }

    pub fn budget_stats(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<BudgetStats> {
        let body = self.call(
            "BudgetStats",
            Method::GET,
            "/statistics/budget",
            &[
                ("start_date", start_date.to_string()),
                ("end_date", end_date.to_string()),
            ],
            None,
        )?;
        decode("BudgetStats", body)
    }

    /// Raw CSV for one export kind over a date range, optionally limited to a category.
    pub fn export_csv(&self, query: &ExportQuery) -> ApiResult<String> {
        let operation = match query.kind {
            ExportKind::Transactions => "ExportTransactions",
            ExportKind::Bills => "ExportBills",
        };
        match &self.mode {
            ClientMode::Fixtures(dir) => {
                let path = dir.join(format!("{operation}.csv"));
                fs::read_to_string(&path).map_err(|source| ApiError::Fixture { path, source })
            }
            ClientMode::Http { base_url } => {
                let path = format!("/export/{}", query.kind);
                let req = reqwest::blocking::Client::new()
                    .get(join_url(base_url, &path))
                    .query(&query.to_params());
                send_text(req, Method::GET, &path)
            }
        }
    }

    /// Asks the server which category it would assign to `description`.
    pub fn test_categorize(&self, description: &str) -> ApiResult<CategorizeCheck> {
        let body = self.call(
            "TestCategorize",
            Method::POST,
            "/test-categorize",
            &[("description", description.to_string())],
            None,
        )?;
        decode("TestCategorize", body)
    }

    /// Sends a question to the server-side advisor, which answers using the current
    /// month's totals and the recurring bills.
    pub fn ask_advisor(&self, question: &str) -> ApiResult<AdvisorAnswer> {
        let body = self.call(
            "AskAdvisor",
            Method::POST,
            "/finance/ask",
            &[],
            Some(serde_json::json!({ "question": question })),
        )?;
        decode("AskAdvisor", body)
    }

    /// Uploads a CSV file as multipart `file`. Row-level failures come back inside the
    /// [`ImportResult`], not as an error.
    pub fn import_transactions(
        &self,
        csv_path: &Path,
        use_ai_categories: bool,
    ) -> ApiResult<ImportResult> {
        let body = match &self.mode {
            ClientMode::Fixtures(dir) => read_fixture(dir, "ImportTransactions")?,
            ClientMode::Http { base_url } => {
                let path = "/transactions/import";
                let bytes = fs::read(csv_path).map_err(|source| ApiError::Upload {
                    path: csv_path.to_path_buf(),
                    source,
                })?;
                let file_name = csv_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "transactions.csv".to_string());
                let part = multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("text/csv")
                    .map_err(|source| ApiError::Transport {
                        method: Method::POST,
                        path: path.to_string(),
                        source,
                    })?;
                let form = multipart::Form::new().part("file", part);

                let http = reqwest::blocking::Client::new();
                let req = http
                    .post(join_url(base_url, path))
                    .query(&[("use_ai_categories", use_ai_categories.to_string())])
                    .multipart(form);
                send(req, Method::POST, path)?
            }
        };
        decode("ImportTransactions", body)
    }

    fn call(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> ApiResult<Value> {
        match &self.mode {
            ClientMode::Fixtures(dir) => {
                tracing::debug!(operation, "serving fixture");
                read_fixture(dir, operation)
            }
            ClientMode::Http { base_url } => {
                let http = reqwest::blocking::Client::new();
                let mut req = http.request(method.clone(), join_url(base_url, path));
                if !query.is_empty() {
                    req = req.query(query);
                }
                if let Some(b) = body.as_ref() {
                    req = req.json(b);
                }
                send(req, method, path)
            }
        }
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn send(req: reqwest::blocking::RequestBuilder, method: Method, path: &str) -> ApiResult<Value> {
    let text = send_text(req, method, path)?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|source| ApiError::Decode {
        operation: "response",
        source,
    })
}

fn send_text(
    req: reqwest::blocking::RequestBuilder,
    method: Method,
    path: &str,
) -> ApiResult<String> {
    tracing::debug!(%method, path, "sending request");
    let transport = |source| ApiError::Transport {
        method: method.clone(),
        path: path.to_string(),
        source,
    };
    let resp = req.send().map_err(transport)?;
    let status = resp.status();
    let text = resp.text().map_err(transport)?;
    tracing::debug!(%method, path, status = status.as_u16(), "response received");

    if !status.is_success() {
        let detail = extract_detail(&text);
        tracing::warn!(%method, path, status = status.as_u16(), ?detail, "request failed");
        return Err(ApiError::Status {
            method,
            path: path.to_string(),
            status: status.as_u16(),
            detail,
        });
    }
    Ok(text)
}

/// Pulls a readable message out of an error body: `{"detail": "..."}` or
/// `{"detail": {...}}`, falling back to the raw text.
fn extract_detail(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(v) => match v.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(Value::Object(o)) => o
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .or_else(|| Some(Value::Object(o.clone()).to_string())),
            Some(other) => Some(other.to_string()),
        },
        Err(_) => Some(text.to_string()),
    }
}

fn read_fixture(dir: &Path, operation: &str) -> ApiResult<Value> {
    let path = dir.join(format!("{operation}.json"));
    let s = fs::read_to_string(&path).map_err(|source| ApiError::Fixture {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&s).map_err(|source| ApiError::Decode {
        operation: "fixture",
        source,
    })
}

fn to_body<T: Serialize>(value: &T) -> Value {
    // Plain derive(Serialize) structs with string keys cannot fail to convert.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn decode<T: for<'de> Deserialize<'de>>(operation: &'static str, body: Value) -> ApiResult<T> {
    serde_json::from_value(body).map_err(|source| ApiError::Decode { operation, source })
}

fn decode_or_default<T: for<'de> Deserialize<'de> + Default>(
    operation: &'static str,
    body: Value,
) -> ApiResult<T> {
    if body.is_null() {
        return Ok(T::default());
    }
    decode(operation, body)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TransactionsBody {
    Paged {
        transactions: Vec<Transaction>,
        #[serde(default)]
        total: Option<u64>,
    },
    Bare(Vec<Transaction>),
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionsPage {
    pub transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub is_fixed: bool,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Transaction {
    /// Amount with the display sign applied (expenses negative).
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub is_fixed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
}

/// Partial update; only the set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_fixed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub name: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillDraft {
    pub name: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub category: String,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
}

impl From<&Bill> for BillDraft {
    fn from(b: &Bill) -> Self {
        Self {
            name: b.name.clone(),
            amount: b.amount,
            due_date: b.due_date,
            category: b.category.clone(),
            is_recurring: b.is_recurring,
            frequency: b.frequency,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillQuery {
    pub skip: usize,
    pub limit: Option<usize>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
}

impl BillQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![("skip", self.skip.to_string())];
        if let Some(l) = self.limit {
            out.push(("limit", l.to_string()));
        }
        if let Some(d) = self.start_date {
            out.push(("start_date", d.to_string()));
        }
        if let Some(d) = self.end_date {
            out.push(("end_date", d.to_string()));
        }
        if let Some(c) = self.category.as_ref().filter(|c| !c.trim().is_empty()) {
            out.push(("category", c.trim().to_string()));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportQuery {
    pub kind: ExportKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: Option<String>,
}

impl ExportQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            ("start_date", self.start_date.to_string()),
            ("end_date", self.end_date.to_string()),
        ];
        if let Some(c) = self.category.as_ref().filter(|c| !c.trim().is_empty()) {
            out.push(("category", c.trim().to_string()));
        }
        out
    }
}

/// Reply from `/test-categorize`. A failed categorization still comes back as 200
/// with `success: false` and an `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizeCheck {
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorAnswer {
    pub response: String,
    #[serde(default)]
    pub context: Option<AdvisorContext>,
}

/// The figures the advisor was given alongside the question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorContext {
    pub current_month: AdvisorMonth,
    #[serde(default)]
    pub recurring_bills: Vec<AdvisorBill>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdvisorMonth {
    #[serde(default)]
    pub income: f64,
    #[serde(default)]
    pub expenses: f64,
    #[serde(default)]
    pub available: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorBill {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_savings: f64,
    pub saving_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStats {
    pub current_month: BudgetMonthTotals,
    #[serde(default)]
    pub rollover: f64,
    #[serde(default)]
    pub trend: Vec<BudgetTrendPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetMonthTotals {
    #[serde(default)]
    pub total_income: f64,
    #[serde(default)]
    pub total_expenses: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetTrendPoint {
    pub month: String,
    pub available: f64,
    pub rollover: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub imported: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub categorization: Option<Categorization>,
    #[serde(default)]
    pub failed_rows: Vec<FailedRow>,
}

impl ImportResult {
    pub fn is_partial(&self) -> bool {
        !self.failed_rows.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Categorization {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub using_ai_categories: Option<bool>,
    #[serde(default)]
    pub results: Vec<CategorizedRow>,
    #[serde(default)]
    pub categories_summary: Value,
    #[serde(default)]
    pub different_categories: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizedRow {
    pub row: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_category: Option<String>,
}

impl CategorizedRow {
    /// The category the row was stored under.
    pub fn category(&self) -> &str {
        self.used_category
            .as_deref()
            .or(self.assigned_category.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRow {
    pub row: u64,
    pub error: String,
}
