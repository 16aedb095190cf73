use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use finboard_cli::client::{ApiError, ClientMode, ExportQuery, FinanceClient, TransactionPatch};
use finboard_cli::query::QueryController;
use finboard_cli::types::{ExportKind, SortField, TransactionId, TransactionKind};

struct Captured {
    request_line: String,
    headers: String,
    body: String,
}

fn serve_one(status: u16, body: &'static str) -> (String, Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();

        let mut buf = Vec::new();
        let mut header_end = None;
        while header_end.is_none() {
            let mut tmp = [0u8; 1024];
            let n = stream.read(&mut tmp).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&tmp[..n]);
            if let Some(i) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                header_end = Some(i + 4);
            }
        }

        let header_end = header_end.expect("did not receive full headers");
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let lower = headers.to_lowercase();

        let content_length = lower
            .lines()
            .find_map(|l| l.strip_prefix("content-length: "))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let mut body_buf = buf[header_end..].to_vec();
        while body_buf.len() < content_length {
            let mut tmp = vec![0u8; content_length - body_buf.len()];
            let n = stream.read(&mut tmp).unwrap();
            if n == 0 {
                break;
            }
            body_buf.extend_from_slice(&tmp[..n]);
        }
        let req_body = String::from_utf8_lossy(&body_buf[..content_length.min(body_buf.len())])
            .to_string();

        let resp = format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(resp.as_bytes()).unwrap();

        let request_line = headers.lines().next().unwrap_or_default().to_string();
        let _ = tx.send(Captured {
            request_line,
            headers: lower,
            body: req_body,
        });
    });

    (format!("http://{addr}"), rx)
}

fn client(base_url: String) -> FinanceClient {
    FinanceClient::new(ClientMode::Http { base_url })
}

fn captured(rx: &Receiver<Captured>) -> Captured {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("server did not see a request")
}

#[test]
fn list_transactions_sends_only_set_filters_and_reads_bare_array() {
    let (base_url, rx) = serve_one(
        200,
        r#"[{"id":7,"date":"2025-03-02","description":"Coffee","amount":3.2,"category":"Food","type":"expense"}]"#,
    );
    let mut c = QueryController::default();
    c.commit_search("coffee");
    c.set_sort(SortField::Date);

    let page = client(base_url).list_transactions(&c.request()).unwrap();
    assert_eq!(page.transactions.len(), 1);
    assert_eq!(page.total, None);
    assert_eq!(page.transactions[0].kind, TransactionKind::Expense);

    let req = captured(&rx);
    assert_eq!(
        req.request_line,
        "GET /transactions?skip=0&limit=10&search=coffee&sort_field=date&sort_direction=asc HTTP/1.1"
    );
    assert!(!req.request_line.contains("type="));
}

#[test]
fn list_transactions_reads_paged_shape() {
    let (base_url, _rx) = serve_one(200, r#"{"transactions":[],"total":31}"#);
    let page = client(base_url)
        .list_transactions(&QueryController::default().request())
        .unwrap();
    assert!(page.transactions.is_empty());
    assert_eq!(page.total, Some(31));
}

#[test]
fn error_detail_is_surfaced() {
    let (base_url, rx) = serve_one(404, r#"{"detail":"Transaction not found"}"#);
    let err = client(base_url)
        .get_transaction(TransactionId::new(99))
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.detail(), Some("Transaction not found"));
    assert!(err.to_string().contains("Transaction not found"));
    assert!(captured(&rx).request_line.starts_with("GET /transactions/99 "));
}

#[test]
fn update_sends_partial_json_body() {
    let (base_url, rx) = serve_one(
        200,
        r#"{"id":5,"date":"2025-03-02","description":"Rent","amount":1250,"category":"Housing","type":"expense","is_fixed":true,"frequency":"monthly"}"#,
    );
    let patch = TransactionPatch {
        amount: Some(1250.0),
        ..Default::default()
    };
    let t = client(format!("{base_url}/"))
        .update_transaction(TransactionId::new(5), &patch)
        .unwrap();
    assert!(t.is_fixed);

    let req = captured(&rx);
    assert!(req.request_line.starts_with("PUT /transactions/5 "));
    assert!(req.headers.contains("content-type: application/json"));
    let body: serde_json::Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body, serde_json::json!({"amount": 1250.0}));
}

#[test]
fn empty_delete_body_is_accepted() {
    let (base_url, rx) = serve_one(200, "");
    let res = client(base_url)
        .delete_transaction(TransactionId::new(3))
        .unwrap();
    assert!(res.status.is_none());
    assert!(captured(&rx).request_line.starts_with("DELETE /transactions/3 "));
}

#[test]
fn category_summary_sends_date_range() {
    let (base_url, rx) = serve_one(
        200,
        r#"{"income":{"Salary":{"total":5000,"count":1}},"expenses":{},"totals":{"income":5000,"expenses":0}}"#,
    );
    let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
    let s = client(base_url).category_summary(start, end).unwrap();
    assert!(!s.is_empty());
    assert_eq!(
        captured(&rx).request_line,
        "GET /statistics/category-summary?start_date=2025-02-01&end_date=2025-02-28 HTTP/1.1"
    );
}

#[test]
fn import_uploads_multipart_file() {
    let (base_url, rx) = serve_one(
        200,
        r#"{"status":"success","imported":1,"message":"Successfully imported 1 transactions","failed_rows":[{"row":3,"error":"invalid amount"}]}"#,
    );
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bank.csv");
    std::fs::write(
        &path,
        "date,description,amount,type\n2025-01-01,Salary,3000,income\n",
    )
    .unwrap();

    let res = client(base_url).import_transactions(&path, true).unwrap();
    assert_eq!(res.imported, 1);
    assert!(res.is_partial());

    let req = captured(&rx);
    assert!(
        req.request_line
            .starts_with("POST /transactions/import?use_ai_categories=true ")
    );
    assert!(req.headers.contains("content-type: multipart/form-data"));
    assert!(req.body.contains("name=\"file\""));
    assert!(req.body.contains("filename=\"bank.csv\""));
    assert!(req.body.contains("2025-01-01,Salary,3000,income"));
}

#[test]
fn export_returns_raw_csv() {
    let (base_url, rx) = serve_one(200, "name,amount\nInternet,39.9\n");
    let query = ExportQuery {
        kind: ExportKind::Bills,
        start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        category: Some("Utilities".to_string()),
    };
    let csv = client(base_url).export_csv(&query).unwrap();
    assert_eq!(csv, "name,amount\nInternet,39.9\n");
    assert_eq!(
        captured(&rx).request_line,
        "GET /export/bills?start_date=2025-03-01&end_date=2025-03-31&category=Utilities HTTP/1.1"
    );
}

#[test]
fn categorize_sends_description_as_query() {
    let (base_url, rx) = serve_one(
        200,
        r#"{"description":"Coop","category":"Groceries","success":true}"#,
    );
    let check = client(base_url).test_categorize("Coop Pronto").unwrap();
    assert_eq!(check.category.as_deref(), Some("Groceries"));
    assert_eq!(
        captured(&rx).request_line,
        "POST /test-categorize?description=Coop+Pronto HTTP/1.1"
    );
}

#[test]
fn advisor_question_is_posted_as_json() {
    let (base_url, rx) = serve_one(200, r#"{"response":"Save more."}"#);
    let answer = client(base_url).ask_advisor("Can I afford a bike?").unwrap();
    assert_eq!(answer.response, "Save more.");
    assert!(answer.context.is_none());

    let req = captured(&rx);
    assert!(req.request_line.starts_with("POST /finance/ask "));
    let body: serde_json::Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body, serde_json::json!({"question": "Can I afford a bike?"}));
}

#[test]
fn advisor_failure_surfaces_detail() {
    let (base_url, _rx) = serve_one(
        500,
        r#"{"detail":"Error processing question: model offline"}"#,
    );
    let err = client(base_url).ask_advisor("Why?").unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("model offline"));
}

#[test]
fn connection_failure_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{addr}"))
        .get_transaction(TransactionId::new(1))
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }));
    assert_eq!(err.status(), None);
}
