use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

use crate::client::{ApiResult, FinanceClient, TransactionsPage};
use crate::query::{QueryController, RequestTracker, Ticket, TransactionQuery};
use crate::types::{SortField, TransactionKind};

use super::Cli;

const HELP: &str = "commands: /<text> search · type income|expense|all · sort <field> · \
                    next · prev · page <n> · help · quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowseCommand {
    Search(String),
    Type(Option<TransactionKind>),
    Sort(SortField),
    Next,
    Prev,
    Page(usize),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<BrowseCommand, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(term) = line.strip_prefix('/') {
        return Ok(BrowseCommand::Search(term.to_string()));
    }
    let mut words = line.split_whitespace();
    let cmd = words.next().unwrap_or("").to_lowercase();
    let arg = words.next();
    match (cmd.as_str(), arg) {
        ("next" | "n", None) => Ok(BrowseCommand::Next),
        ("prev" | "p", None) => Ok(BrowseCommand::Prev),
        ("quit" | "q" | "exit", None) => Ok(BrowseCommand::Quit),
        ("help" | "?", None) => Ok(BrowseCommand::Help),
        ("type", Some("all")) => Ok(BrowseCommand::Type(None)),
        ("type", Some("income")) => Ok(BrowseCommand::Type(Some(TransactionKind::Income))),
        ("type", Some("expense")) => Ok(BrowseCommand::Type(Some(TransactionKind::Expense))),
        ("sort", Some(field)) => match field {
            "date" => Ok(BrowseCommand::Sort(SortField::Date)),
            "description" => Ok(BrowseCommand::Sort(SortField::Description)),
            "amount" => Ok(BrowseCommand::Sort(SortField::Amount)),
            "category" => Ok(BrowseCommand::Sort(SortField::Category)),
            "type" => Ok(BrowseCommand::Sort(SortField::Type)),
            other => Err(format!("unknown sort field {other:?}")),
        },
        ("page", Some(n)) => n
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .map(BrowseCommand::Page)
            .ok_or_else(|| format!("invalid page {n:?}")),
        ("", None) => Err(String::new()),
        _ => Err(format!("unknown command {line:?}")),
    }
}

enum Event {
    /// One line of input; `None` once stdin is closed.
    Input(Option<String>),
    Fetched(Ticket<TransactionQuery>, ApiResult<TransactionsPage>),
}

struct Browser<'a> {
    cli: &'a Cli,
    client: &'a FinanceClient,
    tx: Sender<Event>,
    controller: QueryController,
    tracker: RequestTracker<TransactionQuery>,
    /// Row count of the page shown for the current query; `None` until its
    /// response arrives.
    shown_rows: Option<usize>,
    /// `next` arrived while the current page was loading.
    next_pending: bool,
}

impl<'a> Browser<'a> {
    fn new(cli: &'a Cli, client: &'a FinanceClient, tx: Sender<Event>, page_size: usize) -> Self {
        Self {
            cli,
            client,
            tx,
            controller: QueryController::new(page_size),
            tracker: RequestTracker::new(),
            shown_rows: None,
            next_pending: false,
        }
    }

    fn fetch(&mut self) {
        self.shown_rows = None;
        self.next_pending = false;
        let ticket = self.tracker.issue(self.controller.request());
        let client = self.client.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = client.list_transactions(ticket.key());
            let _ = tx.send(Event::Fetched(ticket, result));
        });
    }

    fn apply(&mut self, cmd: BrowseCommand, now: Instant) {
        match cmd {
            BrowseCommand::Search(term) => self.controller.set_search(term, now),
            BrowseCommand::Type(kind) => {
                self.controller.set_type_filter(kind);
                self.fetch();
            }
            BrowseCommand::Sort(field) => {
                self.controller.set_sort(field);
                self.fetch();
            }
            BrowseCommand::Next => match self.shown_rows {
                // Whether a next page exists is only known once this query's page is in.
                None if self.tracker.in_flight() => self.next_pending = true,
                None => eprintln!(
                    "page {} did not load; retry with `page {}`",
                    self.controller.state().page,
                    self.controller.state().page
                ),
                Some(rows) => self.next(rows),
            },
            BrowseCommand::Prev => {
                if self.controller.previous_page() {
                    self.fetch();
                } else {
                    eprintln!("already on the first page");
                }
            }
            BrowseCommand::Page(n) => {
                self.controller.set_page(n);
                self.fetch();
            }
            BrowseCommand::Help => eprintln!("{HELP}"),
            BrowseCommand::Quit => {
                if self.controller.flush_search() {
                    self.fetch();
                }
            }
        }
    }

    fn next(&mut self, rows: usize) {
        if self.controller.next_page(rows) {
            self.fetch();
        } else {
            eprintln!("already on the last page");
        }
    }

    fn on_fetched(
        &mut self,
        ticket: Ticket<TransactionQuery>,
        result: ApiResult<TransactionsPage>,
    ) -> anyhow::Result<()> {
        if !self.tracker.accept(&ticket) {
            return Ok(());
        }
        match result {
            Ok(page) => {
                let rows = page.transactions.len();
                self.shown_rows = Some(rows);
                super::transactions::render_page(self.cli, &self.controller, page)?;
                if std::mem::take(&mut self.next_pending) {
                    self.next(rows);
                }
                Ok(())
            }
            Err(e) => {
                // Keep the previous page; the user can retry with any command.
                self.next_pending = false;
                eprintln!("error: {e}");
                Ok(())
            }
        }
    }
}

/// Interactive transaction list driven by line commands on stdin.
///
/// Searches are debounced; every other command fetches immediately. Fetches run on
/// worker threads and only the response to the newest request is shown.
pub(super) fn run_browse(cli: &Cli, client: &FinanceClient, page_size: usize) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel();

    let input_tx = tx.clone();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if input_tx.send(Event::Input(Some(line))).is_err() {
                return;
            }
        }
        let _ = input_tx.send(Event::Input(None));
    });

    let mut browser = Browser::new(cli, client, tx, page_size);
    eprintln!("{HELP}");
    browser.fetch();

    let mut quitting = false;
    loop {
        let event = match browser.controller.search_due_in(Instant::now()) {
            Some(wait) if !quitting => match rx.recv_timeout(wait) {
                Ok(ev) => Some(ev),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            _ => match rx.recv() {
                Ok(ev) => Some(ev),
                Err(_) => break,
            },
        };

        let now = Instant::now();
        match event {
            None => {
                if browser.controller.poll_search(now) {
                    browser.fetch();
                }
            }
            Some(Event::Input(Some(line))) if !quitting => match parse_command(&line) {
                Ok(BrowseCommand::Quit) => {
                    browser.apply(BrowseCommand::Quit, now);
                    quitting = true;
                }
                Ok(cmd) => browser.apply(cmd, now),
                Err(msg) if msg.is_empty() => {}
                Err(msg) => eprintln!("{msg}; {HELP}"),
            },
            Some(Event::Input(_)) => {
                // End of input: run a search the user already typed, then finish.
                if !quitting && browser.controller.flush_search() {
                    browser.fetch();
                }
                quitting = true;
            }
            Some(Event::Fetched(ticket, result)) => browser.on_fetched(ticket, result)?,
        }

        if quitting && !browser.tracker.in_flight() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::mpsc::Receiver;
    use std::time::Duration;

    use clap::Parser;

    use super::*;
    use crate::client::ClientMode;

    fn fixture_client() -> FinanceClient {
        FinanceClient::new(ClientMode::Fixtures(PathBuf::from("tests/fixtures/api")))
    }

    fn json_cli() -> Cli {
        Cli::parse_from(["finboard", "--output", "json", "transactions", "browse"])
    }

    fn deliver(browser: &mut Browser<'_>, rx: &Receiver<Event>) {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Event::Fetched(ticket, result)) => browser.on_fetched(ticket, result).unwrap(),
            Ok(Event::Input(_)) => panic!("unexpected input event"),
            Err(e) => panic!("no fetch result: {e}"),
        }
    }

    #[test]
    fn next_waits_for_the_page_in_flight() {
        let (cli, client) = (json_cli(), fixture_client());
        let (tx, rx) = mpsc::channel();
        // The fixture page holds 3 rows, a full page at this size.
        let mut b = Browser::new(&cli, &client, tx, 3);
        b.fetch();
        b.apply(BrowseCommand::Next, Instant::now());
        assert_eq!(b.controller.state().page, 1);
        assert!(b.next_pending);

        deliver(&mut b, &rx);
        assert_eq!(b.controller.state().page, 2);
        assert!(!b.next_pending);
        assert_eq!(b.shown_rows, None);
        assert!(b.tracker.in_flight());
    }

    #[test]
    fn filter_change_forgets_the_previous_row_count() {
        let (cli, client) = (json_cli(), fixture_client());
        let (tx, rx) = mpsc::channel();
        let mut b = Browser::new(&cli, &client, tx, 10);
        b.fetch();
        deliver(&mut b, &rx);
        b.shown_rows = Some(10);

        b.apply(
            BrowseCommand::Type(Some(TransactionKind::Income)),
            Instant::now(),
        );
        assert_eq!(b.shown_rows, None);
        b.apply(BrowseCommand::Next, Instant::now());
        assert_eq!(b.controller.state().page, 1);

        // The income page comes back short, so the deferred next goes nowhere.
        deliver(&mut b, &rx);
        assert_eq!(b.shown_rows, Some(3));
        assert_eq!(b.controller.state().page, 1);
        assert!(!b.tracker.in_flight());
    }

    #[test]
    fn quit_runs_the_pending_search() {
        let (cli, client) = (json_cli(), fixture_client());
        let (tx, _rx) = mpsc::channel();
        let mut b = Browser::new(&cli, &client, tx, 10);
        let now = Instant::now();
        b.apply(BrowseCommand::Search("coffee".to_string()), now);
        assert_eq!(b.controller.request().search, None);

        b.apply(BrowseCommand::Quit, now);
        assert_eq!(b.controller.request().search.as_deref(), Some("coffee"));
        assert!(b.tracker.in_flight());
    }

    #[test]
    fn parses_browse_commands() {
        assert_eq!(
            parse_command("/coffee beans"),
            Ok(BrowseCommand::Search("coffee beans".to_string()))
        );
        assert_eq!(parse_command("/"), Ok(BrowseCommand::Search(String::new())));
        assert_eq!(parse_command("type all"), Ok(BrowseCommand::Type(None)));
        assert_eq!(
            parse_command("type income"),
            Ok(BrowseCommand::Type(Some(TransactionKind::Income)))
        );
        assert_eq!(
            parse_command("sort amount"),
            Ok(BrowseCommand::Sort(SortField::Amount))
        );
        assert_eq!(parse_command("NEXT"), Ok(BrowseCommand::Next));
        assert_eq!(parse_command("page 4"), Ok(BrowseCommand::Page(4)));
        assert_eq!(parse_command("q\r\n"), Ok(BrowseCommand::Quit));
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(parse_command("page 0").is_err());
        assert!(parse_command("sort colour").is_err());
        assert!(parse_command("type other").is_err());
        assert!(parse_command("dance").is_err());
        assert_eq!(parse_command("   "), Err(String::new()));
    }
}
