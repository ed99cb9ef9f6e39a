//! Scripted in-memory news server for integration tests
//!
//! Every protocol call records a start and an end event tagged with the
//! origin key, and waits `latency` of (virtual) time in between, so tests
//! can check how calls for the same and for different origins overlap.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nntp_reader::article::OverviewFormat;
use nntp_reader::{
    ActiveGroup, ActiveRange, Draft, NewsError, NewsProtocol, Origin, ProtocolFactory,
    RawArticle, RawOverview, Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start { origin: String, op: String },
    End { origin: String, op: String },
}

impl Event {
    pub fn origin(&self) -> &str {
        match self {
            Event::Start { origin, .. } | Event::End { origin, .. } => origin,
        }
    }

    pub fn op(&self) -> &str {
        match self {
            Event::Start { op, .. } | Event::End { op, .. } => op,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Event::Start { .. })
    }
}

#[derive(Debug, Clone)]
pub struct MockArticle {
    pub number: u64,
    pub id: String,
    pub subject: String,
    pub from: String,
    pub headers: Vec<String>,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct MockGroup {
    low: u64,
    high: u64,
    articles: BTreeMap<u64, MockArticle>,
}

#[derive(Default)]
struct State {
    groups: BTreeMap<String, MockGroup>,
    latency: Duration,
    slow_ops: BTreeMap<String, Duration>,
    events: Vec<Event>,
    connects: usize,
    disconnects: usize,
    fail_connect: bool,
    reject_posts: bool,
    posted: Vec<Draft>,
}

/// Shared server state; clones see the same data
#[derive(Clone, Default)]
pub struct MockServer {
    state: Arc<Mutex<State>>,
}

pub fn article_id(group: &str, number: u64) -> String {
    format!("<{number}@{group}>")
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group whose active range is `low..=high` holding only `present`
    pub fn with_group(
        self,
        name: &str,
        low: u64,
        high: u64,
        present: impl IntoIterator<Item = u64>,
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let group = state.groups.entry(name.to_string()).or_default();
            group.low = low;
            group.high = high;
            for number in present {
                let id = article_id(name, number);
                let subject = format!("Article {number}");
                let from = "Jane Doe <jane@example.com>".to_string();
                group.articles.insert(
                    number,
                    MockArticle {
                        number,
                        headers: vec![
                            format!("Message-ID: {id}"),
                            format!("From: {from}"),
                            format!("Subject: {subject}"),
                            "Date: Mon, 1 Jan 2024 10:00:00 +0000".to_string(),
                            format!("Newsgroups: {name}"),
                        ],
                        body: vec![format!("Body of article {number}")],
                        id,
                        subject,
                        from,
                    },
                );
            }
        }
        self
    }

    /// Add or replace one article with explicit header and body lines
    pub fn with_article(
        self,
        group: &str,
        number: u64,
        id: &str,
        headers: &[&str],
        body: &[&str],
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let g = state.groups.entry(group.to_string()).or_default();
            g.low = if g.articles.is_empty() { number } else { g.low.min(number) };
            g.high = g.high.max(number);
            let mut lines: Vec<String> = vec![format!("Message-ID: {id}")];
            lines.extend(headers.iter().map(|h| h.to_string()));
            let header = |name: &str| {
                headers
                    .iter()
                    .find_map(|h| h.strip_prefix(name))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default()
            };
            g.articles.insert(
                number,
                MockArticle {
                    number,
                    id: id.to_string(),
                    subject: header("Subject:"),
                    from: header("From:"),
                    headers: lines,
                    body: body.iter().map(|l| l.to_string()).collect(),
                },
            );
        }
        self
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().unwrap().latency = latency;
        self
    }

    /// Extra latency for one operation name (e.g. `"article"`)
    pub fn with_slow_op(self, op: &str, latency: Duration) -> Self {
        self.state
            .lock()
            .unwrap()
            .slow_ops
            .insert(op.to_string(), latency);
        self
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.state.lock().unwrap().fail_connect = fail;
    }

    pub fn set_reject_posts(&self, reject: bool) {
        self.state.lock().unwrap().reject_posts = reject;
    }

    /// Move a group's active range, as expiry and new posts would
    pub fn set_active(&self, group: &str, low: u64, high: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(g) = state.groups.get_mut(group) {
            g.low = low;
            g.high = high;
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().unwrap().events.clear();
    }

    /// Operation names started for `origin`, in order
    pub fn ops(&self, origin: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.is_start() && e.origin() == origin)
            .map(|e| e.op().to_string())
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    pub fn posted(&self) -> Vec<Draft> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn factory(&self) -> Arc<MockFactory> {
        Arc::new(MockFactory {
            server: self.clone(),
        })
    }
}

/// Assert that no two calls for the same origin overlapped
pub fn assert_serialized(events: &[Event]) {
    let mut open: BTreeMap<String, String> = BTreeMap::new();
    for event in events {
        match event {
            Event::Start { origin, op } => {
                if let Some(running) = open.insert(origin.clone(), op.clone()) {
                    panic!("{op} started on {origin} while {running} was running");
                }
            }
            Event::End { origin, .. } => {
                open.remove(origin);
            }
        }
    }
}

/// Whether calls for two different origins ever ran at the same time
pub fn overlapped(events: &[Event], a: &str, b: &str) -> bool {
    let mut running: BTreeMap<&str, usize> = BTreeMap::new();
    for event in events {
        let count = running.entry(event.origin()).or_default();
        if event.is_start() {
            *count += 1;
        } else {
            *count = count.saturating_sub(1);
        }
        if running.get(a).copied().unwrap_or(0) > 0 && running.get(b).copied().unwrap_or(0) > 0 {
            return true;
        }
    }
    false
}

pub struct MockFactory {
    server: MockServer,
}

impl ProtocolFactory for MockFactory {
    fn create(&self, origin: &Origin) -> Box<dyn NewsProtocol> {
        Box::new(MockProtocol {
            origin: origin.key(),
            server: self.server.clone(),
            selected: None,
        })
    }
}

pub struct MockProtocol {
    origin: String,
    server: MockServer,
    selected: Option<String>,
}

impl MockProtocol {
    async fn call<T>(&mut self, op: &str, f: impl FnOnce(&mut State, &mut Option<String>) -> T) -> T {
        let latency = {
            let mut state = self.server.state.lock().unwrap();
            state.events.push(Event::Start {
                origin: self.origin.clone(),
                op: op.to_string(),
            });
            state.latency + state.slow_ops.get(op).copied().unwrap_or_default()
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.server.state.lock().unwrap();
        let result = f(&mut state, &mut self.selected);
        state.events.push(Event::End {
            origin: self.origin.clone(),
            op: op.to_string(),
        });
        result
    }
}

fn xover_line(article: &MockArticle) -> String {
    format!(
        "{}\t{}\t{}\tMon, 1 Jan 2024 10:00:00 +0000\t{}\t\t100\t{}",
        article.number,
        article.subject,
        article.from,
        article.id,
        article.body.len()
    )
}

#[async_trait]
impl NewsProtocol for MockProtocol {
    async fn connect_and_authenticate(&mut self) -> Result<()> {
        self.call("connect", |state, _| -> Result<()> {
            if state.fail_connect {
                return Err(NewsError::Connection("connection refused".into()));
            }
            state.connects += 1;
            Ok(())
        })
        .await
    }

    async fn list_active_groups(&mut self) -> Result<Vec<ActiveGroup>> {
        self.call("list", |state, _| -> Result<Vec<ActiveGroup>> {
            Ok(state
                .groups
                .iter()
                .map(|(name, g)| ActiveGroup {
                    name: name.clone(),
                    high: g.high,
                    low: g.low,
                    posting: Some(true),
                })
                .collect())
        })
        .await
    }

    async fn group(&mut self, name: &str) -> Result<ActiveRange> {
        self.call("group", |state, selected| -> Result<ActiveRange> {
            let g = state
                .groups
                .get(name)
                .ok_or_else(|| NewsError::NoSuchGroup(name.to_string()))?;
            *selected = Some(name.to_string());
            Ok(ActiveRange {
                low: g.low,
                high: g.high,
                count: Some(g.articles.len() as u64),
            })
        })
        .await
    }

    async fn overview_format(&mut self) -> Result<OverviewFormat> {
        self.call("format", |_, _| -> Result<OverviewFormat> { Ok(OverviewFormat::default()) })
            .await
    }

    async fn xover(&mut self, range: &str, format: &OverviewFormat) -> Result<Vec<RawOverview>> {
        let op = format!("xover {range}");
        self.call(&op, |state, selected| -> Result<Vec<RawOverview>> {
            let name = selected
                .as_ref()
                .ok_or_else(|| NewsError::Protocol("412 no group selected".into()))?;
            let g = &state.groups[name];
            let (low, high) = range
                .split_once('-')
                .and_then(|(l, h)| Some((l.parse::<u64>().ok()?, h.parse::<u64>().ok()?)))
                .ok_or_else(|| NewsError::Protocol(format!("501 bad range {range}")))?;
            Ok(g.articles
                .range(low..=high)
                .map(|(_, a)| format.parse_row(&xover_line(a)))
                .collect())
        })
        .await
    }

    async fn article(&mut self, id: &str) -> Result<RawArticle> {
        self.call("article", |state, _| -> Result<RawArticle> {
            let found = state
                .groups
                .values()
                .flat_map(|g| g.articles.values())
                .find(|a| a.id == id)
                .ok_or_else(|| NewsError::NoSuchArticle(id.to_string()))?;
            let mut lines = found.headers.clone();
            lines.push(String::new());
            lines.extend(found.body.iter().cloned());
            Ok(RawArticle::from_lines(lines))
        })
        .await
    }

    async fn post(&mut self, draft: &Draft) -> Result<bool> {
        self.call("post", |state, _| -> Result<bool> {
            if state.reject_posts {
                return Ok(false);
            }
            state.posted.push(draft.clone());
            Ok(true)
        })
        .await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.call("quit", |state, _| -> Result<()> {
            state.disconnects += 1;
            Ok(())
        })
        .await
    }
}

pub fn origin(host: &str) -> Origin {
    Origin::new(host)
}
