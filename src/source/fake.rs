//! In-memory upstream used by tests.

use super::{HttpReply, SeriesRequest, Sleeper, Transport};
use crate::error::FetchError;
use crate::models::SeriesKey;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Transport answering from per-series scripts, then from a per-series default.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<SeriesKey, VecDeque<Result<HttpReply, FetchError>>>>,
    defaults: Mutex<HashMap<SeriesKey, HttpReply>>,
    calls: Mutex<Vec<SeriesKey>>,
    pub gate: Gate,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one-shot replies for a series, consumed in order.
    pub fn script(&self, key: &SeriesKey, replies: Vec<Result<HttpReply, FetchError>>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .extend(replies);
    }

    /// Reply used once the script of a series is exhausted.
    pub fn always(&self, key: &SeriesKey, reply: HttpReply) {
        self.defaults.lock().unwrap().insert(key.clone(), reply);
    }

    pub fn calls_for(&self, key: &SeriesKey) -> usize {
        self.calls.lock().unwrap().iter().filter(|k| *k == key).count()
    }

    pub fn call_order(&self) -> Vec<SeriesKey> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &SeriesRequest) -> Result<HttpReply, FetchError> {
        self.calls.lock().unwrap().push(request.key.clone());
        self.gate.pass().await;

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.key)
            .and_then(|queue| queue.pop_front());
        if let Some(reply) = scripted {
            return reply;
        }

        self.defaults
            .lock()
            .unwrap()
            .get(&request.key)
            .cloned()
            .ok_or_else(|| FetchError::UpstreamUnavailable {
                status: Some(404),
                message: format!("no script for {}", request.key),
            })
    }
}

/// Holds the next request until the test releases it.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolves once a request is being held.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

/// Sleeper that records requested pauses and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.pauses().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

pub fn ok(body: String) -> HttpReply {
    HttpReply { status: 200, body }
}

pub fn status(code: u16) -> HttpReply {
    HttpReply {
        status: code,
        body: String::new(),
    }
}

/// Indicators API body with one record per year, newest first as the API sends them.
pub fn indicator_body(start: i32, end: i32, value: impl Fn(i32) -> Option<f64>) -> String {
    let records: Vec<_> = (start..=end)
        .rev()
        .map(|year| json!({ "date": year.to_string(), "value": value(year) }))
        .collect();
    json!([
        { "page": 1, "pages": 1, "per_page": 2000, "total": records.len() },
        records
    ])
    .to_string()
}
