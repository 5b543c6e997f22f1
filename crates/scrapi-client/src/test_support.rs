//! In-memory engine and sleeper for facade and poller tests.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ScrapiError, ScrapiResult};
use crate::poller::Sleeper;
use crate::transport::TransportEngine;
use crate::types::TransportResult;

pub(crate) fn cbor<T: serde::Serialize>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).unwrap();
    out
}

/// Success payload carrying an operation record.
pub(crate) fn record(
    operation_id: &str,
    status: Option<&str>,
    entry_id: Option<&str>,
) -> TransportResult {
    let mut map = serde_json::Map::new();
    map.insert("operationID".into(), operation_id.into());
    if let Some(status) = status {
        map.insert("status".into(), status.into());
    }
    if let Some(entry_id) = entry_id {
        map.insert("entryID".into(), entry_id.into());
    }
    TransportResult::Success(cbor(&map))
}

#[derive(Debug, Default)]
pub(crate) struct Calls {
    register: AtomicUsize,
    check: AtomicUsize,
    receipt: AtomicUsize,
    statement: AtomicUsize,
}

impl Calls {
    pub(crate) fn register(&self) -> usize {
        self.register.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> usize {
        self.check.load(Ordering::SeqCst)
    }

    pub(crate) fn receipt(&self) -> usize {
        self.receipt.load(Ordering::SeqCst)
    }

    pub(crate) fn statement(&self) -> usize {
        self.statement.load(Ordering::SeqCst)
    }
}

/// Engine that replays queued results per operation.
#[derive(Default)]
pub(crate) struct ScriptedEngine {
    unhealthy: bool,
    configuration: Mutex<VecDeque<TransportResult>>,
    register: Mutex<VecDeque<TransportResult>>,
    checks: Mutex<VecDeque<TransportResult>>,
    receipts: Mutex<VecDeque<TransportResult>>,
    statements: Mutex<VecDeque<TransportResult>>,
    calls: Arc<Calls>,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }

    pub(crate) fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }

    pub(crate) fn on_configuration(self, result: TransportResult) -> Self {
        self.configuration.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn on_register(self, result: TransportResult) -> Self {
        self.register.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn on_check(self, result: TransportResult) -> Self {
        self.checks.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn on_receipt(self, result: TransportResult) -> Self {
        self.receipts.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn on_statement(self, result: TransportResult) -> Self {
        self.statements.lock().unwrap().push_back(result);
        self
    }

    fn next(queue: &Mutex<VecDeque<TransportResult>>, operation: &str) -> ScrapiResult<TransportResult> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ScrapiError::Network {
                message: format!("no scripted result left for {}", operation),
            })
    }
}

impl fmt::Display for ScriptedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Scripted Engine")
    }
}

#[async_trait]
impl TransportEngine for ScriptedEngine {
    fn initialized(&self) -> bool {
        !self.unhealthy
    }

    async fn get_configuration(&self) -> ScrapiResult<TransportResult> {
        Self::next(&self.configuration, "get_configuration")
    }

    async fn register_signed_statement(
        &self,
        _statement: &[u8],
    ) -> ScrapiResult<TransportResult> {
        self.calls.register.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.register, "register_signed_statement")
    }

    async fn check_registration(&self, _registration_id: &str) -> ScrapiResult<TransportResult> {
        self.calls.check.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.checks, "check_registration")
    }

    async fn resolve_receipt(&self, _entry_id: &str) -> ScrapiResult<TransportResult> {
        self.calls.receipt.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.receipts, "resolve_receipt")
    }

    async fn resolve_signed_statement(&self, _entry_id: &str) -> ScrapiResult<TransportResult> {
        self.calls.statement.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.statements, "resolve_signed_statement")
    }
}

/// Sleeper that records requested delays and returns immediately.
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
