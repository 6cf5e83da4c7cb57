//! End-to-end behaviour of the intake loop against a recording backend and
//! a probed in-memory channel.

use async_trait::async_trait;
use cosmos_hdfs::{BackendError, StorageBackend};
use cosmos_sink::{
    BackoffPolicy, Channel, ChannelError, IntakeLoop, MemoryChannel, MemoryTransaction,
    SinkRunner, Status, Transaction,
};
use cosmos_types::RawEvent;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Probed channel ───────────────────────────────────────────────────

type OpLog = Arc<Mutex<Vec<&'static str>>>;

/// Wraps a `MemoryChannel` and records every transaction call.
#[derive(Clone)]
struct ProbeChannel {
    inner: MemoryChannel,
    log: OpLog,
}

impl ProbeChannel {
    fn new() -> Self {
        Self {
            inner: MemoryChannel::new(16),
            log: Arc::default(),
        }
    }

    fn ops(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }

    fn clear_ops(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Takes the head event and rolls it back, leaving the channel as it was.
    fn peek(&self) -> Option<RawEvent> {
        let mut txn = self.inner.transaction();
        txn.begin().unwrap();
        let event = txn.take().unwrap();
        txn.rollback().unwrap();
        txn.close();
        event
    }
}

struct ProbeTransaction {
    inner: MemoryTransaction,
    log: OpLog,
}

impl ProbeTransaction {
    fn record(&self, op: &'static str) {
        self.log.lock().unwrap().push(op);
    }
}

impl Channel for ProbeChannel {
    type Transaction = ProbeTransaction;

    fn transaction(&self) -> ProbeTransaction {
        ProbeTransaction {
            inner: self.inner.transaction(),
            log: Arc::clone(&self.log),
        }
    }
}

impl Transaction for ProbeTransaction {
    fn begin(&mut self) -> Result<(), ChannelError> {
        self.record("begin");
        self.inner.begin()
    }

    fn take(&mut self) -> Result<Option<RawEvent>, ChannelError> {
        self.record("take");
        self.inner.take()
    }

    fn commit(&mut self) -> Result<(), ChannelError> {
        self.record("commit");
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), ChannelError> {
        self.record("rollback");
        self.inner.rollback()
    }

    fn close(&mut self) {
        self.record("close");
        self.inner.close();
    }
}

// ── Recording backend ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Exists(String),
    CreateDir(String),
    CreateFile(String, String),
    Append(String, String),
}

#[derive(Default)]
struct BackendState {
    files: BTreeMap<String, Vec<String>>,
    calls: Vec<Call>,
    /// Number of writes allowed before every further write fails.
    fail_after: Option<usize>,
    writes: usize,
    panic_on_exists: bool,
}

#[derive(Default)]
struct RecordingBackend {
    state: Mutex<BackendState>,
}

impl RecordingBackend {
    fn failing_after(writes: usize) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().fail_after = Some(writes);
        backend
    }

    fn heal(&self) {
        self.state.lock().unwrap().fail_after = None;
    }

    fn seed(&self, key: &str, line: &str) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(key.to_string(), vec![line.to_string()]);
    }

    fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn lines(&self, key: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    fn write(&self, call: Call) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.clone());

        let op = match call {
            Call::Append(..) => "APPEND",
            _ => "CREATE",
        };
        if let Some(limit) = state.fail_after {
            if state.writes >= limit {
                return Err(BackendError::Rejected {
                    op,
                    status: 500,
                    message: "injected failure".to_string(),
                });
            }
        }
        state.writes += 1;

        match call {
            Call::CreateFile(key, line) => {
                state.files.insert(key, vec![line]);
            }
            Call::Append(key, line) => state.files.entry(key).or_default().push(line),
            _ => {}
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for RecordingBackend {
    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Exists(key.to_string()));
        if state.panic_on_exists {
            drop(state);
            panic!("storage backend defect");
        }
        Ok(state.files.contains_key(key))
    }

    async fn create_dir(&self, path: &str) -> Result<(), BackendError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::CreateDir(path.to_string()));
        Ok(())
    }

    async fn create_file(&self, key: &str, initial_line: &str) -> Result<(), BackendError> {
        self.write(Call::CreateFile(key.to_string(), initial_line.to_string()))
    }

    async fn append(&self, key: &str, line: &str) -> Result<(), BackendError> {
        self.write(Call::Append(key.to_string(), line.to_string()))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn notification(entity_id: &str, entity_type: &str, attrs: &[(&str, &str, &str)]) -> RawEvent {
    let attributes: Vec<_> = attrs
        .iter()
        .map(|(name, kind, value)| json!({ "name": name, "type": kind, "value": value }))
        .collect();
    let body = json!({
        "subscriptionId": "51c0ac9ed714fb3b37d7d5a8",
        "originator": "localhost",
        "contextResponses": [{
            "contextElement": {
                "id": entity_id,
                "type": entity_type,
                "isPattern": "false",
                "attributes": attributes,
            },
            "statusCode": { "code": "200", "reasonPhrase": "OK" }
        }]
    });
    RawEvent::with_content_type(body.to_string(), "application/json; charset=utf-8")
}

type ProbedLoop = IntakeLoop<ProbeChannel, Arc<RecordingBackend>>;

fn sink_with(backend: RecordingBackend) -> (ProbeChannel, Arc<RecordingBackend>, ProbedLoop) {
    let channel = ProbeChannel::new();
    let backend = Arc::new(backend);
    let sink = IntakeLoop::new(channel.clone(), Arc::clone(&backend));
    (channel, backend, sink)
}

const TEMPERATURE_KEY: &str = "Room1-room1_type1-temperature-float.txt";

// ── Scenarios ────────────────────────────────────────────────────────

#[tokio::test]
async fn first_write_creates_file_and_commits() {
    let (channel, backend, sink) = sink_with(RecordingBackend::default());
    channel
        .inner
        .put(notification("Room1", "room1:type1", &[("temperature", "float", "24.4")]))
        .unwrap();

    assert_eq!(sink.process().await, Status::Ready);

    let calls = backend.calls();
    assert_eq!(calls.len(), 2, "unexpected calls: {calls:?}");
    assert_eq!(calls[0], Call::Exists(TEMPERATURE_KEY.to_string()));
    match &calls[1] {
        Call::CreateFile(key, line) => {
            assert_eq!(key, TEMPERATURE_KEY);
            assert!(
                line.ends_with("|Room1|room1_type1|temperature|float|24.4"),
                "unexpected line: {line}"
            );
        }
        other => panic!("expected create_file, got {other:?}"),
    }

    assert_eq!(channel.ops(), vec!["begin", "take", "commit", "close"]);
    assert!(channel.inner.is_empty());
}

#[tokio::test]
async fn existing_file_is_appended() {
    let backend = RecordingBackend::default();
    backend.seed(TEMPERATURE_KEY, "earlier|line");
    let (channel, backend, sink) = sink_with(backend);
    channel
        .inner
        .put(notification("Room1", "room1:type1", &[("temperature", "float", "25.0")]))
        .unwrap();

    assert_eq!(sink.process().await, Status::Ready);

    let calls = backend.calls();
    assert!(matches!(&calls[1], Call::Append(key, line)
        if key == TEMPERATURE_KEY && line.ends_with("|Room1|room1_type1|temperature|float|25.0")));
    assert!(!calls.iter().any(|c| matches!(c, Call::CreateFile(..))));
    assert_eq!(backend.lines(TEMPERATURE_KEY).len(), 2);
}

#[tokio::test]
async fn partial_failure_rolls_back_and_event_is_redelivered() {
    let (channel, backend, sink) = sink_with(RecordingBackend::failing_after(1));
    let event = notification(
        "Room1",
        "Room",
        &[("temperature", "float", "24.4"), ("pressure", "integer", "720")],
    );
    channel.inner.put(event.clone()).unwrap();

    assert_eq!(sink.process().await, Status::Backoff);
    assert_eq!(channel.ops(), vec!["begin", "take", "rollback", "close"]);

    // The first attribute stays written: no compensating delete.
    assert_eq!(backend.lines("Room1-Room-temperature-float.txt").len(), 1);
    assert!(backend.lines("Room1-Room-pressure-integer.txt").is_empty());

    // The whole event is available again.
    assert_eq!(channel.inner.len(), 1);
    assert_eq!(channel.peek(), Some(event));

    backend.heal();
    channel.clear_ops();
    assert_eq!(sink.process().await, Status::Ready);
    assert_eq!(channel.ops(), vec!["begin", "take", "commit", "close"]);

    // Redelivery duplicated the first attribute's line.
    assert_eq!(backend.lines("Room1-Room-temperature-float.txt").len(), 2);
    assert_eq!(backend.lines("Room1-Room-pressure-integer.txt").len(), 1);
    assert!(channel.inner.is_empty());
}

#[tokio::test]
async fn empty_take_backs_off_without_backend_calls() {
    let (channel, backend, sink) = sink_with(RecordingBackend::default());

    assert_eq!(sink.process().await, Status::Backoff);

    assert!(backend.calls().is_empty());
    assert_eq!(channel.ops(), vec!["begin", "take", "close"]);
}

#[tokio::test]
async fn commit_happens_only_when_every_write_succeeds() {
    for total in 1..=4usize {
        for succeeded in 0..total {
            let (channel, backend, sink) = sink_with(RecordingBackend::failing_after(succeeded));
            let values: Vec<String> = (0..total).map(|i| i.to_string()).collect();
            let names: Vec<String> = (0..total).map(|i| format!("attr{i}")).collect();
            let attrs: Vec<(&str, &str, &str)> = names
                .iter()
                .zip(&values)
                .map(|(n, v)| (n.as_str(), "integer", v.as_str()))
                .collect();
            channel.inner.put(notification("Car1", "Car", &attrs)).unwrap();

            assert_eq!(
                sink.process().await,
                Status::Backoff,
                "total={total} succeeded={succeeded}"
            );
            assert!(!channel.ops().contains(&"commit"));
            assert!(channel.ops().contains(&"rollback"));
            assert_eq!(backend.file_count(), succeeded);
            assert_eq!(channel.inner.len(), 1);
        }
    }
}

#[tokio::test]
async fn unparseable_event_is_rolled_back_without_writes() {
    let (channel, backend, sink) = sink_with(RecordingBackend::default());
    let event = RawEvent::with_content_type(
        "<notifyContextRequest><contextResponseList/></notifyContextRequest>",
        "application/json",
    );
    channel.inner.put(event.clone()).unwrap();

    assert_eq!(sink.process().await, Status::Backoff);

    assert!(backend.calls().is_empty());
    assert_eq!(channel.ops(), vec!["begin", "take", "rollback", "close"]);
    assert_eq!(channel.peek(), Some(event));
}

#[tokio::test]
async fn unsupported_content_type_is_rolled_back() {
    let (channel, backend, sink) = sink_with(RecordingBackend::default());
    channel
        .inner
        .put(RawEvent::with_content_type("temperature=24.4", "text/plain"))
        .unwrap();

    assert_eq!(sink.process().await, Status::Backoff);
    assert!(backend.calls().is_empty());
    assert_eq!(channel.inner.len(), 1);
}

#[tokio::test]
async fn appends_to_one_key_follow_processing_order() {
    let (channel, backend, sink) = sink_with(RecordingBackend::default());
    for value in ["20.1", "20.2", "20.3"] {
        channel
            .inner
            .put(notification("Room1", "Room", &[("temperature", "float", value)]))
            .unwrap();
    }

    for _ in 0..3 {
        assert_eq!(sink.process().await, Status::Ready);
    }

    let values: Vec<String> = backend
        .lines("Room1-Room-temperature-float.txt")
        .iter()
        .map(|line| line.rsplit('|').next().unwrap().to_string())
        .collect();
    assert_eq!(values, vec!["20.1", "20.2", "20.3"]);
}

#[tokio::test]
async fn backend_panic_propagates_after_rollback_and_close() {
    let backend = RecordingBackend::default();
    backend.state.lock().unwrap().panic_on_exists = true;
    let (channel, _backend, sink) = sink_with(backend);
    channel
        .inner
        .put(notification("Room1", "Room", &[("temperature", "float", "24.4")]))
        .unwrap();

    let sink = Arc::new(sink);
    let task = {
        let sink = Arc::clone(&sink);
        tokio::spawn(async move { sink.process().await })
    };
    let err = task.await.unwrap_err();

    assert!(err.is_panic());
    assert_eq!(channel.ops(), vec!["begin", "take", "rollback", "close"]);
    assert_eq!(channel.inner.len(), 1);
}

#[tokio::test]
async fn start_creates_dataset_directory() {
    let (_channel, backend, sink) = sink_with(RecordingBackend::default());
    sink.start().await;
    assert_eq!(backend.calls(), vec![Call::CreateDir(String::new())]);
}

#[tokio::test]
async fn runner_drains_channel_and_stops_on_shutdown() {
    let channel = MemoryChannel::new(8);
    let backend = Arc::new(RecordingBackend::default());
    for id in ["Room1", "Room2"] {
        channel
            .put(notification(id, "Room", &[("temperature", "float", "21.0")]))
            .unwrap();
    }

    let runner = SinkRunner::new(
        IntakeLoop::new(channel.clone(), Arc::clone(&backend)),
        BackoffPolicy::new(Duration::from_millis(5), Duration::from_millis(20)),
    );
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(runner.run(shutdown_rx));

    tokio::time::timeout(Duration::from_secs(5), async {
        while backend.file_count() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("runner should persist both events");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("runner should stop after shutdown")
        .unwrap();

    assert!(channel.is_empty());
    assert_eq!(
        backend.calls().first(),
        Some(&Call::CreateDir(String::new()))
    );
}
