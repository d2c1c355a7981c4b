//! In-memory fakes for collaborator traits (testing only)
//!
//! Provides scriptable stand-ins for the capture launcher, media prober,
//! transfer client, acknowledge client, and archive store that satisfy the
//! trait contracts without external processes or network access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::archive::{ArchiveError, ArchiveRecord, ArchiveStore};
use crate::collaborators::*;
use crate::domain::SourceIdentity;

// ---------------------------------------------------------------------------
// FakeLauncher
// ---------------------------------------------------------------------------

type TerminationSlot = Arc<Mutex<Option<oneshot::Sender<TerminationReason>>>>;

/// Capture launcher whose process terminations are driven by the test.
///
/// `end_capture` reports a termination as if the external process exited;
/// `CaptureHandle::terminate` is honored by reporting an abnormal end, the
/// same way a real kill would.
///
/// Slots are keyed by output path, which is unique per launch, so parallel
/// sessions for one source with different labels stay independent.
#[derive(Default)]
pub struct FakeLauncher {
    launches: Mutex<Vec<(SourceIdentity, PathBuf)>>,
    slots: Mutex<HashMap<PathBuf, TerminationSlot>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of processes spawned so far.
    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    /// Output paths of every launch, in order.
    pub fn launched_outputs(&self) -> Vec<PathBuf> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// End the oldest still-live capture for `source`. Returns `false` if
    /// none is live or all already terminated.
    pub fn end_capture(&self, source: &str, reason: TerminationReason) -> bool {
        let outputs: Vec<PathBuf> = self
            .launches
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s.as_str() == source)
            .map(|(_, p)| p.clone())
            .collect();

        let slots = self.slots.lock().unwrap();
        for output in outputs {
            let Some(slot) = slots.get(&output) else {
                continue;
            };
            if let Some(tx) = slot.lock().unwrap().take() {
                return tx.send(reason).is_ok();
            }
        }
        false
    }
}

#[async_trait]
impl CaptureLauncher for FakeLauncher {
    async fn launch(
        &self,
        source: &SourceIdentity,
        output: &Path,
    ) -> Result<LaunchedCapture, LaunchError> {
        let (term_tx, term_rx) = oneshot::channel();
        let (kill_tx, mut kill_rx) = mpsc::channel(1);

        let slot: TerminationSlot = Arc::new(Mutex::new(Some(term_tx)));
        let kill_slot = Arc::clone(&slot);
        tokio::spawn(async move {
            if kill_rx.recv().await.is_some() {
                if let Some(tx) = kill_slot.lock().unwrap().take() {
                    let _ = tx.send(TerminationReason::Abnormal);
                }
            }
        });

        self.slots.lock().unwrap().insert(output.to_path_buf(), slot);
        self.launches
            .lock()
            .unwrap()
            .push((source.clone(), output.to_path_buf()));

        Ok(LaunchedCapture {
            handle: CaptureHandle::new(kill_tx),
            termination: term_rx,
        })
    }
}

// ---------------------------------------------------------------------------
// FakeProber
// ---------------------------------------------------------------------------

/// Prober returning a fixed duration, or failing every call.
pub struct FakeProber {
    duration_secs: Option<f64>,
    error: Option<String>,
    calls: AtomicUsize,
}

impl FakeProber {
    pub fn with_duration(duration_secs: f64) -> Self {
        Self {
            duration_secs: Some(duration_secs),
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            duration_secs: None,
            error: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, _path: &Path) -> Result<MediaInfo, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.error {
            return Err(ProbeError(message.clone()));
        }
        Ok(MediaInfo {
            duration_secs: self.duration_secs.unwrap_or(0.0),
            video_streams: 1,
            audio_streams: 1,
        })
    }
}

// ---------------------------------------------------------------------------
// FakeTransfer
// ---------------------------------------------------------------------------

/// Transfer client that fails a scripted number of times, then succeeds.
pub struct FakeTransfer {
    failures_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeTransfer {
    /// Always succeeds.
    pub fn succeeding() -> Self {
        Self::failing_times(0)
    }

    /// Fail the first `n` calls, succeed afterwards.
    pub fn failing_times(n: usize) -> Self {
        Self {
            failures_remaining: AtomicUsize::new(n),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplayTransfer for FakeTransfer {
    async fn transfer(&self, _local: &Path, _remote_name: &str) -> Result<(), TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(TransferError("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeAcknowledger
// ---------------------------------------------------------------------------

enum AckScript {
    Status(u16),
    TransportFailure(String),
}

/// Acknowledge client replaying a scripted sequence of responses.
///
/// The last script entry repeats once the sequence is exhausted.
pub struct FakeAcknowledger {
    script: Mutex<Vec<AckScript>>,
    requests: Mutex<Vec<AcknowledgeRequest>>,
}

impl FakeAcknowledger {
    /// Respond with one status forever.
    pub fn with_status(status: u16) -> Self {
        Self::with_statuses(&[status])
    }

    /// Respond with each status in turn; the last repeats.
    pub fn with_statuses(statuses: &[u16]) -> Self {
        Self {
            script: Mutex::new(statuses.iter().rev().map(|s| AckScript::Status(*s)).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails at the transport level.
    pub fn transport_failing(message: &str) -> Self {
        Self {
            script: Mutex::new(vec![AckScript::TransportFailure(message.to_string())]),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<AcknowledgeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AcknowledgeClient for FakeAcknowledger {
    async fn acknowledge(
        &self,
        request: &AcknowledgeRequest,
    ) -> Result<AckResponse, AckTransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let mut script = self.script.lock().unwrap();
        let entry = if script.len() > 1 {
            script.pop().expect("script non-empty")
        } else {
            match script.last().expect("script never empty") {
                AckScript::Status(s) => AckScript::Status(*s),
                AckScript::TransportFailure(m) => AckScript::TransportFailure(m.clone()),
            }
        };

        match entry {
            AckScript::Status(status) => Ok(AckResponse { status, body: None }),
            AckScript::TransportFailure(message) => Err(AckTransportError(message)),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryArchiveStore
// ---------------------------------------------------------------------------

/// In-memory archive store backed by a `HashMap<id, record>`.
#[derive(Default)]
pub struct MemoryArchiveStore {
    records: Mutex<HashMap<String, ArchiveRecord>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ArchiveRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchiveStore {
    async fn get(&self, id: &str) -> Result<ArchiveRecord, ArchiveError> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound { id: id.to_string() })
    }

    async fn mark_deleted(&self, id: &str) -> Result<(), ArchiveError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| ArchiveError::NotFound { id: id.to_string() })?;
        record.deleted = true;
        Ok(())
    }
}
