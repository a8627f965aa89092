//! Write-behind staging for monitoring records.
//!
//! The scheduler offers alert and vital records to the [`WriteBehindBuffer`]
//! on its own task; [`RecordFlusher`] hands everything pending to the
//! [`RecordSink`] once per flush interval. Records are only dropped from the
//! buffer after the sink accepted them, so a store outage delays writes
//! without losing or duplicating rows.

use std::sync::Arc;
use std::time::Duration;

use pulseward_db::models::monitoring::{CreateAlertRecord, CreateVitalRecord};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::store::{RecordSink, StoreError};

/// Default time between flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Pending {
    alerts: Vec<CreateAlertRecord>,
    vitals: Vec<CreateVitalRecord>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.alerts.is_empty() && self.vitals.is_empty()
    }

    /// Put `older` in front of whatever was offered in the meantime.
    fn restore(&mut self, mut older: Pending) {
        older.alerts.append(&mut self.alerts);
        older.vitals.append(&mut self.vitals);
        *self = older;
    }
}

/// Number of records written by one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub alerts: usize,
    pub vitals: usize,
}

/// In-memory staging area for records awaiting a batched write.
#[derive(Debug, Default)]
pub struct WriteBehindBuffer {
    pending: Mutex<Pending>,
    /// Serializes flushes so a failed batch is restored before the next
    /// one is taken.
    flush_lock: Mutex<()>,
}

impl WriteBehindBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an alert record.
    pub async fn offer_alert(&self, alert: CreateAlertRecord) {
        self.pending.lock().await.alerts.push(alert);
    }

    /// Queue a vital sign record.
    pub async fn offer_vital(&self, vital: CreateVitalRecord) {
        self.pending.lock().await.vitals.push(vital);
    }

    /// Queue an alert together with the reading that raised it.
    pub async fn offer(&self, alert: CreateAlertRecord, vital: CreateVitalRecord) {
        let mut pending = self.pending.lock().await;
        pending.alerts.push(alert);
        pending.vitals.push(vital);
    }

    /// Pending `(alerts, vitals)` counts.
    pub async fn pending_counts(&self) -> (usize, usize) {
        let pending = self.pending.lock().await;
        (pending.alerts.len(), pending.vitals.len())
    }

    /// Hand everything pending to `sink`.
    ///
    /// The pending lists are taken in one critical section. If the sink
    /// fails, the batch is put back in front of any records offered while
    /// the write was in flight and the error is returned.
    pub async fn flush(&self, sink: &dyn RecordSink) -> Result<FlushReport, StoreError> {
        let _flushing = self.flush_lock.lock().await;

        let draining = std::mem::take(&mut *self.pending.lock().await);
        if draining.is_empty() {
            return Ok(FlushReport::default());
        }

        let report = FlushReport {
            alerts: draining.alerts.len(),
            vitals: draining.vitals.len(),
        };

        match sink.persist(&draining.alerts, &draining.vitals).await {
            Ok(()) => Ok(report),
            Err(e) => {
                self.pending.lock().await.restore(draining);
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RecordFlusher
// ---------------------------------------------------------------------------

/// Background task that flushes a [`WriteBehindBuffer`] on a fixed interval.
pub struct RecordFlusher {
    buffer: Arc<WriteBehindBuffer>,
    sink: Arc<dyn RecordSink>,
    interval: Duration,
}

impl RecordFlusher {
    pub fn new(buffer: Arc<WriteBehindBuffer>, sink: Arc<dyn RecordSink>, interval: Duration) -> Self {
        Self {
            buffer,
            sink,
            interval,
        }
    }

    /// Run the flush loop until `cancel` fires.
    ///
    /// The first flush happens one full interval after start. On
    /// cancellation a final flush is attempted so buffered records survive
    /// a graceful shutdown.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Record flusher started"
        );

        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.flush_once().await;
                    tracing::info!("Record flusher stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.flush_once().await;
                }
            }
        }
    }

    async fn flush_once(&self) {
        match self.buffer.flush(self.sink.as_ref()).await {
            Ok(report) if report == FlushReport::default() => {
                tracing::trace!("Record flush: nothing pending");
            }
            Ok(report) => {
                tracing::info!(
                    alerts = report.alerts,
                    vitals = report.vitals,
                    "Record flush: batch persisted"
                );
            }
            Err(e) => {
                let (alerts, vitals) = self.buffer.pending_counts().await;
                tracing::error!(
                    error = %e,
                    pending_alerts = alerts,
                    pending_vitals = vitals,
                    "Record flush failed, retrying next interval"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
