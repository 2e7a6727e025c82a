//! The per-fetch record retrieval state machine.

use log::{debug, warn};

use vitalink_gatt::{Attribute, Transport};

use crate::error::RacpError;
use crate::operation::{RacpOpcode, RacpOperation};
use crate::response::{RacpResponse, RacpStatus};
use crate::store::RecordStore;

/// Where the engine stands in the current control-point conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// No request in flight.
    Idle,
    /// Waiting for a number-of-records response.
    AwaitingCount {
        /// Whether a non-zero count triggers a follow-up record request
        /// (the fetch-all-on-populated-store path) or the count itself is
        /// the result.
        follow_up: bool,
    },
    /// Waiting for record notifications and the terminal response.
    AwaitingRecords,
}

/// How a fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The terminal response reported success (an empty result set
    /// included).
    Complete {
        /// Records received during this fetch.
        new_records: usize,
    },
    /// A standalone count probe answered.
    Count(u16),
    /// The fetch was aborted at the client's request.
    Aborted,
    /// The peripheral does not implement the requested opcode. Callers
    /// use this to treat the feature as unavailable rather than retry.
    NotSupported,
    /// The peripheral reported a terminal error status.
    Failed(RacpStatus),
}

/// Drives record retrieval conversations on the control point.
///
/// One engine exists per connection; it owns the [`RecordStore`] the
/// fetches populate and enforces the single-fetch-in-flight invariant.
/// Record payloads themselves are profile-specific; the caller decodes
/// them into the store and tells the engine via
/// [`note_records`](RacpEngine::note_records).
pub struct RacpEngine<R> {
    control_point: Attribute,
    store: RecordStore<R>,
    state: FetchState,
    /// Opcode of the request awaiting its response, for echo checking.
    pending_request: Option<RacpOpcode>,
    /// Set by [`abort`](RacpEngine::abort); the next terminal status
    /// resolves as [`FetchOutcome::Aborted`] while this is set.
    abort_pending: bool,
    /// Records received during the current fetch.
    received: usize,
    last_outcome: Option<FetchOutcome>,
}

impl<R> RacpEngine<R> {
    /// Create an engine bound to the discovered control-point attribute.
    pub fn new(control_point: Attribute) -> Self {
        RacpEngine {
            control_point,
            store: RecordStore::new(),
            state: FetchState::Idle,
            pending_request: None,
            abort_pending: false,
            received: 0,
            last_outcome: None,
        }
    }

    /// The control-point attribute this engine writes to.
    pub fn control_point(&self) -> &Attribute {
        &self.control_point
    }

    /// Current conversation state.
    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Whether a fetch is in flight.
    pub fn is_busy(&self) -> bool {
        self.state != FetchState::Idle
    }

    /// Outcome of the most recently finished fetch.
    pub fn last_outcome(&self) -> Option<FetchOutcome> {
        self.last_outcome
    }

    /// The records fetched so far.
    pub fn store(&self) -> &RecordStore<R> {
        &self.store
    }

    /// Mutable store access for the profile decoder inserting records.
    pub fn store_mut(&mut self) -> &mut RecordStore<R> {
        &mut self.store
    }

    /// Drop any in-flight conversation state, e.g. after a disconnect.
    /// Stored records are kept.
    pub fn reset(&mut self) {
        if self.state != FetchState::Idle {
            debug!("racp: resetting engine while {:?}", self.state);
        }
        self.state = FetchState::Idle;
        self.pending_request = None;
        self.abort_pending = false;
        self.received = 0;
    }

    /// Point the engine at a freshly discovered control-point attribute,
    /// dropping any in-flight conversation. Used after re-discovery on
    /// reconnection; stored records are kept.
    pub fn rebind(&mut self, control_point: Attribute) {
        self.control_point = control_point;
        self.reset();
    }

    /// Fetch stored records.
    ///
    /// On an empty store this reports all records directly. On a
    /// populated store the caller wants an incremental refresh, so the
    /// engine first probes the record count and only requests records
    /// beyond the highest sequence it already holds.
    pub fn fetch_all<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<(), RacpError> {
        self.ensure_idle()?;
        if self.store.is_empty() {
            self.send(
                transport,
                RacpOperation::report_all(),
                FetchState::AwaitingRecords,
            )
        } else {
            self.send(
                transport,
                RacpOperation::report_count_all(),
                FetchState::AwaitingCount { follow_up: true },
            )
        }
    }

    /// Fetch records newer than the newest one already stored; on an
    /// empty store this is equivalent to [`fetch_all`](RacpEngine::fetch_all).
    pub fn refresh<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<(), RacpError> {
        self.ensure_idle()?;
        match self.store.highest_sequence() {
            None => self.send(
                transport,
                RacpOperation::report_all(),
                FetchState::AwaitingRecords,
            ),
            Some(highest) => self.send(
                transport,
                RacpOperation::report_greater_or_equal(highest.saturating_add(1)),
                FetchState::AwaitingRecords,
            ),
        }
    }

    /// Fetch only the first (oldest) stored record. Clears the store.
    pub fn fetch_first<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), RacpError> {
        self.ensure_idle()?;
        self.store.clear();
        self.send(
            transport,
            RacpOperation::report_first(),
            FetchState::AwaitingRecords,
        )
    }

    /// Fetch only the last (newest) stored record. Clears the store.
    pub fn fetch_last<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), RacpError> {
        self.ensure_idle()?;
        self.store.clear();
        self.send(
            transport,
            RacpOperation::report_last(),
            FetchState::AwaitingRecords,
        )
    }

    /// Probe how many records the peripheral holds without fetching them.
    pub fn report_count<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), RacpError> {
        self.ensure_idle()?;
        self.send(
            transport,
            RacpOperation::report_count_all(),
            FetchState::AwaitingCount { follow_up: false },
        )
    }

    /// Delete all records from peripheral storage. The local store is
    /// cleared optimistically: peripherals do not echo deleted record
    /// identities.
    pub fn delete_all<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), RacpError> {
        self.ensure_idle()?;
        self.store.clear();
        self.send(
            transport,
            RacpOperation::delete_all(),
            FetchState::AwaitingRecords,
        )
    }

    /// Request an abort of the operation in progress.
    ///
    /// Abort is asynchronous: records already in flight are still
    /// accepted, and the *next* terminal status response resolves as
    /// [`FetchOutcome::Aborted`] regardless of its literal status code.
    /// If terminal responses arrive out of order relative to a superseded
    /// request, that attribution is ambiguous; the protocol does not
    /// guarantee which conversation the flag lands on.
    pub fn abort<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<(), RacpError> {
        if self.state == FetchState::Idle {
            warn!("racp: abort requested with no fetch in flight");
        }
        let operation = RacpOperation::abort();
        debug!("racp: sending {:?}", operation);
        transport.write(&self.control_point, &operation.encode())?;
        self.abort_pending = true;
        Ok(())
    }

    /// Issue an arbitrary control-point operation, for operators the
    /// convenience methods do not cover. Abort requests route through
    /// [`abort`](RacpEngine::abort) semantics.
    pub fn execute<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        operation: RacpOperation,
    ) -> Result<(), RacpError> {
        if operation.opcode == RacpOpcode::Abort {
            return self.abort(transport);
        }
        self.ensure_idle()?;
        let next = match operation.opcode {
            RacpOpcode::ReportCount => FetchState::AwaitingCount { follow_up: false },
            _ => FetchState::AwaitingRecords,
        };
        self.send(transport, operation, next)
    }

    /// Tell the engine that `count` records were decoded into the store.
    pub fn note_records(&mut self, count: usize) {
        if self.state == FetchState::AwaitingRecords {
            self.received += count;
        }
    }

    /// Process a control-point notification/indication.
    ///
    /// Returns the fetch outcome when the response is terminal. The
    /// transport is needed because a count response on the fetch-all path
    /// triggers the follow-up record request.
    pub fn handle_control_point<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        payload: &[u8],
    ) -> Result<Option<FetchOutcome>, RacpError> {
        let response = RacpResponse::decode(payload)?;

        match response {
            RacpResponse::Count(count) => {
                let FetchState::AwaitingCount { follow_up } = self.state else {
                    warn!("racp: unexpected count response while {:?}", self.state);
                    return Ok(None);
                };

                if !follow_up {
                    return Ok(Some(self.finish(FetchOutcome::Count(count))));
                }
                if count == 0 {
                    debug!("racp: peripheral reports no stored records");
                    return Ok(Some(self.finish(FetchOutcome::Complete { new_records: 0 })));
                }

                let from = self
                    .store
                    .highest_sequence()
                    .map_or(0, |s| s.saturating_add(1));
                debug!("racp: {count} records reported, requesting from sequence {from}");
                self.send(
                    transport,
                    RacpOperation::report_greater_or_equal(from),
                    FetchState::AwaitingRecords,
                )?;
                Ok(None)
            }

            RacpResponse::Status { request, status } => {
                if self.state == FetchState::Idle && !self.abort_pending {
                    warn!("racp: unsolicited status response ({status}) ignored");
                    return Ok(None);
                }

                if let Some(expected) = self.pending_request {
                    if expected.code() != request {
                        warn!(
                            "racp: response echoes opcode {request}, expected {}",
                            expected.code()
                        );
                    }
                }

                let aborted = std::mem::take(&mut self.abort_pending);
                let outcome = if aborted {
                    FetchOutcome::Aborted
                } else {
                    match status {
                        RacpStatus::Success | RacpStatus::NoRecordsFound => {
                            FetchOutcome::Complete {
                                new_records: self.received,
                            }
                        }
                        RacpStatus::OpCodeNotSupported => FetchOutcome::NotSupported,
                        other => FetchOutcome::Failed(other),
                    }
                };
                Ok(Some(self.finish(outcome)))
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), RacpError> {
        if self.state != FetchState::Idle {
            return Err(RacpError::Busy);
        }
        Ok(())
    }

    fn send<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        operation: RacpOperation,
        next: FetchState,
    ) -> Result<(), RacpError> {
        debug!("racp: sending {:?}", operation);
        transport.write(&self.control_point, &operation.encode())?;
        self.pending_request = Some(operation.opcode);
        self.state = next;
        self.received = 0;
        Ok(())
    }

    fn finish(&mut self, outcome: FetchOutcome) -> FetchOutcome {
        debug!("racp: fetch finished: {:?}", outcome);
        self.state = FetchState::Idle;
        self.pending_request = None;
        self.received = 0;
        self.last_outcome = Some(outcome);
        outcome
    }
}
