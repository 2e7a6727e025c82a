//! A scripted transport for tests.
//!
//! Records every request so a test can assert on exactly what the layers
//! above issued, in what order. Events are fed back by the test itself,
//! which keeps the whole exchange deterministic.

use std::time::Duration;

use uuid::Uuid;

use crate::attributes::Attribute;
use crate::transport::{Transport, TransportError};

/// A request captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuedRequest {
    /// `connect` was called.
    Connect,
    /// `disconnect` was called.
    Disconnect,
    /// `discover_attributes` was called.
    DiscoverAttributes,
    /// `read` was called for the given characteristic.
    Read(Uuid),
    /// `write` was called.
    Write {
        /// Target characteristic.
        attribute: Uuid,
        /// Payload bytes.
        payload: Vec<u8>,
    },
    /// `set_notify` was called.
    SetNotify {
        /// Target characteristic.
        attribute: Uuid,
        /// Enable flag.
        enabled: bool,
    },
    /// `set_indicate` was called.
    SetIndicate {
        /// Target characteristic.
        attribute: Uuid,
        /// Enable flag.
        enabled: bool,
    },
    /// `start_settle_timer` was called.
    StartSettleTimer(Duration),
}

/// Transport double that records requests and always accepts them,
/// unless told to refuse.
#[derive(Debug, Default)]
pub struct MockTransport {
    issued: Vec<IssuedRequest>,
    refuse: bool,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// Make every subsequent request fail with [`TransportError::Failed`].
    pub fn refuse_requests(&mut self, refuse: bool) {
        self.refuse = refuse;
    }

    /// Requests issued so far, in order.
    pub fn issued(&self) -> &[IssuedRequest] {
        &self.issued
    }

    /// Drain and return the recorded requests.
    pub fn take_issued(&mut self) -> Vec<IssuedRequest> {
        std::mem::take(&mut self.issued)
    }

    /// The most recent write payload, if any request was a write.
    pub fn last_write(&self) -> Option<&[u8]> {
        self.issued.iter().rev().find_map(|req| match req {
            IssuedRequest::Write { payload, .. } => Some(payload.as_slice()),
            _ => None,
        })
    }

    fn record(&mut self, request: IssuedRequest) -> Result<(), TransportError> {
        if self.refuse {
            return Err(TransportError::Failed("refused by test".to_string()));
        }
        self.issued.push(request);
        Ok(())
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.record(IssuedRequest::Connect)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.record(IssuedRequest::Disconnect)
    }

    fn discover_attributes(&mut self) -> Result<(), TransportError> {
        self.record(IssuedRequest::DiscoverAttributes)
    }

    fn read(&mut self, attribute: &Attribute) -> Result<(), TransportError> {
        self.record(IssuedRequest::Read(attribute.uuid))
    }

    fn write(&mut self, attribute: &Attribute, payload: &[u8]) -> Result<(), TransportError> {
        self.record(IssuedRequest::Write {
            attribute: attribute.uuid,
            payload: payload.to_vec(),
        })
    }

    fn set_notify(&mut self, attribute: &Attribute, enabled: bool) -> Result<(), TransportError> {
        self.record(IssuedRequest::SetNotify {
            attribute: attribute.uuid,
            enabled,
        })
    }

    fn set_indicate(&mut self, attribute: &Attribute, enabled: bool) -> Result<(), TransportError> {
        self.record(IssuedRequest::SetIndicate {
            attribute: attribute.uuid,
            enabled,
        })
    }

    fn start_settle_timer(&mut self, delay: Duration) -> Result<(), TransportError> {
        self.record(IssuedRequest::StartSettleTimer(delay))
    }
}
