//! Integration tests for the session lifecycle: connection, bonding,
//! discovery, initialization, and disconnect handling.
//!
//! The scripted mock transport records every request the session issues;
//! the tests feed completion events back by hand, so each exchange is
//! fully deterministic.

use std::time::Duration;

use vitalink_gatt::mock::{IssuedRequest, MockTransport};
use vitalink_gatt::{
    uuids, Attribute, AttributeTable, BondState, CharacteristicProperties, ConnectionState,
    GattEvent, PROP_INDICATE, PROP_NOTIFY, PROP_READ, PROP_WRITE,
};
use vitalink_profiles::GlucoseProfile;
use vitalink_session::{Session, SessionError, SessionEvent, SessionOptions};

type GlucoseSession = Session<MockTransport, GlucoseProfile>;

fn session_with(options: SessionOptions) -> GlucoseSession {
    Session::new(MockTransport::new(), GlucoseProfile::new(), options)
}

fn session() -> GlucoseSession {
    session_with(SessionOptions::default())
}

/// A glucose peripheral's attribute table.
fn glucose_attributes(with_battery: bool, with_service_changed: bool) -> AttributeTable {
    let mut attributes = vec![
        Attribute::new(
            uuids::GLUCOSE_MEASUREMENT,
            0x0010,
            CharacteristicProperties::new(PROP_NOTIFY),
        ),
        Attribute::new(
            uuids::GLUCOSE_MEASUREMENT_CONTEXT,
            0x0012,
            CharacteristicProperties::new(PROP_NOTIFY),
        ),
        Attribute::new(
            uuids::RECORD_ACCESS_CONTROL_POINT,
            0x0014,
            CharacteristicProperties::new(PROP_WRITE | PROP_INDICATE),
        ),
    ];
    if with_battery {
        attributes.push(Attribute::new(
            uuids::BATTERY_LEVEL,
            0x0020,
            CharacteristicProperties::new(PROP_READ),
        ));
    }
    if with_service_changed {
        attributes.push(Attribute::new(
            uuids::SERVICE_CHANGED,
            0x0003,
            CharacteristicProperties::new(PROP_INDICATE),
        ));
    }
    AttributeTable::from_attributes(attributes)
}

fn discovered(attributes: AttributeTable) -> GattEvent {
    GattEvent::AttributesDiscovered {
        status: 0,
        attributes,
    }
}

/// The completion event a recorded request would produce on success.
fn completion_for(request: &IssuedRequest) -> GattEvent {
    match request {
        IssuedRequest::Read(attribute) => GattEvent::ReadComplete {
            attribute: *attribute,
            value: if *attribute == uuids::BATTERY_LEVEL {
                vec![87]
            } else {
                vec![0x03, 0x04]
            },
            status: 0,
        },
        IssuedRequest::SetNotify { attribute, .. } | IssuedRequest::SetIndicate { attribute, .. } => {
            GattEvent::DescriptorWriteComplete {
                attribute: *attribute,
                status: 0,
            }
        }
        IssuedRequest::Write { attribute, .. } => GattEvent::WriteComplete {
            attribute: *attribute,
            status: 0,
        },
        other => panic!("no completion for {other:?}"),
    }
}

fn is_attribute_request(request: &IssuedRequest) -> bool {
    matches!(
        request,
        IssuedRequest::Read(_)
            | IssuedRequest::Write { .. }
            | IssuedRequest::SetNotify { .. }
            | IssuedRequest::SetIndicate { .. }
    )
}

/// Complete queued operations one by one until no new request appears,
/// collecting every session event produced along the way.
fn complete_init(session: &mut GlucoseSession) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let mut completed = 0;
    loop {
        let pending: Vec<IssuedRequest> = session
            .transport()
            .issued()
            .iter()
            .filter(|request| is_attribute_request(request))
            .cloned()
            .collect();
        if completed >= pending.len() {
            break;
        }
        let request = pending[completed].clone();
        completed += 1;
        events.extend(session.handle_event(completion_for(&request)));
    }
    events
}

/// Connect and initialize against the given attribute table.
fn drive_to_ready(session: &mut GlucoseSession, attributes: AttributeTable) -> Vec<SessionEvent> {
    session.connect().expect("connect should be accepted");
    let mut events = session.handle_event(GattEvent::Connected);
    events.extend(session.handle_event(GattEvent::SettleTimerElapsed));
    events.extend(session.handle_event(discovered(attributes)));
    events.extend(complete_init(session));
    events
}

// ============================================================================
// Connection Establishment
// ============================================================================

#[test]
fn test_connect_issues_request_and_rejects_reentry() {
    let mut session = session();

    session.connect().unwrap();
    assert_eq!(session.state(), ConnectionState::Connecting);
    assert_eq!(session.transport().issued(), &[IssuedRequest::Connect]);

    assert_eq!(session.connect().unwrap_err(), SessionError::AlreadyConnected);
}

#[test]
fn test_discovery_waits_for_the_settle_timer() {
    let mut session = session();
    session.connect().unwrap();

    session.handle_event(GattEvent::Connected);
    assert_eq!(session.state(), ConnectionState::Connected);
    assert!(session
        .transport()
        .issued()
        .contains(&IssuedRequest::StartSettleTimer(Duration::from_millis(600))));
    // No discovery until the timer fires.
    assert!(!session
        .transport()
        .issued()
        .contains(&IssuedRequest::DiscoverAttributes));

    session.handle_event(GattEvent::SettleTimerElapsed);
    assert_eq!(session.state(), ConnectionState::Discovering);
    assert!(session
        .transport()
        .issued()
        .contains(&IssuedRequest::DiscoverAttributes));
}

#[test]
fn test_transport_refusal_is_surfaced_to_the_caller() {
    let mut session = session();
    session.transport_mut().refuse_requests(true);

    let err = session.connect().unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[test]
fn test_connection_failure_surfaces_the_transport_code() {
    let mut session = session();
    session.connect().unwrap();

    let events = session.handle_event(GattEvent::Disconnected { reason: 133 });

    assert!(events.contains(&SessionEvent::Error(SessionError::ConnectionError(133))));
    assert!(events.contains(&SessionEvent::Disconnected { reason: 133 }));
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

// ============================================================================
// Bonding
// ============================================================================

#[test]
fn test_discovery_deferred_until_bonding_completes() {
    let mut session = session();
    session.connect().unwrap();

    session.handle_event(GattEvent::BondStateChanged {
        state: BondState::Bonding,
    });
    session.handle_event(GattEvent::Connected);
    assert_eq!(session.state(), ConnectionState::Bonding);
    assert!(session.transport().issued().iter().all(|request| {
        !matches!(request, IssuedRequest::StartSettleTimer(_))
    }));

    // Bond completes: now the settle timer is armed and discovery runs.
    session.handle_event(GattEvent::BondStateChanged {
        state: BondState::Bonded,
    });
    assert_eq!(session.state(), ConnectionState::Connected);
    session.handle_event(GattEvent::SettleTimerElapsed);
    assert!(session
        .transport()
        .issued()
        .contains(&IssuedRequest::DiscoverAttributes));
}

#[test]
fn test_bonded_session_enables_service_changed_first() {
    let mut session = session();
    session.connect().unwrap();
    session.handle_event(GattEvent::BondStateChanged {
        state: BondState::Bonded,
    });
    session.handle_event(GattEvent::Connected);
    session.handle_event(GattEvent::SettleTimerElapsed);
    session.handle_event(discovered(glucose_attributes(false, true)));

    let first = session
        .transport()
        .issued()
        .iter()
        .find(|request| is_attribute_request(request))
        .cloned()
        .expect("an initialization operation should have been issued");
    assert_eq!(
        first,
        IssuedRequest::SetIndicate {
            attribute: uuids::SERVICE_CHANGED,
            enabled: true,
        }
    );
}

#[test]
fn test_unbonded_session_never_touches_service_changed() {
    let mut session = session();
    let events = drive_to_ready(&mut session, glucose_attributes(false, true));

    assert!(events.contains(&SessionEvent::Ready));
    assert!(session.transport().issued().iter().all(|request| {
        !matches!(request, IssuedRequest::SetIndicate { attribute, .. }
            if *attribute == uuids::SERVICE_CHANGED)
    }));
}

// ============================================================================
// Initialization Queue
// ============================================================================

#[test]
fn test_initialization_drains_fifo_and_fires_ready_once() {
    let mut session = session();
    session.connect().unwrap();
    session.handle_event(GattEvent::Connected);
    session.handle_event(GattEvent::SettleTimerElapsed);

    let events = session.handle_event(discovered(glucose_attributes(true, false)));
    assert!(!events.contains(&SessionEvent::Ready));

    let events = complete_init(&mut session);

    // Exactly one ready, and only after the last completion.
    let ready_count = events
        .iter()
        .filter(|event| matches!(event, SessionEvent::Ready))
        .count();
    assert_eq!(ready_count, 1);
    assert_eq!(events.last(), Some(&SessionEvent::Ready));
    assert_eq!(session.state(), ConnectionState::Ready);

    // The battery read surfaced its value on the way.
    assert!(events.contains(&SessionEvent::BatteryLevel(87)));

    // FIFO order: battery read, measurement notify, context notify,
    // control point indicate.
    let attribute_requests: Vec<IssuedRequest> = session
        .transport()
        .issued()
        .iter()
        .filter(|request| is_attribute_request(request))
        .cloned()
        .collect();
    assert_eq!(
        attribute_requests,
        vec![
            IssuedRequest::Read(uuids::BATTERY_LEVEL),
            IssuedRequest::SetNotify {
                attribute: uuids::GLUCOSE_MEASUREMENT,
                enabled: true,
            },
            IssuedRequest::SetNotify {
                attribute: uuids::GLUCOSE_MEASUREMENT_CONTEXT,
                enabled: true,
            },
            IssuedRequest::SetIndicate {
                attribute: uuids::RECORD_ACCESS_CONTROL_POINT,
                enabled: true,
            },
        ]
    );
}

#[test]
fn test_missing_mandatory_attribute_is_not_supported() {
    let mut session = session();
    session.connect().unwrap();
    session.handle_event(GattEvent::Connected);
    session.handle_event(GattEvent::SettleTimerElapsed);

    // Table without the control point: mandatory for glucose.
    let table = AttributeTable::from_attributes(vec![Attribute::new(
        uuids::GLUCOSE_MEASUREMENT,
        0x0010,
        CharacteristicProperties::new(PROP_NOTIFY),
    )]);
    let events = session.handle_event(discovered(table));

    assert!(events.iter().any(|event| matches!(
        event,
        SessionEvent::Error(SessionError::DeviceNotSupported { missing })
            if *missing == uuids::RECORD_ACCESS_CONTROL_POINT
    )));
    // The session tears the connection down itself.
    assert!(session
        .transport()
        .issued()
        .contains(&IssuedRequest::Disconnect));

    let events = session.handle_event(GattEvent::Disconnected { reason: 0 });
    assert!(events.contains(&SessionEvent::Disconnected { reason: 0 }));
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[test]
fn test_discovery_error_is_reported_without_retry() {
    let mut session = session();
    session.connect().unwrap();
    session.handle_event(GattEvent::Connected);
    session.handle_event(GattEvent::SettleTimerElapsed);

    let requests_before = session.transport().issued().len();
    let events = session.handle_event(GattEvent::AttributesDiscovered {
        status: 0x81,
        attributes: AttributeTable::new(),
    });

    assert_eq!(
        events,
        vec![SessionEvent::Error(SessionError::DiscoveryError(0x81))]
    );
    assert_eq!(session.transport().issued().len(), requests_before);
}

#[test]
fn test_failed_initialization_step_halts_the_queue() {
    let mut session = session();
    session.connect().unwrap();
    session.handle_event(GattEvent::Connected);
    session.handle_event(GattEvent::SettleTimerElapsed);
    session.handle_event(discovered(glucose_attributes(false, false)));

    let requests_before = session.transport().issued().len();
    let events = session.handle_event(GattEvent::DescriptorWriteComplete {
        attribute: uuids::GLUCOSE_MEASUREMENT,
        status: 0x80,
    });

    assert!(events.iter().any(|event| matches!(
        event,
        SessionEvent::Error(SessionError::OperationFailed { attribute, status: 0x80 })
            if *attribute == uuids::GLUCOSE_MEASUREMENT
    )));
    assert!(!events.contains(&SessionEvent::Ready));
    // Nothing further was issued: no automatic retry.
    assert_eq!(session.transport().issued().len(), requests_before);
}

#[test]
fn test_insufficient_authentication_on_bonded_link() {
    let mut session = session();
    session.connect().unwrap();
    session.handle_event(GattEvent::BondStateChanged {
        state: BondState::Bonded,
    });
    session.handle_event(GattEvent::Connected);
    session.handle_event(GattEvent::SettleTimerElapsed);
    session.handle_event(discovered(glucose_attributes(false, false)));

    // The peripheral rejects the first descriptor write: stale bond.
    let events = session.handle_event(GattEvent::DescriptorWriteComplete {
        attribute: uuids::SERVICE_CHANGED,
        status: 0x05,
    });

    assert!(events.contains(&SessionEvent::Error(SessionError::AuthenticationRequired)));
}

// ============================================================================
// Disconnection
// ============================================================================

#[test]
fn test_user_disconnect_releases_handles() {
    let mut session = session();
    drive_to_ready(&mut session, glucose_attributes(false, false));

    session.disconnect().unwrap();
    assert_eq!(session.state(), ConnectionState::Disconnecting);

    let events = session.handle_event(GattEvent::Disconnected { reason: 0 });
    assert_eq!(events, vec![SessionEvent::Disconnected { reason: 0 }]);
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.records().is_none());
}

#[test]
fn test_unexpected_drop_with_auto_reconnect_is_link_loss() {
    let mut session = session_with(SessionOptions {
        auto_reconnect: true,
        ..SessionOptions::default()
    });
    drive_to_ready(&mut session, glucose_attributes(false, false));

    let events = session.handle_event(GattEvent::Disconnected { reason: 8 });
    assert_eq!(events, vec![SessionEvent::LinkLoss]);
    assert_eq!(session.state(), ConnectionState::LinkLoss);
    // Handles survive for re-discovery.
    assert!(session.records().is_some());

    // The transport reconnects on its own; discovery re-runs and the
    // session becomes ready again.
    let mut events = session.handle_event(GattEvent::Connected);
    events.extend(session.handle_event(GattEvent::SettleTimerElapsed));
    events.extend(session.handle_event(discovered(glucose_attributes(false, false))));
    events.extend(complete_init(&mut session));
    assert!(events.contains(&SessionEvent::Ready));
}

#[test]
fn test_unexpected_drop_without_auto_reconnect_disconnects() {
    let mut session = session();
    drive_to_ready(&mut session, glucose_attributes(false, false));

    let events = session.handle_event(GattEvent::Disconnected { reason: 8 });
    assert_eq!(events, vec![SessionEvent::Disconnected { reason: 8 }]);
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.records().is_none());
}

#[test]
fn test_completions_after_disconnect_are_discarded() {
    let mut session = session();
    drive_to_ready(&mut session, glucose_attributes(false, false));
    session.disconnect().unwrap();
    session.handle_event(GattEvent::Disconnected { reason: 0 });

    // Stale completions and values arrive late; none may be applied.
    let events = session.handle_event(GattEvent::ReadComplete {
        attribute: uuids::BATTERY_LEVEL,
        value: vec![42],
        status: 0,
    });
    assert!(events.is_empty());

    let events = session.handle_event(GattEvent::ValueChanged {
        attribute: uuids::GLUCOSE_MEASUREMENT,
        value: vec![0x00, 1, 0, 0xE8, 0x07, 3, 1, 12, 30, 5],
    });
    assert!(events.is_empty());
}
