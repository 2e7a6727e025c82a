//! The per-connection session state machine.

use std::time::Duration;

use log::{debug, info, warn};
use uuid::Uuid;

use vitalink_gatt::{
    is_authentication_failure, uuids, AttributeTable, BondState, ConnectionState, GattEvent,
    Operation, Transport, STATUS_SUCCESS,
};
use vitalink_profiles::{Profile, ProfileValue};
use vitalink_racp::{RacpEngine, RecordStore};

use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::queue::{InitQueue, QueueProgress};

/// Session tuning knobs, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Delay between the link coming up and discovery starting. Bonded
    /// peripherals may invalidate their attribute cache right after
    /// connecting (signalled by Service Changed indications); starting
    /// discovery immediately races that invalidation.
    pub settle_delay: Duration,

    /// Whether an unexpected link drop is treated as a transient loss
    /// (the transport reconnects, handles are preserved) instead of a
    /// terminal disconnect.
    pub auto_reconnect: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            settle_delay: Duration::from_millis(600),
            auto_reconnect: false,
        }
    }
}

/// One peripheral connection.
///
/// The session owns its transport, its profile, and the record access
/// engine; it is constructed at connect time and dropped at disconnect.
/// All inbound traffic arrives through [`handle_event`](Session::handle_event),
/// which applies the event to the state machine and returns whatever
/// [`SessionEvent`]s it produced.
pub struct Session<T: Transport, P: Profile> {
    transport: T,
    profile: P,
    options: SessionOptions,
    state: ConnectionState,
    bond_state: BondState,
    /// Set when this side asked for the disconnect (user request or
    /// automatic teardown), so the eventual link-down event is not
    /// mistaken for a loss.
    planned_disconnect: bool,
    attributes: Option<AttributeTable>,
    queue: InitQueue,
    engine: Option<RacpEngine<P::Record>>,
}

impl<T: Transport, P: Profile> Session<T, P> {
    /// Create a session around a transport bound to one peripheral.
    pub fn new(transport: T, profile: P, options: SessionOptions) -> Self {
        Session {
            transport,
            profile,
            options,
            state: ConnectionState::Disconnected,
            bond_state: BondState::NotBonded,
            planned_disconnect: false,
            attributes: None,
            queue: InitQueue::new(),
            engine: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current bond state as last reported by the transport.
    pub fn bond_state(&self) -> BondState {
        self.bond_state
    }

    /// The active profile.
    pub fn profile(&self) -> &P {
        &self.profile
    }

    /// The owned transport adapter.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable transport access, e.g. for adapter-specific plumbing.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The attribute table from the most recent discovery. Preserved
    /// across a link loss, released on disconnect.
    pub fn attributes(&self) -> Option<&AttributeTable> {
        self.attributes.as_ref()
    }

    /// Records fetched so far, if a connection has been initialized.
    pub fn records(&self) -> Option<&RecordStore<P::Record>> {
        self.engine.as_ref().map(|engine| engine.store())
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Open the connection. Fails with
    /// [`SessionError::AlreadyConnected`] unless fully disconnected.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }
        info!("session: connecting");
        self.planned_disconnect = false;
        self.transport.connect()?;
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Close the connection at the user's request.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Disconnecting => Ok(()),
            _ => {
                info!("session: disconnecting on request");
                self.planned_disconnect = true;
                self.state = ConnectionState::Disconnecting;
                self.transport.disconnect()?;
                Ok(())
            }
        }
    }

    /// Fetch all stored records (incrementally, if some are already
    /// held).
    pub fn fetch_all(&mut self) -> Result<(), SessionError> {
        let (engine, transport) = self.ready_engine()?;
        engine.fetch_all(transport)?;
        Ok(())
    }

    /// Fetch records newer than the newest already held.
    pub fn refresh(&mut self) -> Result<(), SessionError> {
        let (engine, transport) = self.ready_engine()?;
        engine.refresh(transport)?;
        Ok(())
    }

    /// Fetch only the oldest stored record.
    pub fn fetch_first(&mut self) -> Result<(), SessionError> {
        let (engine, transport) = self.ready_engine()?;
        engine.fetch_first(transport)?;
        Ok(())
    }

    /// Fetch only the newest stored record.
    pub fn fetch_last(&mut self) -> Result<(), SessionError> {
        let (engine, transport) = self.ready_engine()?;
        engine.fetch_last(transport)?;
        Ok(())
    }

    /// Probe how many records the peripheral holds.
    pub fn report_count(&mut self) -> Result<(), SessionError> {
        let (engine, transport) = self.ready_engine()?;
        engine.report_count(transport)?;
        Ok(())
    }

    /// Delete all records from peripheral storage.
    pub fn delete_all(&mut self) -> Result<(), SessionError> {
        let (engine, transport) = self.ready_engine()?;
        engine.delete_all(transport)?;
        Ok(())
    }

    /// Ask the peripheral to abort the fetch in progress.
    pub fn abort(&mut self) -> Result<(), SessionError> {
        let (engine, transport) = self.ready_engine()?;
        engine.abort(transport)?;
        Ok(())
    }

    fn ready_engine(&mut self) -> Result<(&mut RacpEngine<P::Record>, &mut T), SessionError> {
        if self.state != ConnectionState::Ready {
            return Err(SessionError::NotReady);
        }
        let engine = self.engine.as_mut().ok_or(SessionError::NotReady)?;
        Ok((engine, &mut self.transport))
    }

    // ========================================================================
    // Event Handling
    // ========================================================================

    /// Apply one transport event and return the session events it
    /// produced.
    pub fn handle_event(&mut self, event: GattEvent) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        match event {
            GattEvent::Connected => self.on_connected(&mut out),
            GattEvent::Disconnected { reason } => self.on_disconnected(reason, &mut out),
            GattEvent::SettleTimerElapsed => self.on_settle_elapsed(&mut out),
            GattEvent::BondStateChanged { state } => self.on_bond_changed(state, &mut out),
            GattEvent::AttributesDiscovered { status, attributes } => {
                self.on_discovered(status, attributes, &mut out)
            }
            GattEvent::ReadComplete {
                attribute,
                value,
                status,
            } => self.on_read_complete(attribute, value, status, &mut out),
            GattEvent::WriteComplete { attribute, status } => {
                self.on_write_complete(attribute, status, &mut out)
            }
            GattEvent::DescriptorWriteComplete { attribute, status } => {
                self.on_descriptor_write_complete(attribute, status, &mut out)
            }
            GattEvent::ValueChanged { attribute, value } => {
                self.on_value_changed(attribute, value, &mut out)
            }
        }
        out
    }

    fn on_connected(&mut self, out: &mut Vec<SessionEvent>) {
        match self.state {
            ConnectionState::Connecting | ConnectionState::LinkLoss => {
                debug!("session: link up");
                if self.bond_state == BondState::Bonding {
                    // Discovery would race the pairing dialog; wait for
                    // the bond to settle first.
                    self.state = ConnectionState::Bonding;
                    return;
                }
                self.state = ConnectionState::Connected;
                self.arm_settle_timer(out);
            }
            other => warn!("session: link up while {other:?}, ignoring"),
        }
    }

    fn arm_settle_timer(&mut self, out: &mut Vec<SessionEvent>) {
        if let Err(err) = self.transport.start_settle_timer(self.options.settle_delay) {
            out.push(SessionEvent::Error(err.into()));
        }
    }

    fn on_settle_elapsed(&mut self, out: &mut Vec<SessionEvent>) {
        if self.state != ConnectionState::Connected {
            debug!("session: settle timer while {:?}, ignoring", self.state);
            return;
        }
        debug!("session: starting attribute discovery");
        self.state = ConnectionState::Discovering;
        if let Err(err) = self.transport.discover_attributes() {
            out.push(SessionEvent::Error(err.into()));
        }
    }

    fn on_bond_changed(&mut self, new_state: BondState, out: &mut Vec<SessionEvent>) {
        debug!("session: bond state {:?} -> {new_state:?}", self.bond_state);
        let previous = self.bond_state;
        self.bond_state = new_state;

        match (self.state, new_state) {
            (ConnectionState::Connected, BondState::Bonding) => {
                self.state = ConnectionState::Bonding;
            }
            (ConnectionState::Bonding, BondState::Bonded) => {
                self.state = ConnectionState::Connected;
                self.arm_settle_timer(out);
            }
            (ConnectionState::Bonding, BondState::NotBonded) => {
                // Pairing fell through. Try discovery anyway: the
                // peripheral may serve unauthenticated reads, and a
                // protected attribute will surface the failure cleanly.
                warn!("session: pairing failed (was {previous:?})");
                self.state = ConnectionState::Connected;
                self.arm_settle_timer(out);
            }
            _ => {}
        }
    }

    fn on_discovered(
        &mut self,
        status: u8,
        attributes: AttributeTable,
        out: &mut Vec<SessionEvent>,
    ) {
        if self.state != ConnectionState::Discovering {
            warn!(
                "session: discovery result while {:?}, discarding",
                self.state
            );
            return;
        }

        if status != STATUS_SUCCESS {
            out.push(SessionEvent::Error(SessionError::DiscoveryError(status)));
            return;
        }

        for uuid in self.profile.mandatory_attributes() {
            if !attributes.contains(uuid) {
                warn!("session: mandatory attribute {uuid} missing, disconnecting");
                out.push(SessionEvent::Error(SessionError::DeviceNotSupported {
                    missing: *uuid,
                }));
                self.teardown(out);
                return;
            }
        }
        for uuid in self.profile.optional_attributes() {
            if attributes.contains(uuid) {
                debug!("session: optional attribute {uuid} present");
            } else {
                debug!("session: optional attribute {uuid} absent");
            }
        }

        let control_point_uuid = self.profile.control_point();
        let Some(control_point) = attributes.find(&control_point_uuid).cloned() else {
            out.push(SessionEvent::Error(SessionError::DeviceNotSupported {
                missing: control_point_uuid,
            }));
            self.teardown(out);
            return;
        };

        self.build_init_queue(&attributes);

        match &mut self.engine {
            // Reconnection after link loss: keep the fetched records,
            // rebind to the freshly discovered control point.
            Some(engine) => engine.rebind(control_point),
            None => self.engine = Some(RacpEngine::new(control_point)),
        }
        self.attributes = Some(attributes);

        info!(
            "session: discovery complete, {} initialization step(s)",
            self.queue.len()
        );
        self.state = ConnectionState::Initializing;
        match self.queue.start(&mut self.transport) {
            Ok(QueueProgress::Issued) => {}
            Ok(QueueProgress::Done) => self.finish_initialization(out),
            Err(err) => out.push(SessionEvent::Error(err.into())),
        }
    }

    /// Assemble the initialization queue for the discovered attributes.
    /// Absent optional attributes are never enqueued.
    fn build_init_queue(&mut self, attributes: &AttributeTable) {
        self.queue.clear();

        // A bonded peripheral that moved its attributes around tells us
        // through Service Changed indications.
        if self.bond_state == BondState::Bonded {
            if let Some(service_changed) = attributes.find(&uuids::SERVICE_CHANGED) {
                self.queue
                    .enqueue(Operation::EnableIndicate(service_changed.clone()));
            }
        }

        if let Some(battery) = attributes.find(&uuids::BATTERY_LEVEL) {
            if battery.properties.can_read() {
                self.queue.enqueue(Operation::Read(battery.clone()));
            } else if battery.properties.can_notify() {
                self.queue.enqueue(Operation::EnableNotify(battery.clone()));
            }
        }

        for operation in self.profile.init_operations(attributes) {
            self.queue.enqueue(operation);
        }
    }

    fn finish_initialization(&mut self, out: &mut Vec<SessionEvent>) {
        info!("session: {} profile ready", self.profile.name());
        self.state = ConnectionState::Ready;
        out.push(SessionEvent::Ready);
    }

    fn advance_queue(&mut self, out: &mut Vec<SessionEvent>) {
        match self.queue.on_operation_complete(&mut self.transport) {
            Ok(QueueProgress::Issued) => {}
            Ok(QueueProgress::Done) => self.finish_initialization(out),
            Err(err) => out.push(SessionEvent::Error(err.into())),
        }
    }

    /// Map a failed initialization step to its session error. A bonded
    /// link rejecting authentication means the stored bond is stale, not
    /// that the protocol failed.
    fn fail_operation(&mut self, attribute: Uuid, status: u8, out: &mut Vec<SessionEvent>) {
        let error = if self.bond_state == BondState::Bonded && is_authentication_failure(status) {
            SessionError::AuthenticationRequired
        } else {
            SessionError::OperationFailed { attribute, status }
        };
        warn!("session: operation on {attribute} failed with status {status}");
        out.push(SessionEvent::Error(error));
    }

    fn on_read_complete(
        &mut self,
        attribute: Uuid,
        value: Vec<u8>,
        status: u8,
        out: &mut Vec<SessionEvent>,
    ) {
        if self.state != ConnectionState::Initializing {
            debug!(
                "session: read completion for {attribute} while {:?}, discarding",
                self.state
            );
            return;
        }

        if status != STATUS_SUCCESS {
            self.fail_operation(attribute, status, out);
            return;
        }

        if attribute == uuids::BATTERY_LEVEL {
            if let Some(&level) = value.first() {
                debug!("session: battery level {level}%");
                out.push(SessionEvent::BatteryLevel(level));
            }
        } else if let Err(err) = self.profile.handle_read(&attribute, &value) {
            warn!("session: unparseable read from {attribute}: {err}");
        }

        self.advance_queue(out);
    }

    fn on_write_complete(&mut self, attribute: Uuid, status: u8, out: &mut Vec<SessionEvent>) {
        match self.state {
            ConnectionState::Initializing => {
                if status != STATUS_SUCCESS {
                    self.fail_operation(attribute, status, out);
                } else {
                    self.advance_queue(out);
                }
            }
            ConnectionState::Ready => {
                // Control-point command writes complete here; a failure
                // ends the conversation the command was starting.
                if status != STATUS_SUCCESS {
                    if let Some(engine) = self.engine.as_mut() {
                        engine.reset();
                    }
                    self.fail_operation(attribute, status, out);
                }
            }
            other => debug!("session: write completion while {other:?}, discarding"),
        }
    }

    fn on_descriptor_write_complete(
        &mut self,
        attribute: Uuid,
        status: u8,
        out: &mut Vec<SessionEvent>,
    ) {
        if self.state != ConnectionState::Initializing {
            debug!(
                "session: descriptor write for {attribute} while {:?}, discarding",
                self.state
            );
            return;
        }

        if status != STATUS_SUCCESS {
            self.fail_operation(attribute, status, out);
        } else {
            self.advance_queue(out);
        }
    }

    fn on_value_changed(&mut self, attribute: Uuid, value: Vec<u8>, out: &mut Vec<SessionEvent>) {
        if !matches!(
            self.state,
            ConnectionState::Initializing | ConnectionState::Ready
        ) {
            debug!(
                "session: value from {attribute} while {:?}, discarding",
                self.state
            );
            return;
        }

        if attribute == uuids::BATTERY_LEVEL {
            if let Some(&level) = value.first() {
                out.push(SessionEvent::BatteryLevel(level));
            }
            return;
        }

        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        if attribute == self.profile.control_point() {
            match engine.handle_control_point(&mut self.transport, &value) {
                Ok(Some(outcome)) => out.push(SessionEvent::FetchFinished(outcome)),
                Ok(None) => {}
                Err(err) => {
                    warn!("session: control point response failed to decode: {err}");
                    out.push(SessionEvent::Error(err.into()));
                }
            }
            return;
        }

        match self.profile.handle_value(&attribute, &value, engine.store_mut()) {
            Ok(ProfileValue::Stored { count }) => {
                engine.note_records(count);
                out.push(SessionEvent::RecordsStored { count });
            }
            Ok(ProfileValue::Merged { .. }) => {}
            Ok(ProfileValue::Ignored) => {
                debug!("session: value from {attribute} ignored");
            }
            // A payload we cannot decode is logged and dropped; the
            // peripheral may be newer than this profile.
            Err(err) => warn!("session: undecodable value from {attribute}: {err}"),
        }
    }

    fn on_disconnected(&mut self, reason: u8, out: &mut Vec<SessionEvent>) {
        let was_establishing = self.state == ConnectionState::Connecting;
        let was_established = matches!(
            self.state,
            ConnectionState::Connected
                | ConnectionState::Discovering
                | ConnectionState::Bonding
                | ConnectionState::Initializing
                | ConnectionState::Ready
        );

        // Whatever was pending is invalid from here on; completions that
        // still arrive are discarded by the state checks above.
        self.queue.clear();
        if let Some(engine) = self.engine.as_mut() {
            engine.reset();
        }

        if self.planned_disconnect || self.state == ConnectionState::Disconnecting {
            info!("session: disconnected");
            self.planned_disconnect = false;
            self.release_handles();
            self.state = ConnectionState::Disconnected;
            out.push(SessionEvent::Disconnected { reason });
        } else if was_established && self.options.auto_reconnect {
            warn!("session: link lost (status {reason}), awaiting reconnection");
            self.state = ConnectionState::LinkLoss;
            out.push(SessionEvent::LinkLoss);
        } else {
            if was_establishing {
                out.push(SessionEvent::Error(SessionError::ConnectionError(reason)));
            } else {
                warn!("session: connection ended (status {reason})");
            }
            self.release_handles();
            self.state = ConnectionState::Disconnected;
            out.push(SessionEvent::Disconnected { reason });
        }
    }

    /// Disconnect initiated by the session itself (unsupported device,
    /// unrecoverable failure).
    fn teardown(&mut self, out: &mut Vec<SessionEvent>) {
        self.planned_disconnect = true;
        self.state = ConnectionState::Disconnecting;
        if let Err(err) = self.transport.disconnect() {
            out.push(SessionEvent::Error(err.into()));
        }
    }

    fn release_handles(&mut self) {
        self.attributes = None;
        self.engine = None;
    }
}
