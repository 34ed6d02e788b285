//! Device binding engine
//!
//! Owns the active device profile and its MIDI ports:
//!
//! - **Activation**: pair an input port with an output port by name, load
//!   the stored profile, replay its initial output messages, subscribe to
//!   inbound messages.
//! - **Inbound flow**: the transport callback only enqueues 3-byte messages.
//!   [`Engine::process_pending`] drains the queue on the owning thread, where
//!   recording, telemetry and dispatch run.
//! - **Deactivation**: close both ports and drop the queue. Saving is the
//!   caller's decision.

pub mod dispatch;
pub mod ports;
pub mod telemetry;


use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::actions::Actions;
use crate::error::{Error, Result};
use crate::midi::{format_hex, to_raw_message, MessageKind, RawMessage};
use crate::profile::DeviceProfile;
use crate::store::ProfileStore;
use crate::transport::{InboundHandler, InputConnection, MidiBackend, OutputConnection};

pub use dispatch::DispatchOutcome;
pub use ports::{available_devices, find_port_pair, sanitize_port_name};
pub use telemetry::{MessageLog, INCOMING_MESSAGES_CAPACITY};

/// Inbound messages buffered between the transport thread and the engine
pub const INBOUND_QUEUE_CAPACITY: usize = 1024;

/// Lifecycle of the engine's device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Inactive,
    Activating,
    Active,
    Deactivating,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Inactive => write!(f, "inactive"),
            DeviceState::Activating => write!(f, "activating"),
            DeviceState::Active => write!(f, "active"),
            DeviceState::Deactivating => write!(f, "deactivating"),
        }
    }
}

/// Shared slot holding the open output port.
///
/// Clones can send from any thread; sends and port close are serialized by
/// the slot's mutex.
#[derive(Clone, Default)]
pub struct OutputHandle {
    slot: Arc<Mutex<Option<Box<dyn OutputConnection>>>>,
}

impl OutputHandle {
    /// Send on the open output port, `NotActive` if none is open.
    pub fn send(&self, message: &RawMessage) -> Result<()> {
        let mut slot = self.slot.lock();
        let connection = slot.as_mut().ok_or(Error::NotActive)?;
        connection.send(message)
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }

    fn open(&self, connection: Box<dyn OutputConnection>) {
        if let Some(previous) = self.slot.lock().replace(connection) {
            previous.close();
        }
    }

    fn close(&self) {
        if let Some(connection) = self.slot.lock().take() {
            connection.close();
        }
    }
}

/// Everything that exists only while a device is active
struct Session {
    profile: DeviceProfile,
    input: Box<dyn InputConnection>,
    inbound: Receiver<RawMessage>,
}

/// Binds one MIDI device at a time to host actions
pub struct Engine {
    backend: Box<dyn MidiBackend>,
    store: ProfileStore,
    actions: Actions,
    output: OutputHandle,
    session: Option<Session>,
    state: DeviceState,
    incoming: MessageLog,
}

impl Engine {
    pub fn new(backend: Box<dyn MidiBackend>, store: ProfileStore, actions: Actions) -> Self {
        debug!("Engine created with {:?}", actions);
        Self {
            backend,
            store,
            actions,
            output: OutputHandle::default(),
            session: None,
            state: DeviceState::Inactive,
            incoming: MessageLog::default(),
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Sanitized, de-duplicated input device names in port order
    pub fn list_available_devices(&self) -> Result<Vec<String>> {
        let inputs = self.backend.input_port_names()?;
        Ok(available_devices(&inputs))
    }

    /// Pair ports for `device_name`, load its profile and start listening.
    ///
    /// An already active device is deactivated first (without saving).
    /// Returns `NotFound` if no input/output pair matches; no port is left
    /// open on any failure.
    pub fn activate(&mut self, device_name: &str) -> Result<()> {
        if self.session.is_some() {
            self.deactivate();
        }

        self.state = DeviceState::Activating;
        info!("Activating '{}'", device_name);

        match self.open_session(device_name) {
            Ok(session) => {
                info!(
                    "✅ '{}' active on input port {} / output port {} ({} bindings)",
                    session.profile.name,
                    session.profile.input_port(),
                    session.profile.output_port(),
                    session.profile.bindings.len()
                );
                self.incoming.clear();
                self.session = Some(session);
                self.state = DeviceState::Active;
                Ok(())
            }
            Err(e) => {
                self.state = DeviceState::Inactive;
                warn!("Failed to activate '{}': {}", device_name, e);
                Err(e)
            }
        }
    }

    /// Activate the first connected device that has a stored profile.
    ///
    /// Devices are tried in port order; one that fails to activate is
    /// skipped. Returns the activated device name, or `NoStoredProfile`
    /// when no stored device could be activated.
    pub fn activate_stored(&mut self) -> Result<String> {
        let candidates: Vec<String> = self
            .list_available_devices()?
            .into_iter()
            .filter(|device| self.store.has(device))
            .collect();
        debug!("Devices with stored profiles: {:?}", candidates);

        for device in candidates {
            match self.activate(&device) {
                Ok(()) => return Ok(device),
                Err(e) => warn!("Skipping '{}': {}", device, e),
            }
        }
        Err(Error::NoStoredProfile)
    }

    fn open_session(&mut self, device_name: &str) -> Result<Session> {
        let inputs = self.backend.input_port_names()?;
        let outputs = self.backend.output_port_names()?;
        let (input_port, output_port) = find_port_pair(&inputs, &outputs, device_name)
            .ok_or_else(|| Error::NotFound {
                device: device_name.to_string(),
            })?;
        debug!(
            "Paired '{}' with input '{}' and output '{}'",
            device_name, inputs[input_port], outputs[output_port]
        );

        self.output.open(self.backend.open_output(output_port)?);

        let mut profile = DeviceProfile::new(device_name, input_port, output_port);
        if let Err(e) = self.store.load(&mut profile) {
            self.output.close();
            return Err(e);
        }

        for message in &profile.initial_output_messages {
            if let Err(e) = self.output.send(message) {
                warn!(
                    "Failed to send initial message {} to '{}': {}",
                    format_hex(message),
                    device_name,
                    e
                );
            }
        }

        let (sender, inbound) = channel::bounded(INBOUND_QUEUE_CAPACITY);
        let input = match self
            .backend
            .open_input(input_port, inbound_handler(sender, device_name.to_string()))
        {
            Ok(input) => input,
            Err(e) => {
                self.output.close();
                return Err(e);
            }
        };

        Ok(Session {
            profile,
            input,
            inbound,
        })
    }

    /// Close the active device's ports. Queued, undispatched messages are
    /// discarded. Does not save the profile.
    pub fn deactivate(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        self.state = DeviceState::Deactivating;
        let Session {
            profile,
            input,
            inbound,
        } = session;

        input.close();
        self.output.close();
        let discarded = inbound.try_iter().count();
        if discarded > 0 {
            debug!("Discarded {} queued messages from '{}'", discarded, profile.name);
        }

        self.incoming.clear();
        self.state = DeviceState::Inactive;
        info!("'{}' deactivated", profile.name);
    }

    pub fn active_profile(&self) -> Result<&DeviceProfile> {
        self.session
            .as_ref()
            .map(|s| &s.profile)
            .ok_or(Error::NotActive)
    }

    /// Bindings and initial messages are edited directly through this.
    pub fn active_profile_mut(&mut self) -> Result<&mut DeviceProfile> {
        self.session
            .as_mut()
            .map(|s| &mut s.profile)
            .ok_or(Error::NotActive)
    }

    /// Persist the active profile.
    pub fn save_active_profile(&self) -> Result<()> {
        self.store.save(self.active_profile()?)
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.store.has(name)
    }

    pub fn remove_profile(&self, name: &str) -> Result<()> {
        self.store.remove(&DeviceProfile::detached(name))
    }

    pub fn send_output(&self, message: &RawMessage) -> Result<()> {
        self.output.send(message)
    }

    /// A clone of the output slot for sending from other threads
    pub fn output_handle(&self) -> OutputHandle {
        self.output.clone()
    }

    /// Recent inbound messages, most recent first
    pub fn incoming_messages(&self) -> impl Iterator<Item = &RawMessage> {
        self.incoming.iter()
    }

    /// Drain queued inbound messages and handle each one.
    ///
    /// Returns the number of messages handled.
    pub fn process_pending(&mut self) -> usize {
        self.process_pending_with(|_, _| {})
    }

    /// Like [`Engine::process_pending`], also passing every drained message
    /// and its outcome to `observer`, oldest first.
    pub fn process_pending_with<F>(&mut self, mut observer: F) -> usize
    where
        F: FnMut(&RawMessage, DispatchOutcome),
    {
        let pending: Vec<RawMessage> = match &self.session {
            Some(session) => session.inbound.try_iter().collect(),
            None => return 0,
        };

        for message in &pending {
            match self.handle_message(*message) {
                Ok(outcome) => observer(message, outcome),
                Err(e) => warn!("Dropped {}: {}", format_hex(message), e),
            }
        }
        pending.len()
    }

    /// Route one inbound message: recording capture, telemetry, dispatch.
    pub fn handle_message(&mut self, message: RawMessage) -> Result<DispatchOutcome> {
        let session = self.session.as_mut().ok_or(Error::NotActive)?;

        let recorded = dispatch::record(&mut session.profile, &message);
        self.incoming.push(message);
        if recorded {
            return Ok(DispatchOutcome::Recorded);
        }

        let outcome = dispatch::dispatch(&mut session.profile.bindings, &self.actions, &message);
        if outcome.is_success() {
            debug!("{} → {:?}", MessageKind::of(&message), outcome);
        }
        Ok(outcome)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Transport callback: keep 3-byte messages and hand them to the engine.
fn inbound_handler(sender: Sender<RawMessage>, device: String) -> InboundHandler {
    Box::new(move |data: &[u8]| {
        let Some(message) = to_raw_message(data) else {
            trace!("Ignoring {}-byte message from '{}'", data.len(), device);
            return;
        };

        match sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Inbound queue for '{}' full, dropping {}", device, format_hex(data));
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    })
}
