//! MIDI transport abstraction
//!
//! The engine talks to ports through [`MidiBackend`] so tests can swap the
//! hardware for an in-memory fake. [`MidirBackend`] is the real thing.

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::midi::format_hex;

/// Receives raw inbound bytes on the backend's I/O thread
pub type InboundHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// An open input port delivering messages to its handler
pub trait InputConnection: Send {
    /// Stop delivering messages and release the port.
    fn close(self: Box<Self>);
}

/// An open output port
pub trait OutputConnection: Send {
    fn send(&mut self, message: &[u8]) -> Result<()>;

    fn close(self: Box<Self>);
}

/// Port enumeration and connection
pub trait MidiBackend: Send {
    /// Input port names, indexed by port number
    fn input_port_names(&self) -> Result<Vec<String>>;

    /// Output port names, indexed by port number
    fn output_port_names(&self) -> Result<Vec<String>>;

    fn open_input(&mut self, index: usize, handler: InboundHandler)
        -> Result<Box<dyn InputConnection>>;

    fn open_output(&mut self, index: usize) -> Result<Box<dyn OutputConnection>>;
}

/// [`MidiBackend`] over the system MIDI API via `midir`
pub struct MidirBackend {
    client_name: String,
}

impl MidirBackend {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn input(&self) -> Result<MidiInput> {
        Ok(MidiInput::new(&format!("{}-Input", self.client_name))?)
    }

    fn output(&self) -> Result<MidiOutput> {
        Ok(MidiOutput::new(&format!("{}-Output", self.client_name))?)
    }
}

impl Default for MidirBackend {
    fn default() -> Self {
        Self::new("MIDI-Binder")
    }
}

/// A port whose name cannot be read keeps its index with an empty name.
fn port_names<T: midir::MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .enumerate()
        .map(|(index, port)| {
            io.port_name(port).unwrap_or_else(|e| {
                warn!("Cannot read name of MIDI port {}: {}", index, e);
                String::new()
            })
        })
        .collect()
}

impl MidiBackend for MidirBackend {
    fn input_port_names(&self) -> Result<Vec<String>> {
        Ok(port_names(&self.input()?))
    }

    fn output_port_names(&self) -> Result<Vec<String>> {
        Ok(port_names(&self.output()?))
    }

    fn open_input(
        &mut self,
        index: usize,
        mut handler: InboundHandler,
    ) -> Result<Box<dyn InputConnection>> {
        let midi_in = self.input()?;
        let port = midi_in
            .ports()
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::Transport(format!("input port {} disappeared", index)))?;

        let connection = midi_in.connect(
            &port,
            &format!("{}-in-{}", self.client_name, index),
            move |_timestamp, data, _| handler(data),
            (),
        )?;

        debug!("Opened MIDI input port {}", index);
        Ok(Box::new(MidirInput(connection)))
    }

    fn open_output(&mut self, index: usize) -> Result<Box<dyn OutputConnection>> {
        let midi_out = self.output()?;
        let port = midi_out
            .ports()
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::Transport(format!("output port {} disappeared", index)))?;

        let connection = midi_out.connect(&port, &format!("{}-out-{}", self.client_name, index))?;

        debug!("Opened MIDI output port {}", index);
        Ok(Box::new(MidirOutput(connection)))
    }
}

struct MidirInput(MidiInputConnection<()>);

// Some midir backends hold raw OS handles that are not marked Send. The
// connections are only ever touched by the thread that owns the engine or
// through the output slot's mutex.
unsafe impl Send for MidirInput {}

impl InputConnection for MidirInput {
    fn close(self: Box<Self>) {
        let _ = self.0.close();
    }
}

struct MidirOutput(MidiOutputConnection);

unsafe impl Send for MidirOutput {}

impl OutputConnection for MidirOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.0.send(message)?;
        debug!("Sent: {}", format_hex(message));
        Ok(())
    }

    fn close(self: Box<Self>) {
        let _ = self.0.close();
    }
}
