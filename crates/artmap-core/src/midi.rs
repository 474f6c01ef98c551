//! Live MIDI input for the label transport (feature `midi`).

use crate::error::{Error, Result};
use crate::transport::{LabelStream, TransportSettings};
use crossbeam_channel::Receiver;
use midir::{MidiInput, MidiInputConnection};

/// An open MIDI input port decoding labels.
///
/// Labels arrive on the receiver returned by [`LabelListener::open`]. The
/// connection closes when the listener is dropped.
pub struct LabelListener {
    port_name: String,
    _connection: MidiInputConnection<()>,
}

/// Names of the available MIDI input ports.
pub fn list_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new("artmap-ports").map_err(|e| Error::Midi(format!("Failed to create MIDI input: {}", e)))?;
    Ok(midi_in
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| midi_in.port_name(port).unwrap_or_else(|_| format!("Unknown Device {}", i)))
        .collect())
}

impl LabelListener {
    /// Connect to the first port whose name contains `name` (case-insensitive),
    /// or the first port at all when `name` is `None`.
    pub fn open(name: Option<&str>, settings: TransportSettings) -> Result<(Self, Receiver<String>)> {
        let midi_in = MidiInput::new("artmap").map_err(|e| Error::Midi(format!("Failed to create MIDI input: {}", e)))?;

        let wanted = name.map(str::to_lowercase);
        let ports = midi_in.ports();
        let port = ports
            .iter()
            .find(|p| match (&wanted, midi_in.port_name(p)) {
                (None, _) => true,
                (Some(w), Ok(n)) => n.to_lowercase().contains(w),
                (Some(_), Err(_)) => false,
            })
            .ok_or_else(|| Error::Midi(format!("No MIDI input found matching '{}'", name.unwrap_or("*"))))?;

        let port_name = midi_in
            .port_name(port)
            .map_err(|e| Error::Midi(format!("Failed to read port name: {}", e)))?;

        let (mut stream, rx) = LabelStream::new(settings);
        let connection = midi_in
            .connect(
                port,
                "artmap-labels",
                move |_timestamp, bytes, _| {
                    stream.push_bytes(bytes);
                },
                (),
            )
            .map_err(|e| Error::Midi(format!("Failed to connect to MIDI device: {}", e)))?;

        log::info!("Listening for labels on {}", port_name);

        Ok((
            Self {
                port_name,
                _connection: connection,
            },
            rx,
        ))
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}
