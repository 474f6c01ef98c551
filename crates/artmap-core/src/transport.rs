//! Serial label transport over MIDI control changes.
//!
//! A track name is sent as a frame of control-change messages on one
//! channel:
//!
//! - start: controller 119, value = label length (clamped to 127)
//! - character: controller 118, one per character, value = code point & 0x7F
//! - end: controller 117, value 127
//!
//! Lengths and truncation count Unicode scalar values (`char`), so a
//! character outside the Basic Multilingual Plane is one message, not two
//! UTF-16 halves. Non-ASCII characters lose their high bits.
//!
//! The receiver delivers a label only when the end message arrives; a new
//! start discards whatever was being accumulated.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Channel and controller assignments (`[transport]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// MIDI channel, 0-based (15 = channel 16)
    pub channel: u8,
    pub start_controller: u8,
    pub character_controller: u8,
    pub end_controller: u8,
    /// Value carried by the end message
    pub end_value: u8,
    /// Labels are cut to this many characters before sending
    pub max_label_chars: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            channel: 15,
            start_controller: 119,
            character_controller: 118,
            end_controller: 117,
            end_value: 127,
            max_label_chars: 64,
        }
    }
}

impl TransportSettings {
    /// Which part of a frame `msg` is, if it belongs to this transport at all.
    pub fn classify(&self, msg: &ControlMessage) -> Option<ControlKind> {
        if msg.channel != self.channel {
            return None;
        }
        match msg.controller {
            c if c == self.start_controller => Some(ControlKind::Start),
            c if c == self.character_controller => Some(ControlKind::Character),
            c if c == self.end_controller => Some(ControlKind::End),
            _ => None,
        }
    }

    fn message(&self, controller: u8, value: u8) -> ControlMessage {
        ControlMessage {
            channel: self.channel,
            controller,
            value: value & 0x7F,
        }
    }
}

/// Role of a message within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Start,
    Character,
    End,
}

/// A MIDI control change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMessage {
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl ControlMessage {
    /// Convert to raw MIDI bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        [0xB0 | (self.channel & 0x0F), self.controller & 0x7F, self.value & 0x7F]
    }

    /// Parse raw MIDI bytes. Anything but a control change yields `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [status, controller, value, ..] if status & 0xF0 == 0xB0 => Some(Self {
                channel: status & 0x0F,
                controller: *controller,
                value: *value,
            }),
            _ => None,
        }
    }
}

/// Build the full frame for `label`, ignoring send history.
pub fn encode_frame(label: &str, settings: &TransportSettings) -> Vec<ControlMessage> {
    let chars: Vec<char> = label.chars().take(settings.max_label_chars).collect();

    let mut frame = Vec::with_capacity(chars.len() + 2);
    frame.push(settings.message(settings.start_controller, chars.len().min(127) as u8));
    for c in chars {
        frame.push(settings.message(settings.character_controller, (c as u32 & 0x7F) as u8));
    }
    frame.push(settings.message(settings.end_controller, settings.end_value));
    frame
}

/// Sender side. Remembers the last label so repeats are not re-sent.
///
/// Each surface connection owns its own encoder.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    settings: TransportSettings,
    last_sent: Option<String>,
}

impl LabelEncoder {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            settings,
            last_sent: None,
        }
    }

    /// Frame for `label`, or an empty vec when it is empty or was just sent.
    pub fn encode(&mut self, label: &str) -> Vec<ControlMessage> {
        if label.is_empty() || self.last_sent.as_deref() == Some(label) {
            return Vec::new();
        }
        self.last_sent = Some(label.to_string());
        encode_frame(label, &self.settings)
    }

    pub fn last_sent(&self) -> Option<&str> {
        self.last_sent.as_deref()
    }

    /// Forget the last label, e.g. after the receiver reconnects.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

/// Decoder state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DecoderState {
    #[default]
    Idle,
    Accumulating { expected: usize, label: String },
}

/// Receiver side: rebuilds labels from a single ordered message stream.
#[derive(Debug, Clone, Default)]
pub struct LabelDecoder {
    settings: TransportSettings,
    state: DecoderState,
}

impl LabelDecoder {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            settings,
            state: DecoderState::Idle,
        }
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    /// Feed one message; returns a label when a frame completes.
    pub fn push(&mut self, msg: &ControlMessage) -> Option<String> {
        let kind = self.settings.classify(msg)?;

        match kind {
            ControlKind::Start => {
                if let DecoderState::Accumulating { label, .. } = &self.state {
                    log::debug!("Discarding partial label {:?}", label);
                }
                self.state = DecoderState::Accumulating {
                    expected: msg.value as usize,
                    label: String::with_capacity(msg.value as usize),
                };
                None
            }
            ControlKind::Character => {
                match &mut self.state {
                    DecoderState::Accumulating { label, .. } if label.len() < 127 => {
                        label.push(char::from(msg.value & 0x7F));
                    }
                    DecoderState::Accumulating { .. } => {}
                    DecoderState::Idle => log::debug!("Dropping character {} outside a frame", msg.value),
                }
                None
            }
            ControlKind::End => {
                if msg.value != self.settings.end_value {
                    log::debug!("Dropping end message with value {}", msg.value);
                    return None;
                }
                match std::mem::take(&mut self.state) {
                    DecoderState::Accumulating { expected, label } => {
                        if label.chars().count() != expected {
                            log::debug!(
                                "Label {:?} has {} characters, start announced {}",
                                label,
                                label.chars().count(),
                                expected
                            );
                        }
                        Some(label)
                    }
                    DecoderState::Idle => {
                        log::debug!("Dropping end message outside a frame");
                        None
                    }
                }
            }
        }
    }

    /// Feed raw MIDI bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Option<String> {
        ControlMessage::from_bytes(bytes).and_then(|msg| self.push(&msg))
    }
}

/// A decoder that publishes completed labels on a channel.
///
/// The stream half lives wherever raw MIDI arrives (typically a driver
/// callback); the receiver half is read by the matcher loop.
pub struct LabelStream {
    decoder: LabelDecoder,
    tx: Sender<String>,
}

impl LabelStream {
    pub fn new(settings: TransportSettings) -> (Self, Receiver<String>) {
        let (tx, rx) = unbounded();
        (
            Self {
                decoder: LabelDecoder::new(settings),
                tx,
            },
            rx,
        )
    }

    /// Decode raw bytes and forward a completed label.
    ///
    /// Returns `false` once the receiving side has gone away.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> bool {
        match self.decoder.push_bytes(bytes) {
            Some(label) => {
                log::debug!("Received label {:?}", label);
                self.tx.send(label).is_ok()
            }
            None => true,
        }
    }
}
