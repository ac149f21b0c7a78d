use rescue_core::core::LogSummary;
use rescue_core::error::{RescueError, RescueResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a physical robot, assigned once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for DeviceId {
    fn from(raw: u32) -> Self {
        DeviceId(raw)
    }
}

/// The three broadcast message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Sender is declaring distress
    Alert,
    /// Sender is distress-looping; carrier for direction finding
    Beacon,
    /// Sender has recovered
    Done,
}

impl MessageKind {
    /// Name carried on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            MessageKind::Alert => "ALERT",
            MessageKind::Beacon => "BEACON",
            MessageKind::Done => "DONE",
        }
    }

    /// Parse a wire name; `SAFE` is the legacy spelling of `DONE`
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "ALERT" => Some(MessageKind::Alert),
            "BEACON" => Some(MessageKind::Beacon),
            "DONE" | "SAFE" => Some(MessageKind::Done),
            _ => None,
        }
    }
}

/// A broadcast message as sent: kind plus the sender's id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioMessage {
    pub kind: MessageKind,
    pub sender: DeviceId,
}

/// Name/value pair as it travels over the air
#[derive(Debug, Serialize, Deserialize)]
struct WirePacket {
    name: String,
    value: u32,
}

impl RadioMessage {
    pub fn new(kind: MessageKind, sender: DeviceId) -> Self {
        Self { kind, sender }
    }

    pub fn alert(sender: DeviceId) -> Self {
        Self::new(MessageKind::Alert, sender)
    }

    pub fn beacon(sender: DeviceId) -> Self {
        Self::new(MessageKind::Beacon, sender)
    }

    pub fn done(sender: DeviceId) -> Self {
        Self::new(MessageKind::Done, sender)
    }

    /// Encode as a name/value wire packet
    pub fn encode(&self) -> RescueResult<Vec<u8>> {
        let packet = WirePacket {
            name: self.kind.wire_name().to_string(),
            value: self.sender.0,
        };
        bincode::serialize(&packet)
            .map_err(|e| RescueError::Encode(format!("{} packet: {}", packet.name, e)))
    }

    /// Decode a wire packet; unknown names are a decode error
    pub fn decode(bytes: &[u8]) -> RescueResult<Self> {
        let packet: WirePacket = bincode::deserialize(bytes)?;
        let kind = MessageKind::from_wire_name(&packet.name).ok_or_else(|| {
            RescueError::decode(format!("unknown message name '{}'", packet.name))
        })?;
        Ok(Self::new(kind, DeviceId(packet.value)))
    }
}

impl LogSummary for RadioMessage {
    fn log_summary(&self) -> String {
        format!("{}({})", self.kind.wire_name(), self.sender)
    }
}

/// A message as received, with the measured signal strength of that reception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message: RadioMessage,
    /// dBm; only meaningful for beacons
    pub signal_strength: i32,
}

impl ReceivedMessage {
    pub fn new(message: RadioMessage, signal_strength: i32) -> Self {
        Self {
            message,
            signal_strength,
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.message.kind
    }

    pub fn sender(&self) -> DeviceId {
        self.message.sender
    }
}

impl LogSummary for ReceivedMessage {
    fn log_summary(&self) -> String {
        format!("{} @ {} dBm", self.message.log_summary(), self.signal_strength)
    }
}
