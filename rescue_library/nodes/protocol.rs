use crate::messages::{
    DeviceId, MessageKind, RadioMessage, ReceivedMessage, RescueRequest, RescueTicket,
};
use crate::nodes::indicator::IndicatorController;
use crate::state::SharedState;
use rescue_core::hal::{Hardware, RawPacket};
use rescue_core::{Hub, LogSummary, Node, NodeInfo};
use std::sync::Arc;

/// What handling one message did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// An alert claimed this robot for a rescue
    RescueRequested(RescueTicket),
    BeaconRecorded,
    /// The tracked target announced it is done; the rescue was released
    TargetReleased,
    Ignored,
}

/// Reacts to `ALERT` / `BEACON` / `DONE` broadcasts
///
/// Never blocks: an alert only claims the rescue and publishes a
/// [`RescueRequest`]; the sequence itself runs elsewhere. Every branch is
/// idempotent, so duplicated or reordered deliveries leave state consistent.
pub struct ProtocolHandler {
    self_id: DeviceId,
    hardware: Hardware,
    state: Arc<SharedState>,
    indicators: Arc<IndicatorController>,
    requests: Hub<RescueRequest>,
}

impl ProtocolHandler {
    pub fn new(
        self_id: DeviceId,
        hardware: Hardware,
        state: Arc<SharedState>,
        indicators: Arc<IndicatorController>,
        requests: Hub<RescueRequest>,
    ) -> Self {
        Self {
            self_id,
            hardware,
            state,
            indicators,
            requests,
        }
    }

    /// Decode a raw packet and handle it; undecodable packets are dropped
    pub fn handle_packet(&self, packet: &RawPacket, ctx: Option<&mut NodeInfo>) -> Handled {
        match RadioMessage::decode(&packet.payload) {
            Ok(message) => {
                self.handle(ReceivedMessage::new(message, packet.signal_strength), ctx)
            }
            Err(e) => {
                log::warn!("robot {} dropped packet: {}", self.self_id, e);
                Handled::Ignored
            }
        }
    }

    pub fn handle(&self, received: ReceivedMessage, ctx: Option<&mut NodeInfo>) -> Handled {
        let sender = received.sender();
        if sender == self.self_id {
            return Handled::Ignored;
        }
        if let Some(ctx) = ctx.as_deref() {
            ctx.log_debug(&format!("received {}", received.log_summary()));
        }

        match received.kind() {
            MessageKind::Alert => self.on_alert(sender, received.signal_strength, ctx),
            MessageKind::Beacon => {
                let now = self.hardware.now_ms();
                if self.state.record_beacon(sender, received.signal_strength, now) {
                    Handled::BeaconRecorded
                } else {
                    Handled::Ignored
                }
            }
            MessageKind::Done => {
                if self.state.complete_target(sender) {
                    self.hardware.drive.stop();
                    self.indicators.calm();
                    log::info!("robot {}: {} is safe, rescue released", self.self_id, sender);
                    Handled::TargetReleased
                } else {
                    Handled::Ignored
                }
            }
        }
    }

    fn on_alert(&self, sender: DeviceId, signal: i32, ctx: Option<&mut NodeInfo>) -> Handled {
        let Some(ticket) = self.state.try_begin_rescue(sender) else {
            log::debug!(
                "robot {} ignoring alert from {} (status {:?}, phase {})",
                self.self_id,
                sender,
                self.state.status(),
                self.state.phase()
            );
            return Handled::Ignored;
        };

        let request = RescueRequest {
            ticket,
            alert_signal: signal,
        };
        if self.requests.send(request, ctx).is_err() {
            log::warn!(
                "robot {}: rescue queue full, dropping alert from {}",
                self.self_id,
                sender
            );
            self.state.finish_rescue(&ticket);
            return Handled::Ignored;
        }
        Handled::RescueRequested(ticket)
    }
}

/// Drains the radio into the protocol handler every tick
pub struct RadioNode {
    name: String,
    handler: Arc<ProtocolHandler>,
    hardware: Hardware,
    max_packets_per_tick: usize,
}

impl RadioNode {
    pub fn new(name: impl Into<String>, handler: Arc<ProtocolHandler>, hardware: Hardware) -> Self {
        Self {
            name: name.into(),
            handler,
            hardware,
            max_packets_per_tick: 64,
        }
    }
}

impl Node for RadioNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, mut ctx: Option<&mut NodeInfo>) {
        for _ in 0..self.max_packets_per_tick {
            let Some(packet) = self.hardware.radio.try_recv() else {
                break;
            };
            self.handler.handle_packet(&packet, ctx.as_deref_mut());
        }
    }
}
