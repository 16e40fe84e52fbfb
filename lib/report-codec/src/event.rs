//! Decoding of a single fixed-size packet into a typed [`Event`].

use std::fmt;

use crate::layout::PacketLayout;

/// The classification of a decoded event, closed over the wire's `event_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A clock tick emitted by the SUT (wire code 0).
    TimedEvent,
    /// A state-variable change (wire code 1).
    StateEvent,
    /// A high-level process step (wire code 2).
    ProcessEvent,
    /// Component activity (wire code 3).
    ComponentEvent,
    /// Dual-purpose sentinel: opens a new sink (file variant) or marks
    /// end-of-report (broker variant) (wire code 4).
    LogInit,
    /// Payload is `"<component>,<rest>"`, self-reported by a component (wire code 5).
    SelfLoggedComponentEvent,
    /// Any other wire code, preserved verbatim under the `invalid` tag.
    Invalid,
}

impl EventKind {
    /// Classify a raw `event_type` value per the wire table.
    pub const fn from_wire(event_type: u32) -> Self {
        match event_type {
            0 => EventKind::TimedEvent,
            1 => EventKind::StateEvent,
            2 => EventKind::ProcessEvent,
            3 => EventKind::ComponentEvent,
            4 => EventKind::LogInit,
            5 => EventKind::SelfLoggedComponentEvent,
            _ => EventKind::Invalid,
        }
    }

    /// The CSV/AMQP tag used when this kind is emitted as a line or message.
    pub const fn tag(self) -> &'static str {
        match self {
            EventKind::TimedEvent => "timed_event",
            EventKind::StateEvent => "state_event",
            EventKind::ProcessEvent => "process_event",
            EventKind::ComponentEvent => "component_event",
            EventKind::LogInit => "log_init",
            EventKind::SelfLoggedComponentEvent => "self_logged_component_event",
            EventKind::Invalid => "invalid",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A decoded SUT event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Timestamp as written by the SUT, opaque to this crate.
    pub timestamp: u64,
    /// The classified event kind.
    pub kind: EventKind,
    /// The right-stripped, lossily-decoded payload text.
    pub payload: String,
}

/// Decode one packet of exactly `layout.max_pkg_size()` bytes into an [`Event`].
///
/// # Panics
///
/// Panics if `packet.len() != layout.max_pkg_size()`; callers (the framer) are
/// responsible for only ever handing over whole packets.
pub fn decode_packet(packet: &[u8], layout: PacketLayout) -> Event {
    assert_eq!(
        packet.len(),
        layout.max_pkg_size(),
        "decode_packet requires exactly one whole packet"
    );

    let timestamp = u64::from_ne_bytes(
        packet[0..8]
            .try_into()
            .expect("first 8 bytes of a packet form a u64"),
    );
    let event_type = u32::from_ne_bytes(
        packet[8..12]
            .try_into()
            .expect("next 4 bytes of a packet form a u32"),
    );
    let payload_region = &packet[12..12 + layout.payload_region_size()];
    let text_region = &payload_region[..layout.payload_text_size()];

    let payload = String::from_utf8_lossy(text_region)
        .trim_end()
        .to_string();

    Event {
        timestamp,
        kind: EventKind::from_wire(event_type),
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_packet(layout: PacketLayout, timestamp: u64, event_type: u32, payload: &[u8]) -> Vec<u8> {
        let mut packet = vec![0u8; layout.max_pkg_size()];
        packet[0..8].copy_from_slice(&timestamp.to_ne_bytes());
        packet[8..12].copy_from_slice(&event_type.to_ne_bytes());
        let text_region = &mut packet[12..12 + layout.payload_text_size()];
        let n = payload.len().min(text_region.len());
        text_region[..n].copy_from_slice(&payload[..n]);
        packet
    }

    #[test]
    fn decodes_timed_event() {
        let layout = PacketLayout::Canonical;
        let packet = build_packet(layout, 10, 0, b"a");
        let event = decode_packet(&packet, layout);
        assert_eq!(event.timestamp, 10);
        assert_eq!(event.kind, EventKind::TimedEvent);
        assert_eq!(event.payload, "a");
    }

    #[test]
    fn unknown_event_type_is_invalid_not_an_error() {
        let layout = PacketLayout::Canonical;
        let packet = build_packet(layout, 1, 99, b"?");
        let event = decode_packet(&packet, layout);
        assert_eq!(event.kind, EventKind::Invalid);
        assert_eq!(event.kind.tag(), "invalid");
    }

    #[test]
    fn payload_is_right_stripped() {
        let layout = PacketLayout::Canonical;
        let packet = build_packet(layout, 1, 1, b"hello   ");
        let event = decode_packet(&packet, layout);
        assert_eq!(event.payload, "hello");
    }

    #[test]
    fn non_utf8_payload_is_replaced_not_panicking() {
        let layout = PacketLayout::Canonical;
        let packet = build_packet(layout, 1, 1, &[0xff, 0xfe, b'x']);
        let event = decode_packet(&packet, layout);
        assert!(event.payload.contains('x'));
    }

    #[test]
    fn self_logged_component_event_carries_raw_payload() {
        let layout = PacketLayout::Canonical;
        let packet = build_packet(layout, 42, 5, b"mod,100,hello");
        let event = decode_packet(&packet, layout);
        assert_eq!(event.kind, EventKind::SelfLoggedComponentEvent);
        assert_eq!(event.payload, "mod,100,hello");
    }
}
