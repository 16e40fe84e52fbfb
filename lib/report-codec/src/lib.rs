//! Wire framing and decoding for the fixed-size packets an instrumented SUT
//! writes to its stdout.

mod event;
mod framer;
mod layout;

pub use event::{decode_packet, Event, EventKind};
pub use framer::{FramingError, PacketFramer};
pub use layout::PacketLayout;
