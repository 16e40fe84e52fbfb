//! Slices raw pipe reads into whole, fixed-size packets.

use bytes::BytesMut;
use snafu::Snafu;

use crate::layout::PacketLayout;

/// An error produced while framing a byte stream into packets.
#[derive(Debug, Snafu)]
pub enum FramingError {
    /// The stream ended with a partial packet still buffered: the total
    /// number of bytes written was not a multiple of `max_pkg_size`.
    #[snafu(display(
        "stream ended with {remainder} buffered bytes, short of one full {max_pkg_size}-byte packet"
    ))]
    TruncatedStream {
        /// Number of bytes left over at EOF.
        remainder: usize,
        /// The packet size the remainder was measured against.
        max_pkg_size: usize,
    },
}

/// Accumulates bytes read from the SUT's stdout pipe and yields whole packets.
///
/// Short reads are expected: a call to [`PacketFramer::push`] may deliver any
/// number of bytes, including a sub-packet remainder from a previous read. The
/// framer buffers that remainder until enough bytes arrive to complete a packet.
#[derive(Debug)]
pub struct PacketFramer {
    layout: PacketLayout,
    remainder: BytesMut,
}

impl PacketFramer {
    /// Create a framer for the given packet geometry.
    pub fn new(layout: PacketLayout) -> Self {
        Self {
            layout,
            remainder: BytesMut::new(),
        }
    }

    /// The packet geometry this framer slices against.
    pub fn layout(&self) -> PacketLayout {
        self.layout
    }

    /// Feed newly-read bytes in and drain every whole packet they complete.
    ///
    /// Returns packets in stream order; any trailing sub-packet bytes remain
    /// buffered internally for the next call.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.remainder.extend_from_slice(bytes);
        let max_pkg_size = self.layout.max_pkg_size();

        let mut packets = Vec::with_capacity(self.remainder.len() / max_pkg_size.max(1));
        while self.remainder.len() >= max_pkg_size {
            let packet = self.remainder.split_to(max_pkg_size);
            packets.push(packet.to_vec());
        }
        packets
    }

    /// Called once the SUT's stdout has reached EOF. Returns an error if a
    /// non-empty, sub-packet remainder is still buffered (a truncated stream);
    /// otherwise confirms the stream ended cleanly on a packet boundary.
    pub fn finish(self) -> Result<(), FramingError> {
        if self.remainder.is_empty() {
            Ok(())
        } else {
            TruncatedStreamSnafu {
                remainder: self.remainder.len(),
                max_pkg_size: self.layout.max_pkg_size(),
            }
            .fail()
        }
    }
}
