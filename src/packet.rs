//! Fixed command frames sent to the inverter.
//!
//! The frames are opaque: nothing here builds, checksums, or inspects them.

use std::fmt;

/// A named, pre-encoded command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    name: &'static str,
    bytes: &'static [u8],
}

/// Off-line query probe.
pub const OFFLINE_QUERY: Packet = Packet {
    name: "Off-line Query",
    bytes: &[0xaa, 0x55, 0x80, 0x7f, 0x00, 0x00, 0x00, 0x01, 0xfe],
};

/// Remove-register command.
pub const REMOVE_REGISTER: Packet = Packet {
    name: "Remove Register",
    bytes: &[0xaa, 0x55, 0x80, 0x7f, 0x00, 0x02, 0x00, 0x02, 0x00],
};

impl Packet {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase hex without separators, e.g. `aa55807f00000001fe`.
    pub fn hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_payloads() {
        assert_eq!(OFFLINE_QUERY.hex(), "aa55807f00000001fe");
        assert_eq!(REMOVE_REGISTER.hex(), "aa55807f0002000200");
        assert_eq!(OFFLINE_QUERY.len(), 9);
        assert_eq!(REMOVE_REGISTER.len(), 9);
    }

    #[test]
    fn test_packet_display() {
        assert_eq!(
            REMOVE_REGISTER.to_string(),
            "Remove Register [aa55807f0002000200]"
        );
    }
}
