//! The minimal NTP client request packet (spec §4.7).

/// Size in bytes of an NTP packet.
pub const PACKET_LEN: usize = 48;

/// Builds a minimal NTP client request: LI=0, VN=3, Mode=3 packed into byte
/// 0 as `0x1B`, with the remaining 47 bytes zeroed. This is a request, not a
/// full client — the supervisor only cares whether *any* byte comes back,
/// not the encoded timestamp.
#[must_use]
pub fn client_request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = 0x1B;
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_byte_is_li_vn_mode() {
        let packet = client_request();
        assert_eq!(packet[0], 0x1B);
        assert_eq!(packet.len(), 48);
        assert!(packet[1..].iter().all(|&b| b == 0));
    }
}
