//! Wire format of the broadcast announcement.

/// Prefix of every announcement datagram.
pub const ANNOUNCE_PREFIX: &str = "GAMETUX_DISPLAY:";

/// Receive buffer size; longer datagrams are truncated and fail to parse.
pub const MAX_ANNOUNCEMENT_LEN: usize = 1024;

/// Build the datagram payload announcing a signaling port.
pub fn encode_announcement(port: u16) -> Vec<u8> {
    format!("{ANNOUNCE_PREFIX}{port}").into_bytes()
}

/// Extract the announced port from a datagram.
///
/// Returns `None` for anything that is not `GAMETUX_DISPLAY:<port>` with a
/// decimal port in `1..=65535`. Trailing whitespace is tolerated.
pub fn parse_announcement(datagram: &[u8]) -> Option<u16> {
    let text = std::str::from_utf8(datagram).ok()?;
    let port = text.strip_prefix(ANNOUNCE_PREFIX)?.trim_end();
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}
