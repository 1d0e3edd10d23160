//! WebSocket upgrade detection.

use crate::http::headers::Headers;

/// Whether a request asks to switch to the WebSocket protocol.
///
/// `Connection` only has to contain `upgrade` somewhere, ignoring case,
/// since browsers send lists such as `keep-alive, Upgrade`. `Upgrade` must
/// be exactly `websocket`, ignoring case.
pub fn is_upgrade_request(headers: &Headers) -> bool {
    let connection = headers
        .get("Connection")
        .map(|v| v.to_ascii_lowercase().contains("upgrade"))
        .unwrap_or(false);

    let upgrade = headers
        .get("Upgrade")
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    connection && upgrade
}
