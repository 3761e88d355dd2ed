//! Transport-error classification.
//!
//! Raw transport errors ("dns error: failed to lookup address ...") are
//! useless to someone standing in front of a phone. Substitute a short
//! actionable hint for the known categories and pass everything else
//! through verbatim.

/// Map a raw transport error message to a friendly, actionable one.
///
/// Total: every input maps to some output, default is the input itself.
pub fn classify_error(raw: &str) -> String {
    let lower = raw.to_lowercase();

    let dns = ["failed to lookup address", "resolve host", "no address associated", "unknown host", "dns error"];
    if dns.iter().any(|k| lower.contains(k)) {
        return "can't resolve host. Is the tunnel running? Is this device on a network that can reach the internet?".to_string();
    }

    if lower.contains("connection refused") {
        return "connection refused. Server may not be running or not listening on that port.".to_string();
    }

    if lower.contains("timed out") || lower.contains("timeout") {
        return "connection timed out. If using a local address, ensure same Wi-Fi; otherwise the tunnel may be down or the network blocking.".to_string();
    }

    let connect = ["failed to connect", "error trying to connect", "connect error"];
    if connect.iter().any(|k| lower.contains(k)) {
        return "can't reach server. If using a local address (e.g. 192.168.x.x), ensure this device is on the same Wi-Fi as the server, or configure a remote URL (e.g. a Cloudflare tunnel).".to_string();
    }

    raw.to_string()
}
