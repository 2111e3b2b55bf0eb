//! # Call Metadata
//!
//! Turns inbound HTTP headers plus the exchanged backend credential into the
//! metadata pairs attached to a call. Transport-managed headers stay behind;
//! everything else is forwarded verbatim.
use http::HeaderMap;

/// Metadata key carrying the exchanged backend credential.
pub const BACKEND_CREDENTIAL_KEY: &str = "authz-token";

// Hop-by-hop and transport-managed headers that must not leak into call
// metadata. content-type describes the HTTP body, which does not survive
// translation; the RPC layer sets its own.
const TRANSPORT_HEADERS: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
    "content-type",
];

/// Produces the call metadata for one request: every forwardable inbound
/// header as a `name: value` pair, with the exchanged credential appended
/// under [`BACKEND_CREDENTIAL_KEY`] last so it always wins over any inbound
/// value for that key.
pub fn propagate(headers: &HeaderMap, credential: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(headers.len() + 1);

    for (name, value) in headers {
        let name = name.as_str();
        if TRANSPORT_HEADERS.contains(&name) || name == BACKEND_CREDENTIAL_KEY {
            continue;
        }
        // Binary metadata keys expect base64 values the HTTP side cannot
        // provide, and values must be visible ASCII. Neither can be carried.
        if name.ends_with("-bin") {
            tracing::debug!(header = name, "dropping binary key from call metadata");
            continue;
        }
        let Ok(value) = value.to_str() else {
            tracing::debug!(header = name, "dropping non-ascii header from call metadata");
            continue;
        };
        pairs.push((name.to_string(), value.to_string()));
    }

    pairs.push((BACKEND_CREDENTIAL_KEY.to_string(), credential.to_string()));
    pairs
}
