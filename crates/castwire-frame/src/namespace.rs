//! Well-known namespaces and endpoint ids.
//!
//! Every namespace is a URN under `urn:x-cast:`. The platform namespaces
//! below are handled by the receiver itself; applications add their own.

/// Virtual connection management (CONNECT / CLOSE).
pub const CONNECTION: &str = "urn:x-cast:com.google.cast.tp.connection";

/// Liveness ping/pong.
pub const HEARTBEAT: &str = "urn:x-cast:com.google.cast.tp.heartbeat";

/// Receiver control: status, volume, app launch/stop.
pub const RECEIVER: &str = "urn:x-cast:com.google.cast.receiver";

/// Media session control.
pub const MEDIA: &str = "urn:x-cast:com.google.cast.media";

/// Device authentication (BINARY payloads).
pub const DEVICE_AUTH: &str = "urn:x-cast:com.google.cast.tp.deviceauth";

/// Prefix every namespace must carry.
pub const NAMESPACE_PREFIX: &str = "urn:x-cast:";

/// Longest namespace the receiver accepts.
pub const MAX_NAMESPACE_LEN: usize = 128;

/// Default sender endpoint id.
pub const DEFAULT_SENDER_ID: &str = "sender-0";

/// The receiver platform's endpoint id.
pub const DEFAULT_RECEIVER_ID: &str = "receiver-0";

/// Returns a human-readable name for a namespace.
pub fn namespace_name(namespace: &str) -> &'static str {
    match namespace {
        CONNECTION => "CONNECTION",
        HEARTBEAT => "HEARTBEAT",
        RECEIVER => "RECEIVER",
        MEDIA => "MEDIA",
        DEVICE_AUTH => "DEVICE_AUTH",
        ns if ns.starts_with(NAMESPACE_PREFIX) => "APP",
        _ => "UNKNOWN",
    }
}

/// Returns true for the platform namespaces above.
pub fn is_builtin(namespace: &str) -> bool {
    matches!(
        namespace,
        CONNECTION | HEARTBEAT | RECEIVER | MEDIA | DEVICE_AUTH
    )
}

/// Returns true if `namespace` is a well-formed cast namespace.
pub fn is_valid(namespace: &str) -> bool {
    namespace.len() <= MAX_NAMESPACE_LEN
        && namespace.is_ascii()
        && namespace
            .strip_prefix(NAMESPACE_PREFIX)
            .is_some_and(|rest| !rest.is_empty() && !rest.contains(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_for_builtins() {
        assert_eq!(namespace_name(CONNECTION), "CONNECTION");
        assert_eq!(namespace_name(HEARTBEAT), "HEARTBEAT");
        assert_eq!(namespace_name(RECEIVER), "RECEIVER");
        assert_eq!(namespace_name(MEDIA), "MEDIA");
        assert_eq!(namespace_name(DEVICE_AUTH), "DEVICE_AUTH");
        assert_eq!(namespace_name("urn:x-cast:com.example.app"), "APP");
        assert_eq!(namespace_name("bogus"), "UNKNOWN");
    }

    #[test]
    fn builtin_detection() {
        assert!(is_builtin(RECEIVER));
        assert!(!is_builtin("urn:x-cast:com.example.app"));
    }

    #[test]
    fn validity() {
        assert!(is_valid(MEDIA));
        assert!(is_valid("urn:x-cast:com.example.app"));
        assert!(!is_valid("urn:x-cast:"));
        assert!(!is_valid("urn:x-cast:has space"));
        assert!(!is_valid("com.example.app"));
        assert!(!is_valid(&format!("urn:x-cast:{}", "a".repeat(MAX_NAMESPACE_LEN))));
    }
}
