//! Private-address guard.
//!
//! Rejects targets that point at the local machine or a private network,
//! judged from the literal URL only. No DNS resolution is performed and
//! redirects are not followed, so a public hostname that *resolves to* a
//! private address is not caught.

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

/// Returns `true` when `url` must not be contacted without `allow_local`.
///
/// Unparseable URLs and non-HTTP(S) schemes count as private.
///
/// # Example
///
/// ```
/// use a2a_recorder::client::is_private_url;
///
/// assert!(is_private_url("http://localhost:8080"));
/// assert!(is_private_url("http://10.1.2.3/a2a"));
/// assert!(is_private_url("file:///etc/passwd"));
/// assert!(!is_private_url("https://agent.example.com"));
/// ```
pub fn is_private_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => is_private(&parsed),
        Err(_) => true,
    }
}

/// Same as [`is_private_url`] for an already-parsed URL.
pub fn is_private(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return true;
    }
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => is_private_ipv4(addr),
        Some(Host::Ipv6(addr)) => is_private_ipv6(addr),
        None => true,
    }
}

/// 127/8, 10/8, 172.16/12, 192.168/16, 169.254/16.
fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    let [a, b, _, _] = addr.octets();
    a == 127
        || a == 10
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || (a == 169 && b == 254)
}

/// `::1`, fc00::/7, fe80::/10.
fn is_private_ipv6(addr: Ipv6Addr) -> bool {
    let first = addr.segments()[0];
    addr == Ipv6Addr::LOCALHOST || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}
