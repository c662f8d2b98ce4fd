/// Normalise a subscriber phone number to the `2547XXXXXXXX` format Daraja expects.
///
/// Accepts local (`07…`), bare (`7…`) and already-international (`2547…`, `+2547…`) forms. Whitespace and dashes
/// are stripped first.
pub fn normalize_msisdn(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.starts_with("254") {
        digits
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("254{rest}")
    } else {
        format!("254{digits}")
    }
}

/// Whether the given URL is plausibly reachable from the public internet: an http(s) URL with a host that is not a
/// loopback or wildcard address.
pub fn is_public_url(url: &str) -> bool {
    let rest = match url.strip_prefix("https://").or_else(|| url.strip_prefix("http://")) {
        Some(rest) => rest,
        None => return false,
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    !host.is_empty() && !matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0")
}
