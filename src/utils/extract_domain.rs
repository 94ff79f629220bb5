//! Hostname extraction from URLs and allow-list entries.

use url::Url;

/// Extracts the lowercase hostname from an absolute URL.
///
/// Handles:
/// - IPv4 addresses (e.g., `http://192.168.1.1/`)
/// - IPv6 addresses (e.g., `http://[::1]:8080/`), returned with brackets
/// - Hostnames with ports (e.g., `https://example.com:3000/`)
/// - Fully-qualified names with a trailing dot (`example.com.`)
///
/// Port numbers are stripped from the result. Returns `None` for relative
/// or host-less URLs.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(extract_hostname("https://WWW.Sura.com:443/seguros").as_deref(), Some("www.sura.com"));
/// ```
pub fn extract_hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    if host.is_empty() { None } else { Some(host) }
}

/// Reduces an allow-list entry to its host part.
///
/// Entries are usually bare domains, but some are written with a scheme or
/// a path (`chubb.com/co-es`). Only the host participates in matching.
pub fn host_of_entry(entry: &str) -> String {
    let entry = entry.trim();
    let without_scheme = entry
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(entry);

    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);

    let host = if host.starts_with('[') {
        // IPv6 literal, keep the brackets and drop any port
        match host.find(']') {
            Some(end_bracket) => &host[..=end_bracket],
            None => host,
        }
    } else {
        host.split(':').next().unwrap_or(host)
    };

    host.trim_end_matches('.').to_ascii_lowercase()
}
