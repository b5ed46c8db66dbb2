use axum::http::HeaderMap;

/// Shared bucket for callers whose address cannot be resolved. Every such
/// caller lands in the same bucket, so stripping proxy headers never buys a
/// fresh quota.
pub const ANONYMOUS: &str = "anonymous";

/// Proxy headers consulted in priority order.
const CLIENT_IP_HEADERS: &[&str] = &[
    "x-forwarded-for",
    "x-real-ip",
    "cf-connecting-ip",
    "x-vercel-forwarded-for",
];

/// Derives the rate-limit key for a request from its proxy headers.
///
/// The first non-empty header wins. For comma-separated chains only the first
/// hop (the original client) is used.
pub fn resolve(headers: &HeaderMap) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ANONYMOUS.to_string())
}
