/// Expands a dotted 3-octet prefix into the 254 host addresses
/// `prefix.1 ..= prefix.254`.
///
/// Purely mechanical: the prefix is not validated, so a malformed prefix
/// surfaces as connect failures downstream rather than a distinct error.
pub fn expand_prefix(prefix: &str) -> Vec<String> {
    (1u16..=254).map(|host| format!("{}.{}", prefix, host)).collect()
}

/// Caps a response body to the comparison sample size.
pub fn trim_sample(body: &[u8], max: usize) -> Vec<u8> {
    body[..body.len().min(max)].to_vec()
}
