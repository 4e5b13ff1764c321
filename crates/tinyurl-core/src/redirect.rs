/// Appends incoming query parameters to a resolved URL.
///
/// A single trailing `&` on `url` is dropped first. Parameters are appended
/// as `key=value` in the order given; the caller is responsible for any
/// percent-encoding.
pub fn merge_query<K, V>(url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let base = url.strip_suffix('&').unwrap_or(url);
    let mut merged = String::from(base);

    for (index, (key, value)) in params.iter().enumerate() {
        let separator = match index {
            0 if base.ends_with('?') => "",
            0 if !base.contains('?') => "?",
            _ => "&",
        };
        merged.push_str(separator);
        merged.push_str(key.as_ref());
        merged.push('=');
        merged.push_str(value.as_ref());
    }

    merged
}
