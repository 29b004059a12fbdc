/// Parse the leading decimal digits of a value like `30`, `30min` or ` 450 kcal`.
///
/// Returns `None` when the value does not start with a digit or overflows.
pub fn parse_leading_u32(raw: &str) -> Option<u32> {
    let value = raw.trim_start();
    let digits_end = value
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(value.len(), |(idx, _)| idx);

    if digits_end == 0 {
        return None;
    }

    value[..digits_end].parse::<u32>().ok()
}

/// Same as [`parse_leading_u32`] but falls back to zero.
pub fn parse_leading_u32_or_zero(raw: Option<&str>) -> u32 {
    raw.and_then(parse_leading_u32).unwrap_or(0)
}

/// Split a `key=value, key=value` list into trimmed pairs.
///
/// Only the first `=` separates key from value, so values may contain `=`.
/// Segments without `=` are skipped. Keys are lowercased.
pub fn parse_key_value_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_ascii_lowercase(), value.trim().to_owned()))
        })
        .collect()
}
