/// Truncate text to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Join badge names for prompt context (e.g. "First Rep, On Fire"), or "none yet".
pub fn format_badge_list<S: AsRef<str>>(badges: &[S]) -> String {
    let names: Vec<&str> = badges
        .iter()
        .map(AsRef::as_ref)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        "none yet".to_owned()
    } else {
        names.join(", ")
    }
}

/// Collapse runs of spaces and tabs on each line and drop trailing blanks.
///
/// Line breaks are kept so markdown replies keep their layout.
pub fn collapse_inline_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            let mut out = String::with_capacity(line.len());
            let mut previous_blank = false;
            for ch in line.chars() {
                if ch == ' ' || ch == '\t' {
                    if !previous_blank {
                        out.push(' ');
                    }
                    previous_blank = true;
                } else {
                    out.push(ch);
                    previous_blank = false;
                }
            }
            out.trim_end().to_owned()
        })
        .collect();

    lines.join("\n").trim().to_owned()
}

/// Render a streak count with a day/days suffix.
pub fn format_streak_days(streak: u32) -> String {
    if streak == 1 {
        "1 day".to_owned()
    } else {
        format!("{streak} days")
    }
}
