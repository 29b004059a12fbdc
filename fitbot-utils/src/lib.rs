/// Shared formatting helpers (badge lists, truncation, whitespace).
pub mod formatting;
/// Pure parser helpers.
pub mod parse;
/// Shared calendar-date helpers.
pub mod time;
