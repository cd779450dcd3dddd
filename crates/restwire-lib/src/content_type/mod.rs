//! Media-type and charset constants shared by the processors and the HTTP glue.

/// Character encoding used for all textual wire formats.
pub const CHARSET: &str = "UTF-8";

/// Media type produced and consumed by the JSON processor.
pub const JSON: &str = "application/json; charset=UTF-8";

/// Returns true when a `Content-Type` header value names JSON, ignoring
/// parameters and case (`application/json`, `application/hal+json`, ...).
pub fn is_json(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or("").trim();
    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };
    kind.eq_ignore_ascii_case("application")
        && (subtype.eq_ignore_ascii_case("json")
            || subtype.to_ascii_lowercase().ends_with("+json"))
}
