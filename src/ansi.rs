use once_cell::sync::Lazy;
use regex::Regex;

/// Substituted when the scanner printed nothing but whitespace.
pub const NO_OUTPUT_PLACEHOLDER: &str = "(no output)";

static SGR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("SGR pattern is a valid regex"));

/// Remove CSI SGR color/style sequences (`ESC [ <digits/;> m`). Other bytes,
/// including other control sequences, are left alone.
pub fn strip_sgr(input: &str) -> String {
    SGR.replace_all(input, "").into_owned()
}

/// Trim the cleaned output, falling back to the placeholder when nothing is left.
pub fn render_output(cleaned: &str) -> String {
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        NO_OUTPUT_PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}
