//! Stripping lint-suppression comments from source shown to users.

use std::sync::LazyLock;

use regex::Regex;

static NOQA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[ \t]*#[ \t]*noqa\b[^\r\n]*").expect("valid regex"));

/// Remove `# noqa` comments (with or without codes) from every line.
///
/// Matches inside string literals are removed too; the pattern does not
/// tokenize the source.
pub fn strip_noqa(source: Option<&str>) -> Option<String> {
    source.map(|code| NOQA_RE.replace_all(code, "").into_owned())
}
