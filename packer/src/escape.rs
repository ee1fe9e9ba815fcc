//! Case-escaping of module paths and versions.
//!
//! Cache artifacts are keyed by module path and version. Both may contain
//! uppercase letters, which collide on case-insensitive filesystems, so
//! every uppercase ASCII letter is replaced by `!` followed by its lowercase
//! form before the identifier becomes a directory or file name. The same
//! rule applies to module paths and version strings.

/// Escape an identifier for use as a filesystem path component.
///
/// The transformation is reversible (see [`unescape`]) and injective over
/// identifiers that do not themselves contain `!`, which upstream module
/// path and version validation rules out.
///
/// # Examples
///
/// ```
/// use modpack::escape::escape;
///
/// assert_eq!(escape("example.com/Foo/Bar"), "example.com/!foo/!bar");
/// assert_eq!(escape("v1.0.0"), "v1.0.0");
/// ```
#[must_use]
pub fn escape(identifier: &str) -> String {
    let mut escaped = String::with_capacity(identifier.len());
    for ch in identifier.chars() {
        if ch.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(ch.to_ascii_lowercase());
        } else {
            escaped.push(ch);
        }
    }
    escaped
}

/// Reverse [`escape`], returning `None` when the input is not a valid
/// escaped identifier (a `!` not followed by a lowercase ASCII letter).
#[must_use]
pub fn unescape(escaped: &str) -> Option<String> {
    let mut identifier = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(ch) = chars.next() {
        if ch == '!' {
            let follower = chars.next()?;
            if !follower.is_ascii_lowercase() {
                return None;
            }
            identifier.push(follower.to_ascii_uppercase());
        } else {
            identifier.push(ch);
        }
    }
    Some(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("example.com/foo", "example.com/foo")]
    #[case::single_upper("example.com/Foo", "example.com/!foo")]
    #[case::multi_upper("Foo/Bar", "!foo/!bar")]
    #[case::version("v0.0.0-20240501100000-abcdef123456", "v0.0.0-20240501100000-abcdef123456")]
    #[case::upper_version("v1.0.0-RC1", "v1.0.0-!r!c1")]
    fn escapes_uppercase_letters(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape(input), expected);
    }

    #[rstest]
    #[case("example.com/Foo/Bar")]
    #[case("github.com/Azure/azure-sdk")]
    #[case("v1.0.0-RC1")]
    fn unescape_round_trips(#[case] identifier: &str) {
        let escaped = escape(identifier);
        assert_eq!(unescape(&escaped).as_deref(), Some(identifier));
    }

    #[test]
    fn distinct_casings_never_collide() {
        assert_ne!(escape("Foo/Bar"), escape("foo/bar"));
        assert_ne!(escape("FOO"), escape("Foo"));
    }

    #[rstest]
    #[case::trailing_marker("foo!")]
    #[case::marker_before_upper("!F")]
    #[case::marker_before_digit("!1")]
    fn unescape_rejects_malformed_input(#[case] escaped: &str) {
        assert_eq!(unescape(escaped), None);
    }
}
