//! Reversible hero-name ↔ URL-fragment slugs.
//!
//! Spaces become hyphens. Literal hyphens, `%` and anything outside the
//! unreserved URL set are percent-encoded, so decoding can turn every bare
//! hyphen back into a space without ambiguity:
//! `"Yi Sun-shin"` ↔ `"Yi-Sun%2Dshin"`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped inside a single word of a slug.
const SLUG_WORD: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'\'');

/// Encode a display name as a fragment slug.
pub fn encode_name(name: &str) -> String {
    name.split(' ')
        .map(|word| utf8_percent_encode(word, SLUG_WORD).to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// Decode a slug back into a display name. A leading `#` is ignored.
/// Returns `None` for an empty slug or invalid percent-encoded UTF-8.
pub fn decode_slug(slug: &str) -> Option<String> {
    let slug = slug.strip_prefix('#').unwrap_or(slug);
    if slug.is_empty() {
        return None;
    }

    let words = slug
        .split('-')
        .map(|word| {
            percent_decode_str(word)
                .decode_utf8()
                .ok()
                .map(|w| w.into_owned())
        })
        .collect::<Option<Vec<_>>>()?;
    Some(words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_spaces_as_hyphens() {
        assert_eq!(encode_name("Popol and Kupa"), "Popol-and-Kupa");
        assert_eq!(encode_name("Miya"), "Miya");
    }

    #[test]
    fn test_encode_escapes_literal_hyphens() {
        assert_eq!(encode_name("Yi Sun-shin"), "Yi-Sun%2Dshin");
        assert_eq!(encode_name("Lapu-Lapu"), "Lapu%2DLapu");
    }

    #[test]
    fn test_encode_keeps_common_punctuation() {
        assert_eq!(encode_name("X.Borg"), "X.Borg");
        assert_eq!(encode_name("Chang'e"), "Chang'e");
    }

    #[test]
    fn test_decode_with_hash() {
        assert_eq!(decode_slug("#Popol-and-Kupa").as_deref(), Some("Popol and Kupa"));
        assert_eq!(decode_slug("#"), None);
        assert_eq!(decode_slug(""), None);
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert_eq!(decode_slug("%FF%FE"), None);
    }

    #[test]
    fn test_round_trip() {
        let names = [
            "Miya",
            "Popol and Kupa",
            "Yi Sun-shin",
            "Lapu-Lapu",
            "X.Borg",
            "Chang'e",
            "Luo Yi",
            "Yu Zhong",
            "two  spaces",
            " leading",
            "trailing ",
            "a - b",
            "100% hero",
            "Ésmé",
        ];
        for name in names {
            let slug = encode_name(name);
            assert_eq!(decode_slug(&slug).as_deref(), Some(name), "slug {}", slug);
        }
    }
}
