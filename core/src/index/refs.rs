//! # Reference Utilities
//!
//! Shared helpers for splitting `$ref` strings into a document part and a JSON
//! Pointer fragment, and for resolving the document part against a base URI.
//!
//! These utilities never fetch anything: a document URI only means something if a
//! matching document was supplied to the [`crate::index::DocumentRegistry`].

use percent_encoding::percent_decode_str;
use url::Url;

/// Base used when a document has no URI of its own, so relative references still join.
pub(crate) const DUMMY_BASE: &str = "http://example.invalid/";

/// How a `$ref` addresses its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceKind {
    /// `#/...` within the current document.
    Local,
    /// `other.yaml#/...`, resolved against the current document's URI.
    Relative,
    /// `https://host/doc.yaml#/...`.
    Remote,
}

/// A `$ref` split at the first `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParsedReference<'a> {
    pub(crate) kind: ReferenceKind,
    /// Document part, empty for local references.
    pub(crate) document: &'a str,
    /// Fragment without the `#`, if one was written.
    pub(crate) fragment: Option<&'a str>,
}

/// Splits a reference into document and fragment.
pub(crate) fn parse_reference(ref_str: &str) -> ParsedReference<'_> {
    let (document, fragment) = match ref_str.split_once('#') {
        Some((doc, frag)) => (doc, Some(frag)),
        None => (ref_str, None),
    };

    let kind = if document.is_empty() {
        ReferenceKind::Local
    } else if Url::parse(document).is_ok() {
        ReferenceKind::Remote
    } else {
        ReferenceKind::Relative
    };

    ParsedReference {
        kind,
        document,
        fragment,
    }
}

/// Decodes a JSON Pointer segment (handles `~1` and `~0`).
pub(crate) fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Human-facing name of a reference: its last pointer segment, decoded.
///
/// e.g. `#/components/schemas/User` -> `User`
pub(crate) fn reference_name(ref_str: &str) -> String {
    let parsed = parse_reference(ref_str);
    let tail = match parsed.fragment {
        Some(frag) if !frag.trim_matches('/').is_empty() => frag,
        _ => parsed.document,
    };
    let segment = tail.trim_end_matches('/').rsplit('/').next().unwrap_or(tail);
    decode_pointer_segment(segment)
}

/// Parses a document URI, falling back to a join onto [`DUMMY_BASE`] for
/// relative paths such as `schemas/pet.yaml`.
pub(crate) fn parse_base_url(base_str: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(base_str) {
        return Some(without_fragment(url));
    }
    let dummy = Url::parse(DUMMY_BASE).ok()?;
    dummy.join(base_str).ok().map(without_fragment)
}

/// Resolves the document part of a reference against `base`.
pub(crate) fn resolve_doc_uri(doc: &str, base: Option<&Url>) -> Option<Url> {
    if let Ok(url) = Url::parse(doc) {
        return Some(without_fragment(url));
    }
    let base = base?;
    base.join(doc).ok().map(without_fragment)
}

fn without_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference_kinds() {
        let local = parse_reference("#/components/schemas/User");
        assert_eq!(local.kind, ReferenceKind::Local);
        assert_eq!(local.fragment, Some("/components/schemas/User"));

        let relative = parse_reference("pets.yaml#/Pet");
        assert_eq!(relative.kind, ReferenceKind::Relative);
        assert_eq!(relative.document, "pets.yaml");

        let remote = parse_reference("https://example.com/api.yaml");
        assert_eq!(remote.kind, ReferenceKind::Remote);
        assert_eq!(remote.fragment, None);
    }

    #[test]
    fn test_decode_pointer_segment_percent_encoding() {
        let encoded = "User%20Profile~1details";
        let decoded = decode_pointer_segment(encoded);
        assert_eq!(decoded, "User Profile/details");
    }

    #[test]
    fn test_reference_name() {
        assert_eq!(reference_name("#/components/schemas/User"), "User");
        assert_eq!(reference_name("pets.yaml#/definitions/Pet~1Cat"), "Pet/Cat");
        assert_eq!(reference_name("go home, I am drunk"), "go home, I am drunk");
        assert_eq!(reference_name("schemas/pet.yaml"), "pet.yaml");
    }

    #[test]
    fn test_resolve_doc_uri_relative_to_base() {
        let base = parse_base_url("https://example.com/api/openapi.yaml").unwrap();
        let joined = resolve_doc_uri("./schemas/pet.yaml", Some(&base)).unwrap();
        assert_eq!(joined.as_str(), "https://example.com/api/schemas/pet.yaml");

        let dummy = parse_base_url("pet.yaml").unwrap();
        assert_eq!(dummy.as_str(), "http://example.invalid/pet.yaml");
    }
}
