//! JSON Pointer fragments.

use serde_json::Value;

/// Marker segment meaning "the document root".
const ROOT: &str = "#";

/// Split a pointer into path segments.
///
/// A leading empty segment or `#` is the document root and is dropped, so
/// `#/definitions/a`, `/definitions/a` and `definitions/a` all yield
/// `["definitions", "a"]`. `~1` and `~0` are unescaped.
pub fn segments(pointer: &str) -> Vec<String> {
    let mut parts = pointer.split('/').peekable();
    if matches!(parts.peek(), Some(&"") | Some(&ROOT)) {
        parts.next();
    }
    parts
        .map(|part| part.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Walk `document` along `segments`.
///
/// Returns `None` when a segment does not exist on the current value.
pub fn resolve_fragment<'v, S: AsRef<str>>(
    document: &'v Value,
    segments: &[S],
) -> Option<&'v Value> {
    let Some((head, tail)) = segments.split_first() else {
        return Some(document);
    };
    let key = head.as_ref();
    if key == ROOT {
        return resolve_fragment(document, tail);
    }
    let child = match document {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }?;
    resolve_fragment(child, tail)
}

/// Canonical pointer string for `segments`, used to key dereferences.
pub fn pointer_key<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| *s != ROOT)
        .map(|s| format!("/{}", s.replace('~', "~0").replace('/', "~1")))
        .collect()
}
