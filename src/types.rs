//! Core types: node classification and resolution options.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

/// Default timeout for HTTP requests (10 seconds).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Combinator keywords, each carrying a sequence of sub-schemas.
pub const COMBINATORS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Structural kind of a schema node.
///
/// Determines which children the tree walk descends into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Any,
    Object,
    Array,
    OneOf,
    AnyOf,
    AllOf,
    Enum,
    Boolean,
    Number,
    String,
    Null,
}

impl NodeKind {
    /// Returns the combinator keyword for `OneOf`, `AnyOf` and `AllOf`.
    pub fn combinator_keyword(&self) -> Option<&'static str> {
        match self {
            NodeKind::OneOf => Some("oneOf"),
            NodeKind::AnyOf => Some("anyOf"),
            NodeKind::AllOf => Some("allOf"),
            _ => None,
        }
    }
}

/// Classify a schema node by its recognized keywords.
///
/// Never fails: anything that is not a non-empty object is `Any`.
/// Precedence matters: a node carrying both `properties` and `oneOf`
/// is a `OneOf`, not an `Object`.
pub fn classify(node: &Value) -> NodeKind {
    let Some(map) = node.as_object() else {
        return NodeKind::Any;
    };
    if map.is_empty() {
        return NodeKind::Any;
    }

    let ty = map.get("type");
    let type_name = ty.and_then(Value::as_str);

    if !COMBINATORS.iter().any(|k| map.contains_key(*k)) {
        if type_name == Some("object") || (map.contains_key("properties") && ty.is_none()) {
            return NodeKind::Object;
        }
        if type_name == Some("array") || (map.contains_key("items") && ty.is_none()) {
            return NodeKind::Array;
        }
    }

    let is_sequence = |key: &str| map.get(key).is_some_and(Value::is_array);
    if is_sequence("oneOf") {
        return NodeKind::OneOf;
    }
    if is_sequence("anyOf") {
        return NodeKind::AnyOf;
    }
    if is_sequence("allOf") {
        return NodeKind::AllOf;
    }

    if map.contains_key("enum") {
        return NodeKind::Enum;
    }

    match type_name {
        Some("boolean") => NodeKind::Boolean,
        Some("number") | Some("integer") => NodeKind::Number,
        Some("string") => NodeKind::String,
        Some("null") => NodeKind::Null,
        _ => NodeKind::Any,
    }
}

/// What to do when a reference re-enters a schema that is already being
/// expanded on the current path (a recursive schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecursionPolicy {
    /// Fail the whole resolution with `CircularReference`.
    #[default]
    Fail,
    /// Leave the `$ref` in place and stop descending at that node.
    KeepRef,
}

/// Options for schema resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Timeout for each HTTP request.
    pub http_timeout: Duration,
    /// Whether `http`/`https` references may be fetched.
    pub remote: bool,
    /// Handling of recursive schemas.
    pub recursion: RecursionPolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            remote: cfg!(feature = "remote"),
            recursion: RecursionPolicy::Fail,
        }
    }
}

impl ResolveOptions {
    /// Create options with the defaults: remote fetching on, recursion fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP request timeout.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Allow or forbid fetching `http`/`https` documents.
    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote && cfg!(feature = "remote");
        self
    }

    /// Set the recursion policy.
    pub fn recursion(mut self, recursion: RecursionPolicy) -> Self {
        self.recursion = recursion;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_any() {
        assert_eq!(classify(&Value::Null), NodeKind::Any);
        assert_eq!(classify(&json!({})), NodeKind::Any);
        assert_eq!(classify(&json!({ "foo": 1, "bar": 2 })), NodeKind::Any);
        assert_eq!(
            classify(&json!({ "type": "non-existing-type" })),
            NodeKind::Any
        );
        assert_eq!(classify(&json!(true)), NodeKind::Any);
    }

    #[test]
    fn classify_primitives() {
        assert_eq!(classify(&json!({ "type": "string" })), NodeKind::String);
        assert_eq!(
            classify(&json!({ "type": "string", "description": "foo" })),
            NodeKind::String
        );
        assert_eq!(classify(&json!({ "type": "boolean" })), NodeKind::Boolean);
        assert_eq!(classify(&json!({ "type": "number" })), NodeKind::Number);
        assert_eq!(classify(&json!({ "type": "integer" })), NodeKind::Number);
        assert_eq!(classify(&json!({ "type": "null" })), NodeKind::Null);
    }

    #[test]
    fn classify_object_by_type_or_properties() {
        assert_eq!(classify(&json!({ "type": "object" })), NodeKind::Object);
        assert_eq!(
            classify(&json!({ "properties": { "a": {} } })),
            NodeKind::Object
        );
        // An explicit non-object type wins over the properties heuristic
        assert_eq!(
            classify(&json!({ "type": "string", "properties": {} })),
            NodeKind::String
        );
    }

    #[test]
    fn classify_array_by_type_or_items() {
        assert_eq!(classify(&json!({ "type": "array" })), NodeKind::Array);
        assert_eq!(
            classify(&json!({ "items": { "type": "string" } })),
            NodeKind::Array
        );
    }

    #[test]
    fn classify_combinators_take_precedence_over_structure() {
        let node = json!({
            "type": "object",
            "properties": { "a": {} },
            "oneOf": [{ "required": ["a"] }]
        });
        assert_eq!(classify(&node), NodeKind::OneOf);
        assert_eq!(classify(&json!({ "anyOf": [] })), NodeKind::AnyOf);
        assert_eq!(classify(&json!({ "allOf": [] })), NodeKind::AllOf);
        // oneOf before anyOf before allOf
        assert_eq!(
            classify(&json!({ "allOf": [], "anyOf": [], "oneOf": [] })),
            NodeKind::OneOf
        );
    }

    #[test]
    fn classify_non_sequence_combinator_falls_through() {
        assert_eq!(
            classify(&json!({ "oneOf": {}, "type": "string" })),
            NodeKind::String
        );
        assert_eq!(
            classify(&json!({ "oneOf": "x", "enum": [1, 2] })),
            NodeKind::Enum
        );
    }

    #[test]
    fn classify_enum() {
        assert_eq!(classify(&json!({ "enum": ["a", "b"] })), NodeKind::Enum);
        assert_eq!(
            classify(&json!({ "type": "string", "enum": ["a"] })),
            NodeKind::Enum
        );
    }

    #[test]
    fn combinator_keyword() {
        assert_eq!(NodeKind::OneOf.combinator_keyword(), Some("oneOf"));
        assert_eq!(NodeKind::AnyOf.combinator_keyword(), Some("anyOf"));
        assert_eq!(NodeKind::AllOf.combinator_keyword(), Some("allOf"));
        assert_eq!(NodeKind::Object.combinator_keyword(), None);
    }

    #[test]
    fn node_kind_serializes_camel_case() {
        assert_eq!(serde_json::to_value(NodeKind::OneOf).unwrap(), "oneOf");
        assert_eq!(serde_json::to_value(NodeKind::Any).unwrap(), "any");
    }

    #[test]
    fn resolve_options_builder() {
        let opts = ResolveOptions::new()
            .http_timeout(Duration::from_secs(3))
            .recursion(RecursionPolicy::KeepRef)
            .remote(false);
        assert_eq!(opts.http_timeout, Duration::from_secs(3));
        assert_eq!(opts.recursion, RecursionPolicy::KeepRef);
        assert!(!opts.remote);
    }
}
