//! Error types for schema loading and dereferencing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors during schema loading and `$ref` resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[cfg(feature = "remote")]
    #[error("cannot build HTTP client: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON in {uri}: {source}")]
    InvalidJson {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URI \"{uri}\": {message}")]
    InvalidUri { uri: String, message: String },

    #[error("unsupported URI scheme \"{scheme}\" in {uri}: expected file, http or https")]
    UnsupportedScheme { uri: String, scheme: String },

    // Reference errors (exit code 2)
    #[error("reference {pointer:?} does not exist in {uri}")]
    DanglingReference { uri: String, pointer: String },

    #[error("circular reference: {}", chain.join(" -> "))]
    CircularReference { chain: Vec<String> },

    #[error("invalid $ref {reference}: {message}")]
    InvalidReference { reference: String, message: String },

    #[error("cannot load schema for $ref \"{reference}\": {source}")]
    SchemaLoad {
        reference: String,
        #[source]
        source: Box<ResolveError>,
    },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        if self.is_transport() {
            3
        } else {
            2
        }
    }

    /// True when the failure came from reading a file or issuing a request,
    /// looking through `SchemaLoad` wrappers.
    pub fn is_transport(&self) -> bool {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => true,
            #[cfg(feature = "remote")]
            ResolveError::NetworkError { .. } | ResolveError::HttpClient { .. } => true,
            ResolveError::SchemaLoad { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_exit_codes() {
        let err = ResolveError::FileNotFound {
            path: PathBuf::from("test.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = ResolveError::DanglingReference {
            uri: "file:///schema.json".into(),
            pointer: "/definitions/missing".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = ResolveError::UnsupportedScheme {
            uri: "ftp://example.com/schema.json".into(),
            scheme: "ftp".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn schema_load_inherits_transport_exit_code() {
        let err = ResolveError::SchemaLoad {
            reference: "file:///missing.json#/a".into(),
            source: Box::new(ResolveError::FileNotFound {
                path: PathBuf::from("/missing.json"),
            }),
        };
        assert!(err.is_transport());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn circular_reference_display() {
        let err = ResolveError::CircularReference {
            chain: vec!["file:///a.json#/x".into(), "file:///a.json#/y".into()],
        };
        assert_eq!(
            err.to_string(),
            "circular reference: file:///a.json#/x -> file:///a.json#/y"
        );
    }

    #[test]
    fn dangling_reference_display() {
        let err = ResolveError::DanglingReference {
            uri: "file:///schema.json".into(),
            pointer: "/definitions/missing".into(),
        };
        assert_eq!(
            err.to_string(),
            "reference \"/definitions/missing\" does not exist in file:///schema.json"
        );
    }
}
