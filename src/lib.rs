//! JSON Schema Dereferencer
//!
//! Loads a root schema by URI, fetches every document its `$ref`s point to,
//! and inlines the targets so consumers see a single schema free of `$ref`
//! indirection.
//!
//! # Example
//!
//! ```
//! use jsonschema_deref::{Resolver, ResolveOptions};
//! use serde_json::json;
//! use url::Url;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let schema = json!({
//!     "definitions": { "a": { "type": "string" } },
//!     "properties": { "x": { "$ref": "#/definitions/a" } }
//! });
//!
//! let resolver = Resolver::new(ResolveOptions::new().remote(false)).unwrap();
//! let base = Url::parse("file:///schemas/root.json").unwrap();
//! let resolved = resolver.resolve_document(base, schema).await.unwrap();
//!
//! assert_eq!(resolved["properties"]["x"], json!({ "type": "string" }));
//! # });
//! ```
//!
//! # Walk Rules
//!
//! | Node kind | Children walked |
//! |-----------|-----------------|
//! | `allOf` / `anyOf` / `oneOf` | each branch |
//! | object (`type: object` or bare `properties`) | each property schema |
//! | array (`type: array` or bare `items`) | `items` |
//! | anything else | none |
//!
//! `definitions` are only reached through references. A `type` array is
//! rewritten into a `oneOf` of single-type copies before its children are
//! walked.
//!
//! # Reference Forms
//!
//! - `#/json/pointer` and bare `json/pointer`: same document
//! - `file:///abs/path.json#/pointer`, `https://host/schema.json#/pointer`
//! - `relative/path.json#/pointer`: joined against the referring document

mod error;
mod loader;
mod pointer;
mod resolver;
mod types;
mod uri;

pub use error::ResolveError;
pub use loader::{load_schema_str, FileTransport, Loader, Transport};
pub use pointer::{resolve_fragment, segments};
pub use resolver::{resolve, Resolver};
pub use types::{classify, NodeKind, RecursionPolicy, ResolveOptions, DEFAULT_HTTP_TIMEOUT};
pub use uri::{parse_source, Reference, Scheme};

#[cfg(feature = "remote")]
pub use loader::HttpTransport;
