//! Schema dereferencing - inlines every `$ref` reachable from the root.
//!
//! The walk resolves a node's own reference first, then fans out over the
//! children its [`NodeKind`] exposes. Siblings resolve concurrently on the
//! calling task; the first failure aborts the whole resolution.

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::Url;

use crate::error::ResolveError;
use crate::loader::{FileTransport, Loader, Transport};
use crate::pointer::{pointer_key, resolve_fragment, segments};
use crate::types::{classify, json_type_name, NodeKind, RecursionPolicy, ResolveOptions};
use crate::uri::{parse_source, without_fragment, Reference, Scheme};

#[cfg(feature = "remote")]
use crate::loader::HttpTransport;

const REF: &str = "$ref";

/// Dereference the schema at `source` with default options.
///
/// `source` is a `file://` or `http(s)://` URI, or a filesystem path.
///
/// # Errors
///
/// Returns the first `ResolveError` hit anywhere in the tree.
pub async fn resolve(source: &str) -> Result<Value, ResolveError> {
    Resolver::new(ResolveOptions::default())?.resolve(source).await
}

/// Configured entry point for dereferencing schemas.
///
/// Each call to [`Resolver::resolve`] gets its own document cache, so no
/// state leaks between resolutions.
#[derive(Clone)]
pub struct Resolver {
    options: ResolveOptions,
    file: Arc<dyn Transport>,
    http: Option<Arc<dyn Transport>>,
}

impl Resolver {
    /// Create a resolver with the built-in file and HTTP transports.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::HttpClient` if remote fetching is enabled and
    /// the HTTP client cannot be built.
    pub fn new(options: ResolveOptions) -> Result<Self, ResolveError> {
        let http = http_transport(&options)?;
        Ok(Self {
            options,
            file: Arc::new(FileTransport),
            http,
        })
    }

    /// Replace the transport used for `scheme`.
    pub fn with_transport(mut self, scheme: Scheme, transport: impl Transport + 'static) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        match scheme {
            Scheme::File => self.file = transport,
            Scheme::Http => self.http = Some(transport),
        }
        self
    }

    /// The options this resolver was built with.
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Load the raw document at `source` without dereferencing it.
    pub async fn fetch(&self, source: &str) -> Result<Value, ResolveError> {
        let url = parse_source(source)?;
        let document = self.loader().load(&url).await?;
        Ok(Value::clone(&document))
    }

    /// Load the schema at `source` and inline every reference in it.
    pub async fn resolve(&self, source: &str) -> Result<Value, ResolveError> {
        let url = parse_source(source)?;
        let loader = self.loader();
        let root = loader.load(&url).await?;
        Walker::new(&loader, &self.options)
            .run(without_fragment(&url), root)
            .await
    }

    /// Inline every reference in an already-parsed `document`.
    ///
    /// Relative references resolve against `base`.
    pub async fn resolve_document(
        &self,
        base: Url,
        document: Value,
    ) -> Result<Value, ResolveError> {
        let loader = self.loader();
        Walker::new(&loader, &self.options)
            .run(without_fragment(&base), Arc::new(document))
            .await
    }

    fn loader(&self) -> Loader {
        let http = if self.options.remote {
            self.http.clone()
        } else {
            None
        };
        Loader::new(Arc::clone(&self.file), http)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "remote")]
fn http_transport(options: &ResolveOptions) -> Result<Option<Arc<dyn Transport>>, ResolveError> {
    if !options.remote {
        return Ok(None);
    }
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(options.http_timeout)?);
    Ok(Some(transport))
}

#[cfg(not(feature = "remote"))]
fn http_transport(_options: &ResolveOptions) -> Result<Option<Arc<dyn Transport>>, ResolveError> {
    Ok(None)
}

/// The document a node's content came from, plus the references already
/// expanded on the path from the root to that node.
#[derive(Debug, Clone)]
struct Scope {
    url: Url,
    document: Arc<Value>,
    trail: Vec<String>,
}

impl Scope {
    fn root(url: Url, document: Arc<Value>) -> Self {
        let trail = vec![format!("{}#", url)];
        Self {
            url,
            document,
            trail,
        }
    }
}

struct Walker<'r> {
    loader: &'r Loader,
    options: &'r ResolveOptions,
}

impl<'r> Walker<'r> {
    fn new(loader: &'r Loader, options: &'r ResolveOptions) -> Self {
        Self { loader, options }
    }

    async fn run(&self, url: Url, document: Arc<Value>) -> Result<Value, ResolveError> {
        // Same-document references read the pristine snapshot while the
        // working copy is rewritten in place.
        let mut root = Value::clone(&document);
        self.resolve_tree(&mut root, Scope::root(url, document)).await?;
        Ok(root)
    }

    /// Resolve `node`'s reference, then every structural child, concurrently.
    fn resolve_tree<'a>(
        &'a self,
        node: &'a mut Value,
        scope: Scope,
    ) -> BoxFuture<'a, Result<(), ResolveError>> {
        async move {
            let Some(scope) = self.resolve_reference(node, scope).await? else {
                return Ok(());
            };

            let children = if expand_type_union(node) {
                union_child_nodes(node)
            } else {
                child_nodes(node)
            };
            trace!(count = children.len(), document = %scope.url, "walking children");
            future::try_join_all(
                children
                    .into_iter()
                    .map(|child| self.resolve_tree(child, scope.clone())),
            )
            .await?;
            Ok(())
        }
        .boxed()
    }

    /// Replace `node`'s `$ref` with its target until none remains.
    ///
    /// Returns the scope the node's children resolve in, or `None` if the
    /// node was left as a recursive reference.
    async fn resolve_reference(
        &self,
        node: &mut Value,
        mut scope: Scope,
    ) -> Result<Option<Scope>, ResolveError> {
        while let Some(reference) = node.get(REF) {
            let reference = match reference {
                Value::String(s) => s.clone(),
                other => {
                    return Err(ResolveError::InvalidReference {
                        reference: other.to_string(),
                        message: format!("expected string, got {}", json_type_name(other)),
                    })
                }
            };

            let (url, document, pointer) = match Reference::parse(&reference, &scope.url)? {
                Reference::SameDocument { pointer } => {
                    (scope.url.clone(), Arc::clone(&scope.document), pointer)
                }
                Reference::External { document, pointer } => {
                    let loaded = self.loader.load(&document).await.map_err(|source| {
                        ResolveError::SchemaLoad {
                            reference: reference.clone(),
                            source: Box::new(source),
                        }
                    })?;
                    (document, loaded, pointer)
                }
            };

            let path = segments(&pointer);
            let key = format!("{}#{}", url, pointer_key(&path));
            if scope.trail.contains(&key) {
                match self.options.recursion {
                    RecursionPolicy::KeepRef => {
                        debug!(%reference, "keeping recursive reference");
                        return Ok(None);
                    }
                    RecursionPolicy::Fail => {
                        let mut chain = scope.trail.clone();
                        chain.push(key);
                        return Err(ResolveError::CircularReference { chain });
                    }
                }
            }

            let target = resolve_fragment(&document, &path).ok_or_else(|| {
                ResolveError::DanglingReference {
                    uri: url.to_string(),
                    pointer: pointer.clone(),
                }
            })?;
            debug!(%reference, target = %key, "dereferenced");
            splice(node, target.clone(), &reference)?;

            scope.trail.push(key);
            scope.url = url;
            scope.document = document;
        }
        Ok(Some(scope))
    }
}

/// Drop the node's `$ref` and copy the target's keys over the node.
///
/// Sibling keys survive unless the target overwrites them.
fn splice(node: &mut Value, target: Value, reference: &str) -> Result<(), ResolveError> {
    let Value::Object(map) = node else {
        return Ok(());
    };
    map.shift_remove(REF);

    match target {
        Value::Object(target) => {
            for (key, value) in target {
                map.insert(key, value);
            }
            Ok(())
        }
        other if map.is_empty() => {
            *node = other;
            Ok(())
        }
        other => Err(ResolveError::InvalidReference {
            reference: reference.to_string(),
            message: format!(
                "target is {}, cannot merge with sibling keys",
                json_type_name(&other)
            ),
        }),
    }
}

/// Rewrite `"type": [a, b, ...]` into a `oneOf` of single-type copies.
///
/// Returns whether the node was rewritten. A scalar `type` is left alone.
fn expand_type_union(node: &mut Value) -> bool {
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    if !matches!(map.get("type"), Some(Value::Array(_))) {
        return false;
    }
    let Some(Value::Array(types)) = map.shift_remove("type") else {
        return false;
    };
    debug!(count = types.len(), "expanding type union into oneOf");

    let variants = types
        .into_iter()
        .map(|ty| {
            let mut variant: Map<String, Value> = map.clone();
            variant.insert("type".to_string(), ty);
            Value::Object(variant)
        })
        .collect();
    map.insert("oneOf".to_string(), Value::Array(variants));
    true
}

/// Children of an expanded type union: the `oneOf` copies plus the node's own
/// `properties` and `items`, which stay on the node beside the copies.
fn union_child_nodes(node: &mut Value) -> Vec<&mut Value> {
    let Some(map) = node.as_object_mut() else {
        return Vec::new();
    };
    let mut children = Vec::new();
    for (key, value) in map.iter_mut() {
        match (key.as_str(), value) {
            ("properties", Value::Object(props)) => children.extend(props.values_mut()),
            ("items", Value::Array(items)) => children.extend(items.iter_mut()),
            ("items", items) => children.push(items),
            ("oneOf", Value::Array(variants)) => children.extend(variants.iter_mut()),
            _ => {}
        }
    }
    children
}

/// Children the tree walk descends into, by node kind.
fn child_nodes(node: &mut Value) -> Vec<&mut Value> {
    let kind = classify(node);
    let keyword = match kind {
        NodeKind::AllOf | NodeKind::AnyOf | NodeKind::OneOf => kind.combinator_keyword(),
        NodeKind::Object => Some("properties"),
        NodeKind::Array => Some("items"),
        _ => None,
    };
    let (Some(keyword), Some(map)) = (keyword, node.as_object_mut()) else {
        return Vec::new();
    };

    match (kind, map.get_mut(keyword)) {
        (NodeKind::Object, Some(Value::Object(props))) => props.values_mut().collect(),
        // Tuple form: one schema per position
        (NodeKind::Array, Some(Value::Array(items))) => items.iter_mut().collect(),
        (NodeKind::Array, Some(items)) => vec![items],
        (
            NodeKind::AllOf | NodeKind::AnyOf | NodeKind::OneOf,
            Some(Value::Array(branches)),
        ) => branches.iter_mut().collect(),
        _ => Vec::new(),
    }
}
