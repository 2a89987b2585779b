//! URI handling for schema sources and `$ref` values.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::ResolveError;

/// Transport a document URL is fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    File,
    /// Both `http` and `https`.
    Http,
}

impl Scheme {
    /// Map a URL scheme to a transport, `None` if unsupported.
    pub fn from_url(url: &Url) -> Option<Self> {
        match url.scheme() {
            "file" => Some(Scheme::File),
            "http" | "https" => Some(Scheme::Http),
            _ => None,
        }
    }
}

/// Parsed form of a `$ref` value relative to the document it appears in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Resolved by pointer-walking the current document.
    SameDocument { pointer: String },
    /// Resolved by loading `document` and walking `pointer` inside it.
    External { document: Url, pointer: String },
}

impl Reference {
    /// Parse a `$ref` string found in the document at `base`.
    ///
    /// Accepted forms:
    /// - `#/json/pointer` and bare pointers such as `definitions/a`
    /// - absolute `file://` and `http(s)://` URIs with an optional fragment
    /// - relative document paths with a fragment, e.g. `common.json#/a`,
    ///   joined against `base`
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnsupportedScheme` for other schemes and
    /// `ResolveError::InvalidUri` if the value cannot be parsed.
    pub fn parse(reference: &str, base: &Url) -> Result<Self, ResolveError> {
        if let Some(fragment) = reference.strip_prefix('#') {
            return Ok(Reference::SameDocument {
                pointer: decode_fragment(reference, fragment)?,
            });
        }

        let url = match Url::parse(reference) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) if !reference.contains('#') => {
                return Ok(Reference::SameDocument {
                    pointer: reference.to_string(),
                });
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                base.join(reference).map_err(|e| invalid_uri(reference, e))?
            }
            Err(e) => return Err(invalid_uri(reference, e)),
        };

        if Scheme::from_url(&url).is_none() {
            return Err(ResolveError::UnsupportedScheme {
                uri: reference.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let pointer = decode_fragment(reference, url.fragment().unwrap_or_default())?;
        let document = without_fragment(&url);
        if document == without_fragment(base) {
            Ok(Reference::SameDocument { pointer })
        } else {
            Ok(Reference::External { document, pointer })
        }
    }
}

/// Turn a schema source (URI or filesystem path) into a URL.
///
/// Relative paths are made absolute against the current directory.
/// Single-letter schemes are drive letters, not URIs.
pub fn parse_source(source: &str) -> Result<Url, ResolveError> {
    if let Ok(url) = Url::parse(source) {
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }

    let path = Path::new(source);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| ResolveError::ReadError {
                path: path.to_path_buf(),
                source,
            })?
            .join(path)
    };

    Url::from_file_path(&absolute).map_err(|()| ResolveError::InvalidUri {
        uri: source.to_string(),
        message: "not an absolute file path".into(),
    })
}

/// Copy of `url` with the fragment removed.
pub fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Filesystem path named by a `file://` URL.
///
/// On drive-letter filesystems the URL path `/C:/dir/x.json` maps to
/// `C:/dir/x.json`; elsewhere the path is used verbatim.
pub fn file_path(url: &Url) -> Result<PathBuf, ResolveError> {
    url.to_file_path().map_err(|()| ResolveError::InvalidUri {
        uri: url.to_string(),
        message: "not a local file path".into(),
    })
}

/// Percent-decode a URI fragment into the JSON Pointer it carries.
fn decode_fragment(reference: &str, fragment: &str) -> Result<String, ResolveError> {
    percent_decode_str(fragment)
        .decode_utf8()
        .map(|pointer| pointer.into_owned())
        .map_err(|e| ResolveError::InvalidUri {
            uri: reference.to_string(),
            message: format!("fragment is not UTF-8 once decoded: {e}"),
        })
}

fn invalid_uri(uri: &str, err: url::ParseError) -> ResolveError {
    ResolveError::InvalidUri {
        uri: uri.to_string(),
        message: err.to_string(),
    }
}
