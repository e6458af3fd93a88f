//! Tenant-scoped URL rewriting

use std::borrow::Cow;

use url::Url;

use crate::{Error, Result};

/// Builds backend URLs from inbound paths
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    base: Url,
    placeholder: String,
}

impl UrlRewriter {
    /// `base` is the backend URL paths are appended to; `placeholder` is the
    /// text a tenant id replaces. An empty placeholder disables substitution.
    pub fn new(base: &str, placeholder: impl Into<String>) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| Error::Config(format!("backend.endpoint: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "backend.endpoint: '{base}' cannot carry a path"
            )));
        }
        Ok(Self {
            base,
            placeholder: placeholder.into(),
        })
    }

    /// Backend URL for the decoded `path`, scoped to `tenant_id` when one is given.
    ///
    /// Only the first occurrence of the placeholder is replaced. Each segment
    /// is percent-encoded on the way out (`%` included), so the backend
    /// decodes exactly the path that was inspected here.
    #[must_use]
    pub fn build_url(&self, path: &str, tenant_id: Option<&str>) -> String {
        let path = match tenant_id {
            Some(tenant_id) if !self.placeholder.is_empty() => {
                Cow::Owned(path.replacen(&self.placeholder, tenant_id, 1))
            }
            _ => Cow::Borrowed(path),
        };

        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.split('/'));
        }
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASE: &str = "http://localhost:9200/";

    #[test]
    fn test_no_tenant_passes_through() {
        let rewriter = UrlRewriter::new(BASE, "_all").unwrap();
        assert_eq!(
            rewriter.build_url("_all/_search", None),
            "http://localhost:9200/_all/_search"
        );
    }

    #[test]
    fn test_tenant_replaces_placeholder() {
        let rewriter = UrlRewriter::new(BASE, "_all").unwrap();
        assert_eq!(
            rewriter.build_url("_all/_search", Some("t-42")),
            "http://localhost:9200/t-42/_search"
        );
    }

    #[test]
    fn test_only_first_occurrence_replaced() {
        let rewriter = UrlRewriter::new(BASE, "_all").unwrap();
        assert_eq!(
            rewriter.build_url("_all/docs/_all", Some("t-42")),
            "http://localhost:9200/t-42/docs/_all"
        );
    }

    #[test]
    fn test_missing_placeholder_leaves_path() {
        let rewriter = UrlRewriter::new(BASE, "_all").unwrap();
        assert_eq!(
            rewriter.build_url("logs/_msearch", Some("t-42")),
            "http://localhost:9200/logs/_msearch"
        );
    }

    #[test]
    fn test_empty_placeholder_is_noop() {
        let rewriter = UrlRewriter::new(BASE, "").unwrap();
        assert_eq!(
            rewriter.build_url("_all/_search", Some("t-42")),
            "http://localhost:9200/_all/_search"
        );
    }

    #[test]
    fn test_reserved_characters_are_encoded() {
        let rewriter = UrlRewriter::new(BASE, "_all").unwrap();
        assert_eq!(
            rewriter.build_url("logs/%5Fsearch", None),
            "http://localhost:9200/logs/%255Fsearch"
        );
        assert_eq!(
            rewriter.build_url("my logs/_doc", None),
            "http://localhost:9200/my%20logs/_doc"
        );
        assert_eq!(
            rewriter.build_url("_all/_search", Some("t/42")),
            "http://localhost:9200/t%2F42/_search"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let rewriter = UrlRewriter::new("http://proxy:8080/es/", "_all").unwrap();
        assert_eq!(
            rewriter.build_url("_all/_search", Some("t-42")),
            "http://proxy:8080/es/t-42/_search"
        );
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        assert!(UrlRewriter::new("not a url", "_all").is_err());
        assert!(UrlRewriter::new("mailto:ops@example.com", "_all").is_err());
    }
}
