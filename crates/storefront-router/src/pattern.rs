//! Route patterns.

use crate::{normalize_path, InvalidParam, Params};

/// One segment of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Captures the path segment under this name.
    Param(String),
}

/// A parsed path pattern such as `/products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parses a pattern. Trailing slashes are ignored.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let normalized = normalize_path(pattern);
        let segments = split(normalized)
            .map(|seg| {
                match seg
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .filter(|name| !name.is_empty())
                {
                    Some(name) => Segment::Param(name.to_string()),
                    None => Segment::Literal(seg.to_string()),
                }
            })
            .collect();

        Self {
            raw: normalized.to_string(),
            segments,
        }
    }

    /// The normalized pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Matches `path`, returning captured parameters on success.
    ///
    /// Literals are compared against the raw segment; captured segments are
    /// percent-decoded.
    ///
    /// # Errors
    ///
    /// [`InvalidParam`] if the path matches but a captured segment does not
    /// decode to UTF-8.
    pub fn matches(&self, path: &str) -> Result<Option<Params>, InvalidParam> {
        let mut params = Params::new();
        let mut parts = split(normalize_path(path));

        for segment in &self.segments {
            let Some(part) = parts.next() else {
                return Ok(None);
            };
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return Ok(None),
                Segment::Param(_) if part.is_empty() => return Ok(None),
                Segment::Param(name) => {
                    let value = urlencoding::decode(part).map_err(|_| InvalidParam {
                        name: name.clone(),
                        raw: part.to_string(),
                    })?;
                    params.push(name.as_str(), value);
                }
            }
        }

        if parts.next().is_some() {
            return Ok(None);
        }
        Ok(Some(params))
    }
}

// Segments after the leading '/'; the root has none.
fn split(path: &str) -> impl Iterator<Item = &str> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    rest.split('/').filter(move |_| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let pattern = Pattern::parse("/products/{id}/");
        assert_eq!(pattern.as_str(), "/products/{id}");
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("products".to_string()),
                Segment::Param("id".to_string())
            ]
        );
        assert!(Pattern::parse("/").segments().is_empty());
    }

    #[test]
    fn test_root_only_matches_root() {
        let root = Pattern::parse("/");
        assert!(root.matches("/").unwrap().is_some());
        assert!(root.matches("").unwrap().is_some());
        assert!(root.matches("/cart").unwrap().is_none());
    }

    #[test]
    fn test_param_capture() {
        let pattern = Pattern::parse("/products/{id}");
        let params = pattern.matches("/products/42").unwrap().unwrap();
        assert_eq!(params.get("id"), Some("42"));

        assert!(pattern.matches("/products").unwrap().is_none());
        assert!(pattern.matches("/products/42/reviews").unwrap().is_none());
    }

    #[test]
    fn test_param_is_percent_decoded() {
        let pattern = Pattern::parse("/products/{id}");
        let params = pattern.matches("/products/summer%20dress").unwrap().unwrap();
        assert_eq!(params.get("id"), Some("summer dress"));

        let params = pattern.matches("/products/caf%C3%A9").unwrap().unwrap();
        assert_eq!(params.get("id"), Some("café"));

        // '+' is only a space in query strings
        let params = pattern.matches("/products/a+b").unwrap().unwrap();
        assert_eq!(params.get("id"), Some("a+b"));
    }

    #[test]
    fn test_param_with_invalid_utf8_is_an_error() {
        let pattern = Pattern::parse("/products/{id}");
        let err = pattern.matches("/products/%FF%FE").unwrap_err();
        assert_eq!(err.name, "id");
        assert_eq!(err.raw, "%FF%FE");

        // Non-matching paths never decode
        assert!(pattern.matches("/cart/%FF").unwrap().is_none());
    }

    #[test]
    fn test_empty_segment_does_not_capture() {
        let pattern = Pattern::parse("/products/{id}/reviews");
        assert!(pattern.matches("/products//reviews").unwrap().is_none());
    }

    #[test]
    fn test_braces_without_name_are_literal() {
        let pattern = Pattern::parse("/odd/{}");
        assert!(pattern.matches("/odd/{}").unwrap().is_some());
        assert!(pattern.matches("/odd/x").unwrap().is_none());
    }
}
