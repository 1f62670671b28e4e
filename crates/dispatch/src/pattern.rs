//! Route pattern compilation.
//!
//! A pattern has the form `[domain]/literal[/:param]*`:
//!
//! - `/sites` is a plain pattern, matched by exact string equality
//! - `/sites/:siteId/plugins/:pluginId` declares two parameters, each one
//!   capturing exactly one non-empty path segment
//! - `api.example.com/sites/` carries a domain literal, everything before the
//!   first `/` is the domain
//!
//! Every compiled pattern records its depth, the number of `/` in its path
//! minus one. A request path can only match patterns of the same depth, which
//! is what lets [`RouterHub`](crate::RouterHub) bucket its routes.
//!
//! # Example
//!
//! ```
//! use micro_dispatch::CompiledPattern;
//!
//! let pattern = CompiledPattern::compile("/sites/:siteId/plugins/:pluginId").unwrap();
//! assert_eq!(pattern.depth(), 3);
//! assert_eq!(pattern.base_path(), "/sites/");
//!
//! let params = pattern.matches("/sites/7/plugins/9").unwrap();
//! assert_eq!(params.get("siteId"), Some("7"));
//! assert_eq!(params.get("pluginId"), Some("9"));
//! ```

use regex::Regex;

use crate::error::RouteError;
use crate::request::PathParams;

const SEPARATOR: char = '/';
const PARAM_PREFIX: char = ':';
const SEGMENT_CAPTURE: &str = "([^/]+)";

/// Returns the depth of a url path: the count of `/` minus one.
///
/// `/sites` has depth 0, `/sites/` and `/sites/1` have depth 1.
#[inline]
pub fn path_depth(path: &str) -> usize {
    path.matches(SEPARATOR).count().saturating_sub(1)
}

/// A route pattern compiled into its matchable form.
///
/// The matcher is present iff the pattern declares at least one parameter.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: String,
    domain: Option<String>,
    base_path: String,
    param_names: Vec<String>,
    matcher: Option<Regex>,
    depth: usize,
}

impl CompiledPattern {
    /// Compiles a route pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if the pattern is empty, has no path
    /// separator, declares a parameter without a name, or if the matcher can not
    /// be built.
    pub fn compile(pattern: &str) -> Result<Self, RouteError> {
        if pattern.is_empty() {
            return Err(RouteError::invalid_pattern(pattern, "empty pattern"));
        }

        let Some(separator_index) = pattern.find(SEPARATOR) else {
            return Err(RouteError::invalid_pattern(pattern, "pattern has no path separator"));
        };

        let (domain, path) = pattern.split_at(separator_index);
        let domain = if domain.is_empty() { None } else { Some(domain.to_owned()) };

        let mut param_names = Vec::new();
        let mut base_path_end = None;
        let mut regex_str = String::with_capacity(path.len() + 16);
        regex_str.push('^');

        let mut segment_start = 0;
        for (index, segment) in path.split(SEPARATOR).enumerate() {
            if index > 0 {
                regex_str.push(SEPARATOR);
            }

            match segment.strip_prefix(PARAM_PREFIX) {
                Some("") => {
                    return Err(RouteError::invalid_pattern(pattern, "parameter without a name"));
                }
                // the first segment is always empty, a placeholder needs a leading separator
                Some(name) if index > 0 => {
                    base_path_end.get_or_insert(segment_start);
                    param_names.push(name.to_owned());
                    regex_str.push_str(SEGMENT_CAPTURE);
                }
                _ => regex_str.push_str(&regex::escape(segment)),
            }

            segment_start += segment.len() + 1;
        }
        regex_str.push('$');

        let depth = path_depth(path);
        let Some(base_path_end) = base_path_end else {
            return Ok(Self {
                pattern: pattern.to_owned(),
                domain,
                base_path: path.to_owned(),
                param_names,
                matcher: None,
                depth,
            });
        };

        let matcher = Regex::new(&regex_str).map_err(|e| RouteError::invalid_pattern(pattern, e))?;

        Ok(Self {
            pattern: pattern.to_owned(),
            domain,
            base_path: path[..base_path_end].to_owned(),
            param_names,
            matcher: Some(matcher),
            depth,
        })
    }

    /// The pattern string this was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The domain literal, if the pattern is not path only.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// The literal path prefix before the first parameter, or the whole path of a plain pattern.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The key routes are grouped into hubs by: the domain literal followed by the
    /// base path of a parametrized pattern, or by the path up to its last `/` for
    /// a plain pattern.
    ///
    /// `/users/me` thus shares the `/users/` hub with `/users/:id`, and the
    /// registration order decides which of the two serves `/users/me`.
    pub fn base_pattern(&self) -> String {
        let path = if self.is_plain() {
            self.base_path.rfind(SEPARATOR).map_or(self.base_path.as_str(), |index| &self.base_path[..=index])
        } else {
            &self.base_path
        };

        match &self.domain {
            Some(domain) => format!("{domain}{path}"),
            None => path.to_owned(),
        }
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true if the pattern has no parameter and is matched by plain string equality.
    #[inline]
    pub fn is_plain(&self) -> bool {
        self.matcher.is_none()
    }

    /// Tests the url path against this pattern.
    ///
    /// Returns the captured parameters on success, in declaration order. Only the
    /// path is tested, the domain literal is enforced by the server mux.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let Some(matcher) = &self.matcher else {
            return if self.base_path == path { Some(PathParams::empty()) } else { None };
        };

        let captures = matcher.captures(path)?;
        let mut params = PathParams::with_capacity(self.param_names.len());
        for (name, value) in self.param_names.iter().zip(captures.iter().skip(1)) {
            if let Some(value) = value {
                params.push(name, value.as_str());
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth() {
        assert_eq!(CompiledPattern::compile("/sites").unwrap().depth(), 0);
        assert_eq!(CompiledPattern::compile("/sites/").unwrap().depth(), 1);
        assert_eq!(CompiledPattern::compile("/sites/:siteId/").unwrap().depth(), 2);
        assert_eq!(CompiledPattern::compile("/sites/:siteId/plugins/:pluginId").unwrap().depth(), 3);
        assert_eq!(CompiledPattern::compile("example.com/a/b").unwrap().depth(), 1);

        assert_eq!(path_depth("/"), 0);
        assert_eq!(path_depth("/sites/1234/"), 2);
        assert_eq!(path_depth(""), 0);
    }

    #[test]
    fn test_plain_pattern() {
        let pattern = CompiledPattern::compile("/sites").unwrap();
        assert!(pattern.is_plain());
        assert!(pattern.param_names().is_empty());
        assert_eq!(pattern.base_path(), "/sites");

        let params = pattern.matches("/sites").unwrap();
        assert!(params.is_empty());
        assert!(pattern.matches("/sites/1").is_none());
        assert!(pattern.matches("/sites/").is_none());

        let pattern = CompiledPattern::compile("/sites/").unwrap();
        assert!(pattern.is_plain());
        assert!(pattern.matches("/sites/1234").is_none());
    }

    #[test]
    fn test_single_param() {
        let pattern = CompiledPattern::compile("/sites/:siteId/").unwrap();
        assert!(!pattern.is_plain());
        assert_eq!(pattern.base_path(), "/sites/");
        assert_eq!(pattern.param_names(), ["siteId"]);

        let params = pattern.matches("/sites/42/").unwrap();
        assert_eq!(params.get("siteId"), Some("42"));
        assert_eq!(params.len(), 1);

        assert!(pattern.matches("/sites/42").is_none());
        assert!(pattern.matches("/sites/42/extra").is_none());
    }

    #[test]
    fn test_multiple_params() {
        let pattern = CompiledPattern::compile("/sites/:siteId/plugins/:pluginId").unwrap();
        assert_eq!(pattern.param_names(), ["siteId", "pluginId"]);

        let params = pattern.matches("/sites/7/plugins/9").unwrap();
        assert_eq!(params.get("siteId"), Some("7"));
        assert_eq!(params.get("pluginId"), Some("9"));
        assert_eq!(params.iter().collect::<Vec<_>>(), [("siteId", "7"), ("pluginId", "9")]);

        assert!(pattern.matches("/sites/1234/").is_none());
        assert!(pattern.matches("/sites/7/plugins/").is_none());
        assert!(pattern.matches("/sites/7/plugins/9/").is_none());
    }

    #[test]
    fn test_literal_segments_are_escaped() {
        let pattern = CompiledPattern::compile("/files/:name/v1.0").unwrap();
        assert!(pattern.matches("/files/a/v1.0").is_some());
        assert!(pattern.matches("/files/a/v1x0").is_none());
    }

    #[test]
    fn test_duplicated_param_first_wins() {
        let pattern = CompiledPattern::compile("/a/:id/b/:id").unwrap();
        let params = pattern.matches("/a/1/b/2").unwrap();
        assert_eq!(params.get("id"), Some("1"));
    }

    #[test]
    fn test_domain() {
        let pattern = CompiledPattern::compile("api.example.com/users/:id").unwrap();
        assert_eq!(pattern.domain(), Some("api.example.com"));
        assert_eq!(pattern.base_path(), "/users/");
        assert_eq!(pattern.base_pattern(), "api.example.com/users/");
        assert_eq!(pattern.matches("/users/1").unwrap().get("id"), Some("1"));

        let pattern = CompiledPattern::compile("/users/:id").unwrap();
        assert_eq!(pattern.domain(), None);
        assert_eq!(pattern.base_pattern(), "/users/");
    }

    #[test]
    fn test_plain_base_pattern_is_parent_path() {
        let pattern = CompiledPattern::compile("/users/me").unwrap();
        assert_eq!(pattern.base_path(), "/users/me");
        assert_eq!(pattern.base_pattern(), "/users/");

        assert_eq!(CompiledPattern::compile("/users/").unwrap().base_pattern(), "/users/");
        assert_eq!(CompiledPattern::compile("/ping").unwrap().base_pattern(), "/");
        assert_eq!(CompiledPattern::compile("api.example.com/users/me").unwrap().base_pattern(), "api.example.com/users/");
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(CompiledPattern::compile(""), Err(RouteError::InvalidPattern { .. })));
        assert!(matches!(CompiledPattern::compile("sites"), Err(RouteError::InvalidPattern { .. })));
        assert!(matches!(CompiledPattern::compile("/sites/:"), Err(RouteError::InvalidPattern { .. })));
        assert!(matches!(CompiledPattern::compile("/sites/:/x"), Err(RouteError::InvalidPattern { .. })));
    }

    #[test]
    fn test_colon_inside_segment_is_literal() {
        let pattern = CompiledPattern::compile("/a:b").unwrap();
        assert!(pattern.is_plain());
        assert!(pattern.matches("/a:b").is_some());
    }
}
