//! Request types handed to filters and handlers.
//!
//! - `Request`: the decoded request head and body, plus the path parameters
//!   captured by the matched route
//! - `PathParams`: the named segments captured from the url path

use bytes::Bytes;
use http::header::{COOKIE, HOST};
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};

/// An inbound request, owned by the task that serves it.
#[derive(Debug)]
pub struct Request {
    head: Parts,
    body: Bytes,
    path_params: PathParams,
}

impl Request {
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Returns the url path of the request
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the requested host, taken from the `Host` header or else from the uri authority.
    pub fn host(&self) -> &str {
        self.head
            .headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| self.head.uri.host())
            .unwrap_or_default()
    }

    /// Returns the first header value with the given name, if it is visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the value of the named cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.head
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(cookie_name, _)| *cookie_name == name)
            .map(|(_, value)| value)
    }

    /// Returns the first query string value with the given name, percent decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.head.uri.query()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns the path parameters captured by the matched route
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Returns a captured path parameter by name
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    pub(crate) fn set_path_params(&mut self, path_params: PathParams) {
        self.path_params = path_params;
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(request: http::Request<Bytes>) -> Self {
        let (head, body) = request.into_parts();
        Self { head, body, path_params: PathParams::empty() }
    }
}

/// Path parameters captured from the url path of a request.
///
/// Parameters keep the order in which the pattern declares them. When a name is
/// declared twice, [`get`](PathParams::get) returns the first captured value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { inner: Vec::new() }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { inner: Vec::with_capacity(capacity) }
    }

    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.inner.push((name.to_owned(), value.to_owned()));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Gets the value of a path parameter by its name
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.inner.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

#[cfg(test)]
pub(crate) fn test_request(method: Method, uri: &str) -> Request {
    http::Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host() {
        let request: Request = http::Request::builder()
            .uri("http://fallback.example.com/a")
            .header(HOST, "example.com:8080")
            .body(Bytes::new())
            .unwrap()
            .into();
        assert_eq!(request.host(), "example.com:8080");

        let request = test_request(Method::GET, "http://fallback.example.com/a");
        assert_eq!(request.host(), "fallback.example.com");

        let request = test_request(Method::GET, "/a");
        assert_eq!(request.host(), "");
    }

    #[test]
    fn test_cookie() {
        let request: Request = http::Request::builder()
            .uri("/")
            .header(COOKIE, "theme=dark; session=abc123")
            .header(COOKIE, "lang=en")
            .body(Bytes::new())
            .unwrap()
            .into();

        assert_eq!(request.cookie("session"), Some("abc123"));
        assert_eq!(request.cookie("lang"), Some("en"));
        assert_eq!(request.cookie("missing"), None);
    }

    #[test]
    fn test_query_param() {
        let request = test_request(Method::GET, "/search?q=hello%20world&page=2&q=second");
        assert_eq!(request.query_param("q").as_deref(), Some("hello world"));
        assert_eq!(request.query_param("page").as_deref(), Some("2"));
        assert_eq!(request.query_param("size"), None);

        let request = test_request(Method::GET, "/search");
        assert_eq!(request.query_param("q"), None);
    }

    #[test]
    fn test_path_params() {
        let mut params = PathParams::empty();
        assert!(params.is_empty());

        params.push("id", "1");
        params.push("id", "2");
        params.push("name", "x");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("id"), Some("1"));
        assert_eq!(params.get("name"), Some("x"));
        assert_eq!(params.get("missing"), None);

        let mut request = test_request(Method::GET, "/users/1");
        assert_eq!(request.path_param("id"), None);
        request.set_path_params(params);
        assert_eq!(request.path_param("id"), Some("1"));
    }
}
