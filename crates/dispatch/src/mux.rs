//! Selects the hub serving a request from its host and path.
//!
//! Hubs are indexed by their base pattern:
//! - a base pattern ending with `/` serves the whole subtree below it, any other
//!   base pattern serves its exact path only
//! - the longest matching base pattern wins
//! - base patterns carrying a domain are consulted first, with the request host
//!   (port stripped, case insensitive), and win over path only ones

use std::fmt;

use crate::error::RouteError;
use crate::hub::RouterHub;

struct MuxEntry {
    host: Option<String>,
    path: String,
    hub: RouterHub,
}

impl MuxEntry {
    fn matches_path(&self, path: &str) -> bool {
        if self.path.ends_with('/') { path.starts_with(&self.path) } else { path == self.path }
    }

    fn matches_host(&self, host: &str) -> bool {
        self.host.as_deref().is_some_and(|expected| expected.eq_ignore_ascii_case(host))
    }
}

/// Index from base pattern to hub.
#[derive(Default)]
pub struct Mux {
    // sorted by descending path length, so the first match is the longest one
    entries: Vec<MuxEntry>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hub under its base pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if the base pattern has no path, or
    /// [`RouteError::DuplicateHub`] if a hub with the same base pattern exists.
    pub fn insert(&mut self, hub: RouterHub) -> Result<(), RouteError> {
        let base_pattern = hub.base_pattern();
        let Some(separator_index) = base_pattern.find('/') else {
            return Err(RouteError::invalid_pattern(base_pattern, "hub base pattern has no path separator"));
        };

        if self.entries.iter().any(|entry| entry.hub.base_pattern() == base_pattern) {
            return Err(RouteError::duplicate_hub(base_pattern));
        }

        let (host, path) = base_pattern.split_at(separator_index);
        let host = if host.is_empty() { None } else { Some(host.to_owned()) };
        let path = path.to_owned();
        let entry = MuxEntry { host, path, hub };

        let index = self.entries.partition_point(|existing| existing.path.len() >= entry.path.len());
        self.entries.insert(index, entry);
        Ok(())
    }

    /// Returns the hub serving the host and path, if any.
    pub fn lookup(&self, host: &str, path: &str) -> Option<&RouterHub> {
        let host = strip_port(host);

        self.entries
            .iter()
            .find(|entry| entry.matches_host(host) && entry.matches_path(path))
            .or_else(|| self.entries.iter().find(|entry| entry.host.is_none() && entry.matches_path(path)))
            .map(|entry| &entry.hub)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hubs(&self) -> impl Iterator<Item = &RouterHub> {
        self.entries.iter().map(|entry| &entry.hub)
    }
}

fn strip_port(host: &str) -> &str {
    // ipv6 literals keep their brackets, `[::1]:8080` becomes `[::1]`
    match host.rfind(':') {
        Some(index) if !host[index..].contains(']') => &host[..index],
        _ => host,
    }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|entry| entry.hub.base_pattern())).finish()
    }
}
