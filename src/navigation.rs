//! Route table consulted before rendering a view.
//!
//! Patterns are `/`-separated segments. `:name` matches exactly one segment and captures it,
//! a trailing `*` matches whatever remains (including nothing). The first registered route
//! matching a path decides access; paths no route matches are redirected to the fallback.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::identity::{Guard, SessionState, Verdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Guarded(Guard),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Rest,
}

#[derive(Debug, Clone)]
struct Route {
    pattern: String,
    segments: Vec<Segment>,
    access: Access,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Navigation {
    Render { pattern: String, params: BTreeMap<String, String> },
    Pending,
    Redirect { to: String, from: Option<String> },
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    fallback: String,
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    let parts: Vec<&str> = pattern.split('/').filter(|p| !p.is_empty()).collect();
    let last = parts.len().saturating_sub(1);
    parts
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if *p == "*" && i == last {
                Segment::Rest
            } else if let Some(name) = p.strip_prefix(':') {
                Segment::Param(name.to_string())
            } else {
                Segment::Literal(p.to_string())
            }
        })
        .collect()
}

/// Drop query string and fragment, then split into non-empty segments.
fn path_segments(path: &str) -> Vec<&str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].split('/').filter(|p| !p.is_empty()).collect()
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> Option<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    for (i, seg) in pattern.iter().enumerate() {
        match seg {
            Segment::Rest => return Some(params),
            Segment::Literal(lit) => {
                if path.get(i) != Some(&lit.as_str()) { return None; }
            }
            Segment::Param(name) => {
                let value = path.get(i)?;
                params.insert(name.clone(), value.to_string());
            }
        }
    }
    if path.len() == pattern.len() { Some(params) } else { None }
}

impl RouteTable {
    pub fn new<S: Into<String>>(fallback: S) -> Self { Self { routes: Vec::new(), fallback: fallback.into() } }

    pub fn public(self, pattern: &str) -> Self { self.route(pattern, Access::Public) }

    pub fn protected(self, pattern: &str, guard: Guard) -> Self { self.route(pattern, Access::Guarded(guard)) }

    pub fn route(mut self, pattern: &str, access: Access) -> Self {
        self.routes.push(Route { pattern: pattern.to_string(), segments: parse_pattern(pattern), access });
        self
    }

    fn lookup(&self, path: &str) -> Option<(&Route, BTreeMap<String, String>)> {
        let segs = path_segments(path);
        self.routes.iter().find_map(|r| match_segments(&r.segments, &segs).map(|p| (r, p)))
    }

    /// Access rule for a path, if any route matches it.
    pub fn access_for(&self, path: &str) -> Option<&Access> { self.lookup(path).map(|(r, _)| &r.access) }

    pub fn navigate(&self, path: &str, session: &SessionState) -> Navigation {
        let Some((route, params)) = self.lookup(path) else {
            debug!(target: "alumni_portal::nav", "nav.unknown path='{}' -> '{}'", path, self.fallback);
            return Navigation::Redirect { to: self.fallback.clone(), from: None };
        };
        let render = Navigation::Render { pattern: route.pattern.clone(), params };
        match &route.access {
            Access::Public => render,
            Access::Guarded(guard) => match guard.evaluate(session, Some(path)) {
                Verdict::Pending => Navigation::Pending,
                Verdict::Allow => render,
                Verdict::Deny { redirect, from } => {
                    debug!(target: "alumni_portal::nav", "nav.deny path='{}' role={} -> '{}'", path, session.role, redirect);
                    Navigation::Redirect { to: redirect, from }
                }
            },
        }
    }

    /// Whether `navigate` would render `path` for this session.
    pub fn permits(&self, path: &str, session: &SessionState) -> bool {
        matches!(self.navigate(path, session), Navigation::Render { .. })
    }
}
