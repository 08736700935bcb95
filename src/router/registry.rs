use axum::http::Method;
use thiserror::Error;

use crate::router::handler::Handler;
use crate::validation::Schema;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Invalid path template '{0}': {1}")]
    InvalidTemplate(String, String),

    #[error("Duplicate action {0} {1}")]
    Duplicate(Method, String),

    #[error("Ambiguous action {0} {1}: equally specific as {2}")]
    Ambiguous(Method, String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A path like `/posts/:id/increment-rating`. Trailing slashes are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(path: &str) -> Result<Self, RegistryError> {
        let invalid = |why: &str| RegistryError::InvalidTemplate(path.to_string(), why.to_string());

        if !path.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut segments = Vec::new();
        for part in split_path(path) {
            match part.strip_prefix(':') {
                Some("") => return Err(invalid("unnamed parameter")),
                Some(name) => {
                    if segments.iter().any(|s| matches!(s, Segment::Param(p) if p == name)) {
                        return Err(invalid("repeated parameter name"));
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        let raw = format!("/{}", split_path(path).collect::<Vec<_>>().join("/"));
        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Bind `path` against this template, returning parameters in template order
    pub fn matches(&self, path: &[String]) -> Option<Vec<(String, String)>> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(lit) if lit == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.push((name.clone(), actual.clone())),
            }
        }
        Some(params)
    }

    /// Same segment count with literals in the same places holding the same text
    fn same_shape(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|pair| match pair {
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                (Segment::Param(_), Segment::Param(_)) => true,
                _ => false,
            })
    }

    /// Literal positions, left to right; compared lexicographically a literal outranks a parameter
    fn specificity(&self) -> Vec<bool> {
        self.segments.iter().map(|s| matches!(s, Segment::Literal(_))).collect()
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/').filter(|s| !s.is_empty())
}

/// Decoded, non-empty segments of a request path
pub fn request_segments(path: &str) -> Vec<String> {
    split_path(path).map(decode_segment).collect()
}

fn decode_segment(segment: &str) -> String {
    // '+' is literal in a path and '&' would split the pair
    let escaped = format!("v={}", segment.replace('+', "%2B").replace('&', "%26"));
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| segment.to_string())
}

pub struct Route<S> {
    pub method: Method,
    pub template: PathTemplate,
    pub handler: Handler<S>,
    pub schema: Option<Schema>,
}

pub enum Resolution<'a, S> {
    Found(&'a Route<S>, Vec<(String, String)>),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Action table built once at startup and read-only afterwards
pub struct Registry<S> {
    routes: Vec<Route<S>>,
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<S> Registry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler<S>,
        schema: Option<Schema>,
    ) -> Result<&mut Self, RegistryError> {
        let template = PathTemplate::parse(path)?;

        for existing in self.routes.iter().filter(|r| r.method == method) {
            if existing.template == template {
                return Err(RegistryError::Duplicate(method, template.raw));
            }
            if existing.template.same_shape(&template) {
                return Err(RegistryError::Ambiguous(method, template.raw, existing.template.raw.clone()));
            }
        }

        tracing::debug!("Registered action {} {}", method, template.as_str());
        self.routes.push(Route { method, template, handler, schema });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|r| (&r.method, r.template.as_str()))
    }

    /// Most specific template for `method` matching `path`. HEAD falls back to GET.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, S> {
        let segments = request_segments(path);

        let best_for = |m: &Method| {
            self.routes
                .iter()
                .filter(|r| &r.method == m)
                .filter_map(|r| r.template.matches(&segments).map(|params| (r, params)))
                .max_by(|(a, _), (b, _)| a.template.specificity().cmp(&b.template.specificity()))
        };

        let found = best_for(method).or_else(|| {
            if *method == Method::HEAD {
                best_for(&Method::GET)
            } else {
                None
            }
        });
        if let Some((route, params)) = found {
            return Resolution::Found(route, params);
        }

        let mut allow: Vec<Method> = Vec::new();
        for route in &self.routes {
            if route.template.matches(&segments).is_some() && !allow.contains(&route.method) {
                allow.push(route.method.clone());
            }
        }
        if allow.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed(allow)
        }
    }
}
