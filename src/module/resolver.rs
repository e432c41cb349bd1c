//! Module identifier resolution
//!
//! Turns a module identifier plus an optional reference locator into a
//! canonical absolute locator. Resolution is a fixed pipeline over the
//! configured alias table, path-prefix table and base directory:
//!
//! 1. alias substitution
//! 2. path-prefix substitution (`<prefix>/<rest>`)
//! 3. alias substitution
//! 4. normalization (default extension, trailing `#` opt-out)
//! 5. alias substitution
//! 6. base resolution (absolute, relative, root-relative, top-level)
//! 7. path realization (`/./`, slash runs, `/<segment>/../`)
//! 8. alias substitution on the final locator

use std::collections::HashMap;
use tracing::trace;

use crate::config::LoaderConfig;

/// Resolves module identifiers against fixed configuration tables
#[derive(Debug, Clone)]
pub struct PathResolver {
    alias: HashMap<String, String>,
    paths: HashMap<String, String>,
    base: String,
    cwd: String,
    protocol: String,
    extension: String,
}

impl PathResolver {
    /// Create a resolver from loader configuration
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            alias: config.alias.clone(),
            paths: config.paths.clone(),
            base: config.base(),
            cwd: config.cwd.clone(),
            protocol: config.protocol(),
            extension: config.extension.clone(),
        }
    }

    /// Working directory locator that relative and inline locators hang off
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Directory top-level identifiers resolve against
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve `id` to a canonical locator
    ///
    /// Relative identifiers resolve against the directory of `reference`, or
    /// the working directory when no reference is given. An empty identifier
    /// resolves to an empty locator.
    pub fn resolve(&self, id: &str, reference: Option<&str>) -> String {
        if id.is_empty() {
            return String::new();
        }

        let id = self.parse_alias(id);
        let id = self.parse_paths(&id);
        let id = self.parse_alias(&id);
        let id = self.normalize(&id);
        let id = self.parse_alias(&id);

        let locator = realpath(&self.add_base(&id, reference));
        let locator = self.parse_alias(&locator);
        trace!("resolved {} -> {}", id, locator);
        locator
    }

    /// Replace `id` wholesale if it has an exact alias entry
    pub fn parse_alias(&self, id: &str) -> String {
        self.alias.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    /// Replace the leading `<prefix>` of `<prefix>/<rest>` from the path table
    pub fn parse_paths(&self, id: &str) -> String {
        if let Some((prefix, rest)) = split_path_prefix(id) {
            if let Some(replacement) = self.paths.get(prefix) {
                return format!("{}{}", replacement, rest);
            }
        }
        id.to_string()
    }

    /// Append the default extension where one is expected
    ///
    /// A trailing `#` is stripped and suppresses the extension. Identifiers
    /// that already end with the extension, carry a query, or name a
    /// directory are left alone.
    pub fn normalize(&self, id: &str) -> String {
        if let Some(stripped) = id.strip_suffix('#') {
            return stripped.to_string();
        }
        let has_query = id.find('?').is_some_and(|idx| idx > 0);
        if id.ends_with(self.extension.as_str()) || has_query || id.ends_with('/') {
            id.to_string()
        } else {
            format!("{}{}", id, self.extension)
        }
    }

    /// Prefix `id` according to its form
    ///
    /// Absolute identifiers are kept, `.`-relative ones hang off the
    /// reference directory, `/`-rooted ones off the working directory's
    /// scheme and host, everything else off the base directory. A leading
    /// `//` gets the ambient protocol.
    pub fn add_base(&self, id: &str, reference: Option<&str>) -> String {
        let located = if is_absolute(id) {
            id.to_string()
        } else if id.starts_with('.') {
            match reference.filter(|r| !r.is_empty()) {
                Some(reference) => format!("{}{}", dirname(reference), id),
                None => format!("{}{}", self.cwd, id),
            }
        } else if let Some(rooted) = id.strip_prefix('/') {
            match root_dir(&self.cwd) {
                Some(root) => format!("{}{}", root, rooted),
                None => id.to_string(),
            }
        } else {
            format!("{}{}", self.base, id)
        };

        if located.starts_with("//") {
            format!("{}{}", self.protocol, located)
        } else {
            located
        }
    }
}

/// `//host...` or anything carrying a `scheme:/` marker
fn is_absolute(id: &str) -> bool {
    (id.starts_with("//") && id.len() > 2) || id.contains(":/")
}

/// Split `<prefix>/<rest>` where the prefix has no `/` or `:`
fn split_path_prefix(id: &str) -> Option<(&str, &str)> {
    let slash = id.find('/')?;
    let (prefix, rest) = id.split_at(slash);
    if prefix.is_empty() || prefix.contains(':') || rest.len() < 2 {
        return None;
    }
    Some((prefix, rest))
}

/// Scheme and host of a locator, up to and including the first `/` after `//`
fn root_dir(locator: &str) -> Option<&str> {
    let authority = locator.find("//")? + 2;
    let slash = locator[authority..].find('/')? + authority;
    Some(&locator[..=slash])
}

/// Directory portion of a locator
///
/// The longest prefix ending in `/` that sits before any query or fragment:
/// `dirname("a/b/c.js?t=123#xx/zz") == "a/b/"`. Empty when there is no
/// such slash.
pub fn dirname(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    match path[..end].rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

/// Collapse `/./`, redundant slash runs and `/<segment>/../` pairs
///
/// Slash runs directly after a `:` (scheme markers such as `http://`) are
/// left intact. Any non-empty segment collapses against a following `..`,
/// including `..` itself, so `a/../../b` becomes `a/b`.
pub fn realpath(path: &str) -> String {
    let mut path = path.to_string();
    while path.contains("/./") {
        path = path.replace("/./", "/");
    }

    let mut path = collapse_slashes(&path);
    while let Some((start, end)) = find_parent_segment(&path) {
        path.replace_range(start..end, "/");
    }
    path
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c != '/' {
            continue;
        }
        let mut run = 1;
        while chars.peek() == Some(&'/') {
            chars.next();
            run += 1;
        }
        let preceded = out[..out.len() - 1].chars().next_back();
        let keep_run = match preceded {
            None | Some(':') => true,
            Some(_) => false,
        };
        if keep_run {
            for _ in 1..run {
                out.push('/');
            }
        }
    }
    out
}

/// Byte range of the leftmost `/<segment>/../` in `path`, segment non-empty
fn find_parent_segment(path: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(offset) = path[from..].find("/../") {
        let up = from + offset;
        if let Some(start) = path[..up].rfind('/') {
            let segment = &path[start + 1..up];
            if !segment.is_empty() {
                return Some((start, up + 4));
            }
        }
        from = up + 1;
    }
    None
}
