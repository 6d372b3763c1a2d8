//! Structural paths and the ordered path matcher.
//!
//! A [`Path`] is the parsed form of a delimited string (default delimiter
//! `/`); empty segments are discarded. A [`PathMatcher`] holds an ordered
//! list of patterns and resolves a request path to the first pattern that
//! matches — registration order is the only tie-break, by design. Do not
//! reorder registered patterns.

use std::collections::HashMap;
use std::fmt::{self, Display};

/// An ordered sequence of non-empty path components.
///
/// Two paths are equal iff their stored strings are equal.
#[derive(Debug, Clone)]
pub struct Path {
    raw: String,
    delimiter: char,
    components: Vec<String>,
}

impl Path {
    /// Parses a `/`-delimited path.
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_delimiter(path, '/')
    }

    /// Parses a path with a custom delimiter.
    pub fn with_delimiter(path: impl Into<String>, delimiter: char) -> Self {
        let raw = path.into();
        let components = raw
            .split(delimiter)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            raw,
            delimiter,
            components,
        }
    }

    /// The raw string this path was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed components, in order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The last component, if any.
    pub fn last(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The last component without its extension.
    pub fn stem(&self) -> Option<&str> {
        let last = self.last()?;
        match last.rsplit_once('.') {
            Some(("", _)) | None => Some(last),
            Some((stem, _)) => Some(stem),
        }
    }

    /// The extension of the last component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let last = self.last()?;
        match last.rsplit_once('.') {
            Some(("", _)) | None => None,
            Some((_, ext)) => Some(ext),
        }
    }

    /// Whether this path's components start with `prefix`'s components.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.components.len() >= prefix.components.len()
            && self.components[..prefix.components.len()] == prefix.components[..]
    }

    /// Whether this path's components end with `suffix`'s components.
    pub fn ends_with(&self, suffix: &Path) -> bool {
        self.components.len() >= suffix.components.len()
            && self.components[self.components.len() - suffix.components.len()..]
                == suffix.components[..]
    }

    /// A copy of this path with the first component removed.
    pub fn removing_first(&self) -> Path {
        self.rebuilt(self.components.iter().skip(1))
    }

    /// A copy of this path with the last component removed.
    pub fn removing_last(&self) -> Path {
        let keep = self.components.len().saturating_sub(1);
        self.rebuilt(self.components.iter().take(keep))
    }

    /// A copy of this path with `component` appended.
    pub fn appending(&self, component: &str) -> Path {
        self.rebuilt(self.components.iter().chain(std::iter::once(&component.to_string())))
    }

    fn rebuilt<'a>(&self, components: impl Iterator<Item = &'a String>) -> Path {
        let joined = components
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&self.delimiter.to_string());
        Path::with_delimiter(joined, self.delimiter)
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Path {}

impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for Path {
    fn from(value: &str) -> Self {
        Path::new(value)
    }
}

/// One component of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathComponent {
    /// Matches a segment iff it equals the stored string.
    Constant(String),
    /// Matches any single segment without binding. Written `*`.
    Anything,
    /// Matches any single segment and binds it by name. Written `:name`.
    Parameter(String),
    /// Matches and terminates successfully regardless of remaining
    /// segments. Written `**`.
    CatchAll,
}

impl PathComponent {
    /// Parses a pattern string into components, splitting on `delimiter`
    /// and discarding empty segments.
    pub fn parse_pattern(pattern: &str, delimiter: char) -> Vec<PathComponent> {
        pattern
            .split(delimiter)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "*" => PathComponent::Anything,
                "**" => PathComponent::CatchAll,
                _ => match segment.strip_prefix(':') {
                    Some(name) => PathComponent::Parameter(name.to_string()),
                    None => PathComponent::Constant(segment.to_string()),
                },
            })
            .collect()
    }
}

/// Segments bound by `Parameter` components during a match.
///
/// Each capture is available by its parameter name and positionally, in the
/// order the parameters appear in the pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathCaptures {
    named: HashMap<String, String>,
    positional: Vec<String>,
}

impl PathCaptures {
    /// Looks a capture up by parameter name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Looks a capture up by its position among the pattern's parameters.
    pub fn at(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    /// Number of captures.
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// Whether the pattern bound no parameters.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    fn bind(&mut self, name: &str, segment: &str) {
        self.named.insert(name.to_string(), segment.to_string());
        self.positional.push(segment.to_string());
    }
}

type Producer<R> = Box<dyn Fn(PathCaptures) -> R + Send + Sync>;

/// An ordered list of `(pattern, producer)` pairs.
///
/// `parse` walks patterns in insertion order and returns the first match;
/// there is no specificity ranking.
pub struct PathMatcher<R> {
    routes: Vec<(Vec<PathComponent>, Producer<R>)>,
    case_sensitive: bool,
}

impl<R> PathMatcher<R> {
    /// Creates a case-sensitive matcher.
    pub fn new() -> Self {
        Self::with_case_sensitivity(true)
    }

    /// Creates a matcher with explicit constant-segment case sensitivity.
    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self {
            routes: Vec::new(),
            case_sensitive,
        }
    }

    /// Parses `pattern` and appends it with its producer.
    pub fn add<F>(&mut self, pattern: &str, producer: F)
    where
        F: Fn(PathCaptures) -> R + Send + Sync + 'static,
    {
        let components = PathComponent::parse_pattern(pattern, '/');
        self.routes.push((components, Box::new(producer)));
    }

    /// Resolves `path` against the registered patterns, first match wins.
    pub fn parse(&self, path: &Path) -> Option<R> {
        for (components, producer) in &self.routes {
            if let Some(captures) =
                match_components(components, path.components(), self.case_sensitive)
            {
                return Some(producer(captures));
            }
        }
        None
    }

    /// Number of registered patterns.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no patterns are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<R> Default for PathMatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn match_components(
    pattern: &[PathComponent],
    segments: &[String],
    case_sensitive: bool,
) -> Option<PathCaptures> {
    let mut captures = PathCaptures::default();
    let mut remaining = segments;

    for component in pattern {
        match component {
            PathComponent::CatchAll => return Some(captures),
            PathComponent::Constant(expected) => {
                let segment = take_first(&mut remaining)?;
                let matched = if case_sensitive {
                    segment == expected
                } else {
                    segment.eq_ignore_ascii_case(expected)
                };
                if !matched {
                    return None;
                }
            }
            PathComponent::Anything => {
                take_first(&mut remaining)?;
            }
            PathComponent::Parameter(name) => {
                let segment = take_first(&mut remaining)?;
                captures.bind(name, segment);
            }
        }
    }

    // The pattern ran out: only an exact-length match succeeds here (a
    // trailing catch-all already returned above).
    remaining.is_empty().then_some(captures)
}

fn take_first<'a>(segments: &mut &'a [String]) -> Option<&'a str> {
    let (first, rest) = segments.split_first()?;
    *segments = rest;
    Some(first.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parsing_discards_empty_segments() {
        let path = Path::new("/accounts//42/");
        assert_eq!(path.components(), ["accounts", "42"]);
        assert_eq!(path.as_str(), "/accounts//42/");
    }

    #[test]
    fn test_path_equality_is_on_the_stored_string() {
        assert_eq!(Path::new("/a/b"), Path::new("/a/b"));
        // Same components, different raw strings.
        assert_ne!(Path::new("/a/b"), Path::new("a/b"));
    }

    #[test]
    fn test_stem_and_extension() {
        let path = Path::new("/static/report.tar.gz");
        assert_eq!(path.last(), Some("report.tar.gz"));
        assert_eq!(path.stem(), Some("report.tar"));
        assert_eq!(path.extension(), Some("gz"));

        let bare = Path::new("/static/README");
        assert_eq!(bare.stem(), Some("README"));
        assert_eq!(bare.extension(), None);

        let dotfile = Path::new("/.profile");
        assert_eq!(dotfile.stem(), Some(".profile"));
        assert_eq!(dotfile.extension(), None);
    }

    #[test]
    fn test_prefix_suffix_and_edits() {
        let path = Path::new("/a/b/c");
        assert!(path.starts_with(&Path::new("/a/b")));
        assert!(!path.starts_with(&Path::new("/b")));
        assert!(path.ends_with(&Path::new("b/c")));
        assert_eq!(path.removing_first().components(), ["b", "c"]);
        assert_eq!(path.removing_last().components(), ["a", "b"]);
        assert_eq!(path.appending("d").components(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_pattern_parsing() {
        assert_eq!(
            PathComponent::parse_pattern("/users/:id/*/files/**", '/'),
            vec![
                PathComponent::Constant("users".into()),
                PathComponent::Parameter("id".into()),
                PathComponent::Anything,
                PathComponent::Constant("files".into()),
                PathComponent::CatchAll,
            ]
        );
    }

    #[test]
    fn test_parameter_captures_exactly_the_matched_segment() {
        let mut matcher = PathMatcher::new();
        matcher.add("/users/:id/posts/:post", |captures| {
            (
                captures.get("id").unwrap().to_string(),
                captures.get("post").unwrap().to_string(),
                captures.at(0).unwrap().to_string(),
            )
        });

        let (id, post, first) = matcher.parse(&Path::new("/users/u-9/posts/p-3")).unwrap();
        assert_eq!(id, "u-9");
        assert_eq!(post, "p-3");
        assert_eq!(first, "u-9");
    }

    #[test]
    fn test_first_registered_wins() {
        let mut matcher = PathMatcher::new();
        matcher.add("/*", |_| "wildcard");
        matcher.add("/accounts", |_| "constant");
        // Registration order is the tie-break; the wildcard was first.
        assert_eq!(matcher.parse(&Path::new("/accounts")), Some("wildcard"));
    }

    #[test]
    fn test_catchall_matches_any_longer_path() {
        let mut matcher = PathMatcher::new();
        matcher.add("/static/**", |_| true);
        assert_eq!(matcher.parse(&Path::new("/static")), Some(true));
        assert_eq!(matcher.parse(&Path::new("/static/a/b/c/d")), Some(true));
        assert_eq!(matcher.parse(&Path::new("/other")), None);
    }

    #[test]
    fn test_length_mismatches_do_not_match() {
        let mut matcher = PathMatcher::new();
        matcher.add("/a/b", |_| ());
        // Request runs out before the pattern.
        assert_eq!(matcher.parse(&Path::new("/a")), None);
        // Pattern runs out before the request, no trailing catch-all.
        assert_eq!(matcher.parse(&Path::new("/a/b/c")), None);
    }

    #[test]
    fn test_case_sensitivity_is_configurable() {
        let mut strict = PathMatcher::new();
        strict.add("/Accounts", |_| ());
        assert_eq!(strict.parse(&Path::new("/accounts")), None);

        let mut lax = PathMatcher::with_case_sensitivity(false);
        lax.add("/Accounts", |_| ());
        assert_eq!(lax.parse(&Path::new("/accounts")), Some(()));
    }
}
