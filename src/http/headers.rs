//! Ordered HTTP header collection with case-insensitive lookup.

use std::fmt;

/// An ordered list of `(name, value)` header pairs.
///
/// Insertion order is preserved and duplicate names are kept as separate
/// entries; nothing is merged. Lookups compare names ASCII
/// case-insensitively and return the first match.
///
/// # Examples
///
/// ```
/// use ringhttp::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Type", "text/plain");
/// headers.insert("X-Tag", "first");
/// headers.insert("x-tag", "second");
///
/// assert_eq!(headers.get("content-type"), Some("text/plain"));
/// assert_eq!(headers.get("X-TAG"), Some("first"));
///
/// headers.replace("X-Tag", "only");
/// let all: Vec<_> = headers.get_all("x-tag").collect();
/// assert_eq!(all, vec!["only"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, keeping any existing entries with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Removes every entry named `name`, then appends `name: value`.
    pub fn replace(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// Parses one raw header line and appends it.
    ///
    /// The line is trimmed and split at the first `:`; name and value are
    /// trimmed again. A line without a colon becomes a header with an empty
    /// value.
    pub fn insert_line(&mut self, line: &str) {
        let (name, value) = line.trim().split_once(':').unwrap_or((line.trim(), ""));
        self.insert(name.trim(), value.trim());
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry, _)| same_name(entry, name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(entry, _)| same_name(entry, name))
            .map(|(_, value)| value.as_str())
    }

    /// Removes all entries named `name`. Returns `true` if any were removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let count = self.entries.len();
        self.entries.retain(|(entry, _)| !same_name(entry, name));
        self.entries.len() != count
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Declared body length: the first `Content-Length` value, or `0` when it
    /// is missing or not a valid number.
    pub fn content_length(&self) -> u64 {
        self.get("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Total number of entries (not unique names).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

/// Wire format: one `Name: value\r\n` line per entry.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter()
            .try_for_each(|(name, value)| write!(f, "{name}: {value}\r\n"))
    }
}
