/// A parsed subscription or route pattern.
///
/// Levels are separated by `/`. Two wildcards are supported:
/// - `+` matches exactly one level
/// - `#` matches the rest of the path, including nothing (must be last)
///
/// ```ignore
/// let p = Pattern::parse("compose/+");
/// assert!(p.matches("compose/add-post"));
/// assert!(!p.matches("compose/add-post/error"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    levels: Vec<Level>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Level {
    Exact(String),
    One,
    Rest,
}

impl Pattern {
    /// Parse a pattern string. A `#` that is not the last level is
    /// treated as the end of the pattern.
    pub fn parse(raw: &str) -> Self {
        let mut levels = Vec::new();
        if !raw.is_empty() {
            for segment in raw.split('/') {
                match segment {
                    "+" => levels.push(Level::One),
                    "#" => {
                        levels.push(Level::Rest);
                        break;
                    }
                    s => levels.push(Level::Exact(s.to_string())),
                }
            }
        }
        Self {
            raw: raw.to_string(),
            levels,
        }
    }

    /// The pattern as it was registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check whether a concrete path matches this pattern.
    ///
    /// The empty path never matches, not even `#`.
    pub fn matches(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let mut segments = path.split('/');
        for level in &self.levels {
            match level {
                Level::Rest => return true,
                Level::One => {
                    if segments.next().is_none() {
                        return false;
                    }
                }
                Level::Exact(want) => match segments.next() {
                    Some(got) if got == want => {}
                    _ => return false,
                },
            }
        }
        segments.next().is_none()
    }
}
