/// Represents one deterministic rule for locating an element in the current view.
///
/// A cascade of these is tried in declared order; the parser below accepts the
/// prefixed string form used throughout the locator specs (e.g. `"css:tbody tr"`,
/// `"text:Sign in"`, `"label*:play"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Raw CSS selector, passed through to the driver
    Css(String),
    /// Exact visible-text match
    Text(String),
    /// Case-insensitive substring match on visible text
    TextContains(String),
    /// ARIA role, with an optional accessible name
    Role {
        role: String,
        name: Option<String>,
    },
    /// `data-testid` attribute substring match
    TestId(String),
    /// Case-insensitive substring match on `aria-label`
    AriaLabelContains(String),
    /// Case-insensitive substring match on `title`
    TitleContains(String),
    /// Case-insensitive substring match on `placeholder`
    PlaceholderContains(String),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        match s {
            _ if s.starts_with("css:") => Selector::Css(s["css:".len()..].trim().to_string()),
            _ if s.starts_with("text*:") => {
                Selector::TextContains(s["text*:".len()..].trim().to_string())
            }
            _ if s.starts_with("text:") => Selector::Text(s["text:".len()..].to_string()),
            _ if s.starts_with("role:") => {
                let rest = &s["role:".len()..];
                let parts: Vec<&str> = rest.splitn(2, '|').collect();
                Selector::Role {
                    role: parts[0].trim().to_string(),
                    name: parts.get(1).map(|name| name.trim().to_string()),
                }
            }
            _ if s.starts_with("testid:") => {
                Selector::TestId(s["testid:".len()..].trim().to_string())
            }
            _ if s.starts_with("label*:") => {
                Selector::AriaLabelContains(s["label*:".len()..].trim().to_string())
            }
            _ if s.starts_with("title*:") => {
                Selector::TitleContains(s["title*:".len()..].trim().to_string())
            }
            _ if s.starts_with("placeholder*:") => {
                Selector::PlaceholderContains(s["placeholder*:".len()..].trim().to_string())
            }
            // Bare CSS is common enough to accept without the prefix when it
            // is unambiguous (starts with a tag, '.', '#', '[' or '*').
            _ if s.starts_with(['.', '#', '[', '*'])
                || s.chars().next().is_some_and(|c| c.is_ascii_lowercase()) =>
            {
                Selector::Css(s.to_string())
            }
            _ => Selector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes like 'css:', 'text:', 'text*:', 'role:', 'testid:', 'label*:', 'title*:' or 'placeholder*:'."
            )),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}
