use rev_core::Error;
use std::fmt;
use std::str::FromStr;

/// A read against the joke API, parsed from a query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChuckQuery {
    /// `categories`
    Categories,
    /// `random`
    Random,
    /// `random:<category>`
    RandomCategory(String),
    /// `search:<text>`
    Search(String),
}

impl FromStr for ChuckQuery {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (head, arg) = match s.split_once(':') {
            Some((head, arg)) => (head.trim(), Some(arg.trim())),
            None => (s, None),
        };

        let required = |arg: Option<&str>| match arg {
            Some(a) if !a.is_empty() => Ok(a.to_string()),
            _ => Err(Error::Validation(format!(
                "'{}' needs an argument, e.g. '{}:<value>'",
                head, head
            ))),
        };

        match (head.to_ascii_lowercase().as_str(), arg) {
            ("categories", None) => Ok(ChuckQuery::Categories),
            ("random", None) => Ok(ChuckQuery::Random),
            ("random", arg) => Ok(ChuckQuery::RandomCategory(required(arg)?)),
            ("search", arg) => Ok(ChuckQuery::Search(required(arg)?)),
            _ => Err(Error::Validation(format!(
                "Unknown joke query '{}'. Use categories, random, random:<category> or search:<text>",
                s
            ))),
        }
    }
}

impl fmt::Display for ChuckQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChuckQuery::Categories => write!(f, "categories"),
            ChuckQuery::Random => write!(f, "random"),
            ChuckQuery::RandomCategory(c) => write!(f, "random:{}", c),
            ChuckQuery::Search(q) => write!(f, "search:{}", q),
        }
    }
}
