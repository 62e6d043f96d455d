use {
    regex::{self, Regex, RegexBuilder},
    std::{
        fmt,
        hash::{Hash, Hasher},
        sync::Arc,
    },
};

static START_NAME: &str = "<start>";

/// A grammar symbol.
///
/// `Start` is reserved for the synthetic root item the parser seeds each chart
/// with; grammars may not mention it.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Category {
    Start,
    NonTerminal(String),
    Terminal(Terminal),
}

impl Category {
    pub fn nonterminal(name: &str) -> Self {
        Category::NonTerminal(name.to_string())
    }

    /// A terminal matching tokens whose text equals `text`.
    pub fn exact(text: &str) -> Self {
        Category::Terminal(Terminal::exact(text))
    }

    pub fn is_terminal(&self) -> bool {
        match *self {
            Category::Terminal(_) => true,
            _ => false,
        }
    }

    pub fn is_nonterminal(&self) -> bool {
        match *self {
            Category::NonTerminal(_) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &str {
        match *self {
            Category::Start => START_NAME,
            Category::NonTerminal(ref name) => name,
            Category::Terminal(ref terminal) => terminal.name(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<Terminal> for Category {
    fn from(terminal: Terminal) -> Self {
        Category::Terminal(terminal)
    }
}

/// Decides membership of a token text in a user-defined terminal.
pub type TokenPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone)]
enum Matcher {
    Exact(String),
    CaseInsensitive(String),
    Pattern(Regex),
    Any,
    Predicate(TokenPredicate),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Matcher::Exact(ref text) => write!(f, "Exact({:?})", text),
            Matcher::CaseInsensitive(ref text) => write!(f, "CaseInsensitive({:?})", text),
            Matcher::Pattern(ref regex) => write!(f, "Pattern({:?})", regex.as_str()),
            Matcher::Any => write!(f, "Any"),
            Matcher::Predicate(_) => write!(f, "Predicate"),
        }
    }
}

impl Matcher {
    fn source(&self) -> &str {
        match *self {
            Matcher::Exact(ref text) => text,
            Matcher::CaseInsensitive(ref text) => text,
            Matcher::Pattern(ref regex) => regex.as_str(),
            Matcher::Any | Matcher::Predicate(_) => "",
        }
    }

    fn tag(&self) -> u8 {
        match *self {
            Matcher::Exact(_) => 0,
            Matcher::CaseInsensitive(_) => 1,
            Matcher::Pattern(_) => 2,
            Matcher::Any => 3,
            Matcher::Predicate(_) => 4,
        }
    }
}

/// A named terminal category and the predicate deciding which token texts
/// belong to it.
#[derive(Clone, Debug)]
pub struct Terminal {
    name: String,
    matcher: Matcher,
}

impl Terminal {
    pub fn exact(text: &str) -> Self {
        Terminal {
            name: text.to_string(),
            matcher: Matcher::Exact(text.to_string()),
        }
    }

    pub fn case_insensitive(text: &str) -> Self {
        Terminal {
            name: text.to_string(),
            matcher: Matcher::CaseInsensitive(text.to_lowercase()),
        }
    }

    /// A terminal whose tokens must match `pattern` in full.
    pub fn pattern(name: &str, pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&format!("^(?:{})$", pattern)).build()?;
        Ok(Terminal {
            name: name.to_string(),
            matcher: Matcher::Pattern(regex),
        })
    }

    /// Matches every token; meant for lexical error rules.
    pub fn any(name: &str) -> Self {
        Terminal {
            name: name.to_string(),
            matcher: Matcher::Any,
        }
    }

    /// A terminal decided by an arbitrary function of the token text.
    ///
    /// Closures cannot be compared, so two predicate terminals are the same
    /// symbol exactly when their names are equal.
    pub fn predicate<F>(name: &str, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Terminal {
            name: name.to_string(),
            matcher: Matcher::Predicate(Arc::new(predicate)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, text: &str) -> bool {
        match self.matcher {
            Matcher::Exact(ref expected) => expected == text,
            Matcher::CaseInsensitive(ref expected) => *expected == text.to_lowercase(),
            Matcher::Pattern(ref regex) => regex.is_match(text),
            Matcher::Any => true,
            Matcher::Predicate(ref predicate) => predicate(text),
        }
    }
}

impl PartialEq for Terminal {
    fn eq(&self, other: &Terminal) -> bool {
        self.name == other.name
            && self.matcher.tag() == other.matcher.tag()
            && self.matcher.source() == other.matcher.source()
    }
}

impl Eq for Terminal {}

impl Hash for Terminal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.matcher.tag().hash(state);
        self.matcher.source().hash(state);
    }
}
