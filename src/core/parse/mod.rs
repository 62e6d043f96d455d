use {
    crate::core::{
        parse::{
            category::Category,
            chart::{Chart, State},
            grammar::{Grammar, RuleId},
        },
        scan::Token,
        semiring::Semiring,
    },
    std::{error, fmt},
};

pub mod category;
pub mod chart;
mod corner;
mod earley;
pub mod grammar;
mod nullable;

pub use self::earley::StolckeParser;

pub trait Parser<S: Semiring, E: AsRef<str> + Clone> {
    fn parse<'a>(
        &self,
        start: &Category,
        grammar: &'a Grammar<S>,
        tokens: &'a [Token<E>],
    ) -> Result<Chart<'a, S, E>, Error>;

    /// Parses and returns the most probable tree for `start` spanning all tokens.
    fn viterbi_parse_with_score(
        &self,
        start: &Category,
        grammar: &Grammar<S>,
        tokens: &[Token<E>],
    ) -> Result<ParseTreeWithScore<E>, Error> {
        let chart = self.parse(start, grammar, tokens)?;
        let root = earley::top_level_state(&chart)?;

        let score = chart
            .get_viterbi_score(&root)
            .map(|viterbi| viterbi.score)
            .ok_or_else(|| Error::MissingDerivation(chart.state_string(&root)))?;

        let tree = match earley::viterbi_parse(&chart, &root)? {
            ParseTree::Internal { mut children, .. } if children.len() == 1 => children.remove(0),
            _ => return Err(Error::MissingDerivation(chart.state_string(&root))),
        };

        Ok(ParseTreeWithScore {
            tree,
            probability: grammar.semiring().to_probability(score),
        })
    }

    /// Total probability of all derivations of `start` spanning the tokens,
    /// `0.0` when there are none.
    fn recognize(
        &self,
        start: &Category,
        grammar: &Grammar<S>,
        tokens: &[Token<E>],
    ) -> Result<f64, Error> {
        let chart = self.parse(start, grammar, tokens)?;

        match earley::top_level_state(&chart) {
            Ok(root) => Ok(chart
                .get_inner_score(&root)
                .map(|inner| grammar.semiring().to_probability(inner))
                .unwrap_or(0.0)),
            Err(Error::NoParse { .. }) => Ok(0.0),
            Err(err) => Err(err),
        }
    }
}

pub fn def_parser() -> StolckeParser {
    StolckeParser::default()
}

/// Fills a chart for `tokens` with no input limit.
pub fn parse<'a, S, E>(
    start: &Category,
    grammar: &'a Grammar<S>,
    tokens: &'a [Token<E>],
) -> Chart<'a, S, E>
where
    S: Semiring,
    E: AsRef<str>,
{
    earley::fill_chart(start, grammar, tokens)
}

/// Rebuilds the most probable derivation of `state`.
///
/// Fails with `Error::MissingDerivation` if the chart holds no derivation for
/// the state, e.g. because it was never created during this parse.
pub fn viterbi_parse<S, E>(state: &State, chart: &Chart<S, E>) -> Result<ParseTree<E>, Error>
where
    S: Semiring,
    E: Clone,
{
    earley::viterbi_parse(chart, state)
}

pub fn viterbi_parse_with_score<S, E>(
    start: &Category,
    grammar: &Grammar<S>,
    tokens: &[Token<E>],
) -> Result<ParseTreeWithScore<E>, Error>
where
    S: Semiring,
    E: AsRef<str> + Clone,
{
    def_parser().viterbi_parse_with_score(start, grammar, tokens)
}

pub fn recognize<S, E>(start: &Category, grammar: &Grammar<S>, tokens: &[Token<E>]) -> Result<f64, Error>
where
    S: Semiring,
    E: AsRef<str> + Clone,
{
    def_parser().recognize(start, grammar, tokens)
}

#[derive(Clone, PartialEq, Debug)]
pub enum ParseTree<E> {
    Leaf { category: Category, token: Token<E> },
    Internal { category: Category, children: Vec<ParseTree<E>> },
}

impl<E> ParseTree<E> {
    pub fn category(&self) -> &Category {
        match *self {
            ParseTree::Leaf { ref category, .. } => category,
            ParseTree::Internal { ref category, .. } => category,
        }
    }

    pub fn children(&self) -> &[ParseTree<E>] {
        match *self {
            ParseTree::Leaf { .. } => &[],
            ParseTree::Internal { ref children, .. } => children,
        }
    }

    pub fn token(&self) -> Option<&Token<E>> {
        match *self {
            ParseTree::Leaf { ref token, .. } => Some(token),
            ParseTree::Internal { .. } => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.token().is_some()
    }

    /// Scanned tokens in input order.
    pub fn leaves(&self) -> Vec<&Token<E>> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];

        while let Some(tree) = stack.pop() {
            match *tree {
                ParseTree::Leaf { ref token, .. } => leaves.push(token),
                ParseTree::Internal { ref children, .. } => stack.extend(children.iter().rev()),
            }
        }

        leaves
    }
}

/// Bracketed form: `[S[NP[Det[the]][N[boy]]][VP[left]]]`.
impl<E: AsRef<str>> fmt::Display for ParseTree<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseTree::Leaf { ref token, .. } => write!(f, "[{}]", token.text()),
            ParseTree::Internal {
                ref category,
                ref children,
            } => {
                write!(f, "[{}", category)?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct ParseTreeWithScore<E> {
    pub tree: ParseTree<E>,
    pub probability: f64,
}

#[derive(Debug)]
pub enum Error {
    NoParse { tokens: usize },
    AmbiguousParse { count: usize },
    MissingDerivation(String),
    InputTooLong { tokens: usize, limit: usize },
    UnknownRule(RuleId),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::NoParse { tokens } => {
                write!(f, "No complete parse spans the {} input tokens", tokens)
            }
            Error::AmbiguousParse { count } => write!(
                f,
                "Found {} complete start states spanning the input, expected one",
                count
            ),
            Error::MissingDerivation(ref state) => {
                write!(f, "No derivation recorded for state '{}'", state)
            }
            Error::InputTooLong { tokens, limit } => write!(
                f,
                "Input of {} tokens exceeds the limit of {}",
                tokens, limit
            ),
            Error::UnknownRule(rule) => write!(f, "State refers to unknown rule #{}", rule.index()),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}
