#[macro_use]
extern crate log;
extern crate regex;
extern crate stopwatch;
extern crate yaml_rust;

use {
    crate::core::util::thread_pool::ThreadPool,
    std::{
        error, fmt,
        path::Path,
        sync::{mpsc, Arc, Mutex},
    },
    stopwatch::Stopwatch,
};

pub use crate::core::{
    config::{ConfigError, ParserConfig},
    parse::{
        category::{Category, Terminal, TokenPredicate},
        chart::{Chart, Child, State, Viterbi},
        def_parser,
        grammar::{BuildError, ClosureKind, Grammar, GrammarBuilder, NonTerminalBuilder, Rule, RuleId},
        parse, recognize, viterbi_parse, viterbi_parse_with_score, Error as ParseError, ParseTree,
        ParseTreeWithScore, Parser, StolckeParser,
    },
    scan::{tokenize, Token},
    semiring::{LogSemiring, ProbabilitySemiring, Semiring},
    util::thread_pool::PoolError,
};

mod core;

/// Parses inputs against one shared grammar, singly or in batches spread over
/// a worker pool.
pub struct ParseJobRunner<S: Semiring> {
    grammar: Arc<Grammar<S>>,
    start: Category,
    parser: StolckeParser,
}

impl<S: Semiring + 'static> ParseJobRunner<S> {
    pub fn build(
        builder: GrammarBuilder<S>,
        start: Category,
        config: ParserConfig,
    ) -> Result<ParseJobRunner<S>, BuildError> {
        Ok(ParseJobRunner::from_shared(Arc::new(builder.build()?), start, config))
    }

    pub fn from_config_file(
        builder: GrammarBuilder<S>,
        start: Category,
        path: &Path,
    ) -> Result<ParseJobRunner<S>, RunnerError> {
        let config = ParserConfig::from_file(path)?;
        Ok(ParseJobRunner::build(builder, start, config)?)
    }

    pub fn from_shared(grammar: Arc<Grammar<S>>, start: Category, config: ParserConfig) -> Self {
        ParseJobRunner {
            grammar,
            start,
            parser: StolckeParser::new(config),
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar<S>> {
        &self.grammar
    }

    pub fn config(&self) -> &ParserConfig {
        self.parser.config()
    }

    pub fn parse<E>(&self, tokens: &[Token<E>]) -> Result<ParseTreeWithScore<E>, ParseError>
    where
        E: AsRef<str> + Clone,
    {
        self.parser
            .viterbi_parse_with_score(&self.start, &*self.grammar, tokens)
    }

    pub fn recognize<E>(&self, tokens: &[Token<E>]) -> Result<f64, ParseError>
    where
        E: AsRef<str> + Clone,
    {
        self.parser.recognize(&self.start, &*self.grammar, tokens)
    }

    /// Parses every input on the worker pool. Results are in input order.
    pub fn parse_all<E>(
        &self,
        inputs: Vec<Vec<Token<E>>>,
    ) -> Result<Vec<Result<ParseTreeWithScore<E>, ParseError>>, PoolError>
    where
        E: AsRef<str> + Clone + Send + 'static,
    {
        let sw = Stopwatch::start_new();
        let count = inputs.len();

        let (result_tx, result_rx) = mpsc::channel();
        let result_tx = Mutex::new(result_tx);
        let grammar = self.grammar.clone();
        let start = self.start.clone();
        let parser = self.parser.clone();

        let pool = ThreadPool::spawn(
            self.config().workers,
            self.config().queue_size,
            move |(index, tokens): (usize, Vec<Token<E>>)| {
                let result = parser.viterbi_parse_with_score(&start, &*grammar, &tokens[..]);
                match result_tx.lock() {
                    Ok(tx) => {
                        if tx.send((index, result)).is_err() {
                            warn!("Dropped result of parse job {}", index);
                        }
                    }
                    Err(_) => error!("Result channel poisoned, dropped result of parse job {}", index),
                }
            },
        );

        for job in inputs.into_iter().enumerate() {
            pool.enqueue(job)?;
        }
        pool.terminate_and_join()?;

        let mut results: Vec<Option<Result<ParseTreeWithScore<E>, ParseError>>> =
            (0..count).map(|_| None).collect();
        for (index, result) in result_rx.try_iter() {
            results[index] = Some(result);
        }

        debug!("Parsed batch of {} inputs in {}ms", count, sw.elapsed_ms());

        results
            .into_iter()
            .enumerate()
            .map(|(index, result)| result.ok_or(PoolError::LostJob(index)))
            .collect()
    }
}

#[derive(Debug)]
pub enum RunnerError {
    ConfigErr(ConfigError),
    GrammarErr(BuildError),
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RunnerError::ConfigErr(ref err) => write!(f, "Failed to load configuration: {}", err),
            RunnerError::GrammarErr(ref err) => write!(f, "Failed to build grammar: {}", err),
        }
    }
}

impl error::Error for RunnerError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            RunnerError::ConfigErr(ref err) => Some(err),
            RunnerError::GrammarErr(ref err) => Some(err),
        }
    }
}

impl From<ConfigError> for RunnerError {
    fn from(err: ConfigError) -> RunnerError {
        RunnerError::ConfigErr(err)
    }
}

impl From<BuildError> for RunnerError {
    fn from(err: BuildError) -> RunnerError {
        RunnerError::GrammarErr(err)
    }
}
