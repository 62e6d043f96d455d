#![allow(dead_code)]

extern crate difference;
extern crate lazy_static;
extern crate log;
extern crate log4rs;

use {
    self::{
        difference::{Changeset, Difference},
        lazy_static::lazy_static,
        log::LevelFilter,
        log4rs::{
            append::console::ConsoleAppender,
            config::{Appender, Config, Root},
            encode::pattern::PatternEncoder,
            Handle,
        },
    },
    pep::{Category, Semiring},
    std::{env, sync::Mutex},
};

lazy_static! {
    static ref LOGGER_HANDLE: Mutex<Option<Handle>> = Mutex::new(None);
}

/// Sends parser logs to the console at the level named by `PEP_LOG`, if set.
pub fn init_logging() {
    let level = match env::var("PEP_LOG").as_ref().map(|level| level.as_str()) {
        Ok("error") => LevelFilter::Error,
        Ok("warn") => LevelFilter::Warn,
        Ok("info") => LevelFilter::Info,
        Ok("debug") => LevelFilter::Debug,
        Ok("trace") => LevelFilter::Trace,
        _ => return,
    };

    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {l} - {m}{n}",
        )))
        .build();

    let config = match Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .build(Root::builder().appender("console").build(level))
    {
        Ok(config) => config,
        Err(err) => panic!("Failed to build logger configuration: {}", err),
    };

    let mut handle_opt = LOGGER_HANDLE.lock().unwrap();

    if handle_opt.is_none() {
        match log4rs::init_config(config) {
            Ok(handle) => {
                *handle_opt = Some(handle);
            }
            Err(err) => panic!("Failed to initialize logger: {}", err),
        }
    } else if let Some(ref handle) = *handle_opt {
        handle.set_config(config);
    }
}

pub fn nt(name: &str) -> Category {
    Category::nonterminal(name)
}

pub fn t(text: &str) -> Category {
    Category::exact(text)
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() < tolerance,
        "expected {} but was {}",
        expected,
        actual
    );
}

pub fn probability<S: Semiring>(sr: &S, element: Option<S::Element>) -> f64 {
    match element {
        Some(element) => sr.to_probability(element),
        None => panic!("state is not in the chart"),
    }
}

/// Compares bracketed trees one node per line, printing a diff on mismatch.
pub fn assert_tree(expected: &str, actual: &str) {
    let expected = expected.replace("[", "\n[");
    let actual = actual.replace("[", "\n[");

    let change_set = Changeset::new(&expected, &actual, "\n");
    if change_set.distance != 0 {
        for diff in &change_set.diffs {
            match diff {
                Difference::Same(string) => {
                    for line in string.split('\n') {
                        println!(" |{}", line);
                    }
                }
                Difference::Rem(string) => {
                    for line in string.split('\n') {
                        println!("-|{}", line);
                    }
                }
                Difference::Add(string) => {
                    for line in string.split('\n') {
                        println!("+|{}", line);
                    }
                }
            }
        }
        panic!("Tree did not match");
    }
}
