use {
    std::{error, fmt, fs, path::Path},
    yaml_rust::{scanner::ScanError, Yaml, YamlLoader},
};

/// Parser settings.
///
/// A YAML document may set any subset of the keys; the rest keep their
/// defaults:
///
/// ```yaml
/// max_tokens: 200
/// dump_chart: false
/// workers: 4
/// queue_size: 64
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct ParserConfig {
    /// Longest input a parse will accept; `None` for no limit.
    pub max_tokens: Option<usize>,
    /// Trace every chart state after each parse.
    pub dump_chart: bool,
    pub workers: usize,
    pub queue_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_tokens: None,
            dump_chart: false,
            workers: 4,
            queue_size: 64,
        }
    }
}

impl ParserConfig {
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(input)?;
        let doc = match docs.first() {
            None => return Err(ConfigError::EmptyDocument),
            Some(doc) => doc,
        };

        let mut config = ParserConfig::default();

        match *doc {
            Yaml::Hash(_) => {}
            Yaml::Null => return Ok(config),
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: String::from("<root>"),
                    expected: String::from("a mapping"),
                })
            }
        }

        match doc["max_tokens"] {
            Yaml::BadValue | Yaml::Null => {}
            ref value => config.max_tokens = Some(read_count(value, "max_tokens")?),
        }

        match doc["dump_chart"] {
            Yaml::BadValue => {}
            Yaml::Boolean(dump) => config.dump_chart = dump,
            _ => return Err(ConfigError::invalid("dump_chart", "a boolean")),
        }

        if !doc["workers"].is_badvalue() {
            config.workers = read_count(&doc["workers"], "workers")?;
            if config.workers == 0 {
                return Err(ConfigError::invalid("workers", "a positive integer"));
            }
        }

        if !doc["queue_size"].is_badvalue() {
            config.queue_size = read_count(&doc["queue_size"], "queue_size")?;
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(input) => ParserConfig::from_yaml(&input),
            Err(err) => Err(ConfigError::IOErr(format!(
                "Could not read configuration file \"{}\": {}",
                path.display(),
                err
            ))),
        }
    }
}

fn read_count(value: &Yaml, key: &str) -> Result<usize, ConfigError> {
    match value.as_i64() {
        Some(count) if count >= 0 => Ok(count as usize),
        _ => Err(ConfigError::invalid(key, "a non-negative integer")),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ScanErr(ScanError),
    EmptyDocument,
    InvalidValue { key: String, expected: String },
    IOErr(String),
}

impl ConfigError {
    fn invalid(key: &str, expected: &str) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            expected: expected.to_string(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::ScanErr(ref err) => write!(f, "Failed to scan configuration: {}", err),
            ConfigError::EmptyDocument => write!(f, "Configuration document is empty"),
            ConfigError::InvalidValue {
                ref key,
                ref expected,
            } => write!(f, "Configuration key '{}' must be {}", key, expected),
            ConfigError::IOErr(ref err) => write!(f, "IO Error: {}", err),
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ConfigError::ScanErr(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<ScanError> for ConfigError {
    fn from(err: ScanError) -> Self {
        ConfigError::ScanErr(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document() {
        //setup
        let input = "
max_tokens: 200
dump_chart: true
workers: 2
queue_size: 8
";

        //exercise
        let config = ParserConfig::from_yaml(input).unwrap();

        //verify
        assert_eq!(
            config,
            ParserConfig {
                max_tokens: Some(200),
                dump_chart: true,
                workers: 2,
                queue_size: 8,
            }
        );
    }

    #[test]
    fn absent_keys_keep_defaults() {
        //setup
        let input = "dump_chart: true";

        //exercise
        let config = ParserConfig::from_yaml(input).unwrap();

        //verify
        assert_eq!(config.max_tokens, None);
        assert!(config.dump_chart);
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_size, 64);
    }

    #[test]
    fn null_document_is_default() {
        //exercise
        let config = ParserConfig::from_yaml("~").unwrap();

        //verify
        assert_eq!(config, ParserConfig::default());
    }

    #[test]
    fn failed_empty_document() {
        //exercise
        let res = ParserConfig::from_yaml("");

        //verify
        assert_eq!(
            format!("{}", res.err().unwrap()),
            "Configuration document is empty"
        );
    }

    #[test]
    fn failed_wrong_type() {
        //exercise
        let res = ParserConfig::from_yaml("dump_chart: 3");

        //verify
        assert_eq!(
            format!("{}", res.err().unwrap()),
            "Configuration key 'dump_chart' must be a boolean"
        );
    }

    #[test]
    fn failed_negative_count() {
        //exercise
        let res = ParserConfig::from_yaml("max_tokens: -1");

        //verify
        assert_eq!(
            format!("{}", res.err().unwrap()),
            "Configuration key 'max_tokens' must be a non-negative integer"
        );
    }

    #[test]
    fn failed_zero_workers() {
        //exercise
        let res = ParserConfig::from_yaml("workers: 0");

        //verify
        assert_eq!(
            format!("{}", res.err().unwrap()),
            "Configuration key 'workers' must be a positive integer"
        );
    }

    #[test]
    fn failed_not_a_mapping() {
        //exercise
        let res = ParserConfig::from_yaml("- 1\n- 2");

        //verify
        match res {
            Err(ConfigError::InvalidValue { ref key, .. }) => assert_eq!(key, "<root>"),
            _ => panic!("expected an invalid root"),
        }
    }

    #[test]
    fn failed_scan() {
        //exercise
        let res = ParserConfig::from_yaml("workers: [1, 2");

        //verify
        match res {
            Err(ConfigError::ScanErr(_)) => {}
            _ => panic!("expected a scan error"),
        }
    }

    #[test]
    fn failed_missing_file() {
        //exercise
        let res = ParserConfig::from_file(Path::new("does/not/exist.yaml"));

        //verify
        match res {
            Err(ConfigError::IOErr(ref msg)) => {
                assert!(msg.starts_with("Could not read configuration file \"does/not/exist.yaml\""))
            }
            _ => panic!("expected an IO error"),
        }
    }
}
