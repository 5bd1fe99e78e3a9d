use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const USAGE: &str = "\
Sensor temperature statistics
Usage:
    sensor-stats -i <input file>

Environment:
    THREADS              worker threads used to compute statistics
    SENSOR_STATS_FORMAT  input format, `json` or `jsonl` (default: by extension)
    RUST_LOG             log filter (default: warn)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// A single JSON array of readings.
    Json,
    /// One reading object per line.
    JsonLines,
}

impl InputFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(InputFormat::Json),
            "jsonl" | "ndjson" => Some(InputFormat::JsonLines),
            _ => None,
        }
    }

    fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Self::from_name)
            .unwrap_or(InputFormat::Json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub format: InputFormat,
    pub threads: Option<usize>,
}

impl Config {
    /// Reads the configuration from the process arguments and environment.
    ///
    /// `Ok(None)` means the usage text should be shown instead of running.
    pub fn from_env() -> Result<Option<Self>> {
        Self::parse(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    pub fn parse<I, F>(args: I, var: F) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut args = args.into_iter().peekable();
        if args.peek().is_none() {
            return Ok(None);
        }

        let mut input = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-i" | "--input" => input = args.next().filter(|path| !path.is_empty()),
                "-h" | "--help" => return Ok(None),
                other => return Err(Error::Usage(format!("unexpected argument {:?}", other))),
            }
        }
        let input = PathBuf::from(input.ok_or_else(|| {
            Error::Usage("required argument -i <input file> is missing".to_string())
        })?);

        let format = match var("SENSOR_STATS_FORMAT") {
            Some(name) => InputFormat::from_name(&name).ok_or_else(|| {
                Error::Config(format!("SENSOR_STATS_FORMAT must be json or jsonl, got {:?}", name))
            })?,
            None => InputFormat::from_path(&input),
        };

        let threads = var("THREADS")
            .map(|value| match value.parse::<usize>() {
                Ok(threads) if threads > 0 => Ok(threads),
                _ => Err(Error::Config(format!(
                    "THREADS must be a positive integer, got {:?}",
                    value
                ))),
            })
            .transpose()?;

        Ok(Some(Config {
            input,
            format,
            threads,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn no_arguments_shows_usage() {
        assert_eq!(None, Config::parse(args(&[]), no_env).unwrap());
        assert_eq!(None, Config::parse(args(&["--help"]), no_env).unwrap());
    }

    #[test]
    fn input_flag() {
        let config = Config::parse(args(&["-i", "readings.json"]), no_env)
            .unwrap()
            .unwrap();
        assert_eq!(PathBuf::from("readings.json"), config.input);
        assert_eq!(InputFormat::Json, config.format);
        assert_eq!(None, config.threads);
    }

    #[test]
    fn missing_input_path() {
        let error = Config::parse(args(&["-i"]), no_env).unwrap_err();
        assert!(matches!(error, Error::Usage(_)));
        assert_eq!(2, error.exit_code());
        assert!(matches!(
            Config::parse(args(&["readings.json"]), no_env),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn format_from_extension_or_env() {
        let config = Config::parse(args(&["-i", "day.ndjson"]), no_env)
            .unwrap()
            .unwrap();
        assert_eq!(InputFormat::JsonLines, config.format);

        let env = |key: &str| (key == "SENSOR_STATS_FORMAT").then(|| "JSONL".to_string());
        let config = Config::parse(args(&["-i", "day.txt"]), env).unwrap().unwrap();
        assert_eq!(InputFormat::JsonLines, config.format);

        let env = |key: &str| (key == "SENSOR_STATS_FORMAT").then(|| "xml".to_string());
        assert!(matches!(
            Config::parse(args(&["-i", "day.txt"]), env),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn threads_from_env() {
        let env = |key: &str| (key == "THREADS").then(|| "4".to_string());
        let config = Config::parse(args(&["-i", "a.json"]), env).unwrap().unwrap();
        assert_eq!(Some(4), config.threads);

        let env = |key: &str| (key == "THREADS").then(|| "zero".to_string());
        assert!(matches!(
            Config::parse(args(&["-i", "a.json"]), env),
            Err(Error::Config(_))
        ));
    }
}
