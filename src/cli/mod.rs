use std::{collections::BTreeMap, time::Duration};

use anyhow::bail;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

#[cfg(feature = "memcached")]
use crate::driver::memcached::MemcacheDriver;
use crate::{
    adapter::{Cache, CacheAdapter},
    error::CacheError,
    storage::Storage,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    /// Memcached server URL.
    #[clap(
        short,
        long,
        env = "CACHEPORT_ADDR",
        default_value_t = ("memcache://127.0.0.1:11211").to_string(),
        global = true
    )]
    pub addr: String,

    /// Use an in-process store instead of a memcached server.
    #[arg(long, global = true)]
    pub memory: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Expiration sweep period for the in-process store, in seconds.
    #[arg(long, default_value_t = 1, global = true)]
    pub reap_interval: u64,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(flatten)]
    Op(Op),
    /// Read one operation per line from stdin.
    Interactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Op {
    /// Report whether KEY is present.
    Contains { key: String },
    /// Print the value stored under KEY.
    Fetch { key: String },
    /// Print every found KEY with its value.
    FetchMulti {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Store VALUE under KEY.
    Save {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// Time to live in seconds; 0 never expires.
        #[arg(long, default_value_t = 0)]
        ttl: u64,
    },
    /// Remove KEY.
    Delete { key: String },
    /// Remove every key.
    Flush,
}

/// A single interactive line.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct Line {
    #[clap(subcommand)]
    op: Op,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Contains(bool),
    Value(String),
    Values(BTreeMap<String, String>),
    Done,
}

impl Outcome {
    pub fn render(&self, json: bool) -> Result<String, serde_json::Error> {
        if json {
            return serde_json::to_string(self);
        }

        Ok(match self {
            Outcome::Contains(found) => found.to_string(),
            Outcome::Value(value) => value.clone(),
            Outcome::Values(values) => values
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Outcome::Done => "OK".to_owned(),
        })
    }
}

pub async fn run(cache: &dyn Cache, op: Op) -> Result<Outcome, CacheError> {
    Ok(match op {
        Op::Contains { key } => Outcome::Contains(cache.contains(&key).await),
        Op::Fetch { key } => Outcome::Value(cache.fetch(&key).await?),
        Op::FetchMulti { keys } => {
            Outcome::Values(cache.fetch_multi(&keys).await.into_iter().collect())
        }
        Op::Save { key, value, ttl } => {
            cache.save(&key, &value, Duration::from_secs(ttl)).await?;
            Outcome::Done
        }
        Op::Delete { key } => {
            cache.delete(&key).await?;
            Outcome::Done
        }
        Op::Flush => {
            cache.flush().await?;
            Outcome::Done
        }
    })
}

/// Rejects `args` combinations that cannot do anything useful.
pub fn validate(args: &Args) -> anyhow::Result<()> {
    if args.memory && matches!(args.command, Command::Op(_)) {
        bail!("--memory only keeps values for the life of the process; use it with `interactive`");
    }
    Ok(())
}

/// Builds the cache selected by `args`.
pub async fn open(args: &Args) -> anyhow::Result<Box<dyn Cache>> {
    if args.memory {
        let storage = Storage::new();
        storage.spawn_reaper(Duration::from_secs(args.reap_interval.max(1)));
        info!("using in-process storage");
        return Ok(Box::new(CacheAdapter::new(storage)));
    }

    connect(&args.addr).await
}

#[cfg(feature = "memcached")]
async fn connect(addr: &str) -> anyhow::Result<Box<dyn Cache>> {
    let driver = MemcacheDriver::connect(addr).await?;
    info!(addr, "connected");
    Ok(Box::new(CacheAdapter::new(driver)))
}

#[cfg(not(feature = "memcached"))]
async fn connect(_addr: &str) -> anyhow::Result<Box<dyn Cache>> {
    bail!("built without memcached support; pass --memory")
}

/// Executes operations read line by line from `input`, writing one reply
/// per line to `output`. Stops at end of input or on `quit`/`exit`.
///
/// Lines are split on whitespace, so keys and values cannot contain spaces
/// here; use the one-shot subcommands with shell quoting for those.
pub async fn interactive<R, W>(
    cache: &dyn Cache,
    json: bool,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            _ => {}
        }

        let reply = match Line::try_parse_from(line.split_whitespace()) {
            Ok(Line { op }) => match run(cache, op).await {
                Ok(outcome) => outcome.render(json)?,
                Err(e) => format!("error: {e}"),
            },
            Err(e) => e.to_string().trim_end().to_owned(),
        };

        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }

    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_save_with_ttl() {
        let args = Args::try_parse_from(["cacheport", "save", "k", "v", "--ttl", "30"]).unwrap();
        match args.command {
            Command::Op(op) => assert_eq!(
                op,
                Op::Save {
                    key: "k".into(),
                    value: "v".into(),
                    ttl: 30
                }
            ),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn fetch_multi_needs_keys() {
        assert!(Args::try_parse_from(["cacheport", "fetch-multi"]).is_err());
    }

    #[test]
    fn one_shot_memory_is_rejected() {
        let args = Args::try_parse_from(["cacheport", "--memory", "flush"]).unwrap();
        assert!(validate(&args).is_err());

        let args = Args::try_parse_from(["cacheport", "--memory", "interactive"]).unwrap();
        assert!(validate(&args).is_ok());
    }

    #[test]
    fn renders_plain_and_json() {
        let values = Outcome::Values(BTreeMap::from([
            ("a".to_owned(), "1".to_owned()),
            ("b".to_owned(), "2".to_owned()),
        ]));
        assert_eq!(values.render(false).unwrap(), "a=1\nb=2");
        assert_eq!(values.render(true).unwrap(), r#"{"values":{"a":"1","b":"2"}}"#);
        assert_eq!(Outcome::Done.render(true).unwrap(), r#""done""#);
        assert_eq!(Outcome::Contains(false).render(false).unwrap(), "false");
    }

    #[test]
    fn save_accepts_leading_hyphen_value() {
        let args = Args::try_parse_from(["cacheport", "save", "k", "-5", "--ttl", "3"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Op(Op::Save { ref value, ttl: 3, .. }) if value == "-5"
        ));
    }

    #[tokio::test]
    async fn interactive_saves_negative_numbers() {
        let cache = CacheAdapter::new(Storage::new());
        let mut out = Vec::new();

        interactive(&cache, false, "save k -5\nfetch k\n".as_bytes(), &mut out)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "OK\n-5\n");
    }

    #[tokio::test]
    async fn interactive_session() {
        let cache = CacheAdapter::new(Storage::new());
        let script = "save greeting hello\n\
                      \n\
                      fetch greeting\n\
                      contains other\n\
                      fetch-multi greeting other\n\
                      delete greeting\n\
                      fetch greeting\n\
                      save kept yes\n\
                      bogus\n\
                      quit\n\
                      flush\n";
        let mut out = Vec::new();

        interactive(&cache, false, script.as_bytes(), &mut out)
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            &lines[..7],
            &[
                "OK",
                "hello",
                "false",
                "greeting=hello",
                "OK",
                "error: key not found: greeting",
                "OK",
            ]
        );
        assert!(lines[7].starts_with("error:"), "{}", lines[7]);
        // `flush` comes after `quit` and never runs.
        assert!(cache.contains("kept").await);
    }
}
