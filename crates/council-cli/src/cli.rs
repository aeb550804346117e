//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use council_core::{DebateRequest, SessionId};

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(
    name = "llm-council",
    version,
    about = "Ask a council of models one question, then let a chairman synthesize their answers"
)]
pub struct Cli {
    /// TOML config file with [gateway], [council] and [defaults] sections
    #[arg(long, global = true, env = "LLM_COUNCIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Decision store file (overrides config and COUNCIL_STORE_PATH)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a debate and stream its events to stdout
    Debate(DebateArgs),

    /// Inspect recorded debates
    #[command(subcommand)]
    History(HistoryCommand),

    /// List models the gateway advertises, or check specific ones
    Models(ModelsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ModelsArgs {
    /// Send a tiny completion to MODEL and report whether it answers (repeatable)
    #[arg(long = "test", value_name = "MODEL")]
    pub test: Vec<String>,
}

/// Event rendering on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress and the final synthesis
    Text,
    /// One JSON event per line
    Json,
    /// Server-sent-events framing
    Sse,
}

#[derive(Debug, Args)]
pub struct DebateArgs {
    /// Council member model id (repeat for each member)
    #[arg(short = 'm', long = "member", value_name = "MODEL")]
    pub members: Vec<String>,

    /// Chairman model id
    #[arg(short = 'c', long, value_name = "MODEL")]
    pub chairman: Option<String>,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Cap on members streaming at once
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,

    /// Fewest successful responses needed for synthesis
    #[arg(long, value_name = "N")]
    pub min_responses: Option<usize>,

    /// The question to debate
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,
}

impl DebateArgs {
    /// Overlay flag values onto the loaded config.
    pub fn apply_to(&self, config: &mut CliConfig) {
        if let Some(n) = self.max_concurrent {
            config.council.max_concurrent_members = Some(n);
        }
        if let Some(n) = self.min_responses {
            config.council.min_successful_responses = n;
        }
    }

    /// Build the request, falling back to the configured default council.
    ///
    /// Council size is left to the engine so an undersized council is
    /// reported through the event stream like any other rejection.
    pub fn request(&self, config: &CliConfig) -> Result<DebateRequest, String> {
        let members = if self.members.is_empty() {
            config.defaults.members.clone()
        } else {
            self.members.clone()
        };
        let chairman = self
            .chairman
            .clone()
            .or_else(|| config.defaults.chairman.clone())
            .ok_or_else(|| {
                "no chairman given: pass --chairman or set [defaults].chairman / COUNCIL_CHAIRMAN"
                    .to_string()
            })?;
        Ok(DebateRequest::new(self.query.join(" "), members, chairman))
    }
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List recorded debates, newest first
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one recorded debate with every response and the synthesis
    Show {
        id: SessionId,
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultsConfig;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("llm-council").chain(args.iter().copied())).unwrap()
    }

    fn debate_args(cli: Cli) -> DebateArgs {
        match cli.command {
            Command::Debate(args) => args,
            other => panic!("expected debate, got {other:?}"),
        }
    }

    #[test]
    fn debate_flags_parse() {
        let args = debate_args(parse(&[
            "debate", "-m", "a", "--member", "b", "-c", "chair", "--format", "sse", "Is", "it",
            "fast?",
        ]));
        assert_eq!(args.members, vec!["a", "b"]);
        assert_eq!(args.chairman.as_deref(), Some("chair"));
        assert_eq!(args.format, OutputFormat::Sse);
        assert_eq!(args.query.join(" "), "Is it fast?");
    }

    #[test]
    fn query_is_required() {
        let result = Cli::try_parse_from(["llm-council", "debate", "-m", "a"]);
        assert!(result.is_err());
    }

    #[test]
    fn request_falls_back_to_configured_council() {
        let args = debate_args(parse(&["debate", "why?"]));
        let config = CliConfig {
            defaults: DefaultsConfig {
                members: vec!["x".into(), "y".into()],
                chairman: Some("z".into()),
                store_path: None,
            },
            ..Default::default()
        };
        let request = args.request(&config).unwrap();
        assert_eq!(request.council_members, vec!["x", "y"]);
        assert_eq!(request.chairman, "z");
        assert_eq!(request.query, "why?");
    }

    #[test]
    fn missing_chairman_is_an_error() {
        let args = debate_args(parse(&["debate", "-m", "a", "-m", "b", "why?"]));
        assert!(args.request(&CliConfig::default()).is_err());
    }

    #[test]
    fn flags_override_council_config() {
        let args = debate_args(parse(&[
            "debate",
            "--max-concurrent",
            "2",
            "--min-responses",
            "3",
            "q",
        ]));
        let mut config = CliConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.council.max_concurrent_members, Some(2));
        assert_eq!(config.council.min_successful_responses, 3);
    }

    #[test]
    fn models_test_flag_collects_ids() {
        match parse(&["models", "--test", "gpt-4o", "--test", "llama3.2:3b"]).command {
            Command::Models(args) => assert_eq!(args.test, vec!["gpt-4o", "llama3.2:3b"]),
            other => panic!("unexpected {other:?}"),
        }
        match parse(&["models"]).command {
            Command::Models(args) => assert!(args.test.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn history_subcommands_parse() {
        match parse(&["history", "show", "42", "--json"]).command {
            Command::History(HistoryCommand::Show { id, json }) => {
                assert_eq!(id, 42);
                assert!(json);
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse(&["--store", "/tmp/s.json", "history", "list"]).command {
            Command::History(HistoryCommand::List { skip, limit, json }) => {
                assert_eq!((skip, limit, json), (0, 20, false));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
