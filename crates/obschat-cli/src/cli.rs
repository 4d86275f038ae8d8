//! Command-line argument parsing.

use clap::Parser;
use obschat_core::DebugKey;

/// Conversational front-end for the satellite observation planning pipeline.
#[derive(Debug, Parser)]
#[command(name = "obschat", version, about)]
pub struct Cli {
    /// Prompt text; read from stdin when omitted.
    pub prompt: Option<String>,

    /// Session to converse in.
    #[arg(short = 's', long, default_value = "default", value_name = "NAME")]
    pub session: String,

    /// Show diagnostics and full tool arguments.
    #[arg(short, long)]
    pub verbose: bool,

    /// Send the prompt without advertising tools.
    #[arg(long)]
    pub no_tools: bool,

    /// Replace the session's system prompt before sending.
    #[arg(long, value_name = "TEXT")]
    pub system_prompt: Option<String>,

    /// Show the last N transcript entries (0 = all) and exit.
    #[arg(long, value_name = "N")]
    pub log: Option<usize>,

    /// List sessions and exit.
    #[arg(long)]
    pub list_sessions: bool,

    /// Print the configured satellite catalog and exit.
    #[arg(long)]
    pub catalog: bool,

    /// Enable debug logs (request_log, response_meta, all). Repeatable.
    #[arg(long, value_name = "KEY")]
    pub debug: Vec<DebugKey>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["obschat", "hello"]).unwrap();
        assert_eq!(cli.prompt.as_deref(), Some("hello"));
        assert_eq!(cli.session, "default");
        assert!(!cli.verbose);
        assert!(cli.debug.is_empty());
    }

    #[test]
    fn test_session_and_debug_flags() {
        let cli = Cli::try_parse_from([
            "obschat",
            "-s",
            "night1",
            "--debug",
            "request_log",
            "--debug",
            "response_meta",
            "hi",
        ])
        .unwrap();
        assert_eq!(cli.session, "night1");
        assert_eq!(cli.debug, vec![DebugKey::RequestLog, DebugKey::ResponseMeta]);
    }

    #[test]
    fn test_rejects_unknown_debug_key() {
        assert!(Cli::try_parse_from(["obschat", "--debug", "bogus"]).is_err());
    }

    #[test]
    fn test_log_takes_count() {
        let cli = Cli::try_parse_from(["obschat", "--log", "20"]).unwrap();
        assert_eq!(cli.log, Some(20));
        assert!(cli.prompt.is_none());
    }
}
