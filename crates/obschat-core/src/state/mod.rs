//! Application state management.
//!
//! Everything obschat persists lives under one home directory (default
//! `~/.obschat`): the global config plus one directory per session holding
//! the model-facing context, the human-facing transcript, and optional
//! per-session overrides.

mod entries;
mod paths;

pub use entries::{
    create_assistant_message_entry, create_session_created_anchor, create_tool_call_entry,
    create_tool_result_entry, create_user_message_entry,
};
pub use paths::StatePaths;

use crate::config::{Config, LocalConfig, ResolvedConfig};
use crate::context::{ChatMessage, Context, TranscriptEntry};
use crate::jsonl::{append_jsonl_entry, read_jsonl_file};
use dirs_next::home_dir;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;

/// System prompt used when neither the session nor the home directory
/// provides one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are the conversational front-end of a satellite observation planning system. \
Users describe, in plain language, what they want to observe and when. Your job is \
to clarify the request until you know the targets and the observation window, then \
call the plan_observation tool to schedule the run. Targets are satellites given by \
NORAD catalog id or name. Dates are YYYY-MM-DD; the word Now means tonight. If the \
user is only asking questions, answer them; only plan when asked to observe.";

/// True if `name` is usable as a session directory name.
pub fn is_valid_session_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains(char::is_whitespace)
}

pub struct AppState {
    pub config: Config,
    pub home_dir: PathBuf,
    pub sessions_dir: PathBuf,
}

impl StatePaths for AppState {
    fn sessions_dir(&self) -> &PathBuf {
        &self.sessions_dir
    }
}

impl AppState {
    /// Create AppState from a custom directory. Used by tests and embedders
    /// that manage their own layout.
    pub fn from_dir(home_dir: PathBuf, config: Config) -> io::Result<Self> {
        let sessions_dir = home_dir.join("sessions");
        fs::create_dir_all(&sessions_dir)?;
        Ok(AppState {
            config,
            home_dir,
            sessions_dir,
        })
    }

    /// Load AppState, resolving the home directory from `OBSCHAT_HOME` or
    /// falling back to `~/.obschat`. Creates the layout on first run; a
    /// missing config.toml is treated as empty.
    pub fn load() -> io::Result<Self> {
        let home = if let Ok(dir) = std::env::var("OBSCHAT_HOME") {
            PathBuf::from(dir)
        } else {
            home_dir()
                .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "cannot determine home directory"))?
                .join(".obschat")
        };

        let config_path = home.join("config.toml");
        let config = if config_path.exists() {
            let text = fs::read_to_string(&config_path)?;
            toml::from_str(&text).map_err(|e| {
                io::Error::new(
                    ErrorKind::InvalidData,
                    format!("invalid config {}: {}", config_path.display(), e),
                )
            })?
        } else {
            Config::default()
        };

        Self::from_dir(home, config)
    }

    /// Resolve the effective config for one session, applying its
    /// `local.toml` overrides when present.
    pub fn resolve_config(&self, session: &str) -> io::Result<ResolvedConfig> {
        let local_path = self.local_config_file(session);
        let local = if local_path.exists() {
            let text = fs::read_to_string(&local_path)?;
            toml::from_str(&text).map_err(|e| {
                io::Error::new(
                    ErrorKind::InvalidData,
                    format!("invalid local config {}: {}", local_path.display(), e),
                )
            })?
        } else {
            LocalConfig::default()
        };
        Ok(self.config.resolve(&local))
    }

    /// Create the session directory if new, writing its creation anchor.
    pub fn ensure_session(&self, session: &str) -> io::Result<()> {
        if !is_valid_session_name(session) {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid session name '{}'", session),
            ));
        }
        let dir = self.session_dir(session);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            self.append_transcript_entry(session, &create_session_created_anchor(session))?;
        }
        Ok(())
    }

    /// Load a session's model-facing conversation. Missing file = empty.
    pub fn load_context(&self, session: &str) -> io::Result<Context> {
        let messages: Vec<ChatMessage> = read_jsonl_file(&self.context_file(session))?;
        Ok(Context {
            name: session.to_string(),
            messages,
        })
    }

    /// Append one message to context.jsonl.
    pub fn append_context_message(&self, session: &str, message: &ChatMessage) -> io::Result<()> {
        append_jsonl_entry(&self.context_file(session), message)
    }

    /// Append one entry to transcript.jsonl.
    pub fn append_transcript_entry(
        &self,
        session: &str,
        entry: &TranscriptEntry,
    ) -> io::Result<()> {
        append_jsonl_entry(&self.transcript_file(session), entry)
    }

    /// Read the full transcript. Missing file = empty.
    pub fn read_transcript(&self, session: &str) -> io::Result<Vec<TranscriptEntry>> {
        read_jsonl_file(&self.transcript_file(session))
    }

    /// Effective system prompt: the session's own, else the home-wide
    /// `system_prompt.md`, else the built-in default.
    pub fn load_system_prompt(&self, session: &str) -> io::Result<String> {
        let session_prompt = self.session_prompt_file(session);
        if session_prompt.exists() {
            return fs::read_to_string(&session_prompt);
        }
        let global_prompt = self.home_dir.join("system_prompt.md");
        if global_prompt.exists() {
            return fs::read_to_string(&global_prompt);
        }
        Ok(DEFAULT_SYSTEM_PROMPT.to_string())
    }

    /// Replace the session's system prompt.
    pub fn save_system_prompt(&self, session: &str, prompt: &str) -> io::Result<()> {
        self.ensure_session(session)?;
        fs::write(self.session_prompt_file(session), prompt)
    }

    /// Session names in sorted order.
    pub fn list_sessions(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.sessions_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Role;

    fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::from_dir(dir.path().to_path_buf(), Config::default()).unwrap();
        (dir, state)
    }

    #[test]
    fn test_session_name_validation() {
        assert!(is_valid_session_name("night1"));
        assert!(is_valid_session_name("iss-2026-08"));
        assert!(!is_valid_session_name(""));
        assert!(!is_valid_session_name(".."));
        assert!(!is_valid_session_name("a/b"));
        assert!(!is_valid_session_name("has space"));
    }

    #[test]
    fn test_ensure_session_writes_anchor_once() {
        let (_dir, state) = test_state();
        state.ensure_session("night1").unwrap();
        state.ensure_session("night1").unwrap();
        let transcript = state.read_transcript("night1").unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].entry_type, "session_created");
    }

    #[test]
    fn test_context_append_and_load() {
        let (_dir, state) = test_state();
        state.ensure_session("night1").unwrap();
        state
            .append_context_message("night1", &ChatMessage::new(Role::User, "observe the ISS"))
            .unwrap();
        let context = state.load_context("night1").unwrap();
        assert_eq!(context.messages.len(), 1);
        assert_eq!(context.messages[0].content, "observe the ISS");
    }

    #[test]
    fn test_system_prompt_precedence() {
        let (_dir, state) = test_state();
        state.ensure_session("night1").unwrap();
        assert_eq!(
            state.load_system_prompt("night1").unwrap(),
            DEFAULT_SYSTEM_PROMPT
        );

        std::fs::write(state.home_dir.join("system_prompt.md"), "global").unwrap();
        assert_eq!(state.load_system_prompt("night1").unwrap(), "global");

        state.save_system_prompt("night1", "session").unwrap();
        assert_eq!(state.load_system_prompt("night1").unwrap(), "session");
    }

    #[test]
    fn test_list_sessions_sorted() {
        let (_dir, state) = test_state();
        state.ensure_session("zeta").unwrap();
        state.ensure_session("alpha").unwrap();
        assert_eq!(state.list_sessions().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    #[serial_test::serial]
    fn test_resolve_config_reads_local_toml() {
        let (_dir, state) = test_state();
        state.ensure_session("night1").unwrap();
        std::fs::write(
            state.local_config_file("night1"),
            "model = \"local-model\"\n",
        )
        .unwrap();
        let resolved = state.resolve_config("night1").unwrap();
        assert_eq!(resolved.model, "local-model");
    }
}
