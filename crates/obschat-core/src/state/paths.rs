//! Path computation methods for AppState.
//!
//! All path methods are pure computations with no I/O; they just construct
//! PathBuf values from the session name and directory layout.

use std::path::PathBuf;

/// Path computation for session directories and files.
pub trait StatePaths {
    /// Root directory holding all sessions.
    fn sessions_dir(&self) -> &PathBuf;

    /// A session's directory.
    fn session_dir(&self, name: &str) -> PathBuf {
        self.sessions_dir().join(name)
    }

    /// Model-facing conversation (context.jsonl).
    fn context_file(&self, name: &str) -> PathBuf {
        self.session_dir(name).join("context.jsonl")
    }

    /// Human-facing transcript (transcript.jsonl).
    fn transcript_file(&self, name: &str) -> PathBuf {
        self.session_dir(name).join("transcript.jsonl")
    }

    /// Per-session system prompt override.
    fn session_prompt_file(&self, name: &str) -> PathBuf {
        self.session_dir(name).join("system_prompt.md")
    }

    /// Per-session config overrides.
    fn local_config_file(&self, name: &str) -> PathBuf {
        self.session_dir(name).join("local.toml")
    }

    /// Debug log of outgoing request bodies.
    fn request_log_file(&self, name: &str) -> PathBuf {
        self.session_dir(name).join("requests.jsonl")
    }

    /// Debug log of response metadata (finish reasons, usage).
    fn response_meta_log_file(&self, name: &str) -> PathBuf {
        self.session_dir(name).join("response_meta.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(PathBuf);

    impl StatePaths for Fixed {
        fn sessions_dir(&self) -> &PathBuf {
            &self.0
        }
    }

    #[test]
    fn test_paths_nest_under_session_dir() {
        let fixed = Fixed(PathBuf::from("/tmp/obschat/sessions"));
        assert_eq!(
            fixed.context_file("night1"),
            PathBuf::from("/tmp/obschat/sessions/night1/context.jsonl")
        );
        assert_eq!(
            fixed.local_config_file("night1"),
            PathBuf::from("/tmp/obschat/sessions/night1/local.toml")
        );
    }
}
