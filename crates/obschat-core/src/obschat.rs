//! High-level facade for embedding obschat.
//!
//! `Obschat` bundles the persistent state with a planner implementation and
//! exposes the handful of operations a front-end needs. The CLI is one such
//! front-end; tests and other embedders construct it with `with_planner`.

use crate::api::{PromptOptions, ResponseSink, send_prompt};
use crate::config::{Config, ResolvedConfig};
use crate::context::TranscriptEntry;
use crate::planner::{CommandPlanner, Planner, UnconfiguredPlanner};
use crate::state::AppState;
use crate::tle::{TleRecord, read_tle_file};
use std::io::{self, ErrorKind};
use std::sync::Arc;

pub struct Obschat {
    pub app: AppState,
    planner: Arc<dyn Planner>,
}

impl Obschat {
    /// Load from the default home directory, building the planner from
    /// config. Without a `[planner] command` the planner is a stub whose
    /// failures reach the model as tool errors.
    pub fn load() -> io::Result<Self> {
        let app = AppState::load()?;
        let planner = planner_from_config(&app.config);
        Ok(Self { app, planner })
    }

    /// Construct with explicit state and planner.
    pub fn with_planner(app: AppState, planner: Arc<dyn Planner>) -> Self {
        Self { app, planner }
    }

    pub fn list_sessions(&self) -> io::Result<Vec<String>> {
        self.app.list_sessions()
    }

    pub fn resolve_config(&self, session: &str) -> io::Result<ResolvedConfig> {
        self.app.resolve_config(session)
    }

    pub fn read_transcript(&self, session: &str) -> io::Result<Vec<TranscriptEntry>> {
        self.app.read_transcript(session)
    }

    pub fn set_system_prompt(&self, session: &str, prompt: &str) -> io::Result<()> {
        self.app.save_system_prompt(session, prompt)
    }

    /// Process one user prompt in the given session.
    pub async fn send_prompt<S: ResponseSink>(
        &self,
        session: &str,
        prompt: &str,
        config: &ResolvedConfig,
        options: &PromptOptions<'_>,
        sink: &mut S,
    ) -> io::Result<()> {
        send_prompt(
            &self.app,
            session,
            prompt,
            self.planner.clone(),
            config,
            options,
            sink,
        )
        .await
    }

    /// Load the satellite catalog named by the resolved config.
    pub fn catalog(&self, config: &ResolvedConfig) -> io::Result<Vec<TleRecord>> {
        let path = config.tle_file.as_ref().ok_or_else(|| {
            io::Error::new(ErrorKind::NotFound, "no tle_file configured")
        })?;
        read_tle_file(path)
    }
}

fn planner_from_config(config: &Config) -> Arc<dyn Planner> {
    match &config.planner.command {
        Some(command) => Arc::new(CommandPlanner::new(
            command.clone(),
            config.planner.args.clone(),
        )),
        None => Arc::new(UnconfiguredPlanner),
    }
}
