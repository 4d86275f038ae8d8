//! Observation planner interface and typed tool dispatch.
//!
//! The model schedules observations through one tool, `plan_observation`.
//! Its arguments deserialize into [`ObservationRequest`]; dispatch goes
//! through the [`ToolInvocation`] enum so an unknown tool name or malformed
//! arguments fail in exactly one place. The default [`CommandPlanner`] runs
//! an external pipeline executable, feeding it the request as YAML on stdin
//! and forwarding its stdout line by line.

use chrono::{Duration, Local, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::process::{Child, Command, Stdio};

pub const PLAN_TOOL_NAME: &str = "plan_observation";

/// Local start time of a nightly observation run.
const NIGHTLY_START_HOUR: u32 = 17;
const NIGHTLY_START_MINUTE: u32 = 30;
/// Offset from site-local time to UTC.
const SITE_UTC_OFFSET_HOURS: i64 = 7;

/// One observation run, as requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObservationRequest {
    /// Satellite targets: NORAD catalog ids or names.
    pub targets: Vec<String>,
    /// Observation start, `YYYY-MM-DD` (site-local) or `Now` for tonight.
    #[serde(default = "default_time_start")]
    pub time_start: String,
    /// Observation window length in hours.
    #[serde(default = "default_duration_hours")]
    pub duration_hours: f64,
    /// Observation site name, when the pipeline knows several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    /// Minimum pass elevation in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_elevation_deg: Option<f64>,
}

fn default_time_start() -> String {
    "Now".to_string()
}

fn default_duration_hours() -> f64 {
    8.0
}

/// A tool call decoded into its typed form.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    PlanObservation(ObservationRequest),
}

impl ToolInvocation {
    /// Decode a tool call by name and raw JSON arguments.
    pub fn parse(name: &str, arguments: &str) -> io::Result<Self> {
        match name {
            PLAN_TOOL_NAME => {
                let request: ObservationRequest =
                    serde_json::from_str(arguments).map_err(|e| {
                        io::Error::new(
                            ErrorKind::InvalidInput,
                            format!("invalid arguments for {}: {}", PLAN_TOOL_NAME, e),
                        )
                    })?;
                Ok(Self::PlanObservation(request))
            }
            other => Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("unknown tool '{}'", other),
            )),
        }
    }
}

/// Tool definitions advertised to the API, with schemas derived from the
/// request types.
pub fn tool_definitions() -> Vec<serde_json::Value> {
    let schema = schemars::schema_for!(ObservationRequest);
    vec![serde_json::json!({
        "type": "function",
        "function": {
            "name": PLAN_TOOL_NAME,
            "description": "Schedule a satellite observation run. Call this once the \
targets and observation window are known; progress output streams back as the \
pipeline works.",
            "parameters": serde_json::to_value(schema).unwrap_or_default(),
        },
    })]
}

/// UTC observation-night date in underscore form, for pipeline filenames.
///
/// A nightly run starts at 17:30 site-local; shifting that instant to UTC
/// (+7h) lands on the next calendar day, which is the date the pipeline
/// stamps on its output. `Now` means today; any time-of-day suffix on the
/// input is ignored.
pub fn format_date_for_filename(time_start: &str) -> io::Result<String> {
    let day = time_start.split_whitespace().next().unwrap_or_default();
    let day = if day.eq_ignore_ascii_case("now") {
        Local::now().format("%Y-%m-%d").to_string()
    } else {
        day.to_string()
    };
    let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(|_| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("invalid time_start '{}': expected YYYY-MM-DD or Now", time_start),
        )
    })?;
    let local_start = date
        .and_hms_opt(NIGHTLY_START_HOUR, NIGHTLY_START_MINUTE, 0)
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "invalid nightly start time"))?;
    let utc_start = local_start + Duration::hours(SITE_UTC_OFFSET_HOURS);
    Ok(utc_start.format("%Y_%m_%d").to_string())
}

/// Executes observation requests, writing progress through `out` as it goes.
///
/// Implementations run on the blocking pool; they may take as long as the
/// pipeline needs, writing lines whenever there is something to report.
pub trait Planner: Send + Sync {
    fn plan(&self, request: &ObservationRequest, out: &mut dyn Write) -> io::Result<()>;
}

/// Planner backed by an external pipeline executable.
///
/// The request is piped to the child as YAML on stdin; `OBSCHAT_TOOL`
/// identifies the operation. The child's stdout is forwarded line by line
/// so long-running pipelines report progress live; stderr passes through.
pub struct CommandPlanner {
    command: String,
    args: Vec<String>,
}

impl CommandPlanner {
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self { command, args }
    }
}

impl Planner for CommandPlanner {
    fn plan(&self, request: &ObservationRequest, out: &mut dyn Write) -> io::Result<()> {
        let payload = serde_yml::to_string(request)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .env("OBSCHAT_TOOL", PLAN_TOOL_NAME)
            .env("OBSCHAT_DATE", format_date_for_filename(&request.time_start)?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| io::Error::other(format!("failed to spawn planner {}: {}", self.command, e)))?;

        if let Err(e) = forward_io(&mut child, &payload, out) {
            // Forwarding failed; don't leave the child running unreaped.
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        let status = child
            .wait()
            .map_err(|e| io::Error::other(format!("failed to wait for planner: {}", e)))?;
        if !status.success() {
            return Err(io::Error::other(format!(
                "planner {} exited with {}",
                self.command, status
            )));
        }
        Ok(())
    }
}

/// Pipe the request to the child's stdin, then forward its stdout line by
/// line. BrokenPipe on stdin is tolerated (the child may exit before
/// reading); dropping stdin signals EOF.
fn forward_io(child: &mut Child, payload: &str, out: &mut dyn Write) -> io::Result<()> {
    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(payload.as_bytes()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
            Err(e) => return Err(e),
        }
    }

    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            out.write_all(line.as_bytes())?;
        }
    }
    Ok(())
}

/// Placeholder used when no planner command is configured. Always fails,
/// which reaches the model as a tool error it can explain to the user.
pub struct UnconfiguredPlanner;

impl Planner for UnconfiguredPlanner {
    fn plan(&self, _request: &ObservationRequest, _out: &mut dyn Write) -> io::Result<()> {
        Err(io::Error::new(
            ErrorKind::NotFound,
            "no planner command configured; set [planner] command in config.toml",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_parse_plan_observation() {
        let invocation = ToolInvocation::parse(
            PLAN_TOOL_NAME,
            r#"{"targets": ["25544"], "time_start": "2026-09-01"}"#,
        )
        .unwrap();
        let ToolInvocation::PlanObservation(request) = invocation;
        assert_eq!(request.targets, vec!["25544"]);
        assert_eq!(request.time_start, "2026-09-01");
        assert_eq!(request.duration_hours, 8.0);
        assert!(request.site.is_none());
    }

    #[test]
    fn test_parse_rejects_unknown_tool() {
        let err = ToolInvocation::parse("fire_lasers", "{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("fire_lasers"));
    }

    #[test]
    fn test_parse_rejects_malformed_arguments() {
        let err = ToolInvocation::parse(PLAN_TOOL_NAME, "{\"targets\": [").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_tool_definitions_shape() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0]["function"]["name"], PLAN_TOOL_NAME);
        let params = &defs[0]["function"]["parameters"];
        assert!(params["properties"]["targets"].is_object());
    }

    #[test]
    fn test_filename_date_crosses_into_next_utc_day() {
        // 17:30 local + 7h = 00:30 UTC the following day.
        assert_eq!(format_date_for_filename("2026-08-30").unwrap(), "2026_08_31");
        assert_eq!(
            format_date_for_filename("2026-12-31 20:00:00").unwrap(),
            "2027_01_01"
        );
    }

    #[test]
    fn test_filename_date_rejects_garbage() {
        assert!(format_date_for_filename("tomorrow").is_err());
        assert!(format_date_for_filename("2026-13-01").is_err());
    }

    #[test]
    fn test_filename_date_accepts_now() {
        assert!(format_date_for_filename("Now").is_ok());
    }

    fn write_script(dir: &std::path::Path, body: &str) -> String {
        let path = dir.join("planner.sh");
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_command_planner_pipes_request_and_streams_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "#!/bin/sh\necho \"tool=$OBSCHAT_TOOL\"\ncat\n");
        let planner = CommandPlanner::new(script, vec![]);
        let request = ObservationRequest {
            targets: vec!["25544".to_string()],
            time_start: "2026-09-01".to_string(),
            duration_hours: 2.0,
            site: None,
            min_elevation_deg: None,
        };
        let mut out = Vec::new();
        planner.plan(&request, &mut out).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.starts_with("tool=plan_observation\n"));
        assert!(output.contains("25544"));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "consumer gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    // A child that never stops writing must be killed and reaped when
    // forwarding its output fails; the writer's error propagates.
    #[test]
    fn test_command_planner_kills_child_when_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "#!/bin/sh\nwhile :; do echo tick; done\n");
        let planner = CommandPlanner::new(script, vec![]);
        let request = ObservationRequest {
            targets: vec!["25544".to_string()],
            time_start: "Now".to_string(),
            duration_hours: 1.0,
            site: None,
            min_elevation_deg: None,
        };
        let err = planner.plan(&request, &mut FailingWriter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_command_planner_reports_failure_status() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "#!/bin/sh\necho partial\nexit 3\n");
        let planner = CommandPlanner::new(script, vec![]);
        let request = ObservationRequest {
            targets: vec![],
            time_start: "Now".to_string(),
            duration_hours: 1.0,
            site: None,
            min_elevation_deg: None,
        };
        let mut out = Vec::new();
        let err = planner.plan(&request, &mut out).unwrap_err();
        assert!(err.to_string().contains("exited with"));
        // Output written before the failure is preserved.
        assert_eq!(String::from_utf8(out).unwrap(), "partial\n");
    }
}
