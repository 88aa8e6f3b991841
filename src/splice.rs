//! Program splicing.
//!
//! Loads the target control program, drops its declaration header (every line
//! up to and including the last import marker) and runs the rest inside a
//! namespace bound to the mock robot. Payload errors propagate unchanged so a
//! broken control script fails loudly.
mod payload;

pub use payload::{ImportMarkers, Payload, ProgramText};

use crate::config::HarnessConfig;
use crate::script::{parse_program, Interpreter, Limits, Namespace, MOCK_OPERATIONS};
use crate::sim::RobotApi;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

pub struct Splicer {
    markers: ImportMarkers,
    entry_point: Option<String>,
    limits: Limits,
}

impl Splicer {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        Ok(Self {
            markers: ImportMarkers::new(&config.import_markers)?,
            entry_point: config.entry_point.clone(),
            limits: Limits {
                max_steps: config.max_steps,
            },
        })
    }

    /// Read `path` and extract its payload. A missing file is fatal.
    pub fn load(&self, path: &Path) -> Result<Payload> {
        let program = ProgramText::read(path)?;
        let payload = program.payload(&self.markers);
        tracing::info!(
            target_path = %path.display(),
            lines = program.line_count(),
            cut_index = ?payload.cut_index,
            payload_lines = payload.line_count(),
            "payload extracted"
        );
        Ok(payload)
    }

    /// Run `payload` against `robot`, leaving its definitions in `ns`.
    ///
    /// Blocks until the payload returns; a payload that loops forever keeps
    /// the harness running.
    pub fn execute(
        &self,
        payload: &Payload,
        robot: &mut dyn RobotApi,
        ns: &mut Namespace,
        out: &mut dyn Write,
    ) -> Result<()> {
        let program = parse_program(&payload.text, payload.first_line).context("parse payload")?;
        tracing::debug!(
            statements = program.body.len(),
            bindings = MOCK_OPERATIONS.len(),
            "payload parsed"
        );

        let mut interp = Interpreter::new(robot, ns, out, self.limits);
        interp.run(&program)?;
        if let Some(entry) = &self.entry_point {
            tracing::info!(entry = entry.as_str(), "invoking entry point");
            interp.call_procedure(entry)?;
        }
        tracing::info!(steps = interp.steps(), "payload finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::script::Value;
    use crate::sim::MockEnvironment;

    fn splice_source(config: &HarnessConfig, source: &str) -> (Result<()>, Namespace, String) {
        let splicer = Splicer::new(config).expect("splicer");
        let payload = ProgramText::from_source(source).payload(&splicer.markers);
        let mut env = MockEnvironment::with_seed(23);
        let mut ns = Namespace::default();
        let mut out = Vec::new();
        let result = splicer.execute(&payload, &mut env, &mut ns, &mut out);
        (result, ns, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn executes_only_the_text_after_the_last_import() {
        // markers on lines 2 and 5 (zero-based); the header would fail if run
        let source = "\
fail header ran
let early = true
import nar
fail between imports
undefined_operation
import vision
let sentinel = 42
print spliced
";
        let (result, ns, out) = splice_source(&default_config(), source);
        result.expect("payload runs");
        assert_eq!(ns.get("sentinel"), Some(&Value::Number(42.0)));
        assert_eq!(ns.get("early"), None);
        assert_eq!(out, "spliced\n");
    }

    #[test]
    fn file_without_markers_runs_entirely() {
        let source = "let first = 1\nlet second = 2\n";
        let (result, ns, _) = splice_source(&default_config(), source);
        result.expect("payload runs");
        assert_eq!(ns.get("first"), Some(&Value::Number(1.0)));
        assert_eq!(ns.get("second"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn payload_errors_report_original_line_numbers() {
        let source = "import nar\nstop\nprint $nope\n";
        let (result, _, _) = splice_source(&default_config(), source);
        let rendered = format!("{:#}", result.expect_err("payload fault"));
        assert!(rendered.contains("payload line 3"), "{rendered}");
    }

    #[test]
    fn parse_errors_report_original_line_numbers() {
        let source = "import nar\n\nrepeat 2\n  stop\n";
        let (result, _, _) = splice_source(&default_config(), source);
        let rendered = format!("{:#}", result.expect_err("parse fault"));
        assert!(rendered.contains("parse payload"), "{rendered}");
        assert!(rendered.contains("line 3: `repeat` block is missing `end`"), "{rendered}");
    }

    #[test]
    fn entry_point_runs_after_the_top_level() {
        let mut config = default_config();
        config.entry_point = Some("main".to_string());
        let source = "import nar\nlet order = top\ndef main\n  let order = entry\nend\n";
        let (result, ns, _) = splice_source(&config, source);
        result.expect("payload runs");
        assert_eq!(ns.get("order"), Some(&Value::Text("entry".into())));
    }

    #[test]
    fn missing_entry_point_is_an_error() {
        let mut config = default_config();
        config.entry_point = Some("main".to_string());
        let (result, _, _) = splice_source(&config, "stop\n");
        assert!(result.is_err());
    }

    #[test]
    fn missing_target_file_is_fatal() {
        let splicer = Splicer::new(&default_config()).expect("splicer");
        let err = splicer
            .load(Path::new("/nonexistent/mockbot/transbot.ctl"))
            .expect_err("missing file");
        assert!(err.to_string().contains("read target program"));
    }
}
