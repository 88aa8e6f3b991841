use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::path::Path;

/// Substring matcher for import/include declaration lines.
///
/// Matching is textual: any line containing one of the markers counts,
/// wherever the marker appears.
#[derive(Debug, Clone)]
pub struct ImportMarkers {
    pattern: Regex,
}

impl ImportMarkers {
    pub fn new(markers: &[String]) -> Result<Self> {
        if markers.is_empty() {
            return Err(anyhow!("at least one import marker is required"));
        }
        if let Some(blank) = markers.iter().find(|m| m.trim().is_empty()) {
            return Err(anyhow!("import marker {blank:?} is blank"));
        }
        let alternation = markers
            .iter()
            .map(|m| regex::escape(m))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&alternation).context("compile import marker pattern")?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

/// Source of the target program, one entry per line with its line break.
#[derive(Debug, Clone)]
pub struct ProgramText {
    lines: Vec<String>,
}

/// The executable part of a [`ProgramText`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Zero-based index of the last marker line, if any.
    pub cut_index: Option<usize>,
    /// One-based line number of the first payload line in the original file.
    pub first_line: usize,
    pub text: String,
}

impl Payload {
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

impl ProgramText {
    pub fn from_source(source: &str) -> Self {
        Self {
            lines: source.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("read target program {}", path.display()))?;
        Ok(Self::from_source(&source))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Index of the last line containing an import marker.
    pub fn last_marker_index(&self, markers: &ImportMarkers) -> Option<usize> {
        self.lines.iter().rposition(|line| markers.matches(line))
    }

    /// Everything after the last marker line, or the whole text when no
    /// line carries a marker.
    pub fn payload(&self, markers: &ImportMarkers) -> Payload {
        let cut_index = self.last_marker_index(markers);
        let start = cut_index.map_or(0, |idx| idx + 1);
        Payload {
            cut_index,
            first_line: start + 1,
            text: self.lines[start..].concat(),
        }
    }
}
