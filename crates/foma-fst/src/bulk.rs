// Bulk lookup: many inputs in, one result group per input out.
//
// `NativeLookup` runs the in-process traversal. `ExternalLookup` shells out
// to a precompiled lookup tool such as `hfst-optimized-lookup`, which reads
// one input per line on stdin and writes `input<TAB>result[<TAB>weight]`
// lines, with a blank line after each input's results.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use crate::FstError;
use crate::transducer::Fst;

/// Marker the external tool prints when an input has no result.
pub const NO_RESULT_MARKER: &str = "+?";

/// Which way a bulk lookup runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Analyze,
    Generate,
}

/// Anything that maps a batch of inputs to result strings.
///
/// Implementations return exactly one group per input, in input order.
/// An input without results gets an empty group (native) or a group holding
/// one empty string (external tools that print the no-result marker).
pub trait BulkLookup {
    fn lookup_in_bulk(&self, inputs: &[&str]) -> Result<Vec<Vec<String>>, FstError>;
}

/// In-process bulk lookup over an [`Fst`].
///
/// Analyses are rendered by concatenating their parts, so `("eat", "+V")`
/// becomes `"eat+V"`, which is how external lookup tools print them.
#[derive(Debug, Clone, Copy)]
pub struct NativeLookup<'a> {
    pub fst: &'a Fst,
    pub direction: Direction,
}

impl<'a> NativeLookup<'a> {
    pub fn new(fst: &'a Fst, direction: Direction) -> Self {
        Self { fst, direction }
    }
}

impl BulkLookup for NativeLookup<'_> {
    fn lookup_in_bulk(&self, inputs: &[&str]) -> Result<Vec<Vec<String>>, FstError> {
        let groups: Vec<Vec<String>> = match self.direction {
            Direction::Analyze => self
                .fst
                .analyze_in_bulk(inputs)?
                .into_iter()
                .map(|analyses| analyses.iter().map(|parts| parts.concat()).collect::<Vec<_>>())
                .collect(),
            Direction::Generate => self.fst.generate_in_bulk(inputs)?,
        };
        Ok(groups)
    }
}

/// Bulk lookup through an external program.
#[derive(Debug, Clone)]
pub struct ExternalLookup {
    pub program: PathBuf,
    /// Arguments placed before the table path.
    pub args: Vec<String>,
    /// Compiled table handed to the program as its last argument.
    pub table: PathBuf,
}

impl ExternalLookup {
    /// `hfst-optimized-lookup --quiet <table>`.
    pub fn hfst_optimized_lookup(table: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("hfst-optimized-lookup"),
            args: vec!["--quiet".to_string()],
            table: table.into(),
        }
    }
}

impl BulkLookup for ExternalLookup {
    fn lookup_in_bulk(&self, inputs: &[&str]) -> Result<Vec<Vec<String>>, FstError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.table)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| FstError::ExternalLookup("child stdin was not captured".to_string()))?;
        let mut payload = inputs.join("\n");
        payload.push('\n');
        // The child may block on a full stdout pipe until we read it.
        let writer = thread::spawn(move || stdin.write_all(payload.as_bytes()));

        let output = child.wait_with_output()?;
        let written = writer
            .join()
            .map_err(|_| FstError::ExternalLookup("stdin writer panicked".to_string()))?;

        // A child that quits early breaks the pipe; its stderr says why.
        if !output.status.success() {
            return Err(FstError::ExternalLookup(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written?;
        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| FstError::ExternalLookup(format!("output is not UTF-8: {e}")))?;
        tracing::debug!(
            program = %self.program.display(),
            inputs = inputs.len(),
            bytes = stdout.len(),
            "external lookup finished"
        );
        parse_lookup_output(inputs, &stdout)
    }
}

/// Group the tool's output lines by input.
///
/// A group ends at a blank line or when the input column changes. Results
/// containing [`NO_RESULT_MARKER`] become `""`. Fails unless there is
/// exactly one group per input.
pub fn parse_lookup_output(inputs: &[&str], stdout: &str) -> Result<Vec<Vec<String>>, FstError> {
    let mut groups: Vec<Vec<String>> = Vec::with_capacity(inputs.len());
    let mut current: Option<(&str, Vec<String>)> = None;

    for line in stdout.lines() {
        if line.trim().is_empty() {
            if let Some((_, group)) = current.take() {
                groups.push(group);
            }
            continue;
        }

        let mut fields = line.split('\t');
        let input = fields.next().unwrap_or_default();
        let result = fields.next().ok_or_else(|| {
            FstError::ExternalLookup(format!("line {line:?} has no result column"))
        })?;
        let result = if result.contains(NO_RESULT_MARKER) {
            String::new()
        } else {
            result.to_string()
        };

        if let Some((seen, group)) = current.as_mut() {
            if *seen == input {
                group.push(result);
                continue;
            }
        }
        if let Some((_, group)) = current.take() {
            groups.push(group);
        }
        current = Some((input, vec![result]));
    }
    if let Some((_, group)) = current {
        groups.push(group);
    }

    if groups.len() != inputs.len() {
        return Err(FstError::ExternalLookup(format!(
            "expected {} result groups, got {}",
            inputs.len(),
            groups.len()
        )));
    }
    Ok(groups)
}
