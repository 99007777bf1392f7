//! Console report written to stdout.
//!
//! Every probe step ends in one of `ok`, `fail`, `warn` or `note`. Only
//! `fail` is counted; `--strict` turns a non-zero count into exit status 1.

use std::fmt::Display;
use std::io::{self, Write};

const RULE_WIDTH: usize = 60;

/// Line-oriented report writer.
#[derive(Debug)]
pub struct Reporter<W> {
    out: W,
    failures: usize,
}

impl<W: Write> Reporter<W> {
    /// Report into `out`.
    pub const fn new(out: W) -> Self {
        Self { out, failures: 0 }
    }

    /// A title framed by rules.
    pub fn section(&mut self, title: impl Display) -> io::Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.out, "\n{rule}\n{title}\n{rule}")
    }

    /// A sub-heading.
    pub fn step(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "\n{text}")
    }

    /// An indented `name: value` line.
    pub fn field(&mut self, name: &str, value: impl Display) -> io::Result<()> {
        writeln!(self.out, "  {name}: {value}")
    }

    /// A bullet.
    pub fn item(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "  - {text}")
    }

    /// A successful step.
    pub fn ok(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "[ok] {text}")
    }

    /// A failed step; counted.
    pub fn fail(&mut self, text: impl Display) -> io::Result<()> {
        self.failures += 1;
        tracing::debug!(failures = self.failures, "Probe step failed");
        writeln!(self.out, "[FAIL] {text}")
    }

    /// Something unexpected that does not fail the step.
    pub fn warn(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "[warn] {text}")
    }

    /// Neutral information, including expected conditions like timeouts.
    pub fn note(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "[info] {text}")
    }

    /// Text written as is.
    pub fn raw(&mut self, text: impl Display) -> io::Result<()> {
        write!(self.out, "{text}")
    }

    /// Number of failed steps so far.
    pub const fn failures(&self) -> usize {
        self.failures
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// The underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
