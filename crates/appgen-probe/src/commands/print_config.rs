use std::io::Write;

use anyhow::{Context, Result};
use appgen_probe_core::ProbeConfig;

use crate::report::Reporter;

pub(super) fn run<W: Write>(config: &ProbeConfig, report: &mut Reporter<W>) -> Result<()> {
    let rendered = config
        .to_redacted_toml()
        .context("Failed to render configuration")?;
    report.raw(rendered)?;
    Ok(())
}
