//! `adapt`: start a streamed generation that switches the app's type, read
//! the beginning of the stream, then check whether the stored type changed.

use std::io::Write;

use anyhow::Result;
use appgen_probe_core::config::GenerationConfig;
use appgen_probe_core::{
    check_code_gen_type, endpoints, CodeGenCheck, GenerationCapture, GenerationRequest,
    ProbeConfig, ProbeError, StreamEnd, StreamLimits,
};
use tracing::debug;

use super::{open_session, or_none};
use crate::cli::AdaptArgs;
use crate::report::Reporter;

pub(super) async fn run<W: Write>(
    config: &ProbeConfig,
    args: &AdaptArgs,
    report: &mut Reporter<W>,
) -> Result<()> {
    let Some(session) = open_session(config, report, false).await? else {
        return Ok(());
    };

    let generation = &config.generation;
    let target = args.adapt.as_deref().unwrap_or(&generation.adapt);
    let request = GenerationRequest {
        app_id: args.app_id.unwrap_or(generation.app_id),
        message: args
            .message
            .clone()
            .unwrap_or_else(|| generation.message.clone()),
        adapt: Some(target.to_string()),
    };
    let limits = StreamLimits {
        timeout: generation.timeout(),
        chunk_size: generation.chunk_size,
        max_chunks: generation.max_chunks,
    };

    report.section(format_args!(
        "Generating code for app {} with adapt={target}",
        request.app_id
    ))?;
    report.field(
        "Endpoint",
        format_args!("{}{}", session.client().base_url(), endpoints::GENERATE),
    )?;
    report.field("Message", &request.message)?;

    match session.generate(&request, &limits).await {
        Ok(capture) => print_capture(report, &capture, generation)?,
        Err(e) if e.is_timeout() => {
            report.note("Request timed out (expected, generation takes time)")?;
        }
        Err(ProbeError::HttpStatus { status, body, .. }) => {
            report.fail(format_args!("Generation request failed: HTTP {status}"))?;
            report.field("Response", body)?;
        }
        Err(e) => report.fail(format_args!("Generation request error: {e}"))?,
    }

    let settle = generation.settle();
    if !settle.is_zero() {
        debug!(?settle, "Waiting before re-reading the app");
        tokio::time::sleep(settle).await;
    }

    report.step("Checking the app after generation")?;
    match session.app_detail(request.app_id).await {
        Ok(record) => {
            report.field("id", record.id)?;
            report.field("appName", or_none(record.app_name.as_deref()))?;
            report.field("codeGenType", or_none(record.code_gen_type.as_deref()))?;
            match check_code_gen_type(&record, target) {
                CodeGenCheck::Matches => {
                    report.ok(format_args!("codeGenType updated to {target}"))?;
                }
                CodeGenCheck::Mismatch { actual } => report.warn(format_args!(
                    "codeGenType is still {}",
                    or_none(actual.as_deref())
                ))?,
            }
        }
        Err(e) => report.fail(format_args!("Could not re-read app: {e}"))?,
    }
    Ok(())
}

fn print_capture<W: Write>(
    report: &mut Reporter<W>,
    capture: &GenerationCapture,
    generation: &GenerationConfig,
) -> std::io::Result<()> {
    report.field("Status", capture.status)?;
    report.ok("Generation stream opened")?;

    for (index, chunk) in capture
        .chunks
        .iter()
        .take(generation.preview_chunks)
        .enumerate()
    {
        let shown = &chunk[..chunk.len().min(generation.preview_bytes)];
        report.item(format_args!("Chunk {}: {}...", index + 1, shown.escape_ascii()))?;
    }
    report.field("Chunks received", capture.chunks.len())?;

    match &capture.end {
        StreamEnd::LimitReached => {
            report.note(format_args!("Stopped reading after {} chunks", capture.chunks.len()))?;
        }
        StreamEnd::Completed => report.note("Server closed the stream")?,
        StreamEnd::TimedOut => {
            report.note("Stream timed out (expected, generation takes time)")?;
        }
        StreamEnd::Failed(message) => report.fail(format_args!("Stream broke off: {message}"))?,
    }

    let summary = &capture.summary;
    if summary.is_empty() {
        return Ok(());
    }
    report.field("Data events", summary.data_events)?;
    if !summary.tools_executed.is_empty() {
        report.field("Tools executed", summary.tools_executed.join(", "))?;
    }
    if !summary.files_written.is_empty() {
        report.field("Files written", summary.files_written.join(", "))?;
    }
    if !summary.files_failed.is_empty() {
        report.warn(format_args!(
            "File writes failed: {}",
            summary.files_failed.join(", ")
        ))?;
    }
    if summary.generation_complete || summary.done {
        report.note("Generation reported completion")?;
    }
    Ok(())
}
