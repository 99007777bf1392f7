//! `inspect`: compare stored app records with the expected generation type.

use std::io::Write;

use anyhow::Result;
use appgen_probe_core::types::display_value;
use appgen_probe_core::{check_code_gen_type, AppRecord, CodeGenCheck, ProbeConfig};

use super::{open_session, or_none};
use crate::cli::InspectArgs;
use crate::report::Reporter;

pub(super) async fn run<W: Write>(
    config: &ProbeConfig,
    args: &InspectArgs,
    report: &mut Reporter<W>,
) -> Result<()> {
    let Some(session) = open_session(config, report, false).await? else {
        return Ok(());
    };

    let expected = args
        .expected
        .as_deref()
        .unwrap_or(&config.apps.expected_code_gen_type);
    let ids = if args.ids.is_empty() {
        &config.apps.known_ids
    } else {
        &args.ids
    };

    report.section(format_args!("Checking {} apps against '{expected}'", ids.len()))?;
    for &id in ids {
        report.step(format_args!("App {id}"))?;
        let record = match session.app_detail(id).await {
            Ok(record) => record,
            Err(e) => {
                report.fail(format_args!("No record found: {e}"))?;
                continue;
            }
        };

        print_record(report, &record)?;
        match check_code_gen_type(&record, expected) {
            CodeGenCheck::Matches => report.ok(format_args!("codeGenType is {expected}"))?,
            CodeGenCheck::Mismatch { actual } => report.fail(format_args!(
                "codeGenType mismatch: expected {expected}, found {}",
                or_none(actual.as_deref())
            ))?,
        }
    }
    Ok(())
}

fn print_record<W: Write>(report: &mut Reporter<W>, record: &AppRecord) -> std::io::Result<()> {
    report.field("id", record.id)?;
    report.field("appName", or_none(record.app_name.as_deref()))?;
    report.field("codeGenType", or_none(record.code_gen_type.as_deref()))?;
    match record.user_id {
        Some(user_id) => report.field("userId", user_id)?,
        None => report.field("userId", "None")?,
    }
    report.field("createTime", display_value(record.create_time.as_ref()))?;
    report.field("deployKey", or_none(record.deploy_key.as_deref()))
}
