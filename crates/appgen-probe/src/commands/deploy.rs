//! Deployment probes: by id, the caller's own apps, and all apps of one type.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use appgen_probe_core::types::display_value;
use appgen_probe_core::{
    classify_page, deploy_outcome, filter_by_code_gen_type, project_dir_name, DeployOutcome,
    EntityId, PageKind, PageQuery, ProbeConfig, Session,
};
use serde_json::Value;
use tracing::info;

use super::{build_client, open_session, or_none};
use crate::cli::{DeployArgs, DeployMineArgs, DeployVueArgs};
use crate::report::Reporter;

/// `deploy`
pub(super) async fn run<W: Write>(
    config: &ProbeConfig,
    args: &DeployArgs,
    report: &mut Reporter<W>,
) -> Result<()> {
    let session = if args.anonymous {
        let Some(client) = build_client(config, report)? else {
            return Ok(());
        };
        report.note("Skipping login")?;
        client.anonymous()
    } else {
        let Some(session) = open_session(config, report, false).await? else {
            return Ok(());
        };
        session
    };

    let ids = if !args.ids.is_empty() {
        args.ids.clone()
    } else if args.anonymous {
        vec![config.apps.deploy_id]
    } else {
        config.apps.known_ids.clone()
    };

    for id in ids {
        report.section(format_args!("Deploying app {id}"))?;
        let url = deploy_one(&session, id, report).await?;
        if let (true, Some(url)) = (args.verify, url) {
            verify_page(&session, &url, config.verify.timeout(), report).await?;
        }
    }
    Ok(())
}

/// `deploy-mine`
pub(super) async fn run_mine<W: Write>(
    config: &ProbeConfig,
    args: &DeployMineArgs,
    report: &mut Reporter<W>,
) -> Result<()> {
    let Some(session) = open_session(config, report, true).await? else {
        return Ok(());
    };

    report.step("Listing my apps")?;
    let page_size = args.page_size.unwrap_or(config.listing.my_page_size);
    let page = match session.list_my_apps(PageQuery::first(page_size)).await {
        Ok(page) => page,
        Err(e) => {
            report.fail(format_args!("Failed to list apps: {e}"))?;
            return Ok(());
        }
    };

    if page.records.is_empty() {
        report.fail("No apps found, nothing to deploy")?;
        return Ok(());
    }
    report.ok(format_args!("Found {} apps:", page.records.len()))?;
    for app in &page.records {
        report.item(format_args!(
            "ID: {}, name: {}, type: {}",
            app.id,
            or_none(app.app_name.as_deref()),
            or_none(app.code_gen_type.as_deref())
        ))?;
    }

    for app in &page.records {
        report.section(format_args!(
            "App {} (ID: {}, type: {})",
            or_none(app.app_name.as_deref()),
            app.id,
            or_none(app.code_gen_type.as_deref())
        ))?;
        let url = deploy_one(&session, app.id, report).await?;
        if let (true, Some(url)) = (args.verify, url) {
            verify_page(&session, &url, config.verify.timeout(), report).await?;
        }
    }
    Ok(())
}

/// `deploy-vue`
pub(super) async fn run_vue<W: Write>(
    config: &ProbeConfig,
    args: &DeployVueArgs,
    report: &mut Reporter<W>,
) -> Result<()> {
    let Some(session) = open_session(config, report, false).await? else {
        return Ok(());
    };

    let expected = args
        .expected
        .as_deref()
        .unwrap_or(&config.apps.expected_code_gen_type);
    let limit = args.limit.map_or(config.listing.deploy_limit, |n| {
        usize::try_from(n).unwrap_or(usize::MAX)
    });

    report.step("Listing all apps")?;
    let page_size = args.page_size.unwrap_or(config.listing.admin_page_size);
    let page = match session.list_all_apps(PageQuery::first(page_size)).await {
        Ok(page) => page,
        Err(e) => {
            report.fail(format_args!("Failed to list apps: {e}"))?;
            return Ok(());
        }
    };
    report.ok(format_args!("Found {} apps in total", page.records.len()))?;

    let matching = filter_by_code_gen_type(&page.records, expected);
    if matching.is_empty() {
        report.fail(format_args!("No {expected} apps found"))?;
        return Ok(());
    }
    report.ok(format_args!("Found {} {expected} apps:", matching.len()))?;
    for app in &matching {
        report.item(format_args!(
            "ID: {}, name: {}",
            app.id,
            or_none(app.app_name.as_deref())
        ))?;
    }

    info!(selected = matching.len().min(limit), limit, "Deploying matching apps");
    for app in matching.into_iter().take(limit) {
        report.section(format_args!(
            "App {} (ID: {})",
            or_none(app.app_name.as_deref()),
            app.id
        ))?;
        if let Some(url) = deploy_one(&session, app.id, report).await? {
            verify_page(&session, &url, config.verify.timeout(), report).await?;
        }
    }
    Ok(())
}

/// Deploy one app and print the raw exchange. Returns the deploy URL when the
/// server reported success with one.
async fn deploy_one<W: Write>(
    session: &Session,
    id: EntityId,
    report: &mut Reporter<W>,
) -> Result<Option<String>> {
    report.field("Project directory", project_dir_name(id))?;
    let response = match session.deploy(id).await {
        Ok(response) => response,
        Err(e) => {
            report.fail(format_args!("Deploy request error: {e}"))?;
            return Ok(None);
        }
    };

    report.field("Status", response.status)?;
    report.field("Response", &response.body)?;
    if response.is_ok() {
        if let Ok(envelope) = response.envelope::<Value>() {
            report.field("Code", envelope.code)?;
            report.field("Message", envelope.message_or_empty())?;
            report.field("Data", display_value(envelope.data.as_ref()))?;
        }
    }

    match deploy_outcome(&response) {
        DeployOutcome::RequestFailed { status } => {
            report.fail(format_args!("Deploy request failed: HTTP {status}"))?;
            Ok(None)
        }
        DeployOutcome::Undecodable { message } => {
            report.fail(format_args!("Deploy response is not an API envelope: {message}"))?;
            Ok(None)
        }
        DeployOutcome::Rejected { code, message } => {
            report.fail(format_args!("Deployment failed ({code}): {message}"))?;
            Ok(None)
        }
        DeployOutcome::Deployed { url } => {
            report.ok("Deployment succeeded")?;
            if let Some(url) = &url {
                report.field("Deploy URL", url)?;
            }
            Ok(url)
        }
    }
}

/// Fetch a deployed page and check that it serves HTML.
async fn verify_page<W: Write>(
    session: &Session,
    url: &str,
    timeout: Duration,
    report: &mut Reporter<W>,
) -> Result<()> {
    report.step(format_args!("Fetching deployed page {url}"))?;
    let page = match session.fetch_page(url, timeout).await {
        Ok(page) => page,
        Err(e) => {
            report.fail(format_args!("Error fetching deployed page: {e}"))?;
            return Ok(());
        }
    };

    report.field("Status", page.status)?;
    if page.status != 200 {
        report.fail(format_args!("Deployed page not reachable: HTTP {}", page.status))?;
        return Ok(());
    }
    report.ok("Deployed page is reachable")?;
    report.field("Content length", format_args!("{} chars", page.body.chars().count()))?;
    match classify_page(&page.body) {
        PageKind::Html => report.ok("HTML content confirmed")?,
        PageKind::NotHtml => report.warn("Response is not HTML")?,
    }
    Ok(())
}
