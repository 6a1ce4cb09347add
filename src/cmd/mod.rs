//! CLI command implementations.

use crate::Cli;
use anyhow::{Context, Result};
use crossport::auth::{Authorizer, Identity, StaticAuthorizer};
use crossport::backup::NoopBackup;
use crossport::config::GatewayConfig;
use crossport::events::{ConsoleSink, EventSink};
use crossport::orchestrator::{ExecutePlanOptions, WorkflowEngine};
use crossport::project_io::load_project;
use crossport::rpc::HttpStageTransport;
use crossport_common::AiPlan;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build the engine from config, sinks, and the authorized identity.
async fn build_engine(cli: &Cli, out_dir: Option<PathBuf>) -> Result<WorkflowEngine> {
    let config = GatewayConfig::load(cli.config.as_deref())?;
    let transport =
        Arc::new(HttpStageTransport::new(&config.service).context("stage transport")?);

    let authorizer = StaticAuthorizer::new(Identity::default());
    let identity = authorizer
        .authorize(&cli.access_token)
        .await?
        .context("not authorized to use this service")?;

    let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(ConsoleSink::new(out_dir))];
    Ok(WorkflowEngine::new(
        transport,
        sinks,
        Arc::new(NoopBackup),
        identity,
    ))
}

pub async fn cmd_migrate(
    cli: &Cli,
    project: &Path,
    language: &str,
    target: &str,
    name: Option<&str>,
    out: Option<PathBuf>,
) -> Result<()> {
    let source = load_project(project, language, name)?;
    let engine = build_engine(cli, out).await?;
    engine.migrate(source, target).await;
    Ok(())
}

pub async fn cmd_gen_plan(
    cli: &Cli,
    project: &Path,
    language: &str,
    instruction: &str,
    name: Option<&str>,
) -> Result<()> {
    let source = load_project(project, language, name)?;
    let engine = build_engine(cli, None).await?;
    let plan = engine.generate_plan(source, instruction).await;
    anyhow::ensure!(!plan.is_empty(), "plan generation failed");
    Ok(())
}

pub async fn cmd_execute_plan(
    cli: &Cli,
    project: &Path,
    language: &str,
    plan_file: &Path,
    validate: bool,
    autofix: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let plan_text = std::fs::read_to_string(plan_file)
        .with_context(|| format!("failed to read plan file {}", plan_file.display()))?;
    let source = load_project(project, language, None)?;
    let engine = build_engine(cli, out).await?;
    engine
        .execute_plan(source, &plan_text, ExecutePlanOptions { validate, autofix })
        .await;
    Ok(())
}

pub async fn cmd_gen_tests(
    cli: &Cli,
    project: &Path,
    language: &str,
    tests: Option<&Path>,
    instruction: &str,
) -> Result<()> {
    let source = load_project(project, language, None)?;
    let test_project = tests
        .map(|dir| load_project(dir, language, None))
        .transpose()?;
    let engine = build_engine(cli, None).await?;
    engine.generate_tests(source, instruction, test_project).await;
    Ok(())
}

/// Offline check: parse a plan file and print its canonical rendering.
pub fn cmd_plan_check(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read plan file {}", file.display()))?;
    let plan = AiPlan::from_text(&text).context("plan file is not a valid AI plan")?;
    print!("{}", plan.to_text()?);
    eprintln!("plan OK: {} step(s)", plan.operations.len());
    Ok(())
}
