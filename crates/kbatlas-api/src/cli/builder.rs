//! Builder session CLI commands: new, list, show, update, step, sync-files,
//! deploy, delete.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use kbatlas_types::builder::{
    BuilderId, BuilderState, BuilderStep, DeployEnvironment, DeploymentStatus, OwnerId,
    ProcessingStatus, SectionUpdate,
};

use crate::state::AppState;

fn parse_id(raw: &str) -> Result<BuilderId> {
    raw.parse()
        .with_context(|| format!("invalid builder id: '{raw}'"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Start a session, empty or cloned from a template.
pub async fn new_builder(
    state: &AppState,
    owner: &OwnerId,
    template: Option<String>,
    json: bool,
) -> Result<()> {
    let session = match template.as_deref() {
        Some(template_id) => state
            .store
            .clone_from_template(template_id, owner)
            .await
            .with_context(|| format!("could not clone template '{template_id}'"))?,
        None => state.store.create(owner).await?,
    };

    if json {
        return print_json(&session);
    }

    println!();
    println!("  {} Builder session created", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("ID:").bold(), style(session.id()).cyan());
    if let Some(template_id) = template {
        println!("  {}  {}", style("Template:").bold(), template_id);
    }
    println!("  {}  {}", style("Step:").bold(), session.config.step);
    println!();
    println!(
        "  Next: {}",
        style(format!("kbatlas builder update {} --file basic.json", session.id())).yellow()
    );
    println!();
    Ok(())
}

pub async fn list(state: &AppState, owner: &OwnerId, json: bool) -> Result<()> {
    let sessions = state.store.list(owner).await?;

    if json {
        return print_json(&sessions);
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No builder sessions. Start one with: {}",
            style("i").blue().bold(),
            style("kbatlas builder new").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Step").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for session in &sessions {
        let name = if session.name.trim().is_empty() {
            Cell::new("(unnamed)").fg(Color::DarkGrey)
        } else {
            Cell::new(&session.name)
        };
        table.add_row(vec![
            Cell::new(session.id.to_string()).fg(Color::DarkGrey),
            name,
            Cell::new(step_progress(session.step)),
            status_cell(session.deployment_status),
            Cell::new(format_relative_time(&session.updated_at)),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub async fn show(state: &AppState, owner: &OwnerId, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let session = state.store.load(&id, owner).await?;

    if json {
        return print_json(&session);
    }
    print_session(&session);
    Ok(())
}

/// Replace one section from a `{"section": ..., "data": ...}` JSON file.
pub async fn update(
    state: &AppState,
    owner: &OwnerId,
    id: &str,
    file: &Path,
    json: bool,
) -> Result<()> {
    let id = parse_id(id)?;
    let raw = if file == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?
    };
    let update: SectionUpdate =
        serde_json::from_str(&raw).context("section file is not a valid section update")?;
    let section = update.step();

    let session = state.controller.update_step(&id, owner, update).await?;

    if json {
        return print_json(&session);
    }
    println!();
    println!(
        "  {} Updated {} section (version {})",
        style("✓").green().bold(),
        style(section).cyan(),
        session.version
    );
    print_validation(&session);
    Ok(())
}

pub async fn step(
    state: &AppState,
    owner: &OwnerId,
    id: &str,
    target: BuilderStep,
    json: bool,
) -> Result<()> {
    let id = parse_id(id)?;
    let session = state.controller.navigate_to(&id, owner, target, None).await?;

    if json {
        return print_json(&session);
    }
    println!();
    println!(
        "  {} Now on {}",
        style("→").cyan().bold(),
        style(step_progress(session.config.step)).bold()
    );
    print_validation(&session);
    Ok(())
}

pub async fn sync_files(state: &AppState, owner: &OwnerId, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let session = state.publisher.sync_knowledge_files(&id, owner).await?;

    if json {
        return print_json(&session);
    }
    println!();
    for file in &session.config.files.knowledge_files {
        let marker = match file.processing_status {
            ProcessingStatus::Completed => style("✓").green(),
            ProcessingStatus::Failed => style("✗").red(),
            ProcessingStatus::Pending | ProcessingStatus::Processing => style("…").dim(),
        };
        println!("  {} {}", marker, file.name);
    }
    let stores: Vec<&str> = session
        .config
        .files
        .vector_store_ids
        .iter()
        .map(String::as_str)
        .collect();
    println!();
    println!("  {}  {}", style("Vector stores:").bold(), stores.join(", "));
    println!();
    Ok(())
}

pub async fn deploy(
    state: &AppState,
    owner: &OwnerId,
    id: &str,
    environment: DeployEnvironment,
    json: bool,
) -> Result<()> {
    let id = parse_id(id)?;
    let agent_id = state.publisher.deploy(&id, owner, environment).await?;

    if json {
        return print_json(&serde_json::json!({
            "builder_id": id,
            "agent_id": agent_id,
            "environment": environment,
        }));
    }
    println!();
    println!(
        "  {} Deployed to {}",
        style("✓").green().bold(),
        style(environment).cyan()
    );
    println!("  {}  {}", style("Agent ID:").bold(), agent_id);
    println!();
    Ok(())
}

pub async fn delete(state: &AppState, owner: &OwnerId, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    state.store.delete(&id, owner).await?;

    if json {
        return print_json(&serde_json::json!({ "deleted": id }));
    }
    println!("  {} Deleted builder session {}", style("✓").green().bold(), id);
    Ok(())
}

fn print_session(session: &BuilderState) {
    let config = &session.config;
    println!();
    println!(
        "  {} {}",
        style(if config.basic.name.is_empty() {
            "(unnamed agent)"
        } else {
            &config.basic.name
        })
        .cyan()
        .bold(),
        style(format!("[{}]", session.deployment.status)).dim()
    );
    println!();
    println!("  {}  {}", style("ID:").bold(), style(session.id()).dim());
    println!("  {}  {}", style("Step:").bold(), step_progress(config.step));
    println!("  {}  {}", style("Model:").bold(), config.basic.model);
    println!("  {}  {}", style("Category:").bold(), config.basic.category);
    println!(
        "  {}  code interpreter {}, file search {}, {} function(s)",
        style("Tools:").bold(),
        on_off(config.tools.code_interpreter),
        on_off(config.tools.file_search),
        config.tools.functions.len()
    );
    println!(
        "  {}  temperature {}, top_p {}, max_tokens {}",
        style("Generation:").bold(),
        config.advanced.temperature,
        config.advanced.top_p,
        config.advanced.max_tokens
    );
    if let Some(agent_id) = &session.deployment.deployed_agent_id {
        println!("  {}  {}", style("Agent ID:").bold(), agent_id);
    }
    if let Some(error) = &session.deployment.error {
        println!("  {}  {}", style("Last error:").bold().red(), error);
    }
    print_validation(session);
}

fn print_validation(session: &BuilderState) {
    let report = &session.validation;
    println!();
    if report.is_valid {
        println!("  {} Ready to deploy", style("✓").green());
    }
    for (step, errors) in &report.step_errors {
        for error in errors {
            println!("  {} {}: {}", style("✗").red(), style(step).bold(), error);
        }
    }
    for warning in &report.warnings {
        println!("  {} {}", style("!").yellow(), warning);
    }
    println!();
}

fn step_progress(step: BuilderStep) -> String {
    format!("{} ({}/{})", step, step.index() + 1, BuilderStep::ALL.len())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn status_cell(status: DeploymentStatus) -> Cell {
    match status {
        DeploymentStatus::Draft => Cell::new("○ draft").fg(Color::DarkGrey),
        DeploymentStatus::Deploying => Cell::new("◐ deploying").fg(Color::Yellow),
        DeploymentStatus::Deployed => Cell::new("● deployed").fg(Color::Green),
        DeploymentStatus::Failed => Cell::new("✗ failed").fg(Color::Red),
    }
}

fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let diff = chrono::Utc::now() - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_progress_is_one_based() {
        assert_eq!(step_progress(BuilderStep::Basic), "basic (1/7)");
        assert_eq!(step_progress(BuilderStep::Deploy), "deploy (7/7)");
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = chrono::Utc::now();
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(
            format_relative_time(&(now - chrono::Duration::minutes(5))),
            "5m ago"
        );
        assert_eq!(
            format_relative_time(&(now - chrono::Duration::days(3))),
            "3d ago"
        );
    }
}
