//! Template CLI commands.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

pub async fn list(state: &AppState, all: bool, json: bool) -> Result<()> {
    let templates = state.store.list_templates(!all).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    if templates.is_empty() {
        println!();
        println!(
            "  {} No templates. Load the built-in set with: {}",
            style("i").blue().bold(),
            style("kbatlas template seed").yellow()
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
        Cell::new("Category").fg(Color::White),
        Cell::new("Difficulty").fg(Color::White),
        Cell::new("Tags").fg(Color::White),
    ]);

    for template in &templates {
        let name = if template.is_public {
            Cell::new(&template.name)
        } else {
            Cell::new(format!("{} (private)", template.name)).fg(Color::DarkGrey)
        };
        let tags: Vec<&str> = template.tags.iter().map(String::as_str).collect();
        table.add_row(vec![
            Cell::new(&template.id).fg(Color::Cyan),
            name,
            Cell::new(template.category.to_string()),
            Cell::new(template.difficulty.to_string()),
            Cell::new(tags.join(", ")).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!(
        "\n  Start from one with: {}",
        style("kbatlas builder new --template <id>").yellow()
    );
    Ok(())
}

pub async fn seed(state: &AppState, json: bool) -> Result<()> {
    let count = state.store.seed_builtin_templates().await?;

    if json {
        println!("{}", serde_json::json!({ "seeded": count }));
    } else {
        println!(
            "  {} Seeded {} built-in template(s)",
            style("✓").green().bold(),
            count
        );
    }
    Ok(())
}
