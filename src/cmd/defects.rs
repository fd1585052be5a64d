//! Defect commands: report, list, show, status, teams.

use anyhow::{Context, Result, bail};
use console::style;
use defectdesk::config::DefectDeskToml;
use defectdesk::errors::ClassifierError;
use defectdesk::intake::classifier::{AnthropicClassifier, Classifier};
use defectdesk::intake::models::{Defect, DefectFilter, ExtractedFields, HistoryEntry, NewDefect};
use defectdesk_common::{Category, DefectStatus, Priority};

use super::open_db;

pub async fn cmd_report(
    config: &DefectDeskToml,
    description: String,
    category: Option<Category>,
    priority: Option<Priority>,
    team: Option<String>,
) -> Result<()> {
    let description = description.trim().to_string();
    if description.is_empty() {
        bail!("Description must not be empty");
    }
    let db = open_db(config)?;

    let new = match (category, priority, team) {
        (Some(category), Some(priority), Some(team)) => NewDefect {
            raw_input: description,
            extracted: ExtractedFields::default(),
            category,
            priority,
            team,
            priority_reasoning: Some("Entered manually".to_string()),
            recommended_actions: Vec::new(),
            estimated_resolution_time: None,
        },
        (None, None, None) => {
            let key = config.ai.api_key.clone().ok_or(ClassifierError::NotConfigured)?;
            let classifier = AnthropicClassifier::new(key, &config.ai, config.team_names())?;
            let history = db.recent_resolutions(config.ai.history_context)?;

            println!("{}", style("Analyzing report...").dim());
            let classification = classifier
                .classify(&description, &history)
                .await
                .context("Classification failed; nothing was stored")?;
            classification.into_new_defect(description)
        }
        _ => bail!("Give all of --category, --priority and --team, or none of them"),
    };

    let defect = db.create(&new)?;
    println!();
    println!(
        "{} {}",
        style("Created").green().bold(),
        style(defect.ticket_id.to_string()).bold()
    );
    print_defect(&defect);
    Ok(())
}

pub fn cmd_list(config: &DefectDeskToml, filter: &DefectFilter) -> Result<()> {
    let db = open_db(config)?;
    let defects = db.list(filter)?;

    if defects.is_empty() {
        println!("No defects found.");
        return Ok(());
    }

    println!(
        "{:<20} {:<16} {:<9} {:<16} {:<12} Issue",
        "Ticket", "Category", "Priority", "Team", "Status"
    );
    println!(
        "{:<20} {:<16} {:<9} {:<16} {:<12} -----",
        "------", "--------", "--------", "----", "------"
    );
    for d in &defects {
        let summary = d.extracted.issue.as_deref().unwrap_or(&d.raw_input);
        println!(
            "{:<20} {:<16} {:<9} {:<16} {:<12} {}",
            d.ticket_id.to_string(),
            d.category.as_str(),
            priority_style(d.priority),
            d.assigned_team,
            d.status.as_str(),
            truncate(summary, 50)
        );
    }
    println!();
    println!("{} defect(s)", defects.len());
    Ok(())
}

pub fn cmd_show(config: &DefectDeskToml, ticket: &str) -> Result<()> {
    let db = open_db(config)?;
    let defect = db.get(ticket)?;
    let history = db.history(ticket)?;

    println!();
    println!("{}", style(defect.ticket_id.to_string()).bold());
    print_defect(&defect);
    println!();
    println!("{}", style("History").underlined());
    for entry in &history {
        print_history_entry(entry);
    }
    Ok(())
}

pub fn cmd_status(
    config: &DefectDeskToml,
    ticket: &str,
    status: DefectStatus,
    note: Option<&str>,
    actor: Option<&str>,
) -> Result<()> {
    let db = open_db(config)?;
    let defect = db.transition(ticket, status, note, actor)?;
    println!(
        "{} {} is now {}",
        style("Updated").green().bold(),
        defect.ticket_id,
        style(defect.status).bold()
    );
    Ok(())
}

pub fn cmd_teams(config: &DefectDeskToml) -> Result<()> {
    let db = open_db(config)?;
    let teams = db.list_teams()?;

    println!("{:<18} {:<26} {:<14} Specialization", "Team", "Email", "Phone");
    for team in &teams {
        println!(
            "{:<18} {:<26} {:<14} {}",
            team.name,
            team.contact_email.as_deref().unwrap_or("-"),
            team.contact_phone.as_deref().unwrap_or("-"),
            team.specialization.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn print_defect(d: &Defect) {
    let field = |label: &str, value: &str| println!("  {:<12} {}", style(label).dim(), value);

    field("Status", d.status.as_str());
    field("Category", d.category.as_str());
    field("Priority", &priority_style(d.priority).to_string());
    field("Team", &d.assigned_team);
    field("Created", &d.created_at);
    if let Some(equipment) = &d.extracted.equipment {
        field("Equipment", equipment);
    }
    if let Some(location) = &d.extracted.location {
        field("Location", location);
    }
    if let Some(issue) = &d.extracted.issue {
        field("Issue", issue);
    }
    field("Report", &d.raw_input);
    if let Some(reasoning) = &d.priority_reasoning {
        field("Reasoning", reasoning);
    }
    if let Some(eta) = &d.estimated_resolution_time {
        field("Estimate", eta);
    }
    for (i, action) in d.recommended_actions.iter().enumerate() {
        field(if i == 0 { "Actions" } else { "" }, &format!("{}. {}", i + 1, action));
    }
    if let Some(notes) = &d.resolution_notes {
        field("Resolution", notes);
    }
    if let Some(hours) = d.actual_resolution_time_hours {
        field("Took", &format!("{:.2} h", hours));
    }
}

fn print_history_entry(entry: &HistoryEntry) {
    let from = entry
        .status_from
        .map(|s| s.as_str())
        .unwrap_or("(new)");
    println!(
        "  {}  {} -> {}  {}{}",
        style(&entry.changed_at).dim(),
        from,
        style(entry.status_to).bold(),
        entry.changed_by.as_deref().unwrap_or("-"),
        entry
            .note
            .as_deref()
            .map(|n| format!(": {}", n))
            .unwrap_or_default()
    );
}

fn priority_style(priority: Priority) -> console::StyledObject<&'static str> {
    let s = style(priority.as_str());
    match priority {
        Priority::Critical => s.red().bold(),
        Priority::High => s.yellow(),
        Priority::Medium => s,
        Priority::Low => s.dim(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
