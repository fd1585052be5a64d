//! Database setup and health commands.

use anyhow::Result;
use console::style;
use defectdesk::config::DefectDeskToml;
use defectdesk_common::{DefectStatus, Priority};

use super::open_db;

pub fn cmd_init(config: &DefectDeskToml) -> Result<()> {
    let db = open_db(config)?;
    let teams = db.list_teams()?;
    println!(
        "Database initialized at {} ({} teams)",
        config.database.path.display(),
        teams.len()
    );
    Ok(())
}

pub fn cmd_check(config: &DefectDeskToml) -> Result<()> {
    let db = open_db(config)?;
    let summary = db.summary()?;
    let teams = db.list_teams()?;

    println!();
    println!("DefectDesk Database Check");
    println!("=========================");
    println!("Database: {}", config.database.path.display());
    println!();
    println!("Total defects: {}", summary.total);
    println!("Open defects:  {}", summary.status_count(DefectStatus::Open));
    println!("Teams:         {}", teams.len());
    println!();

    println!("By priority:");
    for priority in Priority::ALL {
        println!("  {:<12} {}", priority.as_str(), summary.priority_count(priority));
    }
    println!();

    println!("By status:");
    for status in DefectStatus::ALL {
        println!("  {:<12} {}", status.as_str(), summary.status_count(status));
    }
    println!();

    println!("Reported per day (last 7 days):");
    if summary.recent_trend.is_empty() {
        println!("  none");
    }
    for day in &summary.recent_trend {
        println!("  {}   {}", day.date, day.count);
    }
    println!();

    let mismatches = db.verify_history()?;
    if mismatches.is_empty() {
        println!("History: {}", style("consistent").green());
    } else {
        println!(
            "History: {}",
            style(format!("{} inconsistent record(s)", mismatches.len())).red()
        );
        for m in &mismatches {
            println!("  {} {}", m.ticket_id, m.detail);
        }
        anyhow::bail!("History check failed");
    }
    Ok(())
}
