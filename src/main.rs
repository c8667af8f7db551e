use std::path::Path;

use clap::Parser;
use colored::*;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use syncpad::api::{FileId, Project};
use syncpad::cli::{self, Args};
use syncpad::SyncSession;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = cli::resolve_config(&args)?;

    let mut session = SyncSession::new(config);

    let projects = session.refresh_projects().await?;
    print_tree(&projects);
    if args.list {
        return Ok(());
    }

    let Some(selector) = args.file.clone() else {
        println!("{}", "Pass a file name or id to start editing (see --help).".yellow());
        return Ok(());
    };
    let file_id = resolve_file(&projects, &selector)
        .ok_or_else(|| format!("no file named or numbered '{}' in this room", selector))?;

    session.open_file(file_id).await?;
    println!(
        "{} {} {}",
        "editing".green().bold(),
        selector.bright_white(),
        format!(
            "[{} mode, as {}]",
            session.editor_mode(),
            session.channel().identity()
        )
        .dimmed()
    );
    write_preview(&session, args.preview_out.as_deref());

    println!(
        "{}",
        "Each input line replaces the document. :save persists, :quit exits.".dimmed()
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            update = session.next_remote() => {
                match update {
                    Some(update) => {
                        session.handle_remote(update);
                        println!("{} {}", "[remote]".cyan(), session.widget_content());
                        write_preview(&session, args.preview_out.as_deref());
                    }
                    None => break,
                }
            }
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(cmd) if cmd.trim() == ":quit" => break,
                    Some(cmd) if cmd.trim() == ":save" => {
                        // A failed save is a transient notice; the cache keeps the edit.
                        match session.save_active().await {
                            Ok(()) => println!("{}", "saved".green()),
                            Err(e) => println!("{} {}", "save failed:".red(), e),
                        }
                    }
                    Some(text) => {
                        session.apply_local_edit(&text);
                        write_preview(&session, args.preview_out.as_deref());
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_tree(projects: &[Project]) {
    for project in projects {
        println!("{}", project.name.bold());
        for file in &project.files {
            println!("  {} {}", format!("#{}", file.id).dimmed(), file.name);
        }
    }
}

/// Match a file selector against the tree: a numeric id, or an exact name.
fn resolve_file(projects: &[Project], selector: &str) -> Option<FileId> {
    if let Ok(id) = selector.parse::<FileId>() {
        if projects.iter().any(|p| p.contains(id)) {
            return Some(id);
        }
    }
    projects
        .iter()
        .flat_map(|p| p.files.iter())
        .find(|f| f.name == selector)
        .map(|f| f.id)
}

fn write_preview(session: &SyncSession, path: Option<&Path>) {
    if let Some(path) = path {
        if let Err(e) = std::fs::write(path, session.render_preview()) {
            tracing::warn!(path = %path.display(), error = %e, "preview write failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
