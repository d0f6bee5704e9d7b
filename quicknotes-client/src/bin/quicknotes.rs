use clap::Parser;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use quicknotes_client::{
    logging, ClientConfig, GraphqlBackend, MemoryBackend, NotesBackend, Store, SyncController,
    WriteOutcome,
};
use quicknotes_core::{AppState, ClientSessionId, FormField};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::parse();
    logging::init_tracing(&config.log_filter);

    let session = ClientSessionId::generate();
    let backend: Arc<dyn NotesBackend> = if config.memory {
        Arc::new(MemoryBackend::new())
    } else {
        Arc::new(GraphqlBackend::from_config(&config)?)
    };
    let controller = SyncController::new(Store::new(), backend, session, config.sync_config());

    println!("{}", "📝 Quick Notes".bold().cyan());
    println!("{}", "==============".cyan());
    if config.memory {
        println!("🧪 Backend: {}", "in-memory".yellow());
    } else {
        println!("🌐 Backend: {}", config.endpoint.green());
    }
    println!("🆔 Session: {}", session.to_string().dimmed());

    let report = controller.initialize().await?;
    if !report.subscribed {
        println!("{}", "⚠️  Realtime updates unavailable".yellow());
    }

    loop {
        render(&controller.state());

        let choices = [
            "Create note",
            "Toggle completed",
            "Delete note",
            "Refresh",
            "Quit",
        ];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(&choices)
            .default(0)
            .interact()?;

        match selection {
            0 => create_note(&controller).await?,
            1 => {
                if let Some(id) = pick_note(&controller.state(), "Toggle which note?")? {
                    report_outcome(controller.toggle_completed(id).await?);
                }
            }
            2 => {
                if let Some(id) = pick_note(&controller.state(), "Delete which note?")? {
                    report_outcome(controller.delete_note(id).await?);
                }
            }
            3 => continue,
            _ => break,
        }
    }

    controller.shutdown().await;
    println!("👋 Goodbye!");
    Ok(())
}

async fn create_note(controller: &SyncController) -> Result<(), Box<dyn std::error::Error>> {
    let theme = ColorfulTheme::default();
    let name: String = Input::with_theme(&theme)
        .with_prompt("Note Name")
        .allow_empty(true)
        .interact_text()?;
    controller.set_input(FormField::Name, name);

    let description: String = Input::with_theme(&theme)
        .with_prompt("Description")
        .allow_empty(true)
        .interact_text()?;
    controller.set_input(FormField::Description, description);

    match controller.submit_form().await {
        Ok(outcome) => report_outcome(outcome),
        Err(e) if e.is_validation() => println!("{}", format!("❌ {}", e).red()),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn pick_note(
    state: &AppState,
    prompt: &str,
) -> Result<Option<uuid::Uuid>, Box<dyn std::error::Error>> {
    if state.notes.is_empty() {
        println!("{}", "No notes yet".dimmed());
        return Ok(None);
    }

    let labels: Vec<String> = state.notes.iter().map(|n| n.name.clone()).collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&labels[..])
        .default(0)
        .interact_opt()?;
    Ok(index.map(|i| state.notes[i].id))
}

fn render(state: &AppState) {
    println!();
    if state.loading {
        println!("{}", "⏳ Loading...".dimmed());
        return;
    }
    if state.error {
        println!("{}", "⚠️  Could not load notes from the server".red());
    }
    if state.notes.is_empty() {
        println!("{}", "No notes".dimmed());
    }
    for note in &state.notes {
        let status = if note.completed {
            "Completed".green()
        } else {
            "Not Completed".blue()
        };
        println!("• {} [{}]", note.name.bold(), status);
        println!("  {}", note.description);
    }
    println!();
}

fn report_outcome(outcome: WriteOutcome) {
    match outcome {
        WriteOutcome::Committed => println!("{}", "✅ Saved".green()),
        WriteOutcome::RolledBack => {
            println!("{}", "↩️  The server rejected the change; it was undone".yellow())
        }
        WriteOutcome::Failed => println!("{}", "⚠️  The server rejected the change".yellow()),
        WriteOutcome::Skipped => println!("{}", "That note no longer exists".dimmed()),
    }
}
