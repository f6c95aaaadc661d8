//! Command execution

use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use favorites::{
    Backend, ClientConfig, FolderId, HttpBackend, InMemoryBackend, SyncController, TaskPoller,
};
use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{Cli, Command, ConfigAction};
use crate::render;

pub async fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return run_config(action, &cli);
    }
    let config = load_config(&cli)?;

    let backend: Arc<dyn Backend> = if cli.demo {
        info!("Using built-in demo data");
        Arc::new(InMemoryBackend::demo())
    } else {
        info!("Using favorites server at {}", config.api_url);
        Arc::new(HttpBackend::from_config(&config))
    };
    let poller = Arc::new(TaskPoller::new(backend.clone()));
    let controller = SyncController::from_config(backend, &config).with_poller(poller.clone());

    match cli.command {
        Command::Tree { all } => tree(&controller, all).await,
        Command::Show { id } => show(&controller, FolderId(id)).await,
        Command::List { folder, full } => list(&controller, folder.map(FolderId), full).await,
        Command::Mkdir {
            name,
            parent,
            description,
        } => {
            mount(&controller).await?;
            let folder = controller
                .create_folder(&name, description.as_deref(), parent.map(FolderId))
                .await
                .ok_or_else(|| failure(&controller))?;
            let path = controller.folders().path_of(folder.id).unwrap_or(folder.name);
            println!("Created {} [{}]", path, folder.id);
            Ok(())
        }
        Command::Rmdir { id } => {
            mount(&controller).await?;
            let id = FolderId(id);
            let path = controller.folders().path_of(id);
            if !controller.delete_folder(id).await {
                return Err(failure(&controller));
            }
            println!("Deleted {}", path.unwrap_or_else(|| id.to_string()));
            Ok(())
        }
        Command::Mv { id, to } => {
            mount(&controller).await?;
            let id = FolderId(id);
            if !controller.move_folder(id, FolderId(to)).await {
                return Err(failure(&controller));
            }
            println!(
                "Moved to {}",
                controller.folders().path_of(id).unwrap_or_else(|| id.to_string())
            );
            Ok(())
        }
        Command::Rename {
            id,
            name,
            description,
        } => {
            mount(&controller).await?;
            let folder = controller
                .rename_folder(FolderId(id), &name, description.as_deref())
                .await
                .ok_or_else(|| failure(&controller))?;
            println!("Renamed folder {} to {}", folder.id, folder.name);
            Ok(())
        }
        Command::Add {
            url,
            title,
            folder,
            tags,
            metadata,
        } => {
            mount(&controller).await?;
            let ack = controller
                .submit_favorite(
                    &url,
                    title.as_deref(),
                    folder.map(FolderId),
                    &tags,
                    metadata.as_deref(),
                )
                .await
                .ok_or_else(|| failure(&controller))?;
            println!("Queued {} as task {}", url, ack.task_id);
            if let Some(task) = poller.tasks().iter().find(|t| t.id == ack.task_id) {
                println!("{}", render::task(task));
            }
            Ok(())
        }
        Command::Tasks {
            id,
            watch,
            interval_ms,
        } => {
            if let Some(id) = id {
                let task = poller.task_status(&id).await?;
                println!("{}", render::task(&task));
                return Ok(());
            }
            if watch {
                let interval = interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| config.poll_interval());
                return watch_tasks(&poller, interval).await;
            }
            poller.poll_now().await?;
            print_tasks(&poller.tasks());
            Ok(())
        }
        Command::Search { query } => {
            let hits = controller
                .search(&query)
                .await
                .ok_or_else(|| failure(&controller))?;
            if hits.is_empty() {
                println!("No matches for {:?}", query);
            }
            for hit in &hits {
                println!("{}", render::search_hit(hit));
            }
            Ok(())
        }
        Command::Config { .. } => Ok(()),
    }
}

/// Resolve settings from the file, the environment, and command-line flags
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ClientConfig::load()?,
    };
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
        config.validate()?;
    }
    Ok(config)
}

fn run_config(action: &ConfigAction, cli: &Cli) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            if let Some(path) = ClientConfig::default_config_path() {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
            }
            let path = ClientConfig::default().save()?;
            println!("Wrote {}", path.display());
        }
        ConfigAction::Show => {
            let config = load_config(cli)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            if let Some(path) = ClientConfig::default_config_path() {
                println!("# config file: {}", path.display());
            }
        }
    }
    Ok(())
}

/// Load the tree and the unfiltered list, as a view does when it appears
async fn mount(controller: &SyncController) -> Result<()> {
    if controller.refresh().await {
        Ok(())
    } else {
        Err(failure(controller))
    }
}

fn failure(controller: &SyncController) -> anyhow::Error {
    anyhow!(
        controller
            .last_error()
            .unwrap_or_else(|| "Request failed".to_string())
    )
}

async fn tree(controller: &SyncController, all: bool) -> Result<()> {
    mount(controller).await?;
    let folders = controller.folders();
    let snapshot = folders.snapshot();
    if all {
        let top_level: Vec<FolderId> = snapshot.top_level().collect();
        for id in top_level {
            for folder in snapshot.descendants(id) {
                folders.expand(Some(folder));
            }
        }
    } else {
        folders.expand(snapshot.root_id());
    }

    for line in render::folder_rows(&folders.visible_rows()) {
        println!("{}", line);
    }
    if !snapshot.orphans().is_empty() {
        println!("({} folders outside the root)", snapshot.orphans().len());
    }
    Ok(())
}

async fn show(controller: &SyncController, id: FolderId) -> Result<()> {
    mount(controller).await?;
    let folder = controller
        .folder_detail(id)
        .await
        .ok_or_else(|| failure(controller))?;
    let path = controller
        .folders()
        .path_of(id)
        .unwrap_or_else(|| folder.name.clone());
    println!("{} [{}]", path, folder.id);
    if let Some(description) = &folder.description {
        println!("{}", description);
    }
    for child in &folder.children {
        println!("  {} [{}]", child.name, child.id);
    }
    Ok(())
}

async fn list(controller: &SyncController, folder: Option<FolderId>, full: bool) -> Result<()> {
    mount(controller).await?;
    if folder.is_some() && !controller.select_folder(folder).await {
        return Err(failure(controller));
    }

    let heading = controller
        .selected_folder()
        .and_then(|id| controller.folders().path_of(id))
        .unwrap_or_else(|| "All favorites".to_string());
    println!("{}\n", heading);

    let favorites = controller.visible_favorites();
    if favorites.is_empty() {
        println!("No favorites yet");
    }
    for favorite in &favorites {
        if full {
            controller.toggle_description(favorite.id);
        }
        let summary = controller.favorites().summary_text(favorite);
        println!("{}\n", render::favorite(favorite, summary.as_deref()));
    }
    Ok(())
}

fn print_tasks(tasks: &[favorites::Task]) {
    if tasks.is_empty() {
        println!("No background tasks");
    }
    for task in tasks {
        println!("{}", render::task(task));
    }
}

async fn watch_tasks(poller: &TaskPoller, interval: Duration) -> Result<()> {
    let mut updates = poller.subscribe();
    poller.start(interval);
    println!("Watching tasks every {:?} (Ctrl-C to stop)", interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let tasks = updates.borrow_and_update().clone();
                println!("--- {} ---", Local::now().format("%H:%M:%S"));
                print_tasks(&tasks);
            }
        }
    }
    poller.stop();

    let stats = poller.stats();
    println!(
        "{} polls, {} failed",
        stats.successful_ticks + stats.failed_ticks,
        stats.failed_ticks
    );
    if let Some(at) = stats.last_success_at {
        println!("Last successful poll at {}", at.with_timezone(&Local).format("%H:%M:%S"));
    }
    if let Some(err) = stats.last_error {
        println!("Last error: {}", err);
    }
    Ok(())
}
