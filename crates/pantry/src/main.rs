//! `pantry` - CLI for the pantry inventory tracker
//!
//! This binary lists and edits the inventory, asks for recipe suggestions,
//! and runs the recipe HTTP endpoint.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use pantry::cli::{
    AddCommand, Cli, Command, ConfigCommand, RemoveCommand, ServeCommand, UpdateCommand,
};
use pantry::server::{self, RECIPE_FAILURE_MESSAGE};
use pantry::{init_logging, store, Config, InventoryController, RecipeService, RemoveMode};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Config commands handle their own loading so a broken file can be reported
    if let Command::Config(config_cmd) = cli.command {
        return handle_config(cli.config, config_cmd);
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::List(list_cmd) => handle_list(&config, list_cmd.json).await,
        Command::Add(add_cmd) => handle_add(&config, add_cmd).await,
        Command::Update(update_cmd) => handle_update(&config, update_cmd).await,
        Command::Remove(remove_cmd) => handle_remove(&config, remove_cmd).await,
        Command::Recipe => handle_recipe(&config).await,
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd).await,
        Command::Config(_) => Ok(()),
    }
}

async fn open_controller(config: &Config) -> anyhow::Result<InventoryController> {
    let store = store::open(config).context("failed to open inventory store")?;
    let controller = InventoryController::load(store, config.inventory.remove_mode)
        .await
        .context("failed to load inventory")?;
    Ok(controller)
}

fn print_inventory(controller: &InventoryController) {
    let items = controller.sorted_view();
    if items.is_empty() {
        println!("The pantry is empty.");
        return;
    }
    for item in items {
        println!("{}: {}", item.display_name(), item.quantity);
    }
}

async fn handle_list(config: &Config, json: bool) -> anyhow::Result<()> {
    let controller = open_controller(config).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&controller.sorted_view())?);
    } else {
        print_inventory(&controller);
    }
    Ok(())
}

async fn handle_add(config: &Config, cmd: AddCommand) -> anyhow::Result<()> {
    let mut controller = open_controller(config).await?;
    if !controller.add_item(&cmd.name, cmd.quantity).await? {
        println!("Nothing to add: item name is blank.");
        return Ok(());
    }
    print_inventory(&controller);
    Ok(())
}

async fn handle_update(config: &Config, cmd: UpdateCommand) -> anyhow::Result<()> {
    let mut controller = open_controller(config).await?;
    if !controller
        .update_item_quantity(&cmd.name, cmd.quantity)
        .await?
    {
        println!("Nothing to update: name must not be blank and quantity must not be negative.");
        return Ok(());
    }
    print_inventory(&controller);
    Ok(())
}

async fn handle_remove(config: &Config, cmd: RemoveCommand) -> anyhow::Result<()> {
    let mut controller = open_controller(config).await?;
    let mode = cmd.mode.map_or(controller.remove_mode(), RemoveMode::from);
    if !controller.remove_item_with(&cmd.name, mode).await? {
        println!("Nothing to remove: item name is blank.");
        return Ok(());
    }
    print_inventory(&controller);
    Ok(())
}

async fn handle_recipe(config: &Config) -> anyhow::Result<()> {
    let controller = open_controller(config).await?;
    let service = RecipeService::from_config(config);

    match service.suggest(&controller.pantry_items()).await {
        Ok(recipe) => println!("{recipe}"),
        Err(err) => {
            tracing::error!("{err}");
            anyhow::bail!(RECIPE_FAILURE_MESSAGE);
        }
    }
    Ok(())
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    let service = Arc::new(RecipeService::from_config(&config));
    server::start_server(&config, service).await?;
    Ok(())
}

fn handle_config(path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Store]");
                println!("  Backend:            {}", config.store.backend);
                println!("  Database path:      {}", config.database_path().display());
                println!("  Firestore project:  {}", config.store.firestore.project_id);
                println!("  Collection:         {}", config.store.firestore.collection);
                println!("  Timeout (secs):     {}", config.store.timeout_secs);
                println!();
                println!("[Inventory]");
                println!("  Remove mode:        {}", config.inventory.remove_mode);
                println!();
                println!("[Recipe]");
                println!("  Base URL:           {}", config.recipe.base_url);
                println!("  Model:              {}", config.recipe.model);
                println!("  Max tokens:         {}", config.recipe.max_tokens);
                println!(
                    "  API key:            {}",
                    if config.recipe_api_key().is_some() {
                        "set"
                    } else {
                        "not set"
                    }
                );
                println!();
                println!("[Server]");
                println!("  Address:            {}", config.bind_address());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
