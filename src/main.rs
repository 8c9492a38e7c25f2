//! loam - a file-backed content server with dependency-aware live rebuilds.

#![allow(dead_code)]

mod cli;
mod config;
mod content;
mod logger;
mod plugin;
mod routes;
mod server;
mod state;
mod utils;
mod watch;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ColorChoice, Parser};

use cli::args::{Cli, Commands};
use config::SiteConfig;
use content::FileStore;
use plugin::{html::HtmlPlugin, layout::LayoutVars, markdown::MarkdownPlugin, text::TextPlugin};
use routes::RouteTable;

fn main() -> Result<()> {
    // Ctrl+C handling must be in place before any blocking operation.
    state::setup_shutdown_handler()?;

    let cli = Cli::parse();
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    logger::set_verbose(cli.verbose);

    let config = load_config(&cli)?;
    let store = Arc::new(FileStore::new(config.site_dir.clone()));

    // Index the content and layout trees, then run every plugin once.
    store.walk_directory("content")?;
    store.walk_directory("layout")?;
    register_builtin_plugins(&store, &config);

    log!("plugins"; "registered:");
    for line in store.plugins().list() {
        log!("plugins"; " - {line}");
    }

    store.process_all_files();

    match cli.command {
        Commands::Run { .. } => {
            let table = Arc::new(RouteTable::new());
            table.initialize(Arc::clone(&store));
            server::run(&config, store, table)
        }
        Commands::Static { .. } => cli::write_static(&store, &config, false),
        Commands::Dump { .. } => cli::write_static(&store, &config, true),
    }
}

/// Read `config/site.yaml`, then apply CLI overrides and mode requirements.
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let site_dir = cli.directory();
    if !site_dir.is_dir() {
        bail!("site directory does not exist: {}", site_dir.display());
    }

    let mut config = SiteConfig::load(site_dir)
        .with_context(|| format!("failed to load configuration for {}", site_dir.display()))?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(hostname) = &cli.hostname {
        config.server.hostname = hostname.clone();
    }
    if let Some(out) = &cli.out {
        config.out_dir = out.clone();
    }
    if cli.needs_out_dir() && config.out_dir.as_os_str().is_empty() {
        bail!("output directory is required (use --out)");
    }

    config.validate()?;
    Ok(config)
}

/// Register the built-in plugins, each receiving its verbatim config map.
fn register_builtin_plugins(store: &FileStore, config: &SiteConfig) {
    let vars = LayoutVars::from_config(config);
    let registry = store.plugins();

    registry.register(Arc::new(MarkdownPlugin::new(
        vars.clone(),
        &config.plugin_params("builtin/markdown"),
    )));
    registry.register(Arc::new(HtmlPlugin::new(vars)));
    registry.register(Arc::new(TextPlugin));
}
