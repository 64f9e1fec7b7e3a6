use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    launch, load_settings, HttpPortalClient, Labels, Locale, PageCommand, PageOptions,
    PageSession, PageState,
};
use shared::domain::{DistrictCode, FilterForm, ItemId, SaveState};
use tracing_subscriber::EnvFilter;

/// Headless shell for the volunteer portal page: attaches the page controllers
/// to a backend, performs one user action and prints the resulting page.
#[derive(Parser, Debug)]
#[command(name = "portal")]
struct Cli {
    /// Backend base url; wins over the config file and environment.
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// ko or en
    #[arg(long, global = true)]
    locale: Option<Locale>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the district list for a region.
    Districts {
        region: String,
        /// District the page was rendered with.
        #[arg(long)]
        selected: Option<String>,
    },
    /// Start a background sync and follow it until the page would reload.
    Sync {
        #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Page has no live count display.
        #[arg(long)]
        no_count: bool,
    },
    /// Toggle the saved state of an item.
    Save {
        item_id: String,
        /// Item is currently saved.
        #[arg(long)]
        saved: bool,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("field name missing in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    if let Some(locale) = cli.locale {
        settings.locale = locale;
    }
    settings.validate()?;

    let (page, command) = build_page(&cli.command, Labels::new(settings.locale));
    let client =
        HttpPortalClient::from_settings(&settings).context("failed to build portal client")?;
    tracing::info!(base_url = %client.base_url(), locale = %settings.locale, "attaching page");

    let session = launch(
        Arc::new(client),
        &page.anchors(),
        PageOptions::from_settings(&settings),
    );
    let page = drive(session, page, command).await?;
    print_page(&page);
    Ok(())
}

fn build_page(command: &Command, labels: Labels) -> (PageState, Option<PageCommand>) {
    match command {
        Command::Districts { region, selected } => {
            let page = PageState::new()
                .with_region_select(region.clone())
                .with_district_select(labels, selected.as_deref().map(DistrictCode::new));
            // the region change is synthesized on attach
            (page, None)
        }
        Command::Sync { fields, no_count } => {
            let mut form = FilterForm::blank();
            for (name, value) in fields {
                form.set(name.clone(), value.clone());
            }
            let mut page = PageState::new()
                .with_filter_form(form)
                .with_sync_button(labels);
            if !no_count {
                page = page.with_sync_count();
            }
            let command = PageCommand::SyncClicked {
                form: page.form_snapshot(),
            };
            (page, Some(command))
        }
        Command::Save { item_id, saved } => {
            let item_id = ItemId::new(item_id.clone());
            let page = PageState::new().with_save_button(labels, item_id.clone(), SaveState(*saved));
            (page, Some(PageCommand::SaveClicked { item_id }))
        }
    }
}

/// Applies page events until the runtime finishes. Ctrl-C tears the page down.
async fn drive(
    session: PageSession,
    mut page: PageState,
    command: Option<PageCommand>,
) -> Result<PageState> {
    if let Some(command) = command {
        session.dispatch(command)?;
    }
    let teardown = session.teardown.clone();
    let (mut events, task) = session.close();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    tracing::debug!(event = event.name(), "applying page event");
                    page.apply(&event);
                }
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                tracing::info!("interrupted; tearing down page");
                teardown.teardown();
            }
        }
    }

    task.await.context("page runtime failed")?;
    Ok(page)
}

fn print_page(page: &PageState) {
    if let Some(district) = &page.district {
        for option in &district.options {
            let marker = if option.value == district.value { "*" } else { " " };
            println!("{marker} {:<10} {}", option.value, option.label);
        }
    }
    if let Some(button) = &page.sync_button {
        let state = if button.enabled { "enabled" } else { "disabled" };
        println!("sync: {} ({state})", button.label);
    }
    if let Some(count) = page.sync_count.as_deref().filter(|c| !c.is_empty()) {
        println!("fetched: {count}");
    }
    if let Some(save) = &page.save_button {
        println!(
            "item {}: {} (saved={})",
            save.item_id,
            save.label,
            save.saved.attribute()
        );
    }
    for alert in &page.alerts {
        println!("alert: {alert}");
    }
    if page.reload_requested {
        println!("page reload requested");
    }
}
