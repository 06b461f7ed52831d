use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{HttpGateway, SyncController};
use shared::domain::{ActiveView, InteractionKind, ProductId, UserId};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(about = "Browse personalized product recommendations")]
struct Args {
    /// Recommendation API base url; overrides config and environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// User to act as; defaults to the first user the API returns.
    #[arg(long)]
    user: Option<i64>,
    #[arg(long, default_value_t = ActiveView::Recommendations)]
    view: ActiveView,
    /// Record an interaction, e.g. `--interact 42:cart`. May be repeated.
    #[arg(long = "interact", value_parser = parse_interaction)]
    interactions: Vec<(ProductId, InteractionKind)>,
    /// Fetch recommendations once more before printing.
    #[arg(long)]
    refresh: bool,
}

fn parse_interaction(raw: &str) -> Result<(ProductId, InteractionKind), String> {
    let (product, kind) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected <product_id>:<kind>, got '{raw}'"))?;
    let product_id = product
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("invalid product id '{product}': {err}"))?;
    Ok((ProductId(product_id), kind.parse()?))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let settings = config::load_settings(args.config.as_deref())?;
    let settings = config::finalize(settings, args.server_url)?;
    info!(api_url = %settings.api_url, "using recommendation api");

    let gateway = Arc::new(HttpGateway::with_options(
        &settings.api_url,
        settings.gateway_options(),
    )?);
    let mut controller = SyncController::new(gateway.clone(), gateway);

    controller.start();
    controller.settle().await;

    if let Some(user) = args.user {
        controller
            .select_user(UserId(user))
            .with_context(|| format!("cannot act as user {user}"))?;
    }
    controller.switch_view(args.view);
    controller.settle().await;

    for (product_id, kind) in args.interactions {
        controller
            .record_interaction(product_id, kind)
            .context("cannot record interaction")?;
        controller.settle().await;
    }

    if args.refresh && controller.refresh() {
        controller.settle().await;
    }

    print!("{}", render::render(controller.store()));
    Ok(())
}
