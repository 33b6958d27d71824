//! `picpost`: publish an image post against local backends.
//!
//! Usage:
//!   picpost --user <name> --uid <uid> --image <file> [--caption <text>]
//!
//! Drives the add-post modal through Flux exactly as a UI shell would:
//! open, pick, type, submit. Posts land in `<data-dir>/posts.redb` and
//! images under `<data-dir>/blobs/`.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use picpost_blob::FileStore;
use picpost_compose::{
    AuthenticatedUser, ComposeContext, ComposerState, ElementTree, LastPost, ModalState,
    OpenAddPostReq, Page, PickImageReq, PostRecord, Session, SubmitPostReq, UpdateCaptionReq,
    register_handlers,
};
use picpost_docs::{DocumentStore, RedbDocStore};
use picpost_flux::Flux;
use tracing::{debug, info};

use config::AppConfig;

/// Publish an image post.
#[derive(Parser, Debug)]
#[command(name = "picpost", about = "Publish an image post")]
struct Cli {
    /// Path to config file.
    #[arg(short = 'c', long = "config", default_value = "picpost.toml")]
    config: PathBuf,

    /// Overrides `data-dir` from the config file.
    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// Display name the post is attributed to.
    #[arg(long)]
    user: String,

    #[arg(long)]
    uid: String,

    /// Profile photo URL.
    #[arg(long = "photo-url")]
    photo_url: Option<String>,

    #[arg(long, default_value = "")]
    caption: String,

    /// Image file to post.
    #[arg(long)]
    image: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    std::fs::create_dir_all(&config.data_dir)?;
    info!("Data directory {}", config.data_dir.display());

    let docs: Arc<dyn DocumentStore> = Arc::new(
        RedbDocStore::open(&config.db_path())
            .map_err(|e| anyhow::anyhow!("failed to open document store: {}", e))?,
    );
    let blobs = Arc::new(
        FileStore::open(&config.blob_dir(), &config.public_base_url)
            .await
            .map_err(|e| anyhow::anyhow!("failed to open blob store: {}", e))?,
    );

    // Page: root > backdrop > modal content.
    let mut tree = ElementTree::new();
    let backdrop = tree.append(tree.root());
    let content = tree.append(backdrop);
    let page = Page::new(tree);

    let flux = Flux::new();
    let ctx = Arc::new(ComposeContext::new(
        Arc::clone(&docs),
        blobs,
        config.composer.clone(),
        page,
        content,
    ));
    register_handlers(&flux, ctx);
    flux.subscribe("compose/#", |path, value| {
        if let Some(state) = value.downcast_ref::<ComposerState>() {
            debug!(path, busy = state.busy, has_image = state.selected_image.is_some(), "composer state");
        }
    });

    flux.store().set(
        Session::PATH,
        Session {
            user: Some(AuthenticatedUser {
                display_name: cli.user,
                uid: cli.uid,
                photo_url: cli.photo_url,
            }),
        },
    );

    flux.emit(OpenAddPostReq::PATH, OpenAddPostReq).await;
    flux.emit(PickImageReq::PATH, PickImageReq { path: cli.image }).await;
    flux.emit(UpdateCaptionReq::PATH, UpdateCaptionReq { value: cli.caption }).await;
    flux.emit(SubmitPostReq::PATH, SubmitPostReq).await;

    let still_open = flux
        .get_as::<ModalState>(ModalState::PATH)
        .is_some_and(|m| m.add_post_open);
    if still_open {
        let error = flux
            .get_as::<ComposerState>(ComposerState::PATH)
            .and_then(|s| s.error)
            .unwrap_or_else(|| "post was not published".to_string());
        anyhow::bail!(error);
    }

    let posted = flux
        .get_as::<LastPost>(LastPost::PATH)
        .context("post was not published")?;
    let latest = docs
        .get_document(&config.composer.collection, &posted.post_id)
        .await?
        .as_ref()
        .and_then(PostRecord::from_document)
        .with_context(|| format!("published post {} not found", posted.post_id))?;

    println!("Posted {}", latest.id);
    println!("  username:  {}", latest.username);
    println!("  caption:   {}", latest.caption);
    println!("  timestamp: {}", latest.timestamp.as_deref().unwrap_or("-"));
    println!("  image:     {}", latest.image.as_deref().unwrap_or("-"));
    Ok(())
}
