use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use showcase_core::{
    ChatRole, ChatSession, FileInput, HfClient, ImageRef, ImageResult, InferenceRouter,
    ModelCategory, RenderIntent, ShowcaseError,
};
use showcase_gateway::GatewayServer;

mod config;

use config::ShowcaseConfig;

#[derive(Parser)]
#[command(name = "showcase")]
#[command(version)]
#[command(about = "Try hosted Hugging Face models: text, chat, images and audio")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration (secrets masked)
    Config,

    /// List the model catalog
    Models,

    /// Check whether a model answers a one-token request
    Status {
        /// Model id; need not be in the catalog
        model: String,
    },

    /// Send text to a model
    Ask {
        /// Model id from the catalog
        #[arg(short, long)]
        model: String,
        /// Input text
        text: String,
        /// Where to write an image result
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Send a file (image or audio) to a model
    File {
        #[arg(short, long)]
        model: String,
        path: PathBuf,
        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
    },

    /// Generate an image from a prompt
    Image {
        #[arg(short, long, default_value = "black-forest-labs/flux-dev")]
        model: String,
        prompt: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Interactive chat (/reset starts over, /exit quits)
    Chat {
        /// Chat model; defaults to chat.default_model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run the HTTP gateway for the browser playground
    Serve {
        /// Address to bind; defaults to gateway.bind
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Models => cmd_models(&cli.config).await,
        Commands::Status { model } => cmd_status(&cli.config, &model).await,
        Commands::Ask { model, text, out } => cmd_ask(&cli.config, &model, &text, out).await,
        Commands::File { model, path, mime } => cmd_file(&cli.config, &model, &path, mime).await,
        Commands::Image { model, prompt, out } => {
            cmd_image(&cli.config, &model, &prompt, out).await
        }
        Commands::Chat { model } => cmd_chat(&cli.config, model).await,
        Commands::Serve { bind } => cmd_serve(&cli.config, bind).await,
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }
}

/// Print an error; classified inference errors also get their guidance
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ShowcaseError>() {
        Some(e) => print_showcase_error(e),
        None => eprintln!("Error: {:#}", err),
    }
}

fn print_showcase_error(e: &ShowcaseError) {
    eprintln!("Error: {}", e);
    if let Some(steps) = e.guidance() {
        for step in steps {
            eprintln!("  - {}", step);
        }
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("Showcase initialized at {}", config_dir.display());
    println!("Set HF_TOKEN or edit {} to configure your token.", config_path.display());
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = ShowcaseConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.masked())?);
    Ok(())
}

async fn cmd_models(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = ShowcaseConfig::load(config_path)?;
    let registry = cfg.registry()?;
    for category in ModelCategory::LISTING_ORDER {
        let models = registry.by_category(category);
        if models.is_empty() {
            continue;
        }
        println!("{}:", category);
        for model in models {
            let provider = model.provider.map(|p| format!(" [{}]", p)).unwrap_or_default();
            println!("  {:<40} {:<5}{}  {}", model.id, model.input_type.to_string(), provider, model.name);
            if !model.description.is_empty() {
                println!("  {:<40} {}", "", model.description);
            }
        }
    }
    Ok(())
}

fn build_router(cfg: &ShowcaseConfig) -> Result<InferenceRouter> {
    if cfg.hub.token.is_empty() {
        warn!("No Hugging Face token configured (set HF_TOKEN); requests are sent unauthenticated");
    }
    let client = HfClient::new(cfg.hub.token.clone())
        .with_base_url(&cfg.hub.base_url)
        .with_context(|| format!("Invalid hub.base_url: {}", cfg.hub.base_url))?;
    Ok(InferenceRouter::new(Arc::new(cfg.registry()?), Arc::new(client)))
}

fn chat_template(cfg: &ShowcaseConfig, model: Option<String>) -> ChatSession {
    ChatSession::new(model.unwrap_or_else(|| cfg.chat.default_model.clone()))
        .with_system_prompt(cfg.chat.system_prompt.clone())
        .with_welcome(cfg.chat.welcome_message.clone())
}

async fn cmd_status(config_path: &Option<PathBuf>, model: &str) -> Result<()> {
    let cfg = ShowcaseConfig::load(config_path)?;
    let router = build_router(&cfg)?;
    if router.check_model_status(model).await {
        println!("{}: available", model);
        Ok(())
    } else {
        anyhow::bail!("{} is not available", model)
    }
}

async fn cmd_ask(
    config_path: &Option<PathBuf>,
    model: &str,
    text: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    let cfg = ShowcaseConfig::load(config_path)?;
    let router = build_router(&cfg)?;
    let intent = router.query_text(model, text).await?;
    match intent {
        RenderIntent::Image(image) => save_image(&image, out).await,
        other => {
            print_intent(&other);
            Ok(())
        }
    }
}

async fn cmd_file(
    config_path: &Option<PathBuf>,
    model: &str,
    path: &Path,
    mime: Option<String>,
) -> Result<()> {
    let cfg = ShowcaseConfig::load(config_path)?;
    let router = build_router(&cfg)?;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mime = mime.or_else(|| mime_guess::from_path(path).first_raw().map(str::to_string));
    info!("Sending {} ({} bytes, {:?}) to {}", path.display(), bytes.len(), mime, model);

    let intent = router.query_file(model, FileInput::new(bytes, mime)).await?;
    print_intent(&intent);
    Ok(())
}

async fn cmd_image(
    config_path: &Option<PathBuf>,
    model: &str,
    prompt: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    let cfg = ShowcaseConfig::load(config_path)?;
    let router = build_router(&cfg)?;
    let image = router.generate_image(model, prompt).await?;
    save_image(&image, out).await
}

/// Write an inline image to `out` (or a timestamped file) and print where it went
async fn save_image(image: &ImageResult, out: Option<PathBuf>) -> Result<()> {
    match &image.image {
        ImageRef::Inline(blob) => {
            let path = out.unwrap_or_else(|| {
                PathBuf::from(format!("image-{}.png", chrono::Utc::now().format("%Y%m%d-%H%M%S")))
            });
            tokio::fs::write(&path, blob.bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} ({} bytes)", path.display(), blob.len());
        }
        ImageRef::Url(url) => println!("Image: {}", url),
    }
    println!("Prompt: {}", image.prompt);
    println!("Model: {}", image.model);
    Ok(())
}

fn print_intent(intent: &RenderIntent) {
    println!("{}", intent.title());
    for line in intent.to_lines() {
        println!("  {}", line);
    }
}

async fn cmd_chat(config_path: &Option<PathBuf>, model: Option<String>) -> Result<()> {
    let cfg = ShowcaseConfig::load(config_path)?;
    let router = build_router(&cfg)?;
    let mut session = chat_template(&cfg, model);

    println!("Chatting with {} (/reset to start over, /exit to quit)", session.model_id());
    print_welcome(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/reset" => {
                session.reset();
                print_welcome(&session);
            }
            text => match session.send(&router, text).await {
                Ok(intent) => println!("{}", intent.primary_text().unwrap_or_default()),
                Err(e) => print_showcase_error(&e),
            },
        }
    }
    Ok(())
}

fn print_welcome(session: &ChatSession) {
    if let Some(entry) = session.transcript().last() {
        if entry.role == ChatRole::Assistant {
            println!("{}", entry.content);
        }
    }
}

async fn cmd_serve(config_path: &Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let cfg = ShowcaseConfig::load(config_path)?;
    let router = build_router(&cfg)?;

    let bind = bind.unwrap_or_else(|| cfg.gateway.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind))?;
    if cfg.gateway.auth_token.is_empty() && !addr.ip().is_loopback() {
        warn!("Gateway bound to {} without an auth token", addr);
    }

    let server = GatewayServer::new(
        addr,
        cfg.gateway.auth_token.clone(),
        router,
        chat_template(&cfg, None),
    );
    let handle = server.spawn();
    println!("Showcase gateway on http://{}. Press Ctrl+C to stop.", addr);

    tokio::select! {
        result = handle => result.context("Gateway task panicked")??,
        _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
    }
    println!("Showcase stopped.");
    Ok(())
}
