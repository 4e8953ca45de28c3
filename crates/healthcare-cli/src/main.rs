//! Healthcare - command-line host for the session core.
//!
//! Signs in against the configured backend, keeps the lifecycle bridge
//! running until Ctrl-C, then saves and logs out.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use healthcare_core::auth::{CredentialVault, Keychain};
use healthcare_core::{AppContext, AuthEvent, Config, LifecycleEvent, LoginSurface, LoginViewHandle};

/// Capacity of the lifecycle signal channel.
const SIGNAL_CHANNEL_CAPACITY: usize = 16;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Prints session transitions to the terminal.
struct ConsoleLogin;

impl LoginSurface for ConsoleLogin {
    fn surface_id(&self) -> &str {
        "console"
    }

    fn show_status(&self, event: &AuthEvent) {
        println!("[{}] {}", event.generation, event.status);
    }
}

fn prompt_username(config: &Config) -> Result<String> {
    if let Ok(username) = std::env::var("HEALTHCARE_USERNAME") {
        return Ok(username);
    }
    match &config.last_username {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let entered = line.trim();
    match (&config.last_username, entered.is_empty()) {
        (Some(last), true) => Ok(last.clone()),
        (None, true) => anyhow::bail!("A username is required"),
        _ => Ok(entered.to_string()),
    }
}

fn prompt_password(config: &Config, username: &str) -> Result<String> {
    if let Ok(password) = std::env::var("HEALTHCARE_PASSWORD") {
        return Ok(password);
    }
    if config.remember_credentials {
        if let Ok(password) = Keychain.recall(username) {
            return Ok(password);
        }
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("Healthcare starting");

    let config = Config::load()?;
    let ctx = AppContext::connect(config).context("Failed to build backend client")?;

    let bridge = Arc::new(ctx.lifecycle_bridge());
    let (signals, receiver) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
    let runner = tokio::spawn(Arc::clone(&bridge).run(receiver));

    let console: Arc<dyn LoginSurface> = Arc::new(ConsoleLogin);
    signals
        .send(LifecycleEvent::LoginViewReady(LoginViewHandle::new(&console)))
        .await?;
    signals.send(LifecycleEvent::DidBecomeActive).await?;

    // Terminal prompts block; keep them off the runtime workers.
    let prompt_config = ctx.config.clone();
    let (username, password) = tokio::task::spawn_blocking(move || -> Result<(String, String)> {
        let username = prompt_username(&prompt_config)?;
        let password = prompt_password(&prompt_config, &username)?;
        Ok((username, password))
    })
    .await??;
    let locale = ctx.config.default_locale.clone();

    match ctx.coordinator.authenticate(&username, &password, &locale).await {
        Ok(_) => {
            println!("Signed in as {}. Press Ctrl-C to exit.", username);
            let mut config = ctx.config.clone();
            config.last_username = Some(username);
            config.save()?;
        }
        Err(e) => println!("Sign-in failed: {}", e),
    }

    // Opens the local store now instead of on first save.
    if ctx.persistence.ensure_ready().is_none() {
        info!("Local persistence disabled");
    }

    tokio::signal::ctrl_c().await?;
    signals.send(LifecycleEvent::WillTerminate).await?;
    runner.await?;

    info!("Healthcare exiting");
    Ok(())
}
