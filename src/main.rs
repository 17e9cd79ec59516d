//! Wiring & DI. Entry point: bootstrap adapters, inject into services, dispatch the command.
//! No business logic here.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use magister_watch::adapters::magister::{HttpAuthAdapter, MagisterClient};
use magister_watch::adapters::notify::{DiscordNotifier, LogNotifier};
use magister_watch::adapters::persistence::{DumpRepo, StateJson, TokenFile};
use magister_watch::adapters::ui::tui::{TuiInputPort, prompt_password, render_overview};
use magister_watch::domain::OutgoingMail;
use magister_watch::ports::{
    AuthPort, DumpPort, InputPort, MagisterGateway, NotifierPort, StatePort, TokenStore,
};
use magister_watch::shared::config::AppConfig;
use magister_watch::usecases::{
    AuthService, Credentials, DumpService, MailService, OverviewService, WatcherService,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "magister-watch", version, about)]
struct Cli {
    /// Without a command an interactive menu is shown.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll grades, inbox and schedule; alert on changes until Ctrl-C.
    Watch,
    /// Export profile, grades, schedule, messages, assignments and study guides as JSON.
    Dump,
    /// Log in again and store a fresh access token.
    Refresh,
    /// Print latest grades, unread mail and open assignments.
    Overview,
    /// Send a Magister mail to one person.
    SendMail {
        /// Recipient person id.
        #[arg(long)]
        to: i64,
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "")]
        body: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cli = Cli::parse();
    let interactive = cli.command.is_none();
    if interactive {
        magister_watch::adapters::ui::init_ui();
    }

    let mut cfg = AppConfig::load().context("invalid configuration")?;
    let Some(school_url) = cfg.school_url() else {
        anyhow::bail!("Set MAGISTER_SCHOOL_URL (env or .env), e.g. https://myschool.magister.net");
    };
    info!(school = %school_url, "using school");

    // Interactive flows may ask for the password; the daemon and dump never block on a prompt.
    let may_prompt = matches!(cli.command, None | Some(Command::Overview | Command::Refresh));
    if cfg.password.as_deref().is_none_or(str::is_empty) && cfg.username.is_some() && may_prompt {
        cfg.password = Some(prompt_password().map_err(|e| anyhow::anyhow!("{}", e))?);
    }
    if !cfg.has_credentials() {
        warn!("MAGISTER_USERNAME / MAGISTER_PASSWORD not set; only a cached token can be used");
    }

    // --- Adapters ---
    let http_timeout = Duration::from_secs(cfg.http_timeout_secs_or_default());
    let gateway: Arc<dyn MagisterGateway> = Arc::new(
        MagisterClient::with_timeout(&school_url, "", http_timeout)
            .map_err(|e| anyhow::anyhow!("{}", e))?,
    );
    let auth_adapter: Arc<dyn AuthPort> = Arc::new(
        HttpAuthAdapter::with_timeout(&cfg.accounts_url_or_default(), http_timeout)
            .map_err(|e| anyhow::anyhow!("{}", e))?,
    );
    let token_file = cfg.token_file_or_default();
    info!(path = %token_file, "token file");
    let token_store: Arc<dyn TokenStore> = Arc::new(TokenFile::new(&token_file));
    let notifier: Arc<dyn NotifierPort> = match cfg.discord_webhook() {
        Some(url) => {
            info!("Discord notifications enabled");
            Arc::new(
                DiscordNotifier::new(url, http_timeout).map_err(|e| anyhow::anyhow!("{}", e))?,
            )
        }
        None => {
            warn!("MAGISTER_DISCORD_WEBHOOK not set; alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let state_store: Arc<dyn StatePort> = Arc::new(StateJson::new(cfg.state_file_or_default()));
    let dump_repo: Arc<dyn DumpPort> = Arc::new(DumpRepo::new(cfg.dump_dir_or_default()));

    // --- Services ---
    let auth_service = Arc::new(AuthService::new(
        auth_adapter,
        token_store,
        Credentials {
            school_url: school_url.clone(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
        },
    ));
    let check_interval = cfg.check_interval_secs_or_default();
    let watcher_service = Arc::new(
        WatcherService::new(
            Arc::clone(&gateway),
            Arc::clone(&auth_service),
            notifier,
            state_store,
            Duration::from_secs(check_interval),
        )
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?,
    );
    let dump_service = Arc::new(DumpService::new(
        Arc::clone(&gateway),
        Arc::clone(&auth_service),
        dump_repo,
    ));
    let overview_service = Arc::new(OverviewService::new(
        Arc::clone(&gateway),
        Arc::clone(&auth_service),
    ));
    let mail_service = Arc::new(MailService::new(
        Arc::clone(&gateway),
        Arc::clone(&auth_service),
    ));

    // --- Run ---
    match cli.command {
        None => {
            let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
                auth_service,
                overview_service,
                dump_service,
                mail_service,
                watcher_service,
            ));
            input_port.run().await.map_err(|e| anyhow::anyhow!("{}", e))?;
        }
        Some(Command::Watch) => {
            info!(check_interval, "starting watcher (Ctrl-C to stop)");
            watcher_service
                .run_loop()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
        }
        Some(Command::Dump) => {
            let report = dump_service
                .run()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            info!(
                files = report.written.len(),
                dir = %cfg.dump_dir_or_default(),
                "dump written"
            );
        }
        Some(Command::Refresh) => {
            auth_service
                .refresh()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            info!(path = %token_file, "new token saved");
        }
        Some(Command::Overview) => {
            let overview = overview_service
                .collect()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            println!("{}", render_overview(&overview));
        }
        Some(Command::SendMail { to, subject, body }) => {
            let mail = OutgoingMail {
                recipient_id: to,
                subject,
                body,
            };
            let accepted = mail_service
                .send(&mail)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            if !accepted {
                anyhow::bail!("Magister rejected the mail");
            }
        }
    }

    Ok(())
}
