mod app;
mod cli;
mod config;
mod network;
mod persistence;
mod post;
mod share;
mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use app::App;
use cli::{Cli, Command, PostArgs};
use network::device_flow::{AuthState, LoginOutcome};
use persistence::FileCredentialStore;
use post::PostDraft;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Enable logging
    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("PIQUE_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = cli.settings();
    debug!(data_dir = %settings.data_dir.display(), "starting");

    let store = Arc::new(FileCredentialStore::new(&settings.data_dir));
    let app = Arc::new(App::new(settings, store).context("Could not set up the HTTP client")?);

    match cli.command {
        Command::Login { .. } => login(app).await,
        Command::Logout => {
            app.logout().context("Could not remove stored credentials")?;
            println!("Signed out.");
            Ok(())
        }
        Command::Status => status(&app),
        Command::Repos => repos(&app).await,
        Command::Select { full_name } => {
            let selection = app
                .select_repository(&full_name)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!(
                "Posts will be published to {} ({}).",
                selection.full_name, selection.default_branch
            );
            Ok(())
        }
        Command::Post(args) => publish(&app, args).await,
        Command::Preview(args) => preview(args),
    }
}

async fn login(app: Arc<App>) -> Result<()> {
    let (states, updates) = flume::unbounded();

    let printer = tokio::spawn(async move {
        while let Ok(state) = updates.recv_async().await {
            match state {
                AuthState::AwaitingUserAuthorization {
                    user_code,
                    verification_uri,
                    expires_in,
                } => {
                    println!("Open {} and enter the code {}", verification_uri, user_code);
                    println!(
                        "The code expires in {} minutes. Press Ctrl-C to cancel.",
                        expires_in / 60
                    );
                }
                AuthState::Failed(message) => eprintln!("{}", message),
                AuthState::Cancelled => println!("Sign in cancelled."),
                other => debug!(?other, "auth state"),
            }
        }
    });

    let canceller = app.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel_login();
        }
    });

    let result = app.login(states).await;
    ctrl_c.abort();
    let _ = printer.await;

    match result {
        Ok(LoginOutcome::SignedIn(user)) => {
            println!("Signed in as {}.", user.login);
            if app.session()?.repository.is_none() {
                println!("Run `pique repos` and `pique select <owner/name>` to pick your blog.");
            }
            Ok(())
        }
        Ok(LoginOutcome::Cancelled) => Ok(()),
        Err(err) => Err(anyhow::anyhow!(err.user_message())),
    }
}

fn status(app: &App) -> Result<()> {
    let session = app.session().context("Could not read stored credentials")?;

    if !session.signed_in {
        println!("Not signed in. Run `pique login`.");
        return Ok(());
    }

    match session.user {
        Some(user) => match user.name {
            Some(name) => println!("Signed in as {} ({}).", user.login, name),
            None => println!("Signed in as {}.", user.login),
        },
        None => println!("Signed in."),
    }
    match session.repository {
        Some(repository) => println!(
            "Publishing to {} on {}.",
            repository.full_name, repository.default_branch
        ),
        None => println!("No repository selected."),
    }
    Ok(())
}

async fn repos(app: &App) -> Result<()> {
    let repositories = app
        .repositories()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load repositories: {}", e.user_message()))?;

    for repository in repositories {
        let visibility = if repository.private { "private" } else { "public" };
        println!(
            "{}\t{}\t{}",
            repository.full_name, repository.default_branch, visibility
        );
    }
    Ok(())
}

/// Build the draft the same way a share would, surfacing share errors.
fn draft(args: PostArgs) -> Result<PostDraft> {
    let (sender, receiver) = share::channel();
    let mut draft = PostDraft::new(args.quote, args.thoughts);

    match args.url {
        Some(url) => sender.share(&url, &args.title),
        None => draft.page_title = args.title,
    }
    receiver.drain_into(&mut draft);

    if let Some(error) = draft.error_message.take() {
        anyhow::bail!(error);
    }
    Ok(draft)
}

fn preview(args: PostArgs) -> Result<()> {
    let content = draft(args)?.submit(Utc::now())?;
    println!("_posts/{}", post::render_filename(&content));
    println!();
    println!("{}", post::render_markdown(&content));
    Ok(())
}

async fn publish(app: &App, args: PostArgs) -> Result<()> {
    let draft = draft(args)?;
    let created = app
        .publish(&draft, Utc::now())
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    match created.html_url {
        Some(url) => println!("Published {}", url),
        None => println!("Published {}", created.path),
    }
    Ok(())
}
