use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Settings, API_BASE_URL, CLIENT_ID, OAUTH_BASE_URL};

/// Publish quotes and your thoughts on them to a Jekyll blog hosted on GitHub.
#[derive(Parser, Debug)]
#[command(name = "pique", version, about)]
pub struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Where credentials and the selected repository are kept
    #[arg(long, env = "PIQUE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// OAuth app client id (device flow must be enabled for it)
    #[arg(long, env = "PIQUE_CLIENT_ID", default_value = CLIENT_ID, global = true)]
    pub client_id: String,

    #[arg(
        long,
        env = "PIQUE_OAUTH_URL",
        default_value = OAUTH_BASE_URL,
        hide = true,
        global = true
    )]
    pub oauth_url: String,

    #[arg(
        long,
        env = "PIQUE_API_URL",
        default_value = API_BASE_URL,
        hide = true,
        global = true
    )]
    pub api_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign into GitHub with a device code
    Login {
        /// Print the verification link instead of opening the browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Forget the token, the user and the selected repository
    Logout,
    /// Show who is signed in and where posts go
    Status,
    /// List the repositories you can publish to
    Repos,
    /// Choose the repository posts are published to
    Select {
        /// Repository in `owner/name` form
        full_name: String,
    },
    /// Publish a quote with your thoughts
    Post(PostArgs),
    /// Print the post file without signing in or publishing
    Preview(PostArgs),
}

#[derive(Args, Debug)]
pub struct PostArgs {
    /// The quoted text
    #[arg(short, long)]
    pub quote: String,

    /// Your thoughts on it
    #[arg(short, long)]
    pub thoughts: String,

    /// Title of the page the quote comes from
    #[arg(long, default_value = "")]
    pub title: String,

    /// Link to the page the quote comes from
    #[arg(long)]
    pub url: Option<String>,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::new(self.data_dir.clone());
        settings.client_id = self.client_id.clone();
        settings.oauth_base_url = self.oauth_url.clone();
        settings.api_base_url = self.api_url.clone();
        if let Command::Login { no_browser } = self.command {
            settings.open_browser = !no_browser;
        }
        settings
    }
}
