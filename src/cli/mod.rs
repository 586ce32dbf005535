pub mod decrypt;
pub mod encrypt;
pub mod input;
pub mod users;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use is_terminal::IsTerminal;

use crate::config::{self, Settings};
use crate::directory::gitlab::GitLabDirectory;
use crate::directory::session::Session;
use crate::directory::Directory;

#[derive(Parser)]
#[command(
    name = "agelab",
    about = "Encrypt messages to GitLab users with their SSH keys"
)]
#[command(version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show debug output (never prints secret values)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Minimal output (for scripting)
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Path to config.toml (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Mask usernames on screen (also AGE_TOOL_DEMO_MODE)
    #[arg(long, global = true)]
    pub censor: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List directory users who can be selected as recipients
    Users(users::UsersArgs),

    /// Encrypt a message to one or more directory users
    Encrypt(encrypt::EncryptArgs),

    /// Decrypt an age envelope with a local private key
    Decrypt(decrypt::DecryptArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Options shared by every command that talks to the directory.
#[derive(Args)]
pub struct DirectoryArgs {
    /// GitLab base URL
    #[arg(long = "gitlab-url", env = "GITLAB_URL")]
    pub url: Option<String>,

    /// GitLab access token
    #[arg(long = "gitlab-token", env = "GITLAB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Global flags plus the config file, passed to every command.
pub struct App {
    pub settings: Settings,
    pub quiet: bool,
    pub censor: bool,
}

impl App {
    pub fn new(cli: &Cli) -> Result<Self> {
        let settings = Settings::load(cli.config.as_deref())?;
        let demo_mode = std::env::var_os("AGE_TOOL_DEMO_MODE").is_some_and(|v| !v.is_empty());
        let censor = cli.censor || demo_mode || settings.display.censor;
        Ok(Self {
            settings,
            quiet: cli.quiet,
            censor,
        })
    }

    /// How a username is shown on screen.
    pub fn display_name(&self, username: &str) -> String {
        if self.censor {
            crate::directory::session::censor(username)
        } else {
            username.to_string()
        }
    }

    /// Build the GitLab client from flags/env, the config file, or a prompt.
    pub fn open_directory(&self, args: &DirectoryArgs) -> Result<GitLabDirectory> {
        let file = &self.settings.directory;
        let url = match config::pick(args.url.as_deref(), file.url.as_deref()) {
            Some(url) => url,
            None => prompt_required("GitLab URL", false)?,
        };
        let token = match config::pick(args.token.as_deref(), file.token.as_deref()) {
            Some(token) => token,
            None => prompt_required("GitLab token", true)?,
        };

        GitLabDirectory::with_timeout(&url, &token, self.settings.timeout())
            .context("failed to initialise GitLab client")
    }

    /// Fetch the roster behind a spinner.
    pub async fn load_session(&self, directory: &dyn Directory) -> Result<Session> {
        let spinner = spinner(self.quiet, "loading users...");
        let users = directory
            .list_identities()
            .await
            .context("failed to fetch users");
        spinner.finish_and_clear();
        let users = users?;
        tracing::debug!("fetched {} users", users.len());
        Ok(Session::new(users))
    }
}

pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

pub fn spinner(quiet: bool, message: &str) -> indicatif::ProgressBar {
    if quiet {
        return indicatif::ProgressBar::hidden();
    }
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn prompt_required(label: &str, secret: bool) -> Result<String> {
    if !is_interactive() {
        bail!(
            "{} is not set. Pass it as a flag, set {}, or add it to config.toml",
            label,
            if secret { "GITLAB_TOKEN" } else { "GITLAB_URL" }
        );
    }
    let value = if secret {
        dialoguer::Password::new().with_prompt(label).interact()?
    } else {
        dialoguer::Input::<String>::new()
            .with_prompt(label)
            .interact_text()?
    };
    if value.trim().is_empty() {
        bail!("{} is required", label);
    }
    Ok(value.trim().to_string())
}
