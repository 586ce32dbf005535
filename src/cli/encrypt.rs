use anyhow::{bail, Result};
use clap::Args;

use super::{input, is_interactive, spinner, App, DirectoryArgs};
use crate::directory::session::Session;
use crate::keys::ResolutionError;
use crate::pipeline::{self, ResolutionPolicy, SealError, SealOptions};
use crate::ui::display;

#[derive(Args)]
pub struct EncryptArgs {
    /// Recipient username or numeric id (can be repeated; omit to pick interactively)
    #[arg(long, short)]
    pub to: Vec<String>,

    /// Read the message from this file instead of stdin or $EDITOR
    pub file: Option<String>,

    /// Write the envelope here instead of stdout
    #[arg(long, short)]
    pub output: Option<String>,

    /// Fail if any selected user has no usable key
    #[arg(long)]
    pub strict: bool,

    /// Overwrite existing files without prompting
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub directory: DirectoryArgs,
}

pub async fn run(args: EncryptArgs, app: &App) -> Result<()> {
    if args.to.is_empty() && !is_interactive() {
        bail!("no recipients: pass --to <user> when not running in a terminal");
    }

    let directory = app.open_directory(&args.directory)?;
    let mut session = app.load_session(&directory).await?;

    if args.to.is_empty() {
        pick_recipients(&mut session, app)?;
    } else {
        for name in &args.to {
            session.select_by_name(name)?;
        }
    }

    if session.selection.is_empty() {
        bail!("no recipients selected");
    }
    for user in session.selected_identities() {
        tracing::debug!("recipient: {} ({})", app.display_name(&user.username), user.id);
    }

    let plaintext = input::read_plaintext(args.file.as_deref())?;

    let options = SealOptions {
        policy: if args.strict {
            ResolutionPolicy::Strict
        } else {
            ResolutionPolicy::Tolerant
        },
        timeout: app.settings.timeout(),
    };

    let progress = spinner(app.quiet, "fetching keys...");
    let sealed = pipeline::seal(&directory, &session.selection, &plaintext, &options).await;
    progress.finish_and_clear();

    let sealed = match sealed {
        Ok(sealed) => sealed,
        Err(SealError::Unresolved(errors)) => {
            for error in &errors {
                display::error(&describe(&session, app, error));
            }
            bail!("{} selected user(s) could not be resolved", errors.len());
        }
        Err(e) => return Err(e.into()),
    };

    if !app.quiet {
        for error in &sealed.skipped {
            display::warning(&format!("skipped {}", describe(&session, app, error)));
        }
    }

    match &args.output {
        Some(path) => {
            input::check_overwrite(path, args.force)?;
            input::write_secret_file(path, sealed.envelope.as_str().as_bytes())
                .map_err(|e| anyhow::anyhow!("failed to write '{}': {}", path, e))?;
            if !app.quiet {
                display::ok(&format!(
                    "{} encrypted ({} key(s))",
                    path, sealed.recipient_count
                ));
            }
        }
        None => {
            print!("{}", sealed.envelope);
            if !app.quiet {
                display::ok(&format!("encrypted to {} key(s)", sealed.recipient_count));
            }
        }
    }

    Ok(())
}

fn pick_recipients(session: &mut Session, app: &App) -> Result<()> {
    let names: Vec<String> = session
        .roster()
        .iter()
        .map(|u| app.display_name(&u.username))
        .collect();
    if names.is_empty() {
        bail!("the directory returned no users");
    }

    let chosen = dialoguer::MultiSelect::new()
        .with_prompt("Recipients (space to toggle, enter to confirm)")
        .items(&names)
        .interact()?;

    let ids: Vec<_> = chosen.iter().map(|&i| session.roster()[i].id).collect();
    for id in ids {
        session.toggle(id);
    }
    Ok(())
}

fn describe(session: &Session, app: &App, error: &ResolutionError) -> String {
    let who = session
        .username(error.identity)
        .map(|u| app.display_name(u))
        .unwrap_or_else(|| error.identity.to_string());
    format!("{}: {}", who, error.cause)
}
