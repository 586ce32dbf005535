use std::path::PathBuf;

use age::secrecy::SecretString;
use anyhow::{bail, Context, Result};
use clap::Args;
use is_terminal::IsTerminal;

use super::{input, is_interactive, App};
use crate::config;
use crate::crypto::{self, DecryptError, Envelope};
use crate::keys::{IdentityLoader, LoadError, UnlockedIdentity};
use crate::ui::display;

const MAX_PASSPHRASE_ATTEMPTS: usize = 3;

#[derive(Args)]
pub struct DecryptArgs {
    /// Envelope file (default: clipboard, then stdin)
    pub file: Option<String>,

    /// Private key to decrypt with (SSH or age)
    #[arg(long, short, env = "AGE_PRIVATE_KEY_PATH")]
    pub identity: Option<String>,

    /// Read the envelope from the clipboard
    #[arg(long, short)]
    pub clipboard: bool,

    /// Write the plaintext here instead of stdout
    #[arg(long, short)]
    pub output: Option<String>,

    /// Overwrite existing files without prompting
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: DecryptArgs, app: &App) -> Result<()> {
    let envelope = read_envelope(&args)?;

    let key_path = identity_path(&args, app)?;
    let identity = load_identity(key_path)?;
    tracing::debug!("loaded {} identity", identity.kind());

    let plaintext = match crypto::decrypt(&envelope, &identity) {
        Ok(plaintext) => plaintext,
        Err(DecryptError::NotARecipient) => {
            bail!("this message was not encrypted to your key")
        }
        Err(e) => return Err(e.into()),
    };

    match &args.output {
        Some(path) => {
            input::check_overwrite(path, args.force)?;
            input::write_secret_file(path, &plaintext)
                .map_err(|e| anyhow::anyhow!("failed to write '{}': {}", path, e))?;
            if !app.quiet {
                display::ok(&format!("{} decrypted", path));
            }
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout();
            stdout.write_all(&plaintext)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

const NOTHING_TO_DECRYPT: &str =
    "nothing to decrypt: pass a file, pipe the envelope on stdin, or use --clipboard";

/// Where the envelope comes from.
#[derive(Debug, PartialEq, Eq)]
enum Source<'a> {
    File(&'a str),
    Clipboard,
    Stdin,
    /// Offer a clipboard envelope behind a confirmation prompt.
    AskClipboard,
    Nothing,
}

/// Priority: file argument > --clipboard > stdin pipe > clipboard (with confirmation)
fn envelope_source(args: &DecryptArgs, stdin_piped: bool, interactive: bool) -> Source<'_> {
    if let Some(path) = &args.file {
        Source::File(path)
    } else if args.clipboard {
        Source::Clipboard
    } else if stdin_piped {
        Source::Stdin
    } else if interactive {
        Source::AskClipboard
    } else {
        Source::Nothing
    }
}

fn read_envelope(args: &DecryptArgs) -> Result<Envelope> {
    let stdin_piped = !std::io::stdin().is_terminal();
    match envelope_source(args, stdin_piped, is_interactive()) {
        Source::File(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path))?;
            Envelope::parse(&text).with_context(|| format!("'{}' is not an age envelope", path))
        }
        Source::Clipboard => match clipboard_envelope()? {
            Some(envelope) => Ok(envelope),
            None => bail!("no age envelope found in the clipboard"),
        },
        Source::Stdin => {
            let text = input::read_piped()?.unwrap_or_default();
            Envelope::parse(&text).context("stdin is not an age envelope")
        }
        Source::AskClipboard => {
            if let Some(envelope) = clipboard_envelope().unwrap_or(None) {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt("Age file detected in clipboard. Decrypt it?")
                    .default(true)
                    .interact()?;
                if confirm {
                    return Ok(envelope);
                }
            }
            bail!(NOTHING_TO_DECRYPT)
        }
        Source::Nothing => bail!(NOTHING_TO_DECRYPT),
    }
}

fn clipboard_envelope() -> Result<Option<Envelope>> {
    let mut clipboard = arboard::Clipboard::new().context("clipboard is not available")?;
    let text = clipboard.get_text().unwrap_or_default();
    Ok(Envelope::find_in(&text))
}

fn identity_path(args: &DecryptArgs, app: &App) -> Result<PathBuf> {
    if let Some(path) = config::pick(
        args.identity.as_deref(),
        app.settings.identity.path.as_deref(),
    ) {
        return Ok(config::expand_home(&path));
    }
    prompt_path()
}

fn prompt_path() -> Result<PathBuf> {
    if !is_interactive() {
        bail!("no private key given. Pass --identity, set AGE_PRIVATE_KEY_PATH, or add [identity] path to config.toml");
    }
    let path: String = dialoguer::Input::new()
        .with_prompt("Path to private key")
        .interact_text()?;
    Ok(config::expand_home(path.trim()))
}

/// Load the key, asking for a passphrase (or another path) when needed.
fn load_identity(mut path: PathBuf) -> Result<UnlockedIdentity> {
    let loader = IdentityLoader::new();
    let mut passphrase: Option<SecretString> = None;
    let mut attempts = 0;

    loop {
        match loader.load(&path, passphrase.as_ref()) {
            Ok(identity) => return Ok(identity),
            Err(e @ LoadError::CredentialRead { .. }) => {
                if !is_interactive() {
                    return Err(e.into());
                }
                display::error(&e.to_string());
                path = prompt_path()?;
                passphrase = None;
                attempts = 0;
            }
            Err(e @ (LoadError::PassphraseRequired | LoadError::PassphraseInvalid(_))) => {
                if !is_interactive() {
                    return Err(e.into());
                }
                if attempts >= MAX_PASSPHRASE_ATTEMPTS {
                    bail!("too many incorrect passphrase attempts");
                }
                if attempts > 0 {
                    display::error("incorrect passphrase");
                }
                attempts += 1;
                let entered = dialoguer::Password::new()
                    .with_prompt(format!("Passphrase for {}", path.display()))
                    .interact()?;
                passphrase = Some(SecretString::from(entered));
            }
            Err(e) => return Err(e.into()),
        }
    }
}
