use std::io::Read;

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;

/// Message to encrypt.
/// Priority: file argument > stdin pipe > $EDITOR on a terminal
pub fn read_plaintext(file: Option<&str>) -> Result<Vec<u8>> {
    if let Some(path) = file {
        return std::fs::read(path).with_context(|| format!("failed to read '{}'", path));
    }

    if !std::io::stdin().is_terminal() {
        let mut buf = vec![];
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }

    match dialoguer::Editor::new().edit("")? {
        Some(text) => Ok(text.into_bytes()),
        None => bail!("aborted: editor closed without saving"),
    }
}

/// Read everything piped on stdin, or `None` when stdin is a terminal.
pub fn read_piped() -> Result<Option<String>> {
    if std::io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("stdin is not valid UTF-8")?;
    Ok(Some(buf))
}

/// Write a file containing secrets with restrictive permissions (0600 on Unix).
pub fn write_secret_file(path: &str, content: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(content)?;
    }
    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }
    Ok(())
}

/// Refuse to clobber `path` unless forced or confirmed on a terminal.
pub fn check_overwrite(path: &str, force: bool) -> Result<()> {
    if force || !std::path::Path::new(path).exists() {
        return Ok(());
    }
    if !std::io::stdin().is_terminal() {
        bail!(
            "'{}' already exists. Use --force to overwrite in non-interactive mode",
            path
        );
    }
    let confirm = dialoguer::Confirm::new()
        .with_prompt(format!("'{}' already exists. Overwrite?", path))
        .default(false)
        .interact()?;
    if !confirm {
        bail!("aborted: not overwriting '{}'", path);
    }
    Ok(())
}
