use console::{style, StyledObject};

/// Completed encrypt/decrypt, e.g. `ok: secret.age encrypted (2 key(s))`.
pub fn ok(message: &str) {
    eprintln!("{}", status(style("ok:").green(), message));
}

/// A user that could not be resolved, or a rejected passphrase.
pub fn error(message: &str) {
    eprintln!("{}", status(style("error:").red(), message));
}

/// Recipients skipped under the tolerant policy.
pub fn warning(message: &str) {
    eprintln!("{}", status(style("warning:").yellow(), message));
}

fn status(tag: StyledObject<&str>, message: &str) -> String {
    format!("{} {}", tag.bold().for_stderr(), message)
}

/// Print a summary line (label: value) after a listing.
pub fn info(label: &str, value: &str) {
    eprintln!("  {:<10}{}", style(label).bold(), value);
}

/// One roster row on stdout, with a marker when selected.
pub fn user(id: u64, name: &str, selected: bool) {
    println!("{}", user_line(id, name, selected));
}

fn user_line(id: u64, name: &str, selected: bool) -> String {
    let marker = if selected { "[x]" } else { "   " };
    format!("{} {:>6}  {}", marker, id, name)
}
