use anyhow::Result;
use clap::Args;

use super::{App, DirectoryArgs};
use crate::ui::display;

#[derive(Args)]
pub struct UsersArgs {
    /// Only show usernames containing this text (case-insensitive)
    #[arg(long, short)]
    pub search: Option<String>,

    /// Print the list as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub directory: DirectoryArgs,
}

pub async fn run(args: UsersArgs, app: &App) -> Result<()> {
    let directory = app.open_directory(&args.directory)?;
    let session = app.load_session(&directory).await?;

    let matches = session.filter(args.search.as_deref().unwrap_or(""));

    if args.json {
        let shown: Vec<_> = matches
            .iter()
            .map(|u| serde_json::json!({ "id": u.id, "username": app.display_name(&u.username) }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    for user in &matches {
        display::user(user.id, &app.display_name(&user.username), false);
    }
    if !app.quiet {
        display::info("users:", &format!("{} of {}", matches.len(), session.roster().len()));
    }
    Ok(())
}
