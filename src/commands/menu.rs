//! Interactive menu shown when no subcommand is given.

use anyhow::{Context, Result, bail};

use crate::app::AppContext;
use crate::commands;

/// Run the interactive menu loop.
///
/// # Errors
///
/// Returns an error when invoked non-interactively; command failures inside
/// the loop are reported and the menu continues.
pub async fn run(app: &AppContext) -> Result<()> {
    if app.non_interactive {
        bail!("no subcommand given; the menu needs an interactive terminal");
    }

    loop {
        let out = &app.output;
        out.header("hy2ctl");
        out.kv("1", "install");
        out.kv("2", "uninstall");
        out.kv("3", "status");
        out.kv("0", "exit");

        let choice: String = dialoguer::Input::new()
            .with_prompt("Select [0-3]")
            .interact_text()
            .context("reading menu choice")?;

        let result = match choice.trim() {
            "1" => commands::install::run(app).await,
            "2" => commands::uninstall::run(app).await,
            "3" => commands::status::run(app).await,
            "0" => return Ok(()),
            other => {
                out.warn(&format!("unknown choice: {other}"));
                continue;
            }
        };
        if let Err(e) = result {
            out.error(&format!("{e:#}"));
        }
    }
}
