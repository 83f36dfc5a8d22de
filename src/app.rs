//! Application context — unified state passed to every command handler.

use anyhow::Result;

use crate::application::ports::ProgressReporter;
use crate::infra::state::DeploymentStore;
use crate::output::{OutputContext, TerminalReporter};

/// Unified application context passed to every command handler.
///
/// Constructed once in `Cli::run()` and passed as `&AppContext` to all
/// command handlers.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Deployment state store rooted at the system deployment directory.
    pub store: DeploymentStore,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `HY2CTL_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool, yes: bool) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("HY2CTL_YES").is_ok();
        Self {
            output: OutputContext::new(no_color, quiet),
            store: DeploymentStore::new(),
            non_interactive: yes || ci_env,
        }
    }

    /// Progress reporter writing through this context's output.
    #[must_use]
    pub fn reporter(&self) -> impl ProgressReporter + '_ {
        TerminalReporter::new(&self.output)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true`, returns `default` immediately
    /// without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
