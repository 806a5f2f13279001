//! Interactive prompts

use std::io;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use is_terminal::IsTerminal;

use crate::errors::CliError;

/// Input validator; `Err` carries the message shown to the user
pub type Validator<'a> = &'a (dyn Fn(&str) -> Result<(), String> + Sync);

/// Questions the deploy flow may ask. Declining an answer (Esc, Ctrl-C)
/// surfaces as [`CliError::canceled`].
pub trait Prompt: Send + Sync {
    fn confirm(&self, message: &str, default: bool) -> Result<bool, CliError>;

    fn input(
        &self,
        message: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, CliError>;

    /// Index of the chosen item
    fn select(&self, message: &str, items: &[String], default: usize) -> Result<usize, CliError>;

    fn secret(&self, message: &str) -> Result<String, CliError>;
}

/// Whether both ends of the terminal are attached
pub fn stdio_is_interactive() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Prompts rendered on stderr with dialoguer
#[derive(Default)]
pub struct DialoguerPrompt {
    theme: ColorfulTheme,
}

impl DialoguerPrompt {
    pub fn new() -> Self {
        Self::default()
    }
}

fn map_prompt_error(err: dialoguer::Error) -> CliError {
    let dialoguer::Error::IO(err) = err;
    if err.kind() == io::ErrorKind::Interrupted {
        CliError::canceled()
    } else {
        CliError::Io(err)
    }
}

impl Prompt for DialoguerPrompt {
    fn confirm(&self, message: &str, default: bool) -> Result<bool, CliError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact_opt()
            .map_err(map_prompt_error)?
            .ok_or_else(CliError::canceled)
    }

    fn input(
        &self,
        message: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, CliError> {
        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(message);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input
            .validate_with(|value: &String| validate(value))
            .interact_text()
            .map(|value| value.trim().to_string())
            .map_err(map_prompt_error)
    }

    fn select(&self, message: &str, items: &[String], default: usize) -> Result<usize, CliError> {
        Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .default(default)
            .interact_opt()
            .map_err(map_prompt_error)?
            .ok_or_else(CliError::canceled)
    }

    fn secret(&self, message: &str) -> Result<String, CliError> {
        Password::with_theme(&self.theme)
            .with_prompt(message)
            .interact()
            .map(|value| value.trim().to_string())
            .map_err(map_prompt_error)
    }
}
