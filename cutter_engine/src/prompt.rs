use std::io::{BufRead, Write};

use crate::prelude::*;

/// The outcome of a blocking text prompt.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PromptResponse {
    /// The user pressed the first button (typically "OK") with this text.
    Confirmed(String),
    Cancelled,
}

/// A modal text input dialog. Implementations block until the user answers.
pub trait UserPrompt {
    fn read_input(&mut self, message: &str, buttons: &[&str]) -> Result<PromptResponse>;
}

impl<P: UserPrompt + ?Sized> UserPrompt for Box<P> {
    fn read_input(&mut self, message: &str, buttons: &[&str]) -> Result<PromptResponse> {
        (**self).read_input(message, buttons)
    }
}

/// Always answers with the same response. Used when the answer is known up
/// front, e.g. passed on the command line.
pub struct FixedPrompt(pub PromptResponse);

impl FixedPrompt {
    pub fn confirm(text: impl Into<String>) -> Self {
        Self(PromptResponse::Confirmed(text.into()))
    }

    pub fn cancel() -> Self {
        Self(PromptResponse::Cancelled)
    }
}

impl UserPrompt for FixedPrompt {
    fn read_input(&mut self, message: &str, _buttons: &[&str]) -> Result<PromptResponse> {
        log::debug!("Prompt '{message}' answered with {:?}", self.0);
        Ok(self.0.clone())
    }
}

/// Prompts on a text terminal. The message is written to `output` and one
/// line is read from `input`. End of input counts as pressing Cancel.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> UserPrompt for TerminalPrompt<R, W> {
    fn read_input(&mut self, message: &str, buttons: &[&str]) -> Result<PromptResponse> {
        writeln!(self.output, "{message}")?;
        if let Some(cancel) = buttons.get(1) {
            writeln!(self.output, "(press Ctrl-D to {cancel})")?;
        }
        write!(self.output, "> ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(PromptResponse::Cancelled);
        }
        Ok(PromptResponse::Confirmed(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
