use crate::command::EslCommand;
use crate::constants::{DIGITS_VARIABLE, READ_DIGIT_TIMEOUT_MS, READ_TERMINATOR};

/// Execute application commands
pub struct AppCommand;

impl AppCommand {
    /// Answer call
    pub fn answer() -> EslCommand {
        Self::execute("answer", None)
    }

    /// Speak text through the channel's configured TTS engine
    pub fn speak(text: &str) -> EslCommand {
        Self::execute("speak", Some(text.to_string()))
    }

    /// Set channel variable
    pub fn set_var(name: &str, value: &str) -> EslCommand {
        Self::execute("set", Some(format!("{}={}", name, value)))
    }

    /// Collect exactly `digits` DTMF digits into the `digits` channel variable.
    ///
    /// Plays `prompt`, waits at most [`READ_DIGIT_TIMEOUT_MS`], and stops
    /// early on [`READ_TERMINATOR`].
    pub fn read_digits(digits: u32, prompt: &str) -> EslCommand {
        Self::execute(
            "read",
            Some(format!(
                "{} {} {} {} {} {}",
                digits, digits, prompt, DIGITS_VARIABLE, READ_DIGIT_TIMEOUT_MS, READ_TERMINATOR
            )),
        )
    }

    /// Bridge the channel to a dial string
    pub fn bridge(destination: &str) -> EslCommand {
        Self::execute("bridge", Some(destination.to_string()))
    }

    /// Any application by name
    pub fn execute(app: &str, args: Option<String>) -> EslCommand {
        EslCommand::Execute {
            app: app.to_string(),
            args,
        }
    }
}
