//! Terminal output for CLI routines.
//!
//! Every user-facing line is a [`Message`]: a short action, right-aligned in a fixed
//! column and colored by its [`MessageType`], followed by the details.

use std::io::IsTerminal;

use serde::Serialize;

pub mod status;
pub mod terminal;

use terminal::{write_styled_line, StyledText};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Highlight,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub action: String,
    pub details: String,
}

impl Message {
    pub fn new(action: String, details: String) -> Self {
        Self { action, details }
    }
}

impl MessageType {
    fn style(&self, action: &str) -> StyledText {
        let text = StyledText::from_str(action);
        match self {
            MessageType::Info => text.cyan().bold(),
            MessageType::Success => text.green().bold(),
            MessageType::Highlight => text.on_green().bold(),
            MessageType::Warning => text.yellow().bold(),
            MessageType::Error => text.red().bold(),
        }
    }
}

fn no_ansi() -> bool {
    std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal()
}

pub fn show_message_wrapper(message_type: MessageType, message: Message) {
    let styled = message_type.style(&message.action);
    if let Err(e) = write_styled_line(&styled, &message.details, no_ansi()) {
        tracing::warn!("Failed to write message to the terminal: {}", e);
    }
    tracing::debug!("{}: {}", message.action, message.details);
}

#[macro_export]
macro_rules! show_message {
    ($message_type:expr, $message:expr) => {
        $crate::cli::display::show_message_wrapper($message_type, $message)
    };
}
