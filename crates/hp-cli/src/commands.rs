//! Driver commands read from stdin, one per line

use std::str::FromStr;

use anyhow::{Context, Result};
use thiserror::Error;

use hp_core::types::{CardPin, PasswordField};
use hp_popup::PopupController;

use crate::output::format_state;

/// One line of driver input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the domain text
    Domain(String),
    /// Replace the universal password text
    Password(String),
    /// Restore the page's domain
    Reset,
    /// Show or mask a password field
    Toggle(PasswordField),
    /// Load the universal password from the smart card
    Card(String),
    Copy,
    Submit,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_start();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim_end_matches(['\r', '\n'])),
            None => (line.trim_end(), ""),
        };

        match word {
            "domain" => Ok(Command::Domain(rest.to_owned())),
            "password" => Ok(Command::Password(rest.to_owned())),
            "reset" => Ok(Command::Reset),
            "toggle" => match rest.trim() {
                "universal" => Ok(Command::Toggle(PasswordField::Universal)),
                "derived" => Ok(Command::Toggle(PasswordField::Derived)),
                _ => Err(ParseError::Usage("toggle universal|derived")),
            },
            "card" if rest.trim().is_empty() => Err(ParseError::Usage("card <pin>")),
            "card" => Ok(Command::Card(rest.trim().to_owned())),
            "copy" => Ok(Command::Copy),
            "submit" => Ok(Command::Submit),
            "show" => Ok(Command::Show),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseError::Unknown(other.to_owned())),
        }
    }
}

const HELP: &str = "\
domain <text>               replace the domain
password <text>             replace the universal password
reset                       restore the page's domain
toggle universal|derived    show or mask a password
card <pin>                  load the universal password from the smart card
copy                        copy the derived password
submit                      fill in the derived password and close
show                        print the popup state
quit                        exit";

/// Whether the driver loop keeps reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Apply one command to the popup
pub async fn execute(popup: &PopupController, command: Command) -> Result<Flow> {
    match command {
        Command::Domain(text) => popup.set_domain(text),
        Command::Password(text) => popup.set_universal_password(text),
        Command::Reset => {
            if !popup.reset_domain() {
                println!("domain is already the page's domain");
            }
        }
        Command::Toggle(field) => {
            let hidden = popup.toggle_visibility(field);
            println!("{} password {}", field, if hidden { "hidden" } else { "shown" });
        }
        Command::Card(pin) => {
            let pin = CardPin::new(pin).context("invalid PIN")?;
            popup
                .use_smart_card(pin)
                .await
                .context("smart card retrieval failed")?;
            println!("universal password loaded from smart card");
        }
        Command::Copy => popup.request_copy(),
        Command::Submit => {
            if !popup.snapshot().can_fill_in {
                anyhow::bail!("no password field is focused on the page");
            }
            popup.request_submit();
        }
        Command::Show => println!("{}", format_state(&popup.snapshot())),
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}
