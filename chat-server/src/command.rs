//! Parsing of client input lines.
//!
//! A line that starts with [`SIGIL`] is a command; anything else is chat text.
//! Command words are case-insensitive and split from their arguments on the
//! first run of whitespace.

use thiserror::Error;

pub const SIGIL: char = '/';

/// One parsed line of client input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Chat(&'a str),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Nick { name: String },
    PrivateMessage { target: String, text: String },
    Complaint { target: String },
    Delay { minutes: u64, text: String },
    Help,
}

/// Misuse of a command. The `Display` text is what the sender is told.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid Command")]
    Unknown,
    #[error("Usage: /nick <nickname>")]
    NickUsage,
    #[error("Usage: /pm <nickname> <message>")]
    PrivateMessageUsage,
    #[error("Usage: /complaint <nickname>")]
    ComplaintUsage,
    #[error("Usage: /delay <minutes> <message>")]
    DelayUsage,
    #[error("Delay can't exceed {max} minutes")]
    DelayTooLong { max: u64 },
}

impl<'a> Input<'a> {
    pub fn parse(line: &'a str) -> Result<Self, CommandError> {
        let Some(body) = line.strip_prefix(SIGIL) else {
            return Ok(Input::Chat(line));
        };

        let (word, args) = split_first_word(body);
        let command = match word.to_ascii_lowercase().as_str() {
            "nick" => parse_nick(args)?,
            "pm" | "private" => parse_private_message(args)?,
            "complaint" => parse_complaint(args)?,
            "delay" => parse_delay(args)?,
            "help" => Command::Help,
            _ => return Err(CommandError::Unknown),
        };

        Ok(Input::Command(command))
    }
}

/// Splits off the first whitespace-delimited word; the remainder has its
/// leading whitespace removed.
fn split_first_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

fn parse_nick(args: &str) -> Result<Command, CommandError> {
    let (name, _) = split_first_word(args);
    if name.is_empty() {
        return Err(CommandError::NickUsage);
    }
    Ok(Command::Nick {
        name: name.to_string(),
    })
}

fn parse_private_message(args: &str) -> Result<Command, CommandError> {
    let (target, text) = split_first_word(args);
    if target.is_empty() || text.trim().is_empty() {
        return Err(CommandError::PrivateMessageUsage);
    }
    Ok(Command::PrivateMessage {
        target: target.to_string(),
        text: text.to_string(),
    })
}

fn parse_complaint(args: &str) -> Result<Command, CommandError> {
    let (target, _) = split_first_word(args);
    if target.is_empty() {
        return Err(CommandError::ComplaintUsage);
    }
    Ok(Command::Complaint {
        target: target.to_string(),
    })
}

fn parse_delay(args: &str) -> Result<Command, CommandError> {
    let (minutes, text) = split_first_word(args);
    let minutes = minutes
        .parse::<u64>()
        .map_err(|_| CommandError::DelayUsage)?;
    if text.trim().is_empty() {
        return Err(CommandError::DelayUsage);
    }
    Ok(Command::Delay {
        minutes,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        match Input::parse(line) {
            Ok(Input::Command(command)) => command,
            other => panic!("expected a command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(Input::parse("hello there"), Ok(Input::Chat("hello there")));
        assert_eq!(Input::parse(" /nick bob"), Ok(Input::Chat(" /nick bob")));
    }

    #[test]
    fn nick_takes_first_word() {
        assert_eq!(
            command("/nick alice"),
            Command::Nick {
                name: "alice".into()
            }
        );
        assert_eq!(
            command("/nick   alice  extra"),
            Command::Nick {
                name: "alice".into()
            }
        );
        assert_eq!(Input::parse("/nick"), Err(CommandError::NickUsage));
        assert_eq!(Input::parse("/nick   "), Err(CommandError::NickUsage));
    }

    #[test]
    fn private_message_keeps_text_intact() {
        assert_eq!(
            command("/pm bob hi  there"),
            Command::PrivateMessage {
                target: "bob".into(),
                text: "hi  there".into()
            }
        );
        assert_eq!(
            Input::parse("/pm bob"),
            Err(CommandError::PrivateMessageUsage)
        );
        assert_eq!(Input::parse("/pm"), Err(CommandError::PrivateMessageUsage));
    }

    #[test]
    fn aliases_and_case_insensitive_words() {
        let expected = Command::PrivateMessage {
            target: "bob".into(),
            text: "hi".into(),
        };
        assert_eq!(command("/private bob hi"), expected);
        assert_eq!(command("/PM bob hi"), expected);
        assert_eq!(command("/Private bob hi"), expected);
        assert_eq!(command("/HELP"), Command::Help);
    }

    #[test]
    fn complaint_requires_target() {
        assert_eq!(
            command("/complaint mallory"),
            Command::Complaint {
                target: "mallory".into()
            }
        );
        assert_eq!(Input::parse("/complaint"), Err(CommandError::ComplaintUsage));
    }

    #[test]
    fn delay_parses_minutes() {
        assert_eq!(
            command("/delay 5 see you soon"),
            Command::Delay {
                minutes: 5,
                text: "see you soon".into()
            }
        );
        assert_eq!(
            command("/delay 0 hi"),
            Command::Delay {
                minutes: 0,
                text: "hi".into()
            }
        );
    }

    #[test]
    fn malformed_delay_is_usage_error() {
        assert_eq!(Input::parse("/delay"), Err(CommandError::DelayUsage));
        assert_eq!(Input::parse("/delay soon hi"), Err(CommandError::DelayUsage));
        assert_eq!(Input::parse("/delay -1 hi"), Err(CommandError::DelayUsage));
        assert_eq!(Input::parse("/delay 1.5 hi"), Err(CommandError::DelayUsage));
        assert_eq!(Input::parse("/delay 5"), Err(CommandError::DelayUsage));
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert_eq!(Input::parse("/dance"), Err(CommandError::Unknown));
        assert_eq!(Input::parse("/"), Err(CommandError::Unknown));
        assert_eq!(Input::parse("/nickname bob"), Err(CommandError::Unknown));
    }
}
