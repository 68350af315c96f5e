//! Commands typed at the terminal client's prompt.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Vote(u32),
    Abstain,
    Show,
    Hide,
    Clear,
    State,
    Link,
    Help,
    Quit,
}

/// Why a line could not be read as a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("type a command, or `help`")]
    Empty,
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),
    #[error("`vote` needs a whole number, got {0:?}")]
    BadPoints(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(ParseError::Empty);
        };

        match word.to_ascii_lowercase().as_str() {
            "vote" | "v" => {
                let arg = words.next().unwrap_or_default();
                arg.parse()
                    .map(Self::Vote)
                    .map_err(|_| ParseError::BadPoints(arg.to_string()))
            }
            "abstain" | "a" => Ok(Self::Abstain),
            "show" => Ok(Self::Show),
            "hide" => Ok(Self::Hide),
            "clear" | "c" => Ok(Self::Clear),
            "state" | "s" => Ok(Self::State),
            "link" => Ok(Self::Link),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

pub const HELP: &str = "\
Commands:
  vote <n>   vote n points
  abstain    sit this round out
  show       reveal everyone's votes
  hide       hide them again
  clear      start a new round
  state      print the table
  link       print the share link
  quit       leave the session";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vote_with_points() {
        assert_eq!(Command::parse("vote 5"), Ok(Command::Vote(5)));
        assert_eq!(Command::parse("  V 13 "), Ok(Command::Vote(13)));
    }

    #[test]
    fn test_parse_vote_needs_number() {
        assert_eq!(
            Command::parse("vote"),
            Err(ParseError::BadPoints(String::new()))
        );
        assert_eq!(
            Command::parse("vote five"),
            Err(ParseError::BadPoints("five".into()))
        );
        assert!(matches!(
            Command::parse("vote -1"),
            Err(ParseError::BadPoints(_))
        ));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("abstain"), Ok(Command::Abstain));
        assert_eq!(Command::parse("SHOW"), Ok(Command::Show));
        assert_eq!(Command::parse("hide"), Ok(Command::Hide));
        assert_eq!(Command::parse("clear"), Ok(Command::Clear));
        assert_eq!(Command::parse("state"), Ok(Command::State));
        assert_eq!(Command::parse("link"), Ok(Command::Link));
        assert_eq!(Command::parse("quit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_empty_and_unknown() {
        assert_eq!(Command::parse("   "), Err(ParseError::Empty));
        assert_eq!(
            Command::parse("kick Flynn"),
            Err(ParseError::Unknown("kick".into()))
        );
    }

    #[test]
    fn test_parse_error_messages() {
        assert_eq!(ParseError::Empty.to_string(), "type a command, or `help`");
        assert_eq!(
            ParseError::Unknown("kick".into()).to_string(),
            "unknown command \"kick\", try `help`"
        );
        assert_eq!(
            ParseError::BadPoints("five".into()).to_string(),
            "`vote` needs a whole number, got \"five\""
        );
    }
}
