use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandError {
    UnknownPlayer(String),
    UnknownFruit(String),
    InvalidDirection(String),
    PlayerDead(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPlayer(id) => write!(f, "unknown player: {id}"),
            Self::UnknownFruit(id) => write!(f, "unknown fruit: {id}"),
            Self::InvalidDirection(key) => write!(f, "invalid direction: {key}"),
            Self::PlayerDead(id) => write!(f, "player has no score left: {id}"),
        }
    }
}

impl std::error::Error for CommandError {}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(f, "failed to read settings: {error}"),
            Self::Parse(error) => write!(f, "failed to parse settings: {error}"),
            Self::Invalid(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(error) => Some(error),
            Self::Parse(error) => Some(error),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error)
    }
}
