use std::fmt;

#[derive(Debug)]
pub enum AutosizeError {
    MissingSource(String),
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl fmt::Display for AutosizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutosizeError::MissingSource(declaration) => {
                write!(f, "declaration has no source file: {}", declaration)
            }
            AutosizeError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            AutosizeError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for AutosizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AutosizeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AutosizeError {
    fn from(value: std::io::Error) -> Self {
        AutosizeError::Io(value)
    }
}
