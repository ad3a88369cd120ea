use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The storage engine refused to prepare or step a statement.
    Database(rusqlite::Error),
    /// A field name from outside the crate did not match any known field.
    UnknownField(String),
    /// A track or image was inserted without an owning url.
    MissingUrl,
    /// The rows of a started query were requested a second time.
    QueryStarted,
    /// The database file carries a schema this build doesn't understand.
    SchemaVersion(u32),
    /// A configuration value couldn't be resolved.
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Error {
        Error::Database(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Database(ref e) => write!(f, "database error: {}", e),
            Error::UnknownField(ref name) => write!(f, "unknown field '{}'", name),
            Error::MissingUrl => write!(f, "url is required"),
            Error::QueryStarted => write!(f, "query already started"),
            Error::SchemaVersion(v) => write!(f, "unsupported schema version {}", v),
            Error::Config(ref msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Database(ref e) => Some(e),
            _ => None,
        }
    }
}
