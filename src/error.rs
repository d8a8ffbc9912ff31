use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum XrefError {
    #[error("missing config file rnac-xref.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("invalid setting {name}: {message}")]
    InvalidSetting { name: &'static str, message: String },

    #[error("unknown species: {0}")]
    UnknownSpecies(String),

    #[error("invalid feed name: {0}")]
    InvalidFeed(String),

    #[error("failed to read feed {feed}: {message}")]
    FeedRead { feed: String, message: String },

    #[error("feed download failed: {0}")]
    FeedHttp(String),

    #[error("feed server returned status {status}: {message}")]
    FeedStatus { status: u16, message: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("failed to parse store snapshot: {0}")]
    StoreParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("run for species {species} failed")]
    Species {
        species: String,
        #[source]
        source: Box<XrefError>,
    },
}

/// Problems with a single feed line. These never abort a feed; the caller logs
/// and counts them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("expected at least {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("unexpected db tag: {found};  was expecting: {expected}")]
    UnexpectedTag {
        expected: &'static str,
        found: String,
    },

    #[error("unparseable taxon: {0:?}")]
    BadTaxon(String),

    #[error("unparseable subject id: {0:?}")]
    BadSubjectId(String),
}
