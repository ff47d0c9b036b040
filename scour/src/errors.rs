use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed finding ngprc config file (looked at /etc/ngprc, ./ngprc)")]
    ConfigMissing,

    #[error("no editor command for '{0}' in ngprc")]
    EditorNotConfigured(String),

    #[error("bad regexp: {0}")]
    BadRegex(#[from] regex::Error),

    #[error("empty search pattern")]
    EmptyPattern,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
