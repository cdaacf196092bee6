use std::{io, path::PathBuf};
use thiserror::Error;

/// Failure codes reported by an `unrar`-compatible executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnrarError {
    #[error("fatal error in archive")]
    FatalArchiveError,
    #[error("invalid archive or CRC error")]
    InvalidArchive,
    #[error("archive is locked or encrypted")]
    LockedArchive,
    #[error("write error")]
    WriteError,
    #[error("file open error")]
    OpenError,
    #[error("wrong command line option")]
    BadArguments,
    #[error("not enough memory")]
    OutOfMemory,
    #[error("file create error")]
    CreateError,
    #[error("no files to extract")]
    NothingToExtract,
}

impl UnrarError {
    /// Maps a nonzero exit code. Code 1 is a warning and maps to nothing,
    /// as does any code outside the documented table.
    pub fn from_exit_code(code: i32) -> Option<Self> {
        match code {
            2 => Some(UnrarError::FatalArchiveError),
            3 => Some(UnrarError::InvalidArchive),
            4 => Some(UnrarError::LockedArchive),
            5 => Some(UnrarError::WriteError),
            6 => Some(UnrarError::OpenError),
            7 => Some(UnrarError::BadArguments),
            8 => Some(UnrarError::OutOfMemory),
            9 => Some(UnrarError::CreateError),
            10 => Some(UnrarError::NothingToExtract),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),
    #[error("archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),
    #[error("scratch directory already exists: {}", .0.display())]
    ScratchCollision(PathBuf),
    #[error("unrar: {0}")]
    Unrar(#[from] UnrarError),
    #[error("archive tool failed with code {0}")]
    ArchiveToolFailure(i32),
    #[error("archive tool not found: {}", .0.display())]
    ToolMissing(PathBuf),
    #[error("read zip: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("extract 7z: {0}")]
    SevenZip(String),
    #[error("no .modinfo file found in archive")]
    NoMetadataFound,
    #[error("{context} ({}): {source}", .path.display())]
    Filesystem {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    pub(crate) fn fs(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ArchiveError::Filesystem {
            context,
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("mod id not found")]
    MissingId,
    #[error("no Properties element found")]
    MissingProperties,
    #[error("no Name element found")]
    MissingName,
    #[error("mod declares no affected files")]
    NoEffect,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("mod {0} is already installed")]
    AlreadyExists(String),
    #[error("mod {mod_id} would overwrite the install folder of mod {existing}")]
    IdCollision { mod_id: String, existing: String },
    #[error("{context} ({}): {source}", .path.display())]
    Filesystem {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    pub(crate) fn fs(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        InstallError::Filesystem {
            context,
            path: path.into(),
            source,
        }
    }

    /// True when the install was refused by policy rather than failing.
    pub fn is_skip(&self) -> bool {
        matches!(self, InstallError::AlreadyExists(_))
    }
}
