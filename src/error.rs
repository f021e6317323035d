use nix::errno::Errno;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TapeError>;

/// Everything that can go wrong while driving a tape transport.
///
/// `Os` is a failed host call and carries the errno. `Scsi` is a transaction
/// the host completed but the device rejected (status != GOOD). `Decode` and
/// `LabelMismatch` are logical contract violations in data we received or
/// are about to write. None of these is retried internally.
#[derive(Error, Debug)]
pub enum TapeError {
    #[error("{context}: {errno}")]
    Os { context: String, errno: Errno },

    #[error("{}", format_scsi(.context, .status_text, .sense_text))]
    Scsi {
        context: String,
        status: u8,
        status_text: String,
        sense_text: Option<String>,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("label field {field} mismatch, contains \"{found}\"")]
    LabelMismatch { field: &'static str, found: String },
}

fn format_scsi(context: &str, status_text: &str, sense_text: &Option<String>) -> String {
    match sense_text {
        Some(sense) => format!("{context}: SCSI status {status_text}: {sense}"),
        None => format!("{context}: SCSI status {status_text}"),
    }
}

impl TapeError {
    pub fn os<C: Into<String>>(context: C, errno: Errno) -> Self {
        Self::Os {
            context: context.into(),
            errno,
        }
    }

    pub fn decode<M: Into<String>>(msg: M) -> Self {
        Self::Decode(msg.into())
    }

    pub fn label(field: &'static str, found: &[u8]) -> Self {
        Self::LabelMismatch {
            field,
            found: String::from_utf8_lossy(found).into_owned(),
        }
    }

    /// The errno of an `Os` error, if that is what this is.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Os { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}
