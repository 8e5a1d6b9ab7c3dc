use rt_graph::{GraphError, LockTimeout};
use rt_output::OutputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed report ({reason}): {line}")]
    Malformed { reason: String, line: String },

    #[error("vehicle {vehicle} reported address {address} -> {next_address}, which is not a rail edge")]
    OffTrack {
        vehicle:      String,
        address:      u32,
        next_address: u32,
    },

    #[error(transparent)]
    LockTimeout(#[from] LockTimeout),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl IngestError {
    pub(crate) fn malformed(reason: impl Into<String>, line: &str) -> Self {
        IngestError::Malformed { reason: reason.into(), line: line.to_owned() }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
