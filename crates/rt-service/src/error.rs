use rt_build::BuildError;
use rt_core::CoreError;
use rt_output::OutputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("facility {0} is not configured")]
    UnknownFacility(String),

    #[error(transparent)]
    Config(#[from] CoreError),

    #[error("rebuild failed: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("could not start ingest pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
