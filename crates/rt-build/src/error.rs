use rt_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("mandatory stage {stage} failed in area {area}: {reason}")]
    MandatoryStage {
        stage:  u8,
        area:   String,
        reason: String,
    },

    #[error("station {0} defined twice")]
    DuplicateStation(String),

    #[error("topology source: {0}")]
    Source(String),

    #[error("could not start build pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type BuildResult<T> = Result<T, BuildError>;
