//! Where build input comes from.

use crate::BuildResult;
use crate::raw::BuildInput;

/// Supplies raw topology for a facility.
///
/// Map-file retrieval and layout parsing live behind this trait; the builder
/// only ever sees the finished [`BuildInput`].
pub trait TopologySource: Send + Sync {
    fn load(&self, facility: &str) -> BuildResult<BuildInput>;
}

/// A source that always returns the same input.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    input: BuildInput,
}

impl StaticSource {
    pub fn new(input: BuildInput) -> Self {
        Self { input }
    }
}

impl TopologySource for StaticSource {
    fn load(&self, facility: &str) -> BuildResult<BuildInput> {
        let mut input = self.input.clone();
        if input.facility.is_empty() {
            input.facility = facility.to_owned();
        }
        Ok(input)
    }
}
