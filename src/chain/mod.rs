//! Signal chain construction
//!
//! - `profile`: the mastering presets as data tables
//! - `params`: per-run numeric knobs and their validation
//! - `stage`: typed stage descriptors
//! - `builder`: `build_chain(profile, params) -> SignalChain`

pub mod builder;
pub mod params;
pub mod profile;
pub mod stage;

pub use builder::build_chain;
pub use params::{MultibandParams, ReverbParams, StageParams, WetDryMixParams};
pub use profile::MasteringProfile;
pub use stage::StageDescriptor;

use crate::error::{MasterError, Result};
use crate::types::AudioBuffer;
use serde::Serialize;
use tracing::trace;

/// Ordered, immutable list of stages
///
/// Built once per batch (or per override group) and shared read-only
/// between workers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalChain {
    profile: MasteringProfile,
    stages: Vec<StageDescriptor>,
}

impl SignalChain {
    pub(crate) fn new(profile: MasteringProfile, stages: Vec<StageDescriptor>) -> Self {
        Self { profile, stages }
    }

    pub fn profile(&self) -> MasteringProfile {
        self.profile
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply every stage in order
    ///
    /// `before_stage` is called with (stage index, stage count, stage) before
    /// each stage runs; returning an error stops the chain. A stage that
    /// leaves non-finite samples behind fails the run.
    pub fn run<F>(&self, buffer: &mut AudioBuffer, mut before_stage: F) -> Result<()>
    where
        F: FnMut(usize, usize, &StageDescriptor) -> Result<()>,
    {
        let total = self.stages.len();
        for (index, stage) in self.stages.iter().enumerate() {
            before_stage(index, total, stage)?;
            stage.apply(buffer)?;

            if buffer.channels.iter().flatten().any(|s| !s.is_finite()) {
                return Err(MasterError::stage(
                    stage.name(),
                    "produced non-finite samples",
                ));
            }
            trace!("Stage {}/{} ({}) done", index + 1, total, stage.name());
        }
        Ok(())
    }
}
