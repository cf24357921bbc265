//! Balance computation: adjust injections until every area reaches its
//! target net position.
//!
//! Two coordinators share the [`BalanceComputation`] contract:
//!
//! - [`BalanceComputationImpl`] iterates scale, solve, measure and decide on a
//!   private copy of the variant, and only writes the copy back on success.
//! - [`NoLoadFlowBalanceComputation`] measures once and applies one scaling
//!   per area directly, without a load flow.

mod computation;
mod hooks;
mod no_load_flow;
mod parameters;
mod result;
mod working_copy;

pub use computation::BalanceComputationImpl;
pub use hooks::{
    ByMismatchMode, LoadFlowAcceptance, MainComponentConverged, MismatchAggregator,
    RunningContext,
};
pub use no_load_flow::NoLoadFlowBalanceComputation;
pub use parameters::{
    BalanceComputationParameters, Extensions, MismatchMode, DEFAULT_MAX_NUMBER_ITERATIONS,
    DEFAULT_THRESHOLD_NET_POSITION, PARAMETERS_VERSION,
};
pub use result::{BalanceComputationResult, BalanceComputationStatus};
pub use working_copy::WorkingCopy;

use crate::area::NetworkAreaFactory;
use crate::scalable::Scalable;
use futures::future::BoxFuture;
use gbal_core::{GbalError, GbalResult, Network};
use std::collections::HashSet;
use std::sync::Arc;

pub trait BalanceComputation: Send + Sync {
    /// Balance the areas on `working_state_id`.
    ///
    /// Physical or numerical trouble yields a `Failed` result; only malformed
    /// input is an error.
    fn run<'a>(
        &'a self,
        network: &'a mut Network,
        working_state_id: &'a str,
        parameters: &'a BalanceComputationParameters,
    ) -> BoxFuture<'a, GbalResult<BalanceComputationResult>>;
}

/// One area to balance: how to find it, how to move it, where it should be.
#[derive(Debug, Clone)]
pub struct BalanceComputationArea {
    name: String,
    network_area_factory: Arc<dyn NetworkAreaFactory>,
    scalable: Arc<dyn Scalable>,
    target_net_position: f64,
}

impl BalanceComputationArea {
    pub fn new(
        name: impl Into<String>,
        network_area_factory: Arc<dyn NetworkAreaFactory>,
        scalable: Arc<dyn Scalable>,
        target_net_position: f64,
    ) -> Self {
        Self {
            name: name.into(),
            network_area_factory,
            scalable,
            target_net_position,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn network_area_factory(&self) -> &Arc<dyn NetworkAreaFactory> {
        &self.network_area_factory
    }

    pub fn scalable(&self) -> &Arc<dyn Scalable> {
        &self.scalable
    }

    pub fn target_net_position(&self) -> f64 {
        self.target_net_position
    }
}

fn validate_areas(areas: &[BalanceComputationArea]) -> GbalResult<()> {
    let mut names = HashSet::new();
    for area in areas {
        if area.name.trim().is_empty() {
            return Err(GbalError::Config("area name must not be empty".into()));
        }
        if !area.target_net_position.is_finite() {
            return Err(GbalError::Config(format!(
                "target net position of area '{}' is not a number",
                area.name
            )));
        }
        if !names.insert(area.name.as_str()) {
            return Err(GbalError::Config(format!(
                "area '{}' is defined more than once",
                area.name
            )));
        }
    }
    Ok(())
}
