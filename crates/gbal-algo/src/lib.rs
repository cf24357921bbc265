//! # gbal-algo: cross-border balance adjustment
//!
//! This crate adjusts generation and load in several areas of a network until
//! each area's net position (its exchange with the rest of the network)
//! reaches a target.
//!
//! ## Building blocks
//!
//! | Module | Role |
//! |--------|------|
//! | [`load_flow`] | [`LoadFlowRunner`] abstraction and the linear [`DcLoadFlow`] |
//! | [`scalable`] | Generator, load and proportional [`Scalable`]s |
//! | [`area`] | [`NetworkArea`] net position calculators and their factories |
//! | [`balance`] | The [`BalanceComputation`] coordinators |
//!
//! ## Example
//!
//! ```ignore
//! use gbal_algo::{
//!     BalanceComputation, BalanceComputationArea, BalanceComputationImpl,
//!     BalanceComputationParameters, CountryAreaFactory, DcLoadFlow, GeneratorScalable,
//! };
//! use gbal_core::{Country, GenId, INITIAL_VARIANT_ID};
//! use std::sync::Arc;
//!
//! let fr = BalanceComputationArea::new(
//!     "FR",
//!     Arc::new(CountryAreaFactory::new([Country::new("FR")?])?),
//!     Arc::new(GeneratorScalable::new(GenId::new(1))),
//!     1300.0,
//! );
//! let computation = BalanceComputationImpl::new(vec![fr], Arc::new(DcLoadFlow))?;
//! let result = futures::executor::block_on(computation.run(
//!     &mut network,
//!     INITIAL_VARIANT_ID,
//!     &BalanceComputationParameters::default(),
//! ))?;
//! println!("{:?} after {} iterations", result.status(), result.iteration_count());
//! ```

pub mod area;
pub mod balance;
pub mod load_flow;
pub mod scalable;
pub mod test_utils;

pub use area::{
    conform_load_scalable, AreaMembership, BorderArea, ControlArea, ControlAreaDescriptor,
    ControlAreaFactory, CountryAreaFactory, InjectionArea, NetworkArea, NetworkAreaFactory,
    VoltageLevelsAreaFactory,
};
pub use balance::{
    BalanceComputation, BalanceComputationArea, BalanceComputationImpl,
    BalanceComputationParameters, BalanceComputationResult, BalanceComputationStatus,
    ByMismatchMode, LoadFlowAcceptance, MainComponentConverged, MismatchAggregator, MismatchMode,
    NoLoadFlowBalanceComputation, RunningContext,
};
pub use load_flow::{
    BalanceType, ComponentResult, ComponentStatus, DcLoadFlow, LoadFlowParameters, LoadFlowResult,
    LoadFlowRunner,
};
pub use scalable::{
    GeneratorScalable, Injection, LoadScalable, ProportionalScalable, Scalable, ScalingParameters,
};
