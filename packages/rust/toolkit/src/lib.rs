//! Typed access to the external GRASS toolkit.
//!
//! The [`Toolkit`] trait is the capability boundary the pipeline runs
//! against: one method per external operation, each taking a typed
//! argument struct that is validated before anything is dispatched.
//! [`GrassToolkit`] is the production implementation backed by
//! `grass <project> --exec`; tests substitute their own impls.

pub mod grass;
pub mod ops;

pub use grass::GrassToolkit;
pub use ops::{
    CopyColorsArgs, SimWaterArgs, SlopeAspectArgs, ThresholdMaskArgs, Toolkit, WriteHistoryArgs,
};
