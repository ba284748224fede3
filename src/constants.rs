//! Physical and numeric constants for source modelling and fitting
//!
//! Amplitudes throughout the engine are log10 moment-rate values in dyne·cm;
//! moments inside the model are N·m.

/// Offset in the moment-magnitude relation `log10 M0 = 1.5 Mw + offset` (M0 in N·m).
pub const LOG10_M0_OFFSET: f64 = 9.1;

/// Slope of the moment-magnitude relation.
pub const MW_SLOPE: f64 = 1.5;

/// Megapascal to pascal.
pub const MPA_TO_PA: f64 = 1e6;

/// log10 of the N·m to dyne·cm conversion factor.
pub const LOG10_NM_TO_DYNE_CM: f64 = 7.0;

/// Default phase velocity for path corrections when none is configured (km/s).
pub const DEFAULT_PHASE_VELOCITY_KM_S: f64 = 3.5;

/// Step used for central-difference Jacobians in parameter space.
pub const JACOBIAN_STEP: f64 = 1e-6;

/// Initial Levenberg-Marquardt damping.
pub const INITIAL_DAMPING: f64 = 1e-3;

/// Damping above which no descent direction is considered to remain.
pub const MAX_DAMPING: f64 = 1e12;

/// Lower limit for damping after successful steps.
pub const MIN_DAMPING: f64 = 1e-12;

/// Parameter step below which the optimizer is considered stationary.
pub const MIN_PARAMETER_STEP: f64 = 1e-10;

/// Diagonal regularisation added to the normal equations.
pub const NORMAL_EQUATION_EPSILON: f64 = 1e-12;
