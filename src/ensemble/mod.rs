//! Per-modality ensembling: swarm-fitted weights and the weighted blend.

mod combiner;
mod objective;
mod optimizer;
mod weights;

pub use combiner::{combine, ClassifierContribution, ModalityResult, WeightReport, WeightSource};
pub use objective::{AgreementObjective, CalibrationLoss, CalibrationObjective, FnObjective, Objective};
pub use optimizer::{Optimization, SwarmOptimizer};
pub use weights::WeightVector;
