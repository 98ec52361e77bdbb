//! Pre-trained classifiers: artifact loading, inference and positive-class extraction.

mod artifact;
mod extract;
mod forest;
mod handle;
mod registry;
mod svm;

pub use artifact::{ClassifierArtifact, ModelKind, ModelParams};
pub use extract::{extract, ModalityProbability};
pub use forest::{ForestParams, RandomForest, TreeParams};
pub use handle::{ClassifierHandle, LoadedModel};
pub use registry::{ModalityModels, ModelRegistry, ModelStatus};
pub use svm::{Kernel, SupportVectorMachine, SvmParams};

use crate::error::Result;

/// Binary classifier returning one probability per physical output index.
/// Which index is "positive" is not the classifier's concern; see [`extract`].
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;
    fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2]>;
}
