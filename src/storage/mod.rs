//! Encrypted local storage for stage results and final assessments.

mod encrypted;

pub use encrypted::AssessmentStore;
