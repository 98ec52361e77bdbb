//! Record store benchmark: append and read back encrypted session records.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use neuroscreen::ensemble::{ClassifierContribution, ModalityResult};
use neuroscreen::features::Modality;
use neuroscreen::session::{RecordPayload, StageRecord};
use neuroscreen::storage::AssessmentStore;
use tempfile::tempdir;

fn stage_payload() -> RecordPayload {
    RecordPayload::Stage(ModalityResult {
        modality: Modality::Behavioral,
        probability: 0.42,
        confidence: 0.8,
        contributing_weights: vec![
            ClassifierContribution {
                classifier_id: "behavioral_rf".into(),
                probability: 0.5,
                weight: 0.4,
            },
            ClassifierContribution {
                classifier_id: "behavioral_svm".into(),
                probability: 0.3,
                weight: 0.6,
            },
        ],
        weighting: None,
    })
}

fn bench_append(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = AssessmentStore::open(&dir.path().join("records.db"), b"bench-secret").unwrap();
    let payload = stage_payload();

    c.bench_function("storage_append_record", |b| {
        b.iter(|| {
            let record = StageRecord::new("bench", payload.clone());
            black_box(store.append(&record)).unwrap()
        })
    });
}

fn bench_session_read(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = AssessmentStore::open(&dir.path().join("records.db"), b"bench-secret").unwrap();
    for _ in 0..3 {
        store.append(&StageRecord::new("s1", stage_payload())).unwrap();
    }

    c.bench_function("storage_records_for_session", |b| {
        b.iter(|| black_box(store.records_for_session("s1")).unwrap())
    });
}

criterion_group!(benches, bench_append, bench_session_read);
criterion_main!(benches);
