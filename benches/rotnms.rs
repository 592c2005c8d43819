use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rotnms::{
    rotated_iou, BatchInputs, BatchOutputsMut, ExecutionContext, NmsConfig, RotatedBox,
    RotatedNmsEngine, FLOATS_PER_BOX,
};
use std::hint::black_box;

fn random_batch(rng: &mut StdRng, batch_size: usize, count: usize) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let entries = batch_size * count;
    let mut scores = Vec::with_capacity(entries);
    let mut boxes = Vec::with_capacity(entries * FLOATS_PER_BOX);
    let mut classes = Vec::with_capacity(entries);
    for _ in 0..entries {
        scores.push(rng.random_range(0.0..1.0));
        boxes.extend_from_slice(&[
            rng.random_range(-50.0..50.0),
            rng.random_range(-50.0..50.0),
            rng.random_range(1.0..10.0),
            rng.random_range(1.0..10.0),
            rng.random_range(-3.2..3.2),
            0.0,
        ]);
        classes.push(rng.random_range(0.0..80.0));
    }
    (scores, boxes, classes)
}

fn bench_rotated_iou(c: &mut Criterion) {
    let a = RotatedBox::new(0.0, 0.0, 4.0, 2.0, 0.4);
    let b = RotatedBox::new(1.0, 0.5, 3.0, 3.0, -0.7);
    c.bench_function("rotated_iou_pair", |bencher| {
        bencher.iter(|| black_box(rotated_iou(black_box(&a), black_box(&b))));
    });
}

fn bench_batch_nms(c: &mut Criterion) {
    let batch_size = 8;
    let count = 512;
    let det = 100;
    let mut rng = StdRng::seed_from_u64(5);
    let (scores, boxes, classes) = random_batch(&mut rng, batch_size, count);

    let engine = RotatedNmsEngine::new(NmsConfig::new(0.5, det, count).unwrap()).unwrap();
    let mut workspace = vec![0u8; engine.required_workspace(batch_size).unwrap()];
    let mut out_boxes = vec![0.0f32; batch_size * det * FLOATS_PER_BOX];
    let mut out_scores = vec![0.0f32; batch_size * det];
    let mut out_classes = vec![0.0f32; batch_size * det];

    c.bench_function("nms_batch_serial", |bencher| {
        bencher.iter(|| {
            let inputs = BatchInputs::new(&scores, &boxes, &classes, batch_size, count).unwrap();
            let mut outputs = BatchOutputsMut::new(
                &mut out_boxes,
                &mut out_scores,
                &mut out_classes,
                batch_size,
                det,
            )
            .unwrap();
            engine
                .enqueue(
                    batch_size,
                    &inputs,
                    &mut outputs,
                    &mut workspace,
                    &ExecutionContext::serial(),
                )
                .unwrap();
        });
    });

    if cfg!(feature = "rayon") {
        c.bench_function("nms_batch_parallel", |bencher| {
            bencher.iter(|| {
                let inputs =
                    BatchInputs::new(&scores, &boxes, &classes, batch_size, count).unwrap();
                let mut outputs = BatchOutputsMut::new(
                    &mut out_boxes,
                    &mut out_scores,
                    &mut out_classes,
                    batch_size,
                    det,
                )
                .unwrap();
                engine
                    .enqueue(
                        batch_size,
                        &inputs,
                        &mut outputs,
                        &mut workspace,
                        &ExecutionContext::parallel(),
                    )
                    .unwrap();
            });
        });
    }
}

criterion_group!(benches, bench_rotated_iou, bench_batch_nms);
criterion_main!(benches);
