use rotnms::{
    create_engine, BatchInputs, BatchOutputsMut, ExecutionContext, NmsConfig, RotNmsError,
    RotatedNmsEngine, ENGINE_NAME, ENGINE_VERSION, FLOATS_PER_BOX,
};

fn packed_image(candidates: &[(f32, [f32; 5], f32)]) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let mut scores = Vec::new();
    let mut boxes = Vec::new();
    let mut classes = Vec::new();
    for &(score, geo, class) in candidates {
        scores.push(score);
        boxes.extend_from_slice(&geo);
        boxes.push(0.0);
        classes.push(class);
    }
    (scores, boxes, classes)
}

#[test]
fn serialized_engine_round_trips_through_registry() {
    let config = NmsConfig::new(0.5, 3, 4).unwrap();
    let original = RotatedNmsEngine::new(config).unwrap();
    let blob = original.encode_config();

    let restored = create_engine(ENGINE_NAME, ENGINE_VERSION, &blob).unwrap();
    assert_eq!(*restored.config(), config);
    assert_eq!(
        restored.required_workspace(2).unwrap(),
        original.required_workspace(2).unwrap()
    );
}

#[test]
fn full_pass_from_registry_to_outputs() {
    let config = NmsConfig::new(0.5, 2, 3).unwrap();
    let engine = create_engine(ENGINE_NAME, ENGINE_VERSION, &config.encode()).unwrap();

    // Candidates: two near-duplicates and one distant box.
    let (scores, boxes, classes) = packed_image(&[
        (0.6, [0.0, 0.0, 2.0, 2.0, 0.3], 1.0),
        (0.9, [0.0, 0.0, 2.0, 2.0, 0.3], 2.0),
        (0.7, [40.0, 0.0, 2.0, 2.0, 0.0], 3.0),
    ]);

    let mut out_boxes = vec![0.0f32; 2 * FLOATS_PER_BOX];
    let mut out_scores = vec![0.0f32; 2];
    let mut out_classes = vec![0.0f32; 2];
    let mut workspace = vec![0u8; engine.required_workspace(1).unwrap()];

    let inputs = BatchInputs::new(&scores, &boxes, &classes, 1, 3).unwrap();
    let mut outputs =
        BatchOutputsMut::new(&mut out_boxes, &mut out_scores, &mut out_classes, 1, 2).unwrap();
    engine
        .enqueue(1, &inputs, &mut outputs, &mut workspace, &ExecutionContext::serial())
        .unwrap();

    assert_eq!(out_scores, vec![0.9, 0.7]);
    assert_eq!(out_classes, vec![2.0, 3.0]);
    assert_eq!(out_boxes[0], 0.0);
    assert_eq!(out_boxes[6], 40.0);
}

#[test]
fn workspace_must_be_queried_size_or_larger() {
    let config = NmsConfig::new(0.5, 2, 3).unwrap();
    let engine = RotatedNmsEngine::new(config).unwrap();
    let (scores, boxes, classes) = packed_image(&[
        (0.6, [0.0, 0.0, 2.0, 2.0, 0.0], 0.0),
        (0.9, [9.0, 0.0, 2.0, 2.0, 0.0], 0.0),
        (0.7, [18.0, 0.0, 2.0, 2.0, 0.0], 0.0),
    ]);
    let needed = engine.required_workspace(1).unwrap();
    let mut workspace = vec![0u8; needed - 1];

    let mut out_boxes = vec![0.0f32; 2 * FLOATS_PER_BOX];
    let mut out_scores = vec![0.0f32; 2];
    let mut out_classes = vec![0.0f32; 2];
    let inputs = BatchInputs::new(&scores, &boxes, &classes, 1, 3).unwrap();
    let mut outputs =
        BatchOutputsMut::new(&mut out_boxes, &mut out_scores, &mut out_classes, 1, 2).unwrap();
    let err = engine
        .enqueue(1, &inputs, &mut outputs, &mut workspace, &ExecutionContext::serial())
        .err()
        .unwrap();
    assert_eq!(
        err,
        RotNmsError::WorkspaceTooSmall {
            needed,
            got: needed - 1,
        }
    );

    // An oversized workspace is fine.
    let mut workspace = vec![0u8; needed + 64];
    let mut outputs =
        BatchOutputsMut::new(&mut out_boxes, &mut out_scores, &mut out_classes, 1, 2).unwrap();
    assert!(engine
        .enqueue(1, &inputs, &mut outputs, &mut workspace, &ExecutionContext::serial())
        .is_ok());
}

#[test]
fn enqueue_rejects_mismatched_shapes() {
    let engine = RotatedNmsEngine::new(NmsConfig::new(0.5, 2, 3).unwrap()).unwrap();
    let (scores, boxes, classes) = packed_image(&[
        (0.6, [0.0, 0.0, 2.0, 2.0, 0.0], 0.0),
        (0.9, [9.0, 0.0, 2.0, 2.0, 0.0], 0.0),
    ]);
    let mut workspace = vec![0u8; engine.required_workspace(1).unwrap()];
    let mut out_boxes = vec![0.0f32; 2 * FLOATS_PER_BOX];
    let mut out_scores = vec![0.0f32; 2];
    let mut out_classes = vec![0.0f32; 2];

    // Inputs describe count = 2, the engine was configured for count = 3.
    let inputs = BatchInputs::new(&scores, &boxes, &classes, 1, 2).unwrap();
    let mut outputs =
        BatchOutputsMut::new(&mut out_boxes, &mut out_scores, &mut out_classes, 1, 2).unwrap();
    let err = engine
        .enqueue(1, &inputs, &mut outputs, &mut workspace, &ExecutionContext::serial())
        .err()
        .unwrap();
    assert_eq!(
        err,
        RotNmsError::ShapeMismatch {
            field: "count",
            expected: 3,
            got: 2,
        }
    );
}

#[test]
fn workspace_buffers_are_reusable_across_batches() {
    let engine = RotatedNmsEngine::new(NmsConfig::new(0.5, 1, 2).unwrap()).unwrap();
    let mut workspace = vec![0u8; engine.required_workspace(1).unwrap()];

    for round in 0..3 {
        let shift = 10.0 * round as f32;
        let (scores, boxes, classes) = packed_image(&[
            (0.9, [shift, 0.0, 2.0, 2.0, 0.0], 1.0),
            (0.4, [shift, 0.0, 2.0, 2.0, 0.0], 2.0),
        ]);
        let mut out_boxes = vec![0.0f32; FLOATS_PER_BOX];
        let mut out_scores = vec![0.0f32; 1];
        let mut out_classes = vec![0.0f32; 1];
        let inputs = BatchInputs::new(&scores, &boxes, &classes, 1, 2).unwrap();
        let mut outputs =
            BatchOutputsMut::new(&mut out_boxes, &mut out_scores, &mut out_classes, 1, 1).unwrap();
        engine
            .enqueue(1, &inputs, &mut outputs, &mut workspace, &ExecutionContext::serial())
            .unwrap();
        assert_eq!(out_scores[0], 0.9);
        assert_eq!(out_boxes[0], shift);
    }
}
