extern crate env_logger;
extern crate nnp_ops;

use nnp_ops::{Name, OpError, Operator, OperatorDef, OperatorRegistry, Tensor};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn conv_from_json_def() {
    init_logging();
    let registry = OperatorRegistry::default();
    let conv = registry
        .create_from_json(
            r#"{"type": "Conv", "engine": "NNPACK", "name": "conv1",
                "args": {"kernel": 2, "algo": "FT8", "kts": "BLOCK"}}"#,
        )
        .unwrap();
    assert_eq!(conv.name(), "conv1");

    let x = Tensor::filled(&[1, 1, 4, 4], 1.0);
    let filter = Tensor::filled(&[1, 1, 2, 2], 1.0);
    let bias = Tensor::zeros(&[1]);
    let mut outputs = vec![Tensor::new()];
    conv.run(&[&x, &filter, &bias], &mut outputs).unwrap();
    assert_eq!(outputs[0].shape(), &[1, 1, 3, 3]);
    assert_eq!(outputs[0].data(), &[4.0; 9]);
}

#[test]
fn conv_reuses_output_buffer() {
    init_logging();
    let registry = OperatorRegistry::default();
    let def = OperatorDef::new("Conv", "NNPACK")
        .with_arg("kernel", 3)
        .with_arg("pad", 1);
    let conv = registry.create(&def).unwrap();

    let filter = Tensor::filled(&[2, 1, 3, 3], 1.0);
    let bias = Tensor::from_shape_vec(&[2], vec![0.0, -1.0]).unwrap();
    let mut outputs = vec![Tensor::new()];
    for batch in 1..=3 {
        let x = Tensor::filled(&[batch, 1, 5, 5], 1.0);
        conv.run(&[&x, &filter, &bias], &mut outputs).unwrap();
        assert_eq!(outputs[0].shape(), &[batch, 2, 5, 5]);
        // centre pixel sees the full 3x3 window, corners only 2x2
        assert_eq!(outputs[0].data()[12], 9.0);
        assert_eq!(outputs[0].data()[0], 4.0);
        assert_eq!(outputs[0].data()[25 + 12], 8.0);
    }
}

#[test]
fn conv_then_max_pool() {
    init_logging();
    let registry = OperatorRegistry::default();
    let conv = registry
        .create(&OperatorDef::new("Conv", "NNPACK").with_arg("kernel", 1))
        .unwrap();
    let pool = registry
        .create(
            &OperatorDef::new("MaxPool", "NNPACK")
                .with_arg("kernel", 2)
                .with_arg("stride", 2),
        )
        .unwrap();

    let x = Tensor::from_shape_vec(&[1, 1, 4, 4], (1..=16).map(|v| v as f32).collect()).unwrap();
    let filter = Tensor::filled(&[1, 1, 1, 1], 2.0);
    let bias = Tensor::filled(&[1], 1.0);
    let mut hidden = vec![Tensor::new()];
    conv.run(&[&x, &filter, &bias], &mut hidden).unwrap();

    let mut outputs = vec![Tensor::new()];
    pool.run(&[&hidden[0]], &mut outputs).unwrap();
    assert_eq!(outputs[0].shape(), &[1, 1, 2, 2]);
    assert_eq!(outputs[0].data(), &[13.0, 17.0, 29.0, 33.0]);
}

#[test]
fn batched_strided_conv_is_rejected() {
    init_logging();
    let registry = OperatorRegistry::default();
    let conv = registry
        .create(
            &OperatorDef::new("Conv", "NNPACK")
                .with_arg("kernel", 2)
                .with_arg("stride", 2),
        )
        .unwrap();
    let x = Tensor::zeros(&[2, 1, 4, 4]);
    let filter = Tensor::zeros(&[1, 1, 2, 2]);
    let bias = Tensor::zeros(&[1]);
    let mut outputs = vec![Tensor::new()];
    let err = conv.run(&[&x, &filter, &bias], &mut outputs).unwrap_err();
    match err.downcast_ref::<OpError>() {
        Some(OpError::Enforce(msg)) => assert!(msg.contains("stride_h")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn invalid_argument_type() {
    let registry = OperatorRegistry::default();
    let def = OperatorDef::new("Conv", "NNPACK").with_arg("kernel", "three");
    let err = registry.create(&def).err().unwrap();
    match err.downcast_ref::<OpError>() {
        Some(OpError::InvalidArgument { name, .. }) => assert_eq!(name, "kernel"),
        other => panic!("unexpected error: {:?}", other),
    }
}
