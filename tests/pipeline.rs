//! End-to-end run over a tiny generated flower directory.

use std::path::Path;

use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use image::{Rgb, RgbImage};

use flower_classifier::dataset::{DatasetSplit, FlowerDataset, SplitConfig};
use flower_classifier::training::{run_training, TrainingConfig, TrainingHistory};
use flower_classifier::{load_model, FlowerError};

type Backend = Autodiff<NdArray>;

const CLASSES: [(&str, [u8; 3]); 3] = [
    ("daisy", [240, 240, 235]),
    ("roses", [200, 20, 40]),
    ("tulips", [250, 180, 20]),
];

fn write_flowers(root: &Path, per_class: usize) {
    for (name, color) in CLASSES {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..per_class {
            let shade = (i * 7) as u8;
            let pixel = Rgb([color[0].saturating_sub(shade), color[1], color[2]]);
            RgbImage::from_pixel(40, 30, pixel)
                .save(dir.join(format!("{}_{}.jpg", name, i)))
                .unwrap();
        }
    }
}

fn test_config(root: &Path, epochs: usize) -> TrainingConfig {
    TrainingConfig {
        data_dir: root.join("images"),
        model_path: root.join("model/myFlower1"),
        output_dir: root.join("output"),
        epochs,
        batch_size: 4,
        image_height: 24,
        image_width: 24,
        ..TrainingConfig::default()
    }
}

#[test]
fn test_full_pipeline_writes_model_history_and_chart() {
    let dir = tempfile::tempdir().unwrap();
    write_flowers(&dir.path().join("images"), 5);
    let config = test_config(dir.path(), 2);

    let report = run_training::<Backend>(&config).unwrap();

    assert_eq!(report.class_names, vec!["daisy", "roses", "tulips"]);
    assert_eq!(report.train_samples, 12);
    assert_eq!(report.val_samples, 3);

    let history = &report.history;
    assert_eq!(history.len(), 2);
    for sequence in [&history.accuracy, &history.loss, &history.val_accuracy, &history.val_loss] {
        assert_eq!(sequence.len(), 2);
    }
    assert!(history.accuracy.iter().all(|a| (0.0..=1.0).contains(a)));

    assert!(config.model_path.with_extension("json").exists());
    assert!(config.model_path.with_extension("mpk").exists());

    let saved = TrainingHistory::load_json(&report.history_path).unwrap();
    assert_eq!(&saved, history);

    let svg = std::fs::read_to_string(&report.chart_path).unwrap();
    assert!(svg.contains("Training and Validation Accuracy"));
    assert!(svg.contains("Training and Validation Loss"));

    let (model, model_config) =
        load_model::<NdArray>(&config.model_path, &Default::default()).unwrap();
    assert_eq!(model.num_classes(), 3);
    assert_eq!(model_config.image_height, 24);
}

#[test]
fn test_split_shares_class_names() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("images");
    write_flowers(&root, 6);

    let dataset = FlowerDataset::new(&root).unwrap();
    let split = DatasetSplit::from_dataset(&dataset, SplitConfig::default()).unwrap();

    assert_eq!(split.class_names.len(), CLASSES.len());
    assert_eq!(split.training.len() + split.validation.len(), 18);
    assert!(split
        .training
        .iter()
        .chain(&split.validation)
        .all(|s| split.class_names[s.label] == s.class_name));
}

#[test]
fn test_missing_data_dir_fails_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 1);

    let result = run_training::<Backend>(&config);

    assert!(matches!(result, Err(FlowerError::PathNotFound(_))));
    assert!(!config.output_dir.exists());
}

#[test]
fn test_class_count_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_flowers(&dir.path().join("images"), 2);
    let config = TrainingConfig {
        num_classes: Some(5),
        ..test_config(dir.path(), 1)
    };

    assert!(matches!(
        run_training::<Backend>(&config),
        Err(FlowerError::Config(_))
    ));
}
