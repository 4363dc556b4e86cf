use burn::backend::{Autodiff, NdArray};
use burn::data::dataloader::Progress;
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::optim::AdamConfig;
use burn::train::metric::MetricMetadata;
use cifar_lenet::config::TrainingConfig;
use cifar_lenet::dataset::{Cifar100Batch, Cifar100Batcher, Cifar100Data, IMAGE_BYTES};
use cifar_lenet::logger::ScalarRecord;
use cifar_lenet::model::{LeNet, LeNetConfig};
use cifar_lenet::training;
use std::fs;
use std::path::{Path, PathBuf};
use temp_dir::TempDir;

type TestBackend = NdArray<f32, i32>;
type TestAutodiffBackend = Autodiff<TestBackend>;

fn synthetic_archive(count: usize, label: &str) -> Cifar100Data {
    Cifar100Data {
        batch_label: label.to_string(),
        coarse_labels: (0..count).map(|i| (i % 20) as u8).collect(),
        fine_labels: (0..count).map(|i| (i % 100) as u8).collect(),
        data: (0..count)
            .map(|i| {
                (0..IMAGE_BYTES)
                    .map(|p| ((i * 31 + p * 7) % 256) as u8)
                    .collect()
            })
            .collect(),
        filenames: (0..count).map(|i| format!("synthetic_{i:05}.png")).collect(),
    }
}

fn write_archive(dir: &Path, name: &str, archive: &Cifar100Data) {
    let bytes = rmp_serde::to_vec_named(archive).unwrap();
    fs::write(dir.join(name), bytes).unwrap();
}

fn find_log(log_dir: &Path, suffix: &str) -> PathBuf {
    let mut matches: Vec<PathBuf> = fs::read_dir(log_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.to_string_lossy().ends_with(suffix))
        .collect();
    assert_eq!(matches.len(), 1, "expected one {suffix} log in {log_dir:?}");
    matches.pop().unwrap()
}

#[test]
fn trains_to_completion_on_a_synthetic_dataset() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let log_dir = dir.path().join("logs");
    fs::create_dir_all(&data_dir).unwrap();

    write_archive(
        &data_dir,
        "train",
        &synthetic_archive(100, "training batch 1 of 1"),
    );
    write_archive(
        &data_dir,
        "test",
        &synthetic_archive(20, "testing batch 1 of 1"),
    );

    let training_config = TrainingConfig::new(AdamConfig::new())
        .with_num_epochs(2)
        .with_batch_size(16)
        .with_train_size(80);
    assert_eq!(training_config.epoch_size(), 5);
    assert_eq!(training_config.half_epoch_size(), 2);

    training::run::<TestAutodiffBackend>(
        &training_config,
        &LeNetConfig::new(),
        Default::default(),
        &data_dir,
        &log_dir,
    );

    // 10 training batches; after the first step, every batch trips the
    // two-step validation cadence once
    let val_records: Vec<ScalarRecord> = fs::read_to_string(find_log(&log_dir, "_val.jsonl"))
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(val_records.len(), 9);
    for (i, record) in val_records.iter().enumerate() {
        assert_eq!(record.tag, "accuracy");
        assert_eq!(record.step, 2 * (i + 1));
        assert!((0.0..=100.0).contains(&record.value));
    }

    let train_contents = fs::read_to_string(find_log(&log_dir, "_train.jsonl")).unwrap();
    let mut train_lines = train_contents.lines();

    let snapshot: serde_json::Value =
        serde_json::from_str(train_lines.next().unwrap()).unwrap();
    assert_eq!(snapshot["tag"], "architecture");
    assert!(snapshot["text"].as_str().unwrap().contains("num_classes"));

    let train_records: Vec<ScalarRecord> = train_lines
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    // one loss and one accuracy record per training step
    assert_eq!(train_records.len(), 2 * 10);
    let mut last_step = 0;
    for pair in train_records.chunks(2) {
        assert_eq!(pair[0].tag, "loss");
        assert_eq!(pair[1].tag, "accuracy");
        assert_eq!(pair[0].step, pair[1].step);
        // training steps never land on the validation cadence
        assert_ne!(pair[0].step % 2, 0);
        assert!(pair[0].step > last_step);
        last_step = pair[0].step;
    }
}

#[test]
fn validation_step_leaves_parameters_untouched() {
    let device = Default::default();
    let model: LeNet<TestAutodiffBackend> = LeNetConfig::new().init(&device);

    let archive = synthetic_archive(8, "validation batch");
    let batcher = Cifar100Batcher::new(archive.mean_image());
    let items: Vec<_> = (0..archive.num_data())
        .map(|i| archive.get(i).unwrap())
        .collect();
    let batch: Cifar100Batch<TestBackend> = batcher.batch(items, &device);

    let before = [
        model.conv1.weight.val().to_data(),
        model.conv2.weight.val().to_data(),
        model.fc1.weight.val().to_data(),
        model.output.weight.val().to_data(),
    ];

    let metric_meta = MetricMetadata {
        progress: Progress::new(0, archive.num_data()),
        epoch: 1,
        epoch_total: 1,
        iteration: 0,
        lr: None,
    };
    let accuracy = training::validation_step::<TestAutodiffBackend>(&model, &batch, &metric_meta);
    assert!((0.0..=100.0).contains(&accuracy));

    let after = [
        model.conv1.weight.val().to_data(),
        model.conv2.weight.val().to_data(),
        model.fc1.weight.val().to_data(),
        model.output.weight.val().to_data(),
    ];
    assert_eq!(before, after);
}
