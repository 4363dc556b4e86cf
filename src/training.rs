use crate::config::TrainingConfig;
use crate::dataset::{Cifar100Batch, Cifar100Batcher, Cifar100Data};
use crate::logger::{MetricsLogger, run_stamp};
use crate::model::{LeNet, LeNetConfig};
use burn::data::dataloader::{DataLoader, DataLoaderBuilder, Progress};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::train::metric::{AccuracyMetric, Adaptor, LossMetric, Metric, MetricMetadata, Numeric};
use std::path::Path;
use std::sync::Arc;

type Dataloader<B> = Arc<dyn DataLoader<B, Cifar100Batch<B>> + 'static>;

/// Drives one full training run and returns the trained model.
///
/// The step counter advances by one for every performed step; whenever it
/// lands on a half-epoch multiple, that step is a validation step (accuracy
/// only, no optimizer update) and the pending training batch runs at the next
/// index. The run ends when the training stream is exhausted.
pub fn run<AutoB: AutodiffBackend>(
    training_config: &TrainingConfig,
    model_config: &LeNetConfig,
    device: AutoB::Device,
    data_dir: &Path,
    log_dir: &Path,
) -> LeNet<AutoB> {
    AutoB::seed(&device, training_config.seed);

    let train_file = Cifar100Data::load(data_dir, "train");
    let validation_file = Cifar100Data::load(data_dir, "train");
    // the held-out file rides along but no evaluation runs against it
    let test_file = Cifar100Data::load(data_dir, "test");

    let train_split = train_file.select(0, Some(training_config.train_size));
    let validation_split = validation_file.select(training_config.train_size, None);
    println!(
        "train: {} images, validation: {} images, test: {} images",
        train_split.num_data(),
        validation_split.num_data(),
        test_file.num_data(),
    );

    let batcher = Cifar100Batcher::new(train_split.mean_image());

    let dataloader_train: Dataloader<AutoB> = DataLoaderBuilder::new(batcher.clone())
        .batch_size(training_config.batch_size)
        .num_workers(training_config.num_workers)
        .build(train_split);
    let dataloader_valid: Dataloader<AutoB::InnerBackend> = DataLoaderBuilder::new(batcher)
        .batch_size(validation_split.num_data())
        .build(validation_split);

    // The whole validation split is one fixed batch, reused at every half epoch.
    let validation_batch = dataloader_valid
        .iter()
        .next()
        .expect("the validation split must not be empty");

    let mut model: LeNet<AutoB> = model_config.init(&device);
    let mut optim: OptimizerAdaptor<Adam, LeNet<AutoB>, AutoB> = training_config.optimizer.init();

    let stamp = run_stamp();
    let mut train_log = MetricsLogger::create(log_dir, &format!("{stamp}_train"));
    let mut validation_log = MetricsLogger::create(log_dir, &format!("{stamp}_val"));
    train_log.log_text(
        "architecture",
        &serde_json::to_string(model_config).expect("Failed to serialize the model config"),
    );

    let mut metric_meta = MetricMetadata {
        progress: Progress::new(0, dataloader_train.num_items()),
        epoch: 1,
        epoch_total: training_config.num_epochs,
        iteration: 0,
        lr: Some(training_config.lr),
    };

    let half_epoch = training_config.half_epoch_size();
    let mut global_step = 0;
    let mut half_epochs = 0;

    println!("Starting training...");
    for epoch in 1..=training_config.num_epochs {
        metric_meta.epoch = epoch;
        let mut loss_metric = LossMetric::<AutoB>::new();
        let mut acc_metric = AccuracyMetric::<AutoB>::new();

        for batch in dataloader_train.iter() {
            global_step += 1;

            if global_step % half_epoch == 0 {
                half_epochs += 1;
                let accuracy = validation_step::<AutoB>(&model, &validation_batch, &metric_meta);
                validation_log.log_scalar("accuracy", accuracy, global_step);
                println!("Ran half epoch {half_epochs} (valid acc {accuracy:0>6.2})");
                global_step += 1;
            }

            let [batch_size, _] = batch.images.dims();
            metric_meta.iteration += 1;
            metric_meta.progress.items_processed += batch_size;

            let output = model.forward_classification(batch);
            loss_metric.update(&output.adapt(), &metric_meta);
            acc_metric.update(&output.adapt(), &metric_meta);
            train_log.log_scalar("loss", loss_metric.value().current(), global_step);
            train_log.log_scalar("accuracy", acc_metric.value().current(), global_step);

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(training_config.lr, model, grads);
        }

        println!(
            "Epoch {}/{}, Avg Loss {:.4}, Avg Acc {:0>6.2}",
            epoch,
            training_config.num_epochs,
            loss_metric.running_value().current(),
            acc_metric.running_value().current(),
        );
    }
    println!("End of Epochs");

    model
}

/// Scores the held-out batch on the inference view of the model; parameters
/// are never touched.
pub fn validation_step<AutoB: AutodiffBackend>(
    model: &LeNet<AutoB>,
    batch: &Cifar100Batch<AutoB::InnerBackend>,
    metric_meta: &MetricMetadata,
) -> f64 {
    let valid_model = model.valid();
    let output = valid_model.forward_classification(batch.clone());

    let mut acc_metric = AccuracyMetric::<AutoB::InnerBackend>::new();
    acc_metric.update(&output.adapt(), metric_meta);
    acc_metric.value().current()
}
