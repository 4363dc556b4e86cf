use crate::backend::Element;
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const IMAGE_SIZE: usize = 32;
pub const IMAGE_DEPTH: usize = 3;
pub const IMAGE_BYTES: usize = IMAGE_SIZE * IMAGE_SIZE * IMAGE_DEPTH;

pub const COARSE_CLASSES: usize = 20;
pub const FINE_CLASSES: usize = 100;

/// One archive of the CIFAR-100 distribution, re-encoded as a MessagePack map.
///
/// Layout per archive:
/// * `batch_label` - name of the batch the rows belong to
/// * `coarse_labels` - one superclass label (0..20) per row
/// * `fine_labels` - one class label (0..100) per row
/// * `data` - one 3072-byte row per image:
///   `<0, 1, ..., 1023>` R-channel,
///   `<1024, 1025, ..., 2047>` G-channel,
///   `<2048, 2049, ..., 3071>` B-channel
/// * `filenames` - one source filename per row
///
/// All row-parallel fields share the same length.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Cifar100Data {
    pub batch_label: String,
    pub coarse_labels: Vec<u8>,
    pub fine_labels: Vec<u8>,
    pub data: Vec<Vec<u8>>,
    pub filenames: Vec<String>,
}

impl Cifar100Data {
    /// Decodes `<data_dir>/<name>`.
    ///
    /// Panics on a missing or malformed archive; nothing can run without one.
    pub fn load(data_dir: &Path, name: &str) -> Self {
        let path = data_dir.join(name);
        let file = File::open(&path)
            .unwrap_or_else(|e| panic!("Failed to open the dataset file {path:?}: {e}"));
        let archive: Self = rmp_serde::decode::from_read(BufReader::new(file))
            .unwrap_or_else(|e| panic!("Failed to decode the dataset file {path:?}: {e}"));
        archive.validate(&path);
        archive
    }

    fn validate(&self, path: &Path) {
        let num_data = self.num_data();
        assert_eq!(
            self.coarse_labels.len(),
            num_data,
            "misaligned coarse_labels in {path:?}"
        );
        assert_eq!(
            self.fine_labels.len(),
            num_data,
            "misaligned fine_labels in {path:?}"
        );
        assert_eq!(
            self.filenames.len(),
            num_data,
            "misaligned filenames in {path:?}"
        );
        for (index, row) in self.data.iter().enumerate() {
            assert_eq!(
                row.len(),
                IMAGE_BYTES,
                "row {index} in {path:?} is not a {IMAGE_DEPTH}x{IMAGE_SIZE}x{IMAGE_SIZE} image"
            );
        }
        for (index, label) in self.coarse_labels.iter().enumerate() {
            assert!(
                (*label as usize) < COARSE_CLASSES,
                "coarse label {label} out of range at row {index} in {path:?}"
            );
        }
        for (index, label) in self.fine_labels.iter().enumerate() {
            assert!(
                (*label as usize) < FINE_CLASSES,
                "fine label {label} out of range at row {index} in {path:?}"
            );
        }
    }

    pub fn num_data(&self) -> usize {
        self.data.len()
    }

    /// Restricts the archive to the half-open row range `[start, finish)`,
    /// keeping every row-parallel field aligned. `None` means "to the end".
    pub fn select(&self, start: usize, finish: Option<usize>) -> Self {
        let finish = finish.unwrap_or_else(|| self.num_data());
        assert!(
            start <= finish && finish <= self.num_data(),
            "invalid selection [{start}, {finish}) of {} rows",
            self.num_data()
        );
        Self {
            batch_label: self.batch_label.clone(),
            coarse_labels: self.coarse_labels[start..finish].to_vec(),
            fine_labels: self.fine_labels[start..finish].to_vec(),
            data: self.data[start..finish].to_vec(),
            filenames: self.filenames[start..finish].to_vec(),
        }
    }

    /// Per-pixel average over every row of this split.
    pub fn mean_image(&self) -> MeanImage {
        assert!(!self.data.is_empty(), "cannot average an empty split");
        let mut sums = vec![0f64; IMAGE_BYTES];
        for row in &self.data {
            for (sum, brightness) in sums.iter_mut().zip(row) {
                *sum += f64::from(*brightness);
            }
        }
        let count = self.data.len() as f64;
        MeanImage {
            pixels: sums.into_iter().map(|sum| (sum / count) as Element).collect(),
        }
    }
}

/// One (image, fine label) pair served to the dataloader.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Cifar100Item {
    /// Image as a flat array of floats, planar RGB.
    /// Each value is a brightness, in between 0.0 and 255.0.
    ///
    /// # Shape
    /// [IMAGE_BYTES]
    pub image: Vec<Element>,

    /// Class label of the image, in between 0 and 99.
    pub fine_label: u8,
}

impl Dataset<Cifar100Item> for Cifar100Data {
    fn get(&self, index: usize) -> Option<Cifar100Item> {
        let row = self.data.get(index)?;
        debug_assert_eq!(row.len(), IMAGE_BYTES);

        let image = row
            .iter()
            .map(|brightness| {
                let element: Element = (*brightness).as_();
                element
            })
            .collect();

        Some(Cifar100Item {
            image,
            fine_label: self.fine_labels[index],
        })
    }

    fn len(&self) -> usize {
        self.num_data()
    }
}

/// Per-pixel mean of the training split, computed once before training and
/// subtracted from every batch afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanImage {
    pixels: Vec<Element>,
}

impl MeanImage {
    /// # Shape
    /// [1, IMAGE_BYTES]
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let data = TensorData::new(self.pixels.clone(), [1, IMAGE_BYTES]).convert::<B::FloatElem>();
        Tensor::from_data(data, device)
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

#[derive(Clone)]
pub struct Cifar100Batcher {
    mean: MeanImage,
}

impl Cifar100Batcher {
    pub fn new(mean: MeanImage) -> Self {
        Self { mean }
    }
}

#[derive(Clone, Debug)]
pub struct Cifar100Batch<B: Backend> {
    /// Mean-subtracted pixel rows.
    ///
    /// # Shape
    /// [batch_size, IMAGE_BYTES]
    pub images: Tensor<B, 2>,
    /// # Shape
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, Cifar100Item, Cifar100Batch<B>> for Cifar100Batcher {
    fn batch(&self, items: Vec<Cifar100Item>, device: &B::Device) -> Cifar100Batch<B> {
        let (items_image, items_label): (Vec<_>, Vec<_>) = items
            .into_iter()
            .map(|item| (item.image, item.fine_label))
            .unzip();
        let images = items_image
            .into_iter()
            .map(|image: Vec<Element>| {
                TensorData::new(image, [1, IMAGE_BYTES]).convert::<B::FloatElem>()
            })
            .map(|data| Tensor::<B, 2>::from_data(data, device))
            .collect();

        let targets = items_label
            .into_iter()
            .map(|label: u8| {
                Tensor::<B, 1, Int>::from_data([(label as i64).elem::<B::IntElem>()], device)
            })
            .collect();

        let images = Tensor::cat(images, 0) - self.mean.to_tensor(device);
        let targets = Tensor::cat(targets, 0);

        Cifar100Batch { images, targets }
    }
}
