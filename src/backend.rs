use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

pub type Element = f32;

#[cfg(all(
    feature = "ndarray",
    not(any(
        feature = "wgpu",
        feature = "tch-cpu",
        feature = "tch-gpu",
        feature = "cuda"
    ))
))]
pub type MainBackend = burn::backend::NdArray<Element, i32>;
#[cfg(any(feature = "tch-cpu", feature = "tch-gpu"))]
pub type MainBackend = burn::backend::libtorch::LibTorch<Element, i32>;
#[cfg(feature = "wgpu")]
pub type MainBackend = burn::backend::wgpu::Wgpu<Element, i32>;
#[cfg(feature = "cuda")]
pub type MainBackend = burn::backend::Cuda<Element, i32>;

pub trait MainDevice: Backend {
    fn main_device() -> <Self as Backend>::Device {
        Default::default()
    }
}

#[cfg(any(
    all(
        feature = "ndarray",
        not(any(
            feature = "wgpu",
            feature = "tch-cpu",
            feature = "tch-gpu",
            feature = "cuda"
        ))
    ),
    all(feature = "tch-cpu", not(feature = "tch-gpu")),
    feature = "wgpu",
    feature = "cuda"
))]
impl MainDevice for MainBackend {}
#[cfg(all(feature = "tch-gpu", not(target_os = "macos")))]
impl MainDevice for MainBackend {
    fn main_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Cuda(0)
    }
}
#[cfg(all(feature = "tch-gpu", target_os = "macos"))]
impl MainDevice for MainBackend {
    fn main_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Mps
    }
}

pub type MainAutoBackend = burn::backend::Autodiff<MainBackend>;
impl MainDevice for MainAutoBackend {
    fn main_device() -> <Self as Backend>::Device {
        <<Self as AutodiffBackend>::InnerBackend as MainDevice>::main_device()
    }
}

#[cfg(not(any(
    feature = "ndarray",
    feature = "wgpu",
    feature = "tch-cpu",
    feature = "tch-gpu",
    feature = "cuda"
)))]
mod err {
    use super::*;
    std::compile_error!("No backend selected. Please check cifar-lenet/Cargo.toml for more info.");

    // pretend to fallback to ndarray (to avoid too many other unrelated errors)
    pub type MainBackend = burn::backend::NdArray<Element, i32>;
    impl MainDevice for MainBackend {}
}
#[cfg(not(any(
    feature = "ndarray",
    feature = "wgpu",
    feature = "tch-cpu",
    feature = "tch-gpu",
    feature = "cuda"
)))]
pub use err::*;
