pub(crate) mod convnets;
pub(crate) mod ndarray;
pub mod nnp;

pub use self::ndarray::NdArrayKernels;
pub use self::nnp::{
    ConvGeometry, ConvolutionAlgorithm, KernelLibrary, Padding, PoolGeometry, Size, Status,
    TransformStrategy, Workspace,
};
