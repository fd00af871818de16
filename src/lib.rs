#[macro_use]
extern crate failure;
extern crate failure_derive;
#[macro_use]
extern crate log;
extern crate ndarray;
extern crate num_cpus;
extern crate num_traits;
extern crate rayon;
extern crate serde;
extern crate serde_json;

#[macro_use]
mod common;

pub mod backends;
pub mod ops;
pub mod registry;
pub mod tensor;
pub mod threadpool;

pub use common::errors::OpError;
pub use common::traits::Name;
pub use common::types::{HError, HResult};

// Operators
pub use ops::{FromDef, NnpConvOp, NnpMaxPoolOp, Operator, OperatorDef, NNPACK_ENGINE};
pub use registry::OperatorRegistry;
pub use tensor::Tensor;

// Kernel library
pub use backends::nnp::{
    ConvGeometry, ConvolutionAlgorithm, KernelLibrary, Padding, PoolGeometry, Size, Status,
    TransformStrategy, Workspace,
};
pub use backends::NdArrayKernels;
pub use threadpool::{host_thread_count, shared_pool};
