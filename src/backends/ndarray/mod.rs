mod backend;
mod convnets;

pub use self::backend::NdArrayKernels;
