mod conv;
mod conv_pool_base;
mod def;
mod pool;
mod traits;
mod translate;

pub const NNPACK_ENGINE: &str = "NNPACK";

pub use self::conv::NnpConvOp;
pub use self::conv_pool_base::{ConvPoolBase, StorageOrder};
pub use self::def::OperatorDef;
pub use self::pool::NnpMaxPoolOp;
pub use self::traits::{FromDef, Operator};
