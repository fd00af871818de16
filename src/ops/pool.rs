use std::sync::Arc;

use crate::backends::nnp::{KernelLibrary, PoolGeometry, Size};
use crate::common::errors::check_status;
use crate::common::traits::Name;
use crate::common::types::HResult;
use crate::ops::conv_pool_base::{ConvPoolBase, StorageOrder};
use crate::ops::def::OperatorDef;
use crate::ops::traits::{check_arity, FromDef, Operator};
use crate::ops::NNPACK_ENGINE;
use crate::tensor::Tensor;
use crate::threadpool::shared_pool;

/// `MaxPool` on the NNPACK engine: 2x2 windows, stride 2, no padding, NCHW.
pub struct NnpMaxPoolOp {
    name: String,
    base: ConvPoolBase,
    library: Arc<dyn KernelLibrary>,
}

impl NnpMaxPoolOp {
    pub fn new(def: &OperatorDef, library: Arc<dyn KernelLibrary>) -> HResult<NnpMaxPoolOp> {
        let base = ConvPoolBase::from_def(def)?;
        needs_feature!(
            base.order == StorageOrder::Nchw,
            "NNPack only supports NCHW order. Please consider add \
             TransposeOp with axes=[0, 3, 1, 2] before NNPack Conv."
        );
        needs_feature!(
            base.kernel_h == 2,
            "NNPack only supports MaxPool kernel size 2*2!"
        );
        needs_feature!(
            base.kernel_w == 2,
            "NNPack only supports MaxPool kernel size 2*2!"
        );
        needs_feature!(
            base.stride_h == 2,
            "NNPack only supports MaxPool stride size 2*2!"
        );
        needs_feature!(
            base.stride_w == 2,
            "NNPack only supports MaxPool stride size 2*2!"
        );
        needs_feature!(
            base.pad_t == 0 && base.pad_l == 0 && base.pad_r == 0 && base.pad_b == 0,
            "NNPack Pooling differs from Caffe2 Pooling when pad > 0!"
        );
        Ok(NnpMaxPoolOp {
            name: def.name.clone(),
            base,
            library,
        })
    }

    pub fn base(&self) -> &ConvPoolBase {
        &self.base
    }

    pub fn validate(&self, x: &Tensor) -> HResult<()> {
        enforce!(x.ndim() == 4, "Input dim should be 4, got {}", x.ndim());
        enforce!(
            x.dim(2) % 2 == 0,
            "NNPack MaxPool differs from Caffe2 when Input Size is not even! (height {})",
            x.dim(2)
        );
        enforce!(
            x.dim(3) % 2 == 0,
            "NNPack MaxPool differs from Caffe2 when Input Size is not even! (width {})",
            x.dim(3)
        );
        Ok(())
    }

    pub fn run_on_device(&self, x: &Tensor, y: &mut Tensor) -> HResult<()> {
        self.validate(x)?;
        self.base.set_output_size(x, y, x.dim(1))?;

        // Input X is in NCHW order
        let geometry = PoolGeometry {
            batch_size: x.dim(0),
            channels: x.dim(1),
            input_size: Size::new(x.dim(2), x.dim(3)),
            input_padding: self.base.padding(),
            pooling_size: self.base.kernel(),
            pooling_stride: self.base.stride(),
        };
        let pool = shared_pool(self.library.as_ref())?;
        let status = self
            .library
            .max_pooling_output(&geometry, x.data(), y.mutable_data(), &pool);
        check_status("max_pooling_output", status)?;
        Ok(())
    }
}

impl Name for NnpMaxPoolOp {
    fn name(&self) -> &String {
        &self.name
    }
}

impl Operator for NnpMaxPoolOp {
    fn run(&self, inputs: &[&Tensor], outputs: &mut [Tensor]) -> HResult<()> {
        check_arity(Self::TYPE, inputs, outputs, 1, 1)?;
        self.run_on_device(inputs[0], &mut outputs[0])
    }
}

impl FromDef for NnpMaxPoolOp {
    const TYPE: &'static str = "MaxPool";
    const ENGINE: &'static str = NNPACK_ENGINE;

    fn from_def(def: &OperatorDef, library: Arc<dyn KernelLibrary>) -> HResult<NnpMaxPoolOp> {
        NnpMaxPoolOp::new(def, library)
    }
}
