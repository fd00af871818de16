use std::sync::Arc;

use crate::backends::nnp::{ConvGeometry, ConvolutionAlgorithm, KernelLibrary, Size, TransformStrategy};
use crate::common::errors::check_status;
use crate::common::traits::Name;
use crate::common::types::HResult;
use crate::ops::conv_pool_base::{ConvPoolBase, StorageOrder};
use crate::ops::def::OperatorDef;
use crate::ops::traits::{check_arity, FromDef, Operator};
use crate::ops::NNPACK_ENGINE;
use crate::tensor::Tensor;
use crate::threadpool::shared_pool;

/// `Conv` on the NNPACK engine.
///
/// Inputs are `X` (N, C, H, W), `filter` (M, C, Kh, Kw) and `bias` (M); the
/// output is resized to (N, M, OH, OW). Single images go through the
/// inference entry point, batches through the batched one, which only
/// supports unit strides.
pub struct NnpConvOp {
    name: String,
    base: ConvPoolBase,
    algorithm: ConvolutionAlgorithm,
    strategy: TransformStrategy,
    library: Arc<dyn KernelLibrary>,
}

impl NnpConvOp {
    pub fn new(def: &OperatorDef, library: Arc<dyn KernelLibrary>) -> HResult<NnpConvOp> {
        let base = ConvPoolBase::from_def(def)?;
        let algo: String = def.get_single_arg("algo", String::from("AUTO"))?;
        let kts: String = def.get_single_arg("kts", String::from("TUPLE"))?;
        needs_feature!(
            base.order == StorageOrder::Nchw,
            "NNPack only supports NCHW order. Please consider adding \
             TransposeOp with axes=[0, 3, 1, 2] before NNPack Conv."
        );
        Ok(NnpConvOp {
            name: def.name.clone(),
            base,
            algorithm: ConvolutionAlgorithm::from(algo.as_str()),
            strategy: TransformStrategy::from(kts.as_str()),
            library,
        })
    }

    pub fn algorithm(&self) -> ConvolutionAlgorithm {
        self.algorithm
    }

    pub fn strategy(&self) -> TransformStrategy {
        self.strategy
    }

    pub fn base(&self) -> &ConvPoolBase {
        &self.base
    }

    /// Checks every precondition the kernel library relies on.
    pub fn validate(&self, x: &Tensor, filter: &Tensor, bias: &Tensor) -> HResult<()> {
        enforce!(x.ndim() == 4, "Input dim should be 4, got {}", x.ndim());
        enforce!(filter.ndim() == 4, "Filter dim should be 4, got {}", filter.ndim());
        let (n, c) = (x.dim(0), x.dim(1));
        let m = filter.dim(0);
        enforce!(
            filter.dim(1) == c,
            "Filter has {} input channels, input has {}",
            filter.dim(1),
            c
        );
        enforce!(
            filter.dim(2) == self.base.kernel_h,
            "Filter height {} does not match kernel_h {}",
            filter.dim(2),
            self.base.kernel_h
        );
        enforce!(
            filter.dim(3) == self.base.kernel_w,
            "Filter width {} does not match kernel_w {}",
            filter.dim(3),
            self.base.kernel_w
        );
        enforce!(bias.ndim() == 1, "Bias dim should be 1, got {}", bias.ndim());
        enforce!(
            bias.dim(0) == m,
            "Bias has {} elements, filter has {} output channels",
            bias.dim(0),
            m
        );
        if n > 1 {
            // the batched entry point has no output subsampling
            enforce!(
                self.base.stride_h == 1,
                "NNPack only supports stride_h = 1 for batched input, got {}",
                self.base.stride_h
            );
            enforce!(
                self.base.stride_w == 1,
                "NNPack only supports stride_w = 1 for batched input, got {}",
                self.base.stride_w
            );
        }
        Ok(())
    }

    pub fn run_on_device(
        &self,
        x: &Tensor,
        filter: &Tensor,
        bias: &Tensor,
        y: &mut Tensor,
    ) -> HResult<()> {
        self.validate(x, filter, bias)?;
        self.base.set_output_size(x, y, filter.dim(0))?;

        let batch_size = x.dim(0);
        // filter is MCHW
        let geometry = ConvGeometry {
            input_channels: x.dim(1),
            output_channels: y.dim(1),
            input_size: Size::new(x.dim(2), x.dim(3)),
            input_padding: self.base.padding(),
            kernel_size: Size::new(filter.dim(2), filter.dim(3)),
        };
        let pool = shared_pool(self.library.as_ref())?;

        if batch_size == 1 {
            debug!("Running inference mode");
            let status = self.library.convolution_inference(
                self.algorithm,
                self.strategy,
                &geometry,
                self.base.stride(),
                x.data(),
                filter.data(),
                bias.data(),
                y.mutable_data(),
                &pool,
                None,
            );
            check_status("convolution_inference", status)?;
        } else {
            debug!("Running batched mode");
            let status = self.library.convolution_output(
                self.algorithm,
                batch_size,
                &geometry,
                x.data(),
                filter.data(),
                bias.data(),
                y.mutable_data(),
                &pool,
            );
            check_status("convolution_output", status)?;
        }
        Ok(())
    }
}

impl Name for NnpConvOp {
    fn name(&self) -> &String {
        &self.name
    }
}

impl Operator for NnpConvOp {
    fn run(&self, inputs: &[&Tensor], outputs: &mut [Tensor]) -> HResult<()> {
        check_arity(Self::TYPE, inputs, outputs, 3, 1)?;
        self.run_on_device(inputs[0], inputs[1], inputs[2], &mut outputs[0])
    }
}

impl FromDef for NnpConvOp {
    const TYPE: &'static str = "Conv";
    const ENGINE: &'static str = NNPACK_ENGINE;

    fn from_def(def: &OperatorDef, library: Arc<dyn KernelLibrary>) -> HResult<NnpConvOp> {
        NnpConvOp::new(def, library)
    }
}
