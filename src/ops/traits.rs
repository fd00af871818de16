use std::sync::Arc;

use crate::backends::nnp::KernelLibrary;
use crate::common::traits::Name;
use crate::common::types::HResult;
use crate::ops::def::OperatorDef;
use crate::tensor::Tensor;

/// A constructed graph node the executor can run.
pub trait Operator: Name + Send + Sync {
    fn run(&self, inputs: &[&Tensor], outputs: &mut [Tensor]) -> HResult<()>;
}

pub trait FromDef
where
    Self: Sized,
{
    const TYPE: &'static str;
    const ENGINE: &'static str;

    fn from_def(def: &OperatorDef, library: Arc<dyn KernelLibrary>) -> HResult<Self>;
}

pub(crate) fn check_arity(
    op: &str,
    inputs: &[&Tensor],
    outputs: &[Tensor],
    num_inputs: usize,
    num_outputs: usize,
) -> HResult<()> {
    enforce!(
        inputs.len() == num_inputs,
        "{} expects {} inputs, got {}",
        op,
        num_inputs,
        inputs.len()
    );
    enforce!(
        outputs.len() == num_outputs,
        "{} expects {} outputs, got {}",
        op,
        num_outputs,
        outputs.len()
    );
    Ok(())
}
