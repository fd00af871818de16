use crate::common::types::HResult;

pub type ShapeVec = Vec<usize>;

/// Dense row-major `f32` tensor as handed over by the graph executor.
///
/// Operators only borrow tensors for the duration of a run: inputs immutably,
/// outputs mutably so they can be resized and filled in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: ShapeVec,
}

impl Tensor {
    pub fn new() -> Tensor {
        Tensor::default()
    }

    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor::filled(shape, 0.0)
    }

    pub fn filled(shape: &[usize], value: f32) -> Tensor {
        Tensor {
            data: vec![value; shape.iter().product()],
            shape: shape.to_vec(),
        }
    }

    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> HResult<Tensor> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(format_err!(
                "Cannot build a tensor of shape {:?} from {} elements.",
                shape,
                data.len()
            ));
        }
        Ok(Tensor {
            data,
            shape: shape.to_vec(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Size of axis `axis`; panics when the axis does not exist, like indexing would.
    pub fn dim(&self, axis: usize) -> usize {
        self.shape[axis]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn mutable_data(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Gives the tensor a new shape, reallocating only when the element count changes.
    pub fn resize(&mut self, shape: &[usize]) {
        let len: usize = shape.iter().product();
        if len != self.data.len() {
            self.data = vec![0.0; len];
        }
        self.shape = shape.to_vec();
    }
}
