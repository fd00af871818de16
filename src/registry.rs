use std::collections::HashMap;
use std::sync::Arc;

use crate::backends::nnp::KernelLibrary;
use crate::backends::NdArrayKernels;
use crate::common::types::HResult;
use crate::ops::{FromDef, NnpConvOp, NnpMaxPoolOp, Operator, OperatorDef};

pub type OperatorCreator = fn(&OperatorDef, Arc<dyn KernelLibrary>) -> HResult<Box<dyn Operator>>;

fn create<O: FromDef + Operator + 'static>(
    def: &OperatorDef,
    library: Arc<dyn KernelLibrary>,
) -> HResult<Box<dyn Operator>> {
    Ok(Box::new(O::from_def(def, library)?))
}

/// Maps `(type, engine)` pairs to operator constructors.
///
/// Every operator built by one registry shares its kernel library.
pub struct OperatorRegistry {
    creators: HashMap<(String, String), OperatorCreator>,
    library: Arc<dyn KernelLibrary>,
}

impl OperatorRegistry {
    /// Registry holding the NNPACK `Conv` and `MaxPool` operators.
    pub fn new(library: Arc<dyn KernelLibrary>) -> OperatorRegistry {
        let mut registry = OperatorRegistry {
            creators: HashMap::new(),
            library,
        };
        registry.register_op::<NnpConvOp>();
        registry.register_op::<NnpMaxPoolOp>();
        registry
    }

    pub fn register(&mut self, op_type: &str, engine: &str, creator: OperatorCreator) {
        self.creators
            .insert((op_type.to_string(), engine.to_string()), creator);
    }

    pub fn register_op<O: FromDef + Operator + 'static>(&mut self) {
        self.register(O::TYPE, O::ENGINE, create::<O>);
    }

    pub fn is_registered(&self, op_type: &str, engine: &str) -> bool {
        self.creators
            .contains_key(&(op_type.to_string(), engine.to_string()))
    }

    pub fn create(&self, def: &OperatorDef) -> HResult<Box<dyn Operator>> {
        let key = (def.op_type.clone(), def.engine.clone());
        match self.creators.get(&key) {
            Some(creator) => creator(def, Arc::clone(&self.library)),
            None => Err(format_err!(
                "No operator registered for type `{}` with engine `{}`",
                def.op_type,
                def.engine
            )),
        }
    }

    pub fn create_from_json(&self, json: &str) -> HResult<Box<dyn Operator>> {
        self.create(&OperatorDef::from_json(json)?)
    }
}

impl Default for OperatorRegistry {
    fn default() -> OperatorRegistry {
        OperatorRegistry::new(Arc::new(NdArrayKernels::new()))
    }
}
