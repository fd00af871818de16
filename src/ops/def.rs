use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{from_str as json_from_str, from_value, Map, Value};

use crate::common::errors::OpError;
use crate::common::types::HResult;

/// Serialized description of one graph node, as produced by the host.
///
/// ```json
/// {"type": "Conv", "engine": "NNPACK", "name": "conv1",
///  "args": {"kernel": 3, "pad": 1, "algo": "WINOGRAD"}}
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorDef {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl OperatorDef {
    pub fn new(op_type: &str, engine: &str) -> OperatorDef {
        OperatorDef {
            op_type: op_type.to_string(),
            engine: engine.to_string(),
            ..OperatorDef::default()
        }
    }

    pub fn from_json(json: &str) -> HResult<OperatorDef> {
        Ok(json_from_str(json)?)
    }

    pub fn with_name(mut self, name: &str) -> OperatorDef {
        self.name = name.to_string();
        self
    }

    pub fn with_arg<V: Into<Value>>(mut self, name: &str, value: V) -> OperatorDef {
        self.args.insert(name.to_string(), value.into());
        self
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    /// Typed lookup of a scalar argument, `default` when it is absent.
    pub fn get_single_arg<T: DeserializeOwned>(&self, name: &str, default: T) -> HResult<T> {
        match self.args.get(name) {
            Some(value) => parse_arg(name, value),
            None => Ok(default),
        }
    }

    /// Typed lookup of a list argument, empty when it is absent.
    pub fn get_repeated_arg<T: DeserializeOwned>(&self, name: &str) -> HResult<Vec<T>> {
        match self.args.get(name) {
            Some(value) => parse_arg(name, value),
            None => Ok(Vec::new()),
        }
    }
}

fn parse_arg<T: DeserializeOwned>(name: &str, value: &Value) -> HResult<T> {
    from_value(value.clone()).map_err(|err| OpError::invalid_argument(name, err.to_string()).into())
}
