use crate::reply::CallbackStandIn;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{fmt, sync::Arc};
use thiserror::Error;

/// A local function handed to a remote method. It receives the values the
/// remote side fires it with, in order.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(Vec<Value>) + Send + Sync + 'static>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn invoke(&self, values: Vec<Value>) {
        (self.0)(values)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// One argument of an outbound call: either plain data or a local callback.
#[derive(Debug, Clone)]
pub enum Arg {
    Value(Value),
    Callback(Callback),
}

impl Arg {
    pub fn value<T: Serialize + ?Sized>(value: &T) -> Result<Self, MarshalError> {
        Ok(Self::Value(serde_json::to_value(value)?))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        Self::Callback(Callback::new(f))
    }

    pub fn is_callback(&self) -> bool {
        matches!(self, Self::Callback(_))
    }
}

impl From<Callback> for Arg {
    fn from(cb: Callback) -> Self {
        Self::Callback(cb)
    }
}

macro_rules! impl_from_value {
    ($($rust_type:ty),* $(,)?) => {
        $(
            impl From<$rust_type> for Arg {
                fn from(v: $rust_type) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_from_value!(Value, String, &str, bool, i32, i64, u32, u64, f64);

impl From<()> for Arg {
    fn from(_: ()) -> Self {
        Self::Value(Value::Null)
    }
}

/// A value could not be turned into its wire form.
#[derive(Debug, Error)]
#[error("value is not serializable: {0}")]
pub struct MarshalError(#[from] serde_json::Error);

/// One unwrapped argument as seen by an exposed method.
#[derive(Debug, Clone)]
pub enum Param {
    Value(Value),
    Callback(CallbackStandIn),
}

/// The arguments an exposed method is invoked with, in call order.
#[derive(Debug, Clone, Default)]
pub struct Args {
    params: Vec<Param>,
}

impl Args {
    pub(crate) fn new(params: Vec<Param>) -> Self {
        Self { params }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Param> {
        self.params.get(index)
    }

    pub fn raw(&self, index: usize) -> Result<&Value, ArgError> {
        match self.params.get(index) {
            Some(Param::Value(v)) => Ok(v),
            Some(Param::Callback(_)) => Err(ArgError::NotAValue { index }),
            None => Err(ArgError::Missing { index }),
        }
    }

    /// Decodes the value argument at `index` into `T`.
    pub fn value<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgError> {
        let raw = self.raw(index)?;
        T::deserialize(raw).map_err(|source| ArgError::Mismatch { index, source })
    }

    pub fn callback(&self, index: usize) -> Result<CallbackStandIn, ArgError> {
        match self.params.get(index) {
            Some(Param::Callback(cb)) => Ok(cb.clone()),
            Some(Param::Value(_)) => Err(ArgError::NotACallback { index }),
            None => Err(ArgError::Missing { index }),
        }
    }
}

impl IntoIterator for Args {
    type Item = Param;
    type IntoIter = std::vec::IntoIter<Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

#[derive(Debug, Error)]
pub enum ArgError {
    #[error("argument {index} is missing")]
    Missing { index: usize },

    #[error("argument {index} is a callback, expected a value")]
    NotAValue { index: usize },

    #[error("argument {index} is a value, expected a callback")]
    NotACallback { index: usize },

    #[error("argument {index} has the wrong shape: {source}")]
    Mismatch {
        index: usize,
        source: serde_json::Error,
    },
}

/// The JSON type name of `value`, as reported in usage errors.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::ReplyChannel;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn typed_access() {
        let channel = ReplyChannel::new();
        let args = Args::new(vec![
            Param::Value(json!({"x": 1, "y": -2})),
            Param::Callback(channel.stand_in(1)),
            Param::Value(json!("text")),
        ]);

        assert_eq!(args.value::<Point>(0).unwrap(), Point { x: 1, y: -2 });
        assert_eq!(args.callback(1).unwrap().index(), 1);
        assert_eq!(args.value::<String>(2).unwrap(), "text");

        assert!(matches!(args.value::<i64>(2), Err(ArgError::Mismatch { index: 2, .. })));
        assert!(matches!(args.raw(1), Err(ArgError::NotAValue { index: 1 })));
        assert!(matches!(args.callback(0), Err(ArgError::NotACallback { index: 0 })));
        assert!(matches!(args.raw(3), Err(ArgError::Missing { index: 3 })));

        assert_eq!(args.len(), 3);
        assert!(matches!(args.get(2), Some(Param::Value(_))));
        assert!(args.get(3).is_none());
        let callbacks = args
            .into_iter()
            .filter(|param| matches!(param, Param::Callback(_)))
            .count();
        assert_eq!(callbacks, 1);
        assert!(Args::default().is_empty());
    }

    #[test]
    fn arg_conversions() {
        assert!(matches!(Arg::from("hi"), Arg::Value(Value::String(s)) if s == "hi"));
        assert!(matches!(Arg::from(()), Arg::Value(Value::Null)));
        assert!(Arg::callback(|_| {}).is_callback());
        assert!(matches!(
            Arg::value(&vec![1, 2]).unwrap(),
            Arg::Value(v) if v == json!([1, 2])
        ));
    }

    #[test]
    fn non_string_map_keys_fail_to_marshal() {
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "tuple keys are not JSON");
        assert!(Arg::value(&map).is_err());
    }
}
