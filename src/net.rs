pub mod client;
pub mod local;
pub mod server;

use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::io;
use thiserror::Error;

/// A request sent by the calling side.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    Connect,
    Invoke { name: String, args: Vec<WireArg> },
}

/// One argument of an `invoke` request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireArg {
    Argument {
        #[serde(default)]
        value: Value,
    },
    Callback {
        idx: usize,
    },
}

/// The answer to an `invoke` request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Reply {
    Callback { idx: usize, args: Vec<Value> },
    Error { reason: String },
    Success,
}

impl Reply {
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }
}

/// Anything the serving side can answer with. A `connect` is answered with the
/// bare list of exposed method names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Response {
    Methods(Vec<String>),
    Reply(Reply),
}

#[derive(Debug, Error)]
#[error("malformed message: {0}")]
pub struct CodecError(#[from] serde_json::Error);

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("remote request failed: {0}")]
    Io(#[from] io::Error),

    #[error("remote request failed: empty reply")]
    EmptyReply,

    #[error("remote request failed: message exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("remote request failed: {0}")]
    Malformed(#[from] CodecError),
}

/// Carries one encoded request to the serving side and brings back its reply.
///
/// Every exchange is independent; implementations must not assume a
/// connection outlives a single call.
pub trait Transport: Send + Sync + 'static {
    fn exchange(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<Vec<u8>, TransportError>>;
}

/// Encodes `request`, runs one exchange and decodes the reply.
pub(crate) async fn send(
    transport: &dyn Transport,
    request: &Request,
) -> Result<Response, TransportError> {
    let payload = encode(request)?;
    let reply = transport.exchange(payload).await?;
    if reply.is_empty() {
        return Err(TransportError::EmptyReply);
    }
    Ok(decode(&reply)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_json<T: Serialize>(message: &T) -> Value {
        serde_json::to_value(message).unwrap()
    }

    #[test]
    fn envelope_shapes() {
        assert_eq!(to_json(&Request::Connect), json!({"type": "connect"}));
        assert_eq!(
            to_json(&Request::Invoke {
                name: "echo".into(),
                args: vec![
                    WireArg::Argument { value: json!("hello") },
                    WireArg::Callback { idx: 1 },
                ],
            }),
            json!({
                "type": "invoke",
                "name": "echo",
                "args": [
                    {"type": "argument", "value": "hello"},
                    {"type": "callback", "idx": 1},
                ],
            })
        );
        assert_eq!(
            to_json(&Reply::Callback { idx: 2, args: vec![json!(1), json!(null)] }),
            json!({"type": "callback", "idx": 2, "args": [1, null]})
        );
        assert_eq!(
            to_json(&Reply::error("nope")),
            json!({"type": "error", "reason": "nope"})
        );
        assert_eq!(to_json(&Reply::Success), json!({"type": "success"}));
        assert_eq!(
            to_json(&Response::Methods(vec!["a".into(), "b".into()])),
            json!(["a", "b"])
        );
    }

    #[test]
    fn responses_decode_by_shape() {
        let methods: Response = decode(br#"["echo","send"]"#).unwrap();
        assert_eq!(methods, Response::Methods(vec!["echo".into(), "send".into()]));

        let empty: Response = decode(b"[]").unwrap();
        assert_eq!(empty, Response::Methods(Vec::new()));

        let success: Response = decode(br#"{"type":"success"}"#).unwrap();
        assert_eq!(success, Response::Reply(Reply::Success));

        assert!(decode::<Response>(br#"{"type":"bogus"}"#).is_err());
    }

    #[test]
    fn argument_without_value_is_null() {
        let arg: WireArg = decode(br#"{"type":"argument"}"#).unwrap();
        assert_eq!(arg, WireArg::Argument { value: Value::Null });
    }
}
