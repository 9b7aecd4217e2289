use crate::{
    error::UsageError,
    marshal,
    net::{self, Reply, Request, Response, Transport, TransportError},
    types::{Arg, Callback},
};
use serde_json::{json, Value};
use std::{collections::BTreeMap, fmt, sync::Arc};
use thiserror::Error;
use tokio::task::{self, JoinHandle};
use tracing::{debug, warn};

/// The proxies generated from a server's `connect` reply, one per exposed name.
#[derive(Clone, Default)]
pub struct Api {
    proxies: Arc<BTreeMap<String, Proxy>>,
}

impl Api {
    pub(crate) fn generate(transport: Arc<dyn Transport>, names: Vec<String>) -> Self {
        let proxies = names
            .into_iter()
            .map(|name| {
                let proxy = Proxy {
                    name: name.as_str().into(),
                    transport: transport.clone(),
                };
                (name, proxy)
            })
            .collect();
        Self {
            proxies: Arc::new(proxies),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.proxies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Proxy> {
        self.proxies.get(name)
    }

    /// The proxy for `name`. Asking for a method the server never advertised
    /// is a usage error.
    pub fn proxy(&self, name: &str) -> Result<&Proxy, UsageError> {
        self.get(name)
            .ok_or_else(|| UsageError::UnknownMethod(name.to_owned()))
    }

    /// Starts a call of `name` in the background.
    ///
    /// Fails immediately if `name` was not advertised. The outcome is also
    /// delivered through the callbacks in `args`, so the handle may be dropped.
    pub fn invoke(
        &self,
        name: &str,
        args: Vec<Arg>,
    ) -> Result<JoinHandle<Result<Outcome, InvokeError>>, UsageError> {
        Ok(self.proxy(name)?.spawn(args))
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.proxies.keys()).finish()
    }
}

/// A local stand-in for one remote method.
#[derive(Clone)]
pub struct Proxy {
    name: Arc<str>,
    transport: Arc<dyn Transport>,
}

impl Proxy {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the remote method and routes its reply.
    ///
    /// A `callback` reply invokes the argument at the replied index with the
    /// forwarded values. If the last argument is a callback it doubles as the
    /// failure handler: it receives the `error` reply object, or the reason
    /// string when the exchange itself failed.
    pub async fn call(&self, args: Vec<Arg>) -> Result<Outcome, InvokeError> {
        let on_failure = match args.last() {
            Some(Arg::Callback(cb)) => Some(cb.clone()),
            _ => None,
        };

        let request = Request::Invoke {
            name: self.name.to_string(),
            args: marshal::wrap(&args),
        };
        debug!(method = %self.name, args = args.len(), "invoke");

        let result = match net::send(self.transport.as_ref(), &request).await {
            Ok(Response::Reply(reply)) => dispatch_reply(&args, reply),
            Ok(Response::Methods(_)) => Err(InvokeError::Protocol(
                "received a method list in reply to invoke".into(),
            )),
            Err(error) => Err(InvokeError::Transport(error)),
        };

        if let Err(error) = &result {
            warn!(method = %self.name, %error, "call failed");
            if let Some(on_failure) = on_failure {
                on_failure.invoke(vec![error.to_value()]);
            }
        }
        result
    }

    pub fn spawn(&self, args: Vec<Arg>) -> JoinHandle<Result<Outcome, InvokeError>> {
        let proxy = self.clone();
        task::spawn(async move { proxy.call(args).await })
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Proxy").field("name", &self.name).finish()
    }
}

fn dispatch_reply(args: &[Arg], reply: Reply) -> Result<Outcome, InvokeError> {
    match reply {
        Reply::Callback { idx, args: values } => {
            let cb: &Callback = match args.get(idx) {
                Some(Arg::Callback(cb)) => cb,
                Some(Arg::Value(_)) => {
                    return Err(InvokeError::Protocol(format!(
                        "callback reply names argument {idx}, which is not a callback"
                    )))
                }
                None => {
                    return Err(InvokeError::Protocol(format!(
                        "callback reply names argument {idx} of {}",
                        args.len()
                    )))
                }
            };
            cb.invoke(values);
            Ok(Outcome::Callback { idx })
        }
        Reply::Error { reason } => Err(InvokeError::Remote { reason }),
        Reply::Success => Ok(Outcome::Success),
    }
}

/// How a call that did not fail was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The argument at `idx` was invoked.
    Callback { idx: usize },
    Success,
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("remote method failed: {reason}")]
    Remote { reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl InvokeError {
    /// The value handed to a call's failure callback.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Remote { reason } => json!({ "type": "error", "reason": reason }),
            other => Value::String(other.to_string()),
        }
    }
}
