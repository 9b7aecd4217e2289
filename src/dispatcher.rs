use crate::{
    marshal,
    net::{Reply, Request, Response, WireArg},
    reply::ReplyChannel,
    MethodError, RemoteMethod,
};
use futures::FutureExt;
use std::{
    collections::BTreeMap,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Maps exposed method names to their [`RemoteMethod`] and answers inbound
/// messages against them.
///
/// Methods are added while the owning [`Server`](crate::Server) is being built;
/// once serving starts the dispatcher is shared read-only between exchanges.
#[derive(Default)]
pub struct Dispatcher {
    methods: BTreeMap<String, Arc<dyn RemoteMethod>>,
}

impl Dispatcher {
    pub(crate) fn insert(&mut self, name: String, method: Arc<dyn RemoteMethod>) {
        self.methods.insert(name, method);
    }

    /// Exposed names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Answers a single inbound message. Always produces exactly one response.
    pub async fn on_message(&self, request: Request) -> Response {
        match request {
            Request::Connect => {
                debug!(methods = self.methods.len(), "connect");
                Response::Methods(self.names())
            }
            Request::Invoke { name, args } => Response::Reply(match self.call(&name, args).await {
                Ok(reply) => reply,
                Err(error) => {
                    warn!(method = %name, %error, "invocation failed");
                    Reply::error(error.to_string())
                }
            }),
        }
    }

    pub(crate) async fn call(&self, name: &str, args: Vec<WireArg>) -> CallResult {
        let method = self
            .methods
            .get(name)
            .ok_or_else(|| DispatchError::NoSuchMethod(name.to_owned()))?;

        let channel = ReplyChannel::new();
        let unwrapped = marshal::unwrap(args, &channel);
        debug!(
            method = %name,
            args = unwrapped.args.len(),
            callback_provided = unwrapped.callback_provided,
            "invoke"
        );

        if let Err(source) = run_isolated(method.as_ref(), unwrapped.args).await {
            warn!(method = %name, error = %source, "method failed");
            channel.send(Reply::error(
                DispatchError::Failed(name.to_owned()).to_string(),
            ));
        }

        // Nothing fired and nothing failed: the exchange still needs its one reply.
        channel.send(Reply::Success);
        Ok(channel.take().unwrap_or(Reply::Success))
    }
}

/// Runs `method`, turning a panic in either the call or its future into an error.
async fn run_isolated(method: &dyn RemoteMethod, args: crate::Args) -> Result<(), MethodError> {
    let fut = panic::catch_unwind(AssertUnwindSafe(|| method.call(args)))
        .map_err(|_| MethodError::Panicked)?;
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .unwrap_or(Err(MethodError::Panicked))
}

pub(crate) type CallResult = Result<Reply, DispatchError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no method named {0}")]
    NoSuchMethod(String),

    #[error("{0}() failed to perform")]
    Failed(String),
}
