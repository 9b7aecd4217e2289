use crate::{
    config::ServerConfig,
    dispatcher::Dispatcher,
    error::UsageError,
    types::{kind_of, Args},
    BoxFuture, MethodResult, RemoteMethod,
};
use futures::future::ready;
use serde_json::Value;
use std::{fmt, future::Future, sync::Arc};
use tracing::debug;

/// Collects the methods to expose and then serves them.
///
/// Exposure happens before serving: [`serve`](Server::serve) and
/// [`LocalTransport::new`](crate::LocalTransport::new) take the server by value
/// and freeze its methods.
#[derive(Default)]
pub struct Server {
    dispatcher: Dispatcher,
    config: ServerConfig,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            dispatcher: Dispatcher::default(),
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Merges `entries` into the exposed methods, replacing same-named ones.
    ///
    /// Fails without exposing anything if any entry is not a method.
    pub fn expose<I, K>(&mut self, entries: I) -> Result<&mut Self, UsageError>
    where
        I: IntoIterator<Item = (K, Export)>,
        K: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, export)| {
                let name = name.into();
                match export {
                    Export::Method(method) => Ok((name, method)),
                    Export::Value(value) => Err(UsageError::NotAMethod {
                        name,
                        kind: kind_of(&value),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (name, method) in entries {
            debug!(method = %name, "exposing");
            self.dispatcher.insert(name, method);
        }
        Ok(self)
    }

    pub fn exposed(&self) -> Vec<String> {
        self.dispatcher.names()
    }

    pub(crate) fn into_dispatcher(self) -> Dispatcher {
        self.dispatcher
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Server")
            .field("exposed", &self.exposed())
            .field("config", &self.config)
            .finish()
    }
}

/// An entry offered to [`Server::expose`].
///
/// Only methods can be exposed; plain values are accepted here so that
/// registries assembled from data are rejected with a [`UsageError`] naming
/// the offending entry.
#[derive(Clone)]
pub enum Export {
    Method(Arc<dyn RemoteMethod>),
    Value(Value),
}

impl Export {
    /// Exposes a synchronous function. Callbacks it fires before returning
    /// become the reply.
    pub fn method<F>(f: F) -> Self
    where
        F: Fn(Args) -> MethodResult + Send + Sync + 'static,
    {
        Self::Method(Arc::new(SyncMethod(f)))
    }

    /// Exposes an asynchronous function. Callbacks it fires before its future
    /// completes become the reply.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MethodResult> + Send + 'static,
    {
        Self::Method(Arc::new(AsyncMethod(f)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Method(_) => "method",
            Self::Value(value) => kind_of(value),
        }
    }
}

impl<M: RemoteMethod> From<Arc<M>> for Export {
    fn from(method: Arc<M>) -> Self {
        Self::Method(method)
    }
}

impl From<Value> for Export {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Method(_) => f.write_str("Method(..)"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

struct SyncMethod<F>(F);

impl<F> RemoteMethod for SyncMethod<F>
where
    F: Fn(Args) -> MethodResult + Send + Sync + 'static,
{
    fn call(&self, args: Args) -> BoxFuture<'static, MethodResult> {
        Box::pin(ready((self.0)(args)))
    }
}

struct AsyncMethod<F>(F);

impl<F, Fut> RemoteMethod for AsyncMethod<F>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MethodResult> + Send + 'static,
{
    fn call(&self, args: Args) -> BoxFuture<'static, MethodResult> {
        Box::pin((self.0)(args))
    }
}
