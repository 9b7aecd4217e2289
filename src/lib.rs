pub mod calling;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod host;
mod macros;
pub mod marshal;
pub mod net;
pub mod reply;
pub mod server;
pub mod types;

pub use calling::{Api, InvokeError, Outcome, Proxy};
pub use config::{ClientConfig, ServerConfig};
pub use dispatcher::{DispatchError, Dispatcher};
pub use error::UsageError;
pub use event::SingleFireEvent;
pub use host::Host;
pub use net::{client::TcpTransport, local::LocalTransport, Transport, TransportError};
pub use reply::CallbackStandIn;
pub use server::{Export, Server};
pub use types::{Arg, ArgError, Args, Callback, MarshalError, Param};

pub use futures::future::BoxFuture;
pub use serde_json::{json, Value};

use thiserror::Error;

/// A function the server exposes to remote callers.
///
/// The returned future runs to completion before the exchange is answered,
/// so callbacks fired anywhere inside it can still become the reply.
pub trait RemoteMethod: Send + Sync + 'static {
    fn call(&self, args: Args) -> BoxFuture<'static, MethodResult>;
}

pub type MethodResult = Result<(), MethodError>;

#[derive(Debug, Error)]
pub enum MethodError {
    #[error(transparent)]
    Argument(#[from] ArgError),

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error("{0}")]
    Failed(String),

    #[error("method panicked")]
    Panicked,
}

impl MethodError {
    pub fn msg(msg: impl std::fmt::Display) -> Self {
        Self::Failed(msg.to_string())
    }
}
