use super::{server::handle_payload, Transport, TransportError};
use crate::{dispatcher::Dispatcher, server::Server};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Delivers requests straight to an in-process [`Dispatcher`], going through
/// the same encoding as the TCP transport.
#[derive(Clone)]
pub struct LocalTransport {
    dispatcher: Arc<Dispatcher>,
}

impl LocalTransport {
    pub fn new(server: Server) -> Self {
        Self {
            dispatcher: Arc::new(server.into_dispatcher()),
        }
    }

    async fn send_recv(&self, payload: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        handle_payload(&self.dispatcher, &payload)
            .await
            .ok_or(TransportError::EmptyReply)
    }
}

impl From<Server> for LocalTransport {
    fn from(server: Server) -> Self {
        Self::new(server)
    }
}

impl Transport for LocalTransport {
    fn exchange(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<Vec<u8>, TransportError>> {
        Box::pin(self.send_recv(payload))
    }
}
