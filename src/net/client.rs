use super::{Transport, TransportError};
use crate::config::ClientConfig;
use futures::future::BoxFuture;
use std::net::SocketAddr;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// Opens a fresh TCP connection for every exchange: the request is written,
/// the write half is shut down and the reply is read until the server closes.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    addr: SocketAddr,
    config: ClientConfig,
}

impl TcpTransport {
    pub fn new(addr: SocketAddr) -> Self {
        Self::with_config(addr, ClientConfig::default())
    }

    pub fn with_config(addr: SocketAddr, config: ClientConfig) -> Self {
        Self { addr, config }
    }

    async fn send_recv(&self, payload: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let mut sock = TcpStream::connect(self.addr).await?;
        sock.write_all(&payload).await?;
        sock.shutdown().await?;

        let limit = self.config.max_reply_bytes;
        let mut reply = Vec::new();
        (&mut sock).take(limit as u64 + 1).read_to_end(&mut reply).await?;
        if reply.len() > limit {
            return Err(TransportError::TooLarge { limit });
        }
        if reply.is_empty() {
            return Err(TransportError::EmptyReply);
        }
        Ok(reply)
    }
}

impl Transport for TcpTransport {
    fn exchange(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<Vec<u8>, TransportError>> {
        Box::pin(self.send_recv(payload))
    }
}
