use crate::{
    dispatcher::Dispatcher,
    net::{decode, encode, Reply, Request, Response},
    server::Server,
};
use std::sync::Arc;
use tokio::{
    io::{self, AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task,
};
use tracing::{debug, info, warn};

impl Server {
    /// Binds `ServerConfig::bind` and serves until the accept loop fails.
    pub async fn serve_tcp(self) -> io::Result<()> {
        let listener = TcpListener::bind(self.config().bind).await?;
        self.serve(listener).await
    }

    /// Serves every connection accepted on `listener`, one exchange per connection.
    ///
    /// The exposed methods are frozen from here on.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        let limit = self.config().max_message_bytes;
        let dispatcher = Arc::new(self.into_dispatcher());
        info!(addr = %listener.local_addr()?, "serving");

        loop {
            let (sock, peer) = listener.accept().await?;
            let dispatcher = dispatcher.clone();
            task::spawn(async move {
                if let Err(error) = handle_connection(&dispatcher, sock, limit).await {
                    warn!(%peer, %error, "exchange failed");
                }
            });
        }
    }
}

async fn handle_connection(
    dispatcher: &Dispatcher,
    mut sock: TcpStream,
    limit: usize,
) -> io::Result<()> {
    let mut payload = Vec::new();
    (&mut sock)
        .take(limit as u64 + 1)
        .read_to_end(&mut payload)
        .await?;

    let reply = if payload.len() > limit {
        warn!(limit, "request too large");
        // unread input left in the socket would reset the connection before the reply lands
        let drained = io::copy(&mut (&mut sock).take(drain_limit(limit)), &mut io::sink()).await?;
        if drained == drain_limit(limit) {
            debug!(drained, "giving up on the rest of the request");
        }
        reply_bytes(&Response::Reply(Reply::error(format!(
            "message exceeds {limit} bytes"
        ))))
    } else {
        handle_payload(dispatcher, &payload).await
    };

    if let Some(reply) = reply {
        sock.write_all(&reply).await?;
    }
    sock.shutdown().await
}

/// How much of an oversized request is read and discarded before replying.
fn drain_limit(limit: usize) -> u64 {
    (limit as u64).max(MIN_DRAIN_BYTES)
}

const MIN_DRAIN_BYTES: u64 = 64 * 1024;

/// Decodes one request, dispatches it and encodes the reply.
///
/// An empty request gets no reply at all; an undecodable one gets an `error`.
pub(crate) async fn handle_payload(dispatcher: &Dispatcher, payload: &[u8]) -> Option<Vec<u8>> {
    if payload.is_empty() {
        debug!("empty request");
        return None;
    }

    let response = match decode::<Request>(payload) {
        Ok(request) => dispatcher.on_message(request).await,
        Err(error) => {
            warn!(%error, "rejecting request");
            Response::Reply(Reply::error(error.to_string()))
        }
    };
    reply_bytes(&response)
}

fn reply_bytes(response: &Response) -> Option<Vec<u8>> {
    match encode(response) {
        Ok(bytes) => Some(bytes),
        Err(error) => {
            warn!(%error, "failed to encode reply");
            None
        }
    }
}
