use crate::{
    calling::Api,
    config::ClientConfig,
    event::SingleFireEvent,
    net::{self, client::TcpTransport, Request, Response, Transport},
};
use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
};
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// A session with one serving endpoint.
///
/// Creating it starts the `connect` exchange in the background. Exactly one of
/// the two events fires: `connected` once the proxies are generated, or
/// `failed` with a reason. Creation requires a tokio runtime. Listeners run on
/// that runtime, wherever they are registered from.
#[derive(Clone)]
pub struct Host {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    api: OnceLock<Api>,
    connected: SingleFireEvent<()>,
    failed: SingleFireEvent<String>,
    settled: SingleFireEvent<Result<Api, String>>,
}

impl Host {
    pub fn new<T: Transport>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn tcp(addr: SocketAddr) -> Self {
        Self::new(TcpTransport::new(addr))
    }

    pub fn tcp_with_config(addr: SocketAddr, config: ClientConfig) -> Self {
        Self::new(TcpTransport::with_config(addr, config))
    }

    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        let runtime = Handle::current();
        let inner = Arc::new(Inner {
            transport,
            api: OnceLock::new(),
            connected: SingleFireEvent::with_handle(runtime.clone()),
            failed: SingleFireEvent::with_handle(runtime.clone()),
            settled: SingleFireEvent::with_handle(runtime.clone()),
        });
        runtime.spawn(inner.clone().connect());
        Self { inner }
    }

    pub fn when_connected<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.connected.subscribe(move |()| listener());
    }

    pub fn when_failed<F>(&self, listener: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        self.inner.failed.subscribe(listener);
    }

    /// The generated proxies, available once connected.
    pub fn api(&self) -> Option<&Api> {
        self.inner.api.get()
    }

    /// Waits for the session to settle.
    pub async fn connected(&self) -> Result<Api, String> {
        self.inner
            .settled
            .wait()
            .await
            .unwrap_or_else(|| Err("session closed before connecting".to_owned()))
    }
}

impl Inner {
    async fn connect(self: Arc<Self>) {
        match net::send(self.transport.as_ref(), &Request::Connect).await {
            Ok(Response::Methods(names)) => {
                debug!(methods = ?names, "connected");
                let api = self.api.get_or_init(|| Api::generate(self.transport.clone(), names));
                self.settled.emit(Ok(api.clone()));
                self.connected.emit(());
            }
            Ok(Response::Reply(reply)) => {
                warn!(?reply, "unexpected reply to connect");
                self.fail(format!("unexpected reply to connect: {reply:?}"));
            }
            Err(error) => {
                warn!(%error, "connect failed");
                self.fail(error.to_string());
            }
        }
    }

    fn fail(&self, reason: String) {
        self.settled.emit(Err(reason.clone()));
        self.failed.emit(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{net::local::LocalTransport, Server};
    use std::{sync::Mutex, thread};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn repeated_waits_leave_no_listeners_behind() {
        let host = Host::new(LocalTransport::new(Server::new()));
        let failures = Arc::new(Mutex::new(Vec::new()));
        let seen = failures.clone();
        host.when_failed(move |reason| seen.lock().unwrap().push(reason));

        let waiters: Vec<_> = (0..100).map(|_| host.connected()).collect();
        for api in futures::future::join_all(waiters).await {
            assert!(api.unwrap().is_empty());
        }
        for _ in 0..1000 {
            assert!(host.connected().await.is_ok());
        }

        assert_eq!(host.inner.settled.pending(), 0);
        assert_eq!(host.inner.connected.pending(), 0);
        // only the explicit subscription above remains
        assert_eq!(host.inner.failed.pending(), 1);
        assert!(failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn listeners_registered_off_the_runtime() {
        let host = Host::new(LocalTransport::new(Server::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let remote = host.clone();
        thread::spawn(move || remote.when_connected(move || _ = tx.send(())))
            .join()
            .unwrap();
        assert_eq!(rx.recv().await, Some(()));

        // and after the session has settled
        host.connected().await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let remote = host.clone();
        thread::spawn(move || remote.when_connected(move || _ = tx.send(())))
            .join()
            .unwrap();
        assert_eq!(rx.recv().await, Some(()));
    }
}
