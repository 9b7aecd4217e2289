#![allow(dead_code)]

use rpcallback::{Arg, Server, Value};
use std::{io, net::SocketAddr};
use tokio::{
    net::TcpListener,
    sync::mpsc,
    task::{self, JoinHandle},
};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serves `server` on an ephemeral local port.
pub async fn start(server: Server) -> SocketAddr {
    spawn_server(server).await.0
}

/// Like [`start`], also returning the serving task so it can be aborted.
pub async fn spawn_server(server: Server) -> (SocketAddr, JoinHandle<io::Result<()>>) {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, task::spawn(server.serve(listener)))
}

/// An address nothing is listening on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A callback argument that forwards every firing to the returned receiver.
pub fn recorder() -> (Arg, mpsc::UnboundedReceiver<Vec<Value>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arg::callback(move |values| _ = tx.send(values)), rx)
}
