//! TCP server runtime.
//!
//! This module is responsible only for networking concerns: accepting
//! connections, driving the request parser over the incoming byte stream, and
//! handing a connection-bound [`ResponseWriter`] to the application handler.
//! HTTP framing itself lives in the [`http`](crate::http) modules.
//!
//! Each accepted connection is served by its own `async-std` task that owns
//! the connection exclusively from accept to close; no state is shared across
//! connections. The one cross-task value is an atomic "closed" flag used to
//! tell a deliberate [`Server::close`] apart from an accept failure.
//!
//! Connection lifecycle:
//!
//! 1. accept a TCP connection
//! 2. incrementally parse the request from the stream
//!    (delegated to [`http::parser`](crate::http::parser))
//! 3. on a parse error, answer `400 Bad Request` with the error message
//! 4. otherwise invoke the handler with a writer bound to the connection;
//!    the handler must produce a complete, well-ordered response
//! 5. close the connection

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_std::net::{TcpListener, TcpStream, ToSocketAddrs};
use async_std::task;
use async_std::task::JoinHandle;
use log::{debug, error, warn};

use crate::http::HttpError;
use crate::http::parser;
use crate::http::request::Request;
use crate::http::response::{ResponseWriter, default_headers};
use crate::http::status::StatusCode;

/// Application callback invoked once per successfully parsed request.
///
/// The handler is solely responsible for writing a fully terminated response
/// through the writer's stages before returning.
pub trait Handler: Send + Sync + 'static {
    fn handle(
        &self,
        writer: &mut ResponseWriter<&TcpStream>,
        req: &Request,
    ) -> impl Future<Output = ()> + Send;
}

/// A running server: a bound listener plus its accept-loop task.
pub struct Server {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    accept_task: JoinHandle<()>,
}

impl Server {
    /// Binds `addr` and spawns the accept loop.
    pub async fn serve<H: Handler>(addr: impl ToSocketAddrs, handler: H) -> std::io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let closed = Arc::new(AtomicBool::new(false));
        let accept_task = task::spawn(Self::listen(listener, Arc::new(handler), closed.clone()));

        Ok(Server {
            local_addr,
            closed,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections. Connections already being served run to
    /// their natural completion.
    pub async fn close(self) {
        self.closed.store(true, Ordering::SeqCst);
        self.accept_task.cancel().await;
    }

    async fn listen<H: Handler>(
        listener: TcpListener,
        handler: Arc<H>,
        closed: Arc<AtomicBool>,
    ) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("connection accepted from {peer}");
                    task::spawn(handle_connection(stream, handler.clone()));
                }
                Err(_) if closed.load(Ordering::SeqCst) => return,
                Err(err) => error!("could not accept connection: {err}"),
            }
        }
    }
}

/// Serves one connection end-to-end, then lets it close on drop.
async fn handle_connection<H: Handler>(stream: TcpStream, handler: Arc<H>) {
    let mut writer = ResponseWriter::new(&stream);

    match parser::from_stream(&stream).await {
        Ok(req) => {
            debug!(
                "{} {} parsed, invoking handler",
                req.request_line.method, req.request_line.target
            );
            handler.handle(&mut writer, &req).await;
        }
        Err(err) => {
            warn!("could not parse request: {err}");
            write_parse_error(&mut writer, &err).await;
        }
    }
}

/// Best-effort `400 Bad Request` carrying the parse error message.
async fn write_parse_error(writer: &mut ResponseWriter<&TcpStream>, err: &HttpError) {
    let body = err.to_string().into_bytes();

    let outcome = async {
        writer.write_status_line(StatusCode::BAD_REQUEST).await?;
        writer.write_headers(&default_headers(body.len())).await?;
        writer.write_body(&body).await
    }
    .await;

    if let Err(write_err) = outcome {
        debug!("could not deliver error response: {write_err}");
    }
}
