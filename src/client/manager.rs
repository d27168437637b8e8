//! Connection manager and its builder.
//!
//! # Example
//!
//! ```no_run
//! use wslink::{ConnectionManager, Result};
//!
//! # async fn example() -> Result<()> {
//! let manager = ConnectionManager::native();
//!
//! let connection = manager
//!     .connect(
//!         "ws://127.0.0.1:9000/feed",
//!         |payload| println!("received {payload:?}"),
//!         |info| println!("closed: {}", info.description()),
//!     )
//!     .await?;
//!
//! connection.send("subscribe")?;
//! connection.disconnect()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{CloseInfo, Payload};
use crate::transport::{
    Connector, EventReceiver, HostConnector, NativeConnector, NativeOptions, Opened,
};

use super::connection::Connection;
use super::lifecycle::{Lifecycle, Resolver};
use super::listeners::Listeners;

// ============================================================================
// ConnectionManager
// ============================================================================

/// Creates connections through one backend.
///
/// Cloning is cheap and clones share the connector.
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
}

impl ConnectionManager {
    /// Creates a manager over the given connector.
    #[must_use]
    pub fn new(connector: impl Connector) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }

    /// Creates a manager over the native backend with default options.
    #[must_use]
    pub fn native() -> Self {
        Self::new(NativeConnector::new())
    }

    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Opens a connection and waits until it is open.
    ///
    /// `on_message` is called for every inbound frame. `on_closed` is called
    /// at most once, when the connection closes after having opened.
    ///
    /// # Errors
    ///
    /// - [`Error::Connect`] if the transport could not be constructed; no
    ///   handler is ever called in that case
    /// - [`Error::ClosedBeforeOpen`] if the transport closed before opening;
    ///   `on_closed` is never called in that case
    /// - [`Error::ConnectionClosed`] if the runtime dropped the lifecycle task
    pub async fn connect<M, C>(&self, url: &str, on_message: M, on_closed: C) -> Result<Connection>
    where
        M: FnMut(Payload) + Send + 'static,
        C: FnOnce(CloseInfo) + Send + 'static,
    {
        let (connection, events) = self.construct(url)?;
        let (result_tx, result_rx) = oneshot::channel();

        tokio::spawn(
            Lifecycle::new(
                connection,
                events,
                Resolver::Result(result_tx),
                Some(Box::new(on_message)),
                Some(Box::new(on_closed)),
            )
            .run(),
        );

        result_rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Opens a connection and reports its lifecycle through `listeners`.
    ///
    /// Returns as soon as the transport is constructed and the listeners are
    /// registered, before the socket opens. `on_open` and `on_failed` are
    /// mutually exclusive; `on_closed` only follows `on_open`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] if the transport could not be constructed.
    /// No listener is ever called in that case.
    pub fn attach(&self, url: &str, listeners: Listeners) -> Result<ConnectionId> {
        let (connection, events) = self.construct(url)?;
        let id = connection.id();

        let Listeners {
            on_open,
            on_message,
            on_closed,
            on_failed,
        } = listeners;

        tokio::spawn(
            Lifecycle::new(
                connection,
                events,
                Resolver::Listeners { on_open, on_failed },
                on_message,
                on_closed,
            )
            .run(),
        );

        debug!(connection = %id, "Listeners attached");
        Ok(id)
    }

    /// Constructs the transport and its handle.
    fn construct(&self, url: &str) -> Result<(Connection, EventReceiver)> {
        tokio::runtime::Handle::try_current().map_err(|e| Error::connect(e.to_string()))?;

        let Opened { transport, events } = self.connector.open(url).map_err(|e| {
            debug!(url, error = %e, "Transport construction failed");
            Error::connect(e.message)
        })?;

        let connection = Connection::new(ConnectionId::generate(), url, transport);
        debug!(connection = %connection.id(), url, "Transport constructed");

        Ok((connection, events))
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager").finish_non_exhaustive()
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Socket backend selected at construction time.
#[derive(Debug, Clone)]
pub enum Backend {
    /// tokio-tungstenite sockets.
    Native(NativeOptions),
    /// Sockets provided by the embedding host.
    Host(HostConnector),
}

// ============================================================================
// ManagerBuilder
// ============================================================================

/// Builder for a [`ConnectionManager`].
#[derive(Debug, Default, Clone)]
pub struct ManagerBuilder {
    /// Selected backend.
    backend: Option<Backend>,
}

impl ManagerBuilder {
    /// Creates a builder with no backend selected.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the native backend with default options.
    #[inline]
    #[must_use]
    pub fn native(self) -> Self {
        self.backend(Backend::Native(NativeOptions::default()))
    }

    /// Selects the native backend with the given options.
    #[inline]
    #[must_use]
    pub fn native_options(self, options: NativeOptions) -> Self {
        self.backend(Backend::Native(options))
    }

    /// Selects a host-provided backend.
    #[inline]
    #[must_use]
    pub fn host(self, connector: HostConnector) -> Self {
        self.backend(Backend::Host(connector))
    }

    /// Selects a backend directly.
    #[inline]
    #[must_use]
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Builds the manager.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no backend was selected
    /// - [`Error::Config`] if the native options are invalid
    pub fn build(self) -> Result<ConnectionManager> {
        let backend = self.backend.ok_or_else(|| {
            Error::config(
                "A backend is required. Use .native() or .host() to select one.\n\
                 Example: ConnectionManager::builder().native().build()",
            )
        })?;

        match backend {
            Backend::Native(options) => {
                options.validate()?;
                Ok(ConnectionManager::new(NativeConnector::with_options(options)))
            }
            Backend::Host(connector) => Ok(ConnectionManager::new(connector)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tokio_test::{assert_err, assert_ok};

    use crate::error::TransportError;
    use crate::transport::{HostFrame, HostListener, HostPeer, ReadyState, TransportResult};

    const WAIT: Duration = Duration::from_secs(5);

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("wslink=debug"))
            .with_test_writer()
            .try_init();
    }

    /// Channels observing the handlers of one connect call.
    struct Observed {
        messages: mpsc::UnboundedReceiver<Payload>,
        closed: oneshot::Receiver<CloseInfo>,
    }

    /// Starts a connect on a host-backed manager and returns the peer.
    async fn start(
        url: &'static str,
    ) -> (
        tokio::task::JoinHandle<Result<Connection>>,
        HostPeer,
        Observed,
        HostListener,
    ) {
        init_tracing();
        let (connector, mut listener) = HostConnector::new();
        let manager = ConnectionManager::new(connector);

        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = oneshot::channel();

        let pending = tokio::spawn(async move {
            manager
                .connect(
                    url,
                    move |payload| {
                        let _ = message_tx.send(payload);
                    },
                    move |info| {
                        let _ = closed_tx.send(info);
                    },
                )
                .await
        });

        let peer = timeout(WAIT, listener.accept())
            .await
            .expect("peer within timeout")
            .expect("peer");

        let seen = Observed {
            messages: message_rx,
            closed: closed_rx,
        };
        (pending, peer, seen, listener)
    }

    #[tokio::test]
    async fn test_connect_open_message_close() {
        let (pending, peer, mut seen, _listener) = start("ws://host/path").await;
        assert_eq!(peer.url().as_str(), "ws://host/path");

        peer.open();
        let connection = assert_ok!(pending.await.expect("join"));
        assert!(connection.is_open());
        assert_eq!(connection.url(), "ws://host/path");

        peer.text("one");
        peer.binary(vec![2u8]);
        assert_eq!(seen.messages.recv().await, Some(Payload::from("one")));
        assert_eq!(seen.messages.recv().await, Some(Payload::from(vec![2u8])));

        peer.close(1001, "going away");
        let info = timeout(WAIT, seen.closed).await.expect("closed").expect("invoked");
        assert_eq!(info.code, 1001);
        assert_eq!(info.reason, "going away");
        assert!(!info.initiated_locally);
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn test_frame_before_open_reaches_handler() {
        let (pending, peer, mut seen, _listener) = start("ws://host").await;

        assert!(peer.text("greeting"));
        peer.open();
        let connection = assert_ok!(pending.await.expect("join"));

        assert_eq!(seen.messages.recv().await, Some(Payload::from("greeting")));
        assert!(connection.is_open());
    }

    #[tokio::test]
    async fn test_close_before_open_never_calls_closed() {
        let (pending, peer, seen, _listener) = start("ws://host").await;

        peer.close(1006, "");
        let err = assert_err!(pending.await.expect("join"));
        assert!(err.is_closed_before_open());
        assert_eq!(err.message(), crate::protocol::classify(1006, ""));

        // The lifecycle task dropped the handler without calling it
        assert!(timeout(WAIT, seen.closed).await.expect("settled").is_err());
    }

    #[tokio::test]
    async fn test_disconnect_closes_once() {
        let (pending, mut peer, seen, _listener) = start("ws://host").await;
        peer.open();
        let connection = assert_ok!(pending.await.expect("join"));

        assert_ok!(connection.disconnect());
        assert!(connection.is_open());
        assert_eq!(connection.ready_state(), ReadyState::Closing);
        assert_ok!(connection.disconnect());

        assert_eq!(
            peer.recv().await,
            Some(HostFrame::Close {
                code: 1000,
                reason: String::new()
            })
        );
        peer.close(1000, "");

        let info = timeout(WAIT, seen.closed).await.expect("closed").expect("invoked");
        assert!(info.initiated_locally);
        assert!(info.is_normal());
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (pending, mut peer, seen, _listener) = start("ws://host").await;
        peer.open();
        let connection = assert_ok!(pending.await.expect("join"));

        assert_ok!(connection.send("hello"));
        assert_eq!(peer.recv().await, Some(HostFrame::Data(Payload::from("hello"))));

        peer.close(1011, "");
        let _ = timeout(WAIT, seen.closed).await.expect("closed");

        let err = assert_err!(connection.send("late"));
        assert!(err.is_command_error());
        assert!(err.message().contains("readyState 3"));
    }

    #[tokio::test]
    async fn test_peer_dropped_reports_abnormal() {
        let (pending, peer, seen, _listener) = start("ws://host").await;
        peer.open();
        let _connection = assert_ok!(pending.await.expect("join"));

        drop(peer);
        let info = timeout(WAIT, seen.closed).await.expect("closed").expect("invoked");
        assert_eq!(info.code, 1006);
    }

    #[tokio::test]
    async fn test_construction_failure_reports_message() {
        /// Connector whose constructor always throws.
        struct Unresolvable;

        impl Connector for Unresolvable {
            fn open(&self, _url: &str) -> TransportResult<Opened> {
                Err(TransportError::new("ENOTFOUND"))
            }
        }

        let manager = ConnectionManager::new(Unresolvable);
        let (message_tx, mut message_rx) = mpsc::unbounded_channel::<Payload>();
        let (closed_tx, closed_rx) = oneshot::channel::<CloseInfo>();

        let err = assert_err!(
            manager
                .connect(
                    "ws://host/path",
                    move |payload| {
                        let _ = message_tx.send(payload);
                    },
                    move |info| {
                        let _ = closed_tx.send(info);
                    },
                )
                .await
        );

        assert!(matches!(err, Error::Connect { .. }));
        assert_eq!(err.message(), "ENOTFOUND");
        // Handlers were dropped unused
        assert!(message_rx.recv().await.is_none());
        assert!(closed_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_bad_url_rejected_at_construction() {
        let (connector, _listener) = HostConnector::new();
        let manager = ConnectionManager::new(connector);

        let err = assert_err!(manager.connect("http://host", |_| {}, |_| {}).await);
        assert!(matches!(err, Error::Connect { .. }));
        assert!(err.message().contains("'http' is not allowed"));

        let err = assert_err!(manager.connect("not a url", |_| {}, |_| {}).await);
        assert!(matches!(err, Error::Connect { .. }));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_dropped_connect_closes_transport() {
        let (pending, mut peer, _seen, _listener) = start("ws://host").await;
        pending.abort();
        let _ = pending.await;

        peer.open();
        assert_eq!(
            timeout(WAIT, peer.recv()).await.expect("close request"),
            Some(HostFrame::Close {
                code: 1000,
                reason: String::new()
            })
        );
    }

    #[tokio::test]
    async fn test_attach_open_then_closed() {
        init_tracing();
        let (connector, mut listener) = HostConnector::new();
        let manager = ConnectionManager::builder().host(connector).build().expect("build");

        let (open_tx, open_rx) = oneshot::channel();
        let (closed_tx, closed_rx) = oneshot::channel();
        let (failed_tx, failed_rx) = oneshot::channel::<Error>();
        let (message_tx, mut message_rx) = mpsc::unbounded_channel();

        let id = assert_ok!(manager.attach(
            "ws://host",
            Listeners::new()
                .on_open(move |connection| {
                    let _ = open_tx.send(connection);
                })
                .on_message(move |payload| {
                    let _ = message_tx.send(payload);
                })
                .on_closed(move |info| {
                    let _ = closed_tx.send(info);
                })
                .on_failed(move |err| {
                    let _ = failed_tx.send(err);
                }),
        ));

        let peer = listener.accept().await.expect("peer");
        assert!(peer.open());
        let connection = timeout(WAIT, open_rx).await.expect("open").expect("invoked");
        assert_eq!(connection.id(), id);

        peer.text("hi");
        assert_eq!(message_rx.recv().await, Some(Payload::from("hi")));

        peer.close(1000, "");
        let info = timeout(WAIT, closed_rx).await.expect("closed").expect("invoked");
        assert!(info.is_normal());
        assert!(failed_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_attach_failure_before_open() {
        let (connector, mut listener) = HostConnector::new();
        let manager = ConnectionManager::new(connector);

        let (failed_tx, failed_rx) = oneshot::channel();
        let (closed_tx, closed_rx) = oneshot::channel::<CloseInfo>();

        assert_ok!(manager.attach(
            "ws://host",
            Listeners::new()
                .on_closed(move |info| {
                    let _ = closed_tx.send(info);
                })
                .on_failed(move |err| {
                    let _ = failed_tx.send(err);
                }),
        ));

        let peer = listener.accept().await.expect("peer");
        peer.close(1010, "foo,bar");

        let err = timeout(WAIT, failed_rx).await.expect("failed").expect("invoked");
        assert_eq!(err.close_code(), Some(1010));
        assert!(err.message().contains("foo,bar"));
        assert!(closed_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_native_echo_end_to_end() -> anyhow::Result<()> {
        use futures_util::{SinkExt, StreamExt};

        init_tracing();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("ws://127.0.0.1:{}", listener.local_addr()?.port());

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            let (mut sink, mut source) = ws.split();
            while let Some(Ok(message)) = source.next().await {
                if (message.is_text() || message.is_binary()) && sink.send(message).await.is_err() {
                    break;
                }
            }
        });

        let manager = ConnectionManager::builder().native().build()?;
        let (message_tx, mut message_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = oneshot::channel();

        let connection = manager
            .connect(
                &url,
                move |payload| {
                    let _ = message_tx.send(payload);
                },
                move |info| {
                    let _ = closed_tx.send(info);
                },
            )
            .await?;
        assert!(connection.is_open());

        connection.send("echo me")?;
        let echoed = timeout(WAIT, message_rx.recv()).await?;
        assert_eq!(echoed, Some(Payload::from("echo me")));

        connection.disconnect()?;
        let info = timeout(WAIT, closed_rx).await??;
        assert_eq!(info.code, 1000);
        assert!(info.initiated_locally);
        assert!(!connection.is_open());
        Ok(())
    }

    #[tokio::test]
    async fn test_native_refused_is_closed_before_open() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("ws://127.0.0.1:{}", listener.local_addr()?.port());
        drop(listener);

        let err = assert_err!(ConnectionManager::native().connect(&url, |_| {}, |_| {}).await);
        assert_eq!(err.close_code(), Some(1006));
        assert!(err.to_string().contains("code 1006"));
        Ok(())
    }

    #[test]
    fn test_attach_outside_runtime_fails() {
        let (connector, _listener) = HostConnector::new();
        let manager = ConnectionManager::new(connector);

        let err = manager.attach("ws://host", Listeners::new()).unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
    }

    #[test]
    fn test_builder_requires_backend() {
        let err = ManagerBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("backend"));
    }

    #[test]
    fn test_builder_validates_native_options() {
        let options = NativeOptions::new().with_close_timeout(Duration::ZERO);
        assert!(ManagerBuilder::new().native_options(options).build().is_err());
        assert!(ManagerBuilder::new().native().build().is_ok());
    }
}
