//! Protocol client for a locally running NCALayer-compatible signing agent.
//!
//! # Lifecycle
//!
//! `Unconnected → Connecting → AwaitingInitialHandshake → AwaitingCapabilityProbe → Ready`,
//! with `Failed` reachable from every non-terminal state. A client connects at
//! most once; reconnecting means building a new client.
//!
//! # Capabilities
//!
//! After the agent's greeting the client asks the KAZTOKEN extension module
//! for its version and, in parallel, checks whether the KAZTOKEN HTTP API is
//! reachable. Either success unlocks multi-document signing; neither can fail
//! [`NcaLayerClient::connect`].
//!
//! # Requests
//!
//! Only one request may be outstanding. A second one issued before the first
//! resolves is refused with [`NcaLayerError::RequestInFlight`].

mod capabilities;
mod connection;
pub(crate) mod exchange;

pub use capabilities::CapabilitySnapshot;

use crate::config::ClientConfig;
use crate::document::{OneOrMany, SignInput, Signed};
use crate::error::NcaLayerError;
use crate::normalize::normalize_data_to_sign;
use crate::params::{SignFormat, SignerParams, SigningParams, Storages};
use crate::protocol::{Request, SignArgs, decode_handshake, decode_response};
use crate::sidecar::KmdHttpApi;

use capabilities::Capabilities;
use connection::Connection;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde_json::Value;
use tokio::task::JoinHandle;

/// Passive hook that sees raw request JSON or raw response text.
pub type Observer = Arc<dyn Fn(&str) + Send + Sync>;

/// Result of the optional enhanced-agent probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The agent answered the extension request.
    Supported,
    /// The agent rejected the request; it is plain NCALayer.
    Unsupported { reason: String },
    /// The socket closed or failed while probing.
    TransportLost { reason: String },
}

enum ConnectionState {
    Unconnected,
    Connecting,
    AwaitingInitialHandshake,
    AwaitingCapabilityProbe,
    Ready(Arc<Connection>),
    Failed,
}

impl ConnectionState {
    fn name(&self) -> &'static str {
        match self {
            ConnectionState::Unconnected => "Unconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::AwaitingInitialHandshake => "AwaitingInitialHandshake",
            ConnectionState::AwaitingCapabilityProbe => "AwaitingCapabilityProbe",
            ConnectionState::Ready(_) => "Ready",
            ConnectionState::Failed => "Failed",
        }
    }
}

pub struct NcaLayerClient {
    config: ClientConfig,
    kmd_http_api: Option<KmdHttpApi>,
    state: Mutex<ConnectionState>,
    capabilities: Arc<Capabilities>,
    probe_outcome: Mutex<Option<ProbeOutcome>>,
    sidecar_probe: Mutex<Option<JoinHandle<()>>>,
    on_request_ready: Option<Observer>,
    on_response_ready: Option<Observer>,
}

impl NcaLayerClient {
    /// Build a client for the agent and HTTP API named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`NcaLayerError::Validation`] if the config is invalid.
    pub fn new(config: ClientConfig) -> Result<Self, NcaLayerError> {
        config
            .validate()
            .map_err(|e| NcaLayerError::validation(e.to_string()))?;

        let kmd_http_api = if config.allow_kmd_http_api {
            Some(KmdHttpApi::new(&config.kmd_http_api_url)?)
        } else {
            None
        };

        Ok(Self {
            config,
            kmd_http_api,
            state: Mutex::new(ConnectionState::Unconnected),
            capabilities: Arc::new(Capabilities::default()),
            probe_outcome: Mutex::new(None),
            sidecar_probe: Mutex::new(None),
            on_request_ready: None,
            on_response_ready: None,
        })
    }

    /// Observe every outbound request as serialised JSON, just before it is sent.
    pub fn with_request_observer(mut self, observer: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_request_ready = Some(Arc::new(observer));
        self
    }

    /// Observe every inbound frame as raw text, before it is decoded.
    pub fn with_response_observer(
        mut self,
        observer: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_response_ready = Some(Arc::new(observer));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn capabilities(&self) -> CapabilitySnapshot {
        self.capabilities.snapshot()
    }

    /// Capability flags once the HTTP API probe has finished.
    pub async fn settled_capabilities(&self) -> CapabilitySnapshot {
        self.await_sidecar_probe().await;
        self.capabilities()
    }

    /// Outcome of the enhanced-agent probe, once `connect` has run it.
    pub fn probe_outcome(&self) -> Option<ProbeOutcome> {
        self.probe_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        match &*self.lock_state() {
            ConnectionState::Ready(connection) => connection.is_open(),
            _ => false,
        }
    }

    /// Open the connection and complete the version handshake.
    ///
    /// Resolves with the agent's version string. The enhanced-agent probe runs
    /// before this returns; the HTTP API probe keeps running in the background.
    ///
    /// # Errors
    ///
    /// - [`NcaLayerError::AlreadyConnected`] if `connect` was called before on this client
    /// - [`NcaLayerError::Transport`] if the socket cannot be opened
    /// - [`NcaLayerError::Handshake`] if the greeting has no version
    /// - [`NcaLayerError::ConnectionClosed`] if the agent hangs up before greeting
    pub async fn connect(&self) -> Result<String, NcaLayerError> {
        self.begin_connect()?;

        let (connection, version) = match self.handshake().await {
            Ok(established) => established,
            Err(e) => {
                warn!("NCALayer handshake failed: {e}");
                self.set_state(ConnectionState::Failed);
                return Err(e);
            }
        };

        info!("Connected to NCALayer version {version}");

        self.start_sidecar_probe();

        self.set_state(ConnectionState::AwaitingCapabilityProbe);
        let outcome = self.probe_extension(&connection).await;
        *self
            .probe_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(outcome);

        self.set_state(ConnectionState::Ready(connection));
        Ok(version)
    }

    /// Send one request and wait for its response.
    ///
    /// # Errors
    ///
    /// - [`NcaLayerError::NotConnected`] before a successful `connect`
    /// - [`NcaLayerError::RequestInFlight`] while another request is outstanding
    /// - [`NcaLayerError::Cancelled`], [`NcaLayerError::Peer`] or
    ///   [`NcaLayerError::Decode`] from the response
    /// - [`NcaLayerError::ConnectionClosed`] / [`NcaLayerError::Transport`] if the socket ends
    pub async fn send_request(&self, request: &Request) -> Result<Value, NcaLayerError> {
        let connection = self.connection()?;
        self.exchange(&connection, request).await
    }

    /// Generic `kz.gov.pki.knca.basics.sign` call. `locale` defaults to the config's.
    pub async fn sign(
        &self,
        storages: &Storages,
        format: SignFormat,
        data: &OneOrMany<String>,
        signing_params: &SigningParams,
        signer_params: &SignerParams,
        locale: Option<&str>,
    ) -> Result<Value, NcaLayerError> {
        let args = SignArgs {
            allowed_storages: storages,
            format,
            data,
            signing_params,
            signer_params,
            locale: locale.unwrap_or(self.config.default_locale.as_str()),
        };
        let request = Request::basics_sign(&args)?;
        self.send_request(&request).await
    }

    /// Produce CMS signature(s), through the HTTP API when it is available.
    ///
    /// A single document yields [`OneOrMany::One`], a batch yields
    /// [`OneOrMany::Many`] in input order.
    ///
    /// # Errors
    ///
    /// - [`NcaLayerError::Capability`] for a batch without multi-document support;
    ///   nothing is sent in that case
    /// - [`NcaLayerError::Validation`] for an empty batch
    /// - [`NcaLayerError::Cancelled`] when the user backs out
    /// - [`NcaLayerError::Sidecar`] for HTTP API failures
    /// - anything [`NcaLayerClient::send_request`] returns
    pub async fn sign_cms(
        &self,
        storages: &Storages,
        data: SignInput,
        signing_params: &SigningParams,
        signer_params: &SignerParams,
        locale: Option<&str>,
    ) -> Result<Signed, NcaLayerError> {
        self.await_sidecar_probe().await;
        let capabilities = self.capabilities();

        if data.is_many() && !capabilities.multisign {
            return Err(NcaLayerError::multisign_unavailable(
                capabilities.enhanced_agent,
            ));
        }

        if data.is_empty() {
            return Err(NcaLayerError::validation("no documents to sign"));
        }

        if let Some(kmd_http_api) = &self.kmd_http_api
            && capabilities.kmd_http_api
        {
            debug!("Signing {} document(s) through the KAZTOKEN API", data.len());
            return kmd_http_api
                .sign_documents(&data, signing_params.encapsulate)
                .await;
        }

        let normalized = normalize_data_to_sign(data);
        let result = self
            .sign(
                storages,
                SignFormat::Cms,
                &normalized,
                signing_params,
                signer_params,
                locale,
            )
            .await?;

        Signed::from_result(&normalized, result)
    }

    /// Produce XML signature(s) over the agent connection.
    pub async fn sign_xml(
        &self,
        storages: &Storages,
        data: OneOrMany<String>,
        signing_params: &SigningParams,
        signer_params: &SignerParams,
        locale: Option<&str>,
    ) -> Result<Signed, NcaLayerError> {
        let result = self
            .sign(
                storages,
                SignFormat::Xml,
                &data,
                signing_params,
                signer_params,
                locale,
            )
            .await?;

        Signed::from_result(&data, result)
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.lock_state();
        debug!("Connection state {} -> {}", state.name(), next.name());
        *state = next;
    }

    fn begin_connect(&self) -> Result<(), NcaLayerError> {
        let mut state = self.lock_state();
        match *state {
            ConnectionState::Unconnected => {
                *state = ConnectionState::Connecting;
                Ok(())
            }
            _ => Err(NcaLayerError::already_connected()),
        }
    }

    async fn handshake(&self) -> Result<(Arc<Connection>, String), NcaLayerError> {
        let (connection, greeting) =
            Connection::open(&self.config.ncalayer_url, self.on_response_ready.clone()).await?;

        self.set_state(ConnectionState::AwaitingInitialHandshake);

        let text = greeting.wait().await.into_frame()?;
        let version = decode_handshake(&text)?;

        Ok((Arc::new(connection), version))
    }

    /// Ask the KAZTOKEN extension for its version; only success upgrades flags.
    async fn probe_extension(&self, connection: &Connection) -> ProbeOutcome {
        match self.exchange(connection, &Request::extension_version()).await {
            Ok(_) => {
                info!("Peer is KAZTOKEN mobile/desktop; multi-document signing available");
                self.capabilities.mark_enhanced_agent();
                ProbeOutcome::Supported
            }
            Err(
                e @ (NcaLayerError::ConnectionClosed { .. } | NcaLayerError::Transport { .. }),
            ) => {
                warn!("Connection lost during extension probe: {e}");
                ProbeOutcome::TransportLost {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                debug!("Extension probe rejected, peer is plain NCALayer: {e}");
                ProbeOutcome::Unsupported {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn start_sidecar_probe(&self) {
        let Some(kmd_http_api) = self.kmd_http_api.clone() else {
            return;
        };

        let capabilities = Arc::clone(&self.capabilities);
        let timeout = self.config.sidecar_probe_timeout();

        let handle = tokio::spawn(async move {
            if kmd_http_api.probe(timeout).await {
                info!(
                    "KAZTOKEN API reachable at {}; multi-document signing available",
                    kmd_http_api.base_url()
                );
                capabilities.mark_kmd_http_api();
            }
        });

        *self
            .sidecar_probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Let a still-running HTTP API probe finish so transport choice is stable.
    async fn await_sidecar_probe(&self) {
        let handle = self
            .sidecar_probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!("KAZTOKEN API probe task failed: {e}");
        }
    }

    fn connection(&self) -> Result<Arc<Connection>, NcaLayerError> {
        match &*self.lock_state() {
            ConnectionState::Ready(connection) => Ok(Arc::clone(connection)),
            _ => Err(NcaLayerError::not_connected()),
        }
    }

    async fn exchange(
        &self,
        connection: &Connection,
        request: &Request,
    ) -> Result<Value, NcaLayerError> {
        let json = request.to_json()?;
        let pending = connection.reserve()?;

        if let Some(observer) = &self.on_request_ready {
            observer(&json);
        }

        debug!("Sending {}.{}", request.module, request.method);
        connection.transmit(json).await?;

        let text = pending.wait().await.into_frame()?;
        decode_response(&text)
    }
}
