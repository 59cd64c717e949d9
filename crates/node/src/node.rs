use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use cggmp_threshold_ecdsa::curv::BigInt;
use cggmp_threshold_ecdsa::gg_2020::state_machine::sign::PartialSignature;
use round_based::Msg;

use tss_core::{
    rounds, DispatchAction, Dispatcher, PartyRegistry, SessionController,
    SessionRunner, SignatureAggregator, ROUND_POLL_INTERVAL,
};
use tss_engine::gg20::{
    KeyShare, KeygenDriver, OfflineResult, PreSignDriver, Signature,
    SignOnlineDriver,
};
use tss_engine::Parameters;
use tss_protocol::{
    CommunicationError, Envelope, EnvelopeKind, KeysignRequest, Operation,
    SessionPhase,
};
use tss_transport::{P2pTransport, TransportConfig};

use crate::config::NodeConfig;
use crate::key_store::KeyStore;
use crate::{Error, Result};

/// How often a caller blocked in [`Node::start_keysign`] rechecks
/// whether the background round driver has produced a signature.
const SIGNATURE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// One running node: owns the transport, party registry, session
/// controller and dispatcher, and drives session lifecycles in
/// response to both RPC calls and inbound network traffic.
///
/// Round-by-round protocol driving lives here rather than in
/// `tss-core`: a [`SessionRunner`] only knows how to advance one
/// driver given a round's collected messages, not when to kick one
/// off, broadcast its output, or hand its result to the next stage.
pub struct Node {
    config: NodeConfig,
    transport: P2pTransport,
    registry: PartyRegistry,
    controller: SessionController,
    dispatcher: Dispatcher,
    key_store: KeyStore,

    keygen_runner: Mutex<Option<SessionRunner<KeygenDriver>>>,
    keygen_round: Mutex<u16>,

    presign_runner: Mutex<Option<SessionRunner<PreSignDriver>>>,
    presign_round: Mutex<u16>,
    /// Message scalar for the signature currently being produced,
    /// carried from [`Node::start_keysign`] through to the online
    /// round once the offline stage finishes.
    pending_message: Mutex<Option<[u8; 32]>>,

    online_driver: Mutex<Option<SignOnlineDriver>>,
    aggregator: Mutex<Option<SignatureAggregator>>,
    last_signature: Mutex<Option<Signature>>,
}

enum KeygenProgress {
    Waiting,
    Broadcast(Vec<tss_protocol::ProtocolMessage>),
    Finished(KeyShare),
}

enum PresignProgress {
    Waiting,
    Broadcast(Vec<tss_protocol::ProtocolMessage>),
    Finished(OfflineResult),
}

impl Node {
    /// Bind the transport and assemble a node from `config`.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        let registry = PartyRegistry::new(config.tss.pubkey.clone())?;
        let dispatcher = Dispatcher::new(registry.local_id().clone());
        let transport = P2pTransport::bind(TransportConfig {
            bind_addr: config.p2p.bind_addr,
            udp_buffer_size: config.p2p.udp_buffer_size,
            cache_ttl: std::time::Duration::from_secs(
                config.p2p.cache_ttl_secs,
            ),
        })
        .await?;

        let key_store = KeyStore::new(config.tss.key_file.clone());
        if key_store.exists().await {
            tracing::info!(
                path = %key_store.path().display(),
                "found a persisted key share"
            );
        }

        Ok(Self {
            config,
            transport,
            registry,
            controller: SessionController::new(),
            dispatcher,
            key_store,
            keygen_runner: Mutex::new(None),
            keygen_round: Mutex::new(1),
            presign_runner: Mutex::new(None),
            presign_round: Mutex::new(1),
            pending_message: Mutex::new(None),
            online_driver: Mutex::new(None),
            aggregator: Mutex::new(None),
            last_signature: Mutex::new(None),
        })
    }

    /// The key share persistence backend for this node.
    pub fn key_store(&self) -> &KeyStore {
        &self.key_store
    }

    /// Node configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Peer registry.
    pub fn registry(&self) -> &PartyRegistry {
        &self.registry
    }

    /// Session controller.
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Announce this node to every configured bootstrap peer.
    pub async fn announce(&self) -> Result<()> {
        for peer in self.config.p2p.bootstrap_peers.clone() {
            self.send_handshake(peer).await?;
        }
        Ok(())
    }

    /// Start key generation: drive this node's own
    /// [`SessionRunner<KeygenDriver>`] to round 1 and broadcast a
    /// `TssKeygenStartMsg` so every peer does the same.
    pub async fn start_keygen(&self) -> Result<()> {
        self.begin_keygen().await?;
        self.broadcast(Envelope {
            kind: EnvelopeKind::TssKeygenStartMsg,
            from: self.registry.local_id().clone(),
            pubkey: None,
            peer_addr: None,
            tss_message: None,
            keysign_request: None,
            si: None,
            party_id: None,
            sent_time: Some(SystemTime::now()),
            communication_error: None,
        })
        .await
    }

    /// Start threshold signing over `msg`, blocking until the
    /// background round driver (run from [`Node::run`]'s poll loop)
    /// either produces a signature or the session fails.
    ///
    /// `one_round_signing` is accepted for wire compatibility; this
    /// engine always runs the full offline-then-online path, since the
    /// vendored GG20 state machine has no shortcut that skips the
    /// offline stage.
    pub async fn start_keysign(
        &self,
        msg: Vec<u8>,
        one_round_signing: bool,
    ) -> Result<Vec<u8>> {
        self.begin_keysign(msg.clone(), one_round_signing).await?;
        self.broadcast(Envelope {
            kind: EnvelopeKind::TssKeysignStartMsg,
            from: self.registry.local_id().clone(),
            pubkey: None,
            peer_addr: None,
            tss_message: None,
            keysign_request: Some(KeysignRequest {
                msg,
                one_round_signing,
            }),
            si: None,
            party_id: None,
            sent_time: Some(SystemTime::now()),
            communication_error: None,
        })
        .await?;
        self.await_signature().await
    }

    /// Verify a signature against this node's persisted group public
    /// key, reusing the same verification call the online signing
    /// round itself uses to accept a freshly combined signature.
    pub async fn verify(&self, msg: &[u8], signature: &[u8]) -> Result<bool> {
        let key_share: KeyShare = self.key_store.load().await?;
        let signature: Signature = serde_json::from_slice(signature)?;
        let scalar = tss_engine::message_to_scalar(msg);
        let message = BigInt::from_bytes(&scalar);
        let public_key = key_share.public_key().clone();
        Ok(cggmp_threshold_ecdsa::gg_2020::party_i::verify(
            &signature.signature,
            &public_key,
            &message,
        )
        .is_ok())
    }

    /// Handle an informational event forwarded from an external
    /// system (for example, a chain event the node should react to).
    ///
    /// The coordinator this is grounded on relays these to a
    /// configurable webhook; this implementation only logs, leaving
    /// the webhook callout as a clearly-named extension point.
    pub fn notify(&self, event: &str) {
        tracing::info!(event, "received external notification");
    }

    /// Run the inbound network loop: receive datagrams, dispatch them,
    /// and drive round advancement on a fixed poll interval.
    ///
    /// A single bad frame, a self-addressed message, or a transient
    /// handling error logs and is dropped rather than killing the
    /// loop — the node keeps serving every other peer regardless.
    pub async fn run(&self) -> Result<()> {
        let mut round_check = tokio::time::interval(ROUND_POLL_INTERVAL);
        loop {
            tokio::select! {
                inbound = self.transport.next_message() => {
                    let inbound = inbound?;
                    if let Err(e) = self
                        .handle_inbound(inbound.from, &inbound.payload)
                        .await
                    {
                        tracing::warn!(
                            error = %e,
                            from = %inbound.from,
                            "dropping inbound frame after handling error"
                        );
                    }
                }
                _ = round_check.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::warn!(error = %e, "round tick failed");
                    }
                }
            }
        }
    }

    async fn handle_inbound(
        &self,
        from: SocketAddr,
        payload: &[u8],
    ) -> Result<()> {
        let action = self.dispatcher.dispatch(payload, &self.controller)?;
        match action {
            DispatchAction::Handshake { pubkey, peer_addr } => {
                let addr: SocketAddr = peer_addr.parse().unwrap_or(from);
                let changed = self.registry.handle_handshake(&pubkey, addr)?;
                if changed {
                    self.send_handshake(addr).await?;
                }
            }
            DispatchAction::Disconnect { pubkey, peer_addr } => {
                let addr: SocketAddr = peer_addr.parse().unwrap_or(from);
                self.registry.handle_disconnect(&pubkey, addr)?;
            }
            DispatchAction::KeygenStart => {
                match self.begin_keygen().await {
                    Ok(()) => tracing::info!("keygen started by peer request"),
                    Err(e) => tracing::debug!(
                        error = %e,
                        "keygen start ignored"
                    ),
                }
            }
            DispatchAction::KeygenMsg(message) => {
                self.controller.keygen_store().insert(message);
            }
            DispatchAction::KeysignMsg(message) => {
                self.controller.keysign_store().insert(message);
            }
            DispatchAction::KeysignStart(request) => {
                match self
                    .begin_keysign(request.msg, request.one_round_signing)
                    .await
                {
                    Ok(()) => tracing::info!(
                        one_round = request.one_round_signing,
                        "keysign started by peer request"
                    ),
                    Err(e) => {
                        tracing::debug!(error = %e, "keysign start ignored")
                    }
                }
            }
            DispatchAction::KeysignOneRound { party_id, si } => {
                if let Some(aggregator) =
                    self.aggregator.lock().unwrap().as_ref()
                {
                    let share = hex::decode(&si).unwrap_or_default();
                    aggregator.add_share(party_id, share);
                }
            }
            DispatchAction::KeygenCancel(error)
            | DispatchAction::UnparsableFrame(error) => {
                let operation = error.operation;
                if self.controller.cancel(operation, error).is_err() {
                    self.reset_session(operation);
                }
            }
            DispatchAction::KeysignCancel(error) => {
                if self.controller.cancel(Operation::Keysign, error).is_err()
                {
                    self.reset_session(Operation::Keysign);
                }
            }
            DispatchAction::SelfAddressed => {
                tracing::trace!("dropping self-addressed round message");
            }
        }
        Ok(())
    }

    async fn tick(&self) -> Result<()> {
        if let Err(e) = self.tick_keygen().await {
            tracing::warn!(error = %e, "keygen round tick failed");
            self.controller.fail(Operation::Keygen);
            self.reset_session(Operation::Keygen);
        }
        if let Err(e) = self.tick_presign().await {
            tracing::warn!(error = %e, "keysign round tick failed");
            self.controller.fail(Operation::Keysign);
            self.reset_session(Operation::Keysign);
        }
        if let Err(e) = self.tick_online().await {
            tracing::warn!(error = %e, "keysign finalize failed");
            self.controller.fail(Operation::Keysign);
            self.reset_session(Operation::Keysign);
        }
        Ok(())
    }

    async fn tick_keygen(&self) -> Result<()> {
        let progress = {
            let mut slot = self.keygen_runner.lock().unwrap();
            let Some(runner) = slot.as_mut() else {
                return Ok(());
            };
            let mut round = self.keygen_round.lock().unwrap();
            let idx = (*round as usize).saturating_sub(1);
            let Some((prefix, _)) = rounds::keygen::ROUND_PREFIXES.get(idx)
            else {
                return Ok(());
            };
            let is_last =
                *round as usize == rounds::keygen::ROUND_PREFIXES.len();
            match runner.advance(
                self.controller.keygen_store(),
                &self.controller,
                *round,
                prefix,
            )? {
                None => KeygenProgress::Waiting,
                Some(_) if is_last => {
                    let runner = slot.take().expect("checked Some above");
                    KeygenProgress::Finished(runner.finish()?)
                }
                Some(messages) => {
                    *round += 1;
                    KeygenProgress::Broadcast(messages)
                }
            }
        };
        match progress {
            KeygenProgress::Waiting => {}
            KeygenProgress::Broadcast(messages) => {
                self.broadcast_tss(EnvelopeKind::TssKeygenMsg, messages)
                    .await?;
            }
            KeygenProgress::Finished(key_share) => {
                self.key_store.save(&key_share).await?;
                *self.keygen_round.lock().unwrap() = 1;
                self.controller.keygen_store().reset();
                self.controller.complete(Operation::Keygen);
                tracing::info!("key generation complete, share persisted");
            }
        }
        Ok(())
    }

    async fn tick_presign(&self) -> Result<()> {
        let progress = {
            let mut slot = self.presign_runner.lock().unwrap();
            let Some(runner) = slot.as_mut() else {
                return Ok(());
            };
            let mut round = self.presign_round.lock().unwrap();
            let idx = (*round as usize).saturating_sub(1);
            let Some((prefix, _)) = rounds::keysign::ROUND_PREFIXES.get(idx)
            else {
                return Ok(());
            };
            let is_last =
                *round as usize == rounds::keysign::ROUND_PREFIXES.len();
            match runner.advance(
                self.controller.keysign_store(),
                &self.controller,
                *round,
                prefix,
            )? {
                None => PresignProgress::Waiting,
                Some(_) if is_last => {
                    let runner = slot.take().expect("checked Some above");
                    PresignProgress::Finished(runner.finish()?)
                }
                Some(messages) => {
                    *round += 1;
                    PresignProgress::Broadcast(messages)
                }
            }
        };
        match progress {
            PresignProgress::Waiting => {}
            PresignProgress::Broadcast(messages) => {
                self.broadcast_tss(EnvelopeKind::TssKeysignMsg, messages)
                    .await?;
            }
            PresignProgress::Finished(offline) => {
                self.start_online_signing(offline).await?;
            }
        }
        Ok(())
    }

    async fn tick_online(&self) -> Result<()> {
        let ready = {
            let agg_ready = self
                .aggregator
                .lock()
                .unwrap()
                .as_ref()
                .map(|a| a.is_ready())
                .unwrap_or(false);
            agg_ready && self.online_driver.lock().unwrap().is_some()
        };
        if ready {
            self.finalize_keysign().await?;
        }
        Ok(())
    }

    async fn begin_keygen(&self) -> Result<()> {
        self.controller.begin(Operation::Keygen)?;
        let local = self.registry.local_descriptor()?;
        let parties = self.registry.sorted_parties()?;
        let params = Parameters {
            parties: parties.len() as u16,
            threshold: self.config.tss.threshold,
        };
        let driver = KeygenDriver::new(params, local.index as u16 + 1)
            .map_err(Self::to_core_err)?;
        let mut runner = SessionRunner::new(
            driver,
            local,
            parties,
            Operation::Keygen,
            rounds::keygen::ROUND_PREFIXES,
        );
        let messages = runner.start()?;
        *self.keygen_runner.lock().unwrap() = Some(runner);
        *self.keygen_round.lock().unwrap() = 1;
        self.broadcast_tss(EnvelopeKind::TssKeygenMsg, messages).await
    }

    async fn begin_keysign(
        &self,
        msg: Vec<u8>,
        _one_round_signing: bool,
    ) -> Result<()> {
        self.controller.begin(Operation::Keysign)?;
        *self.aggregator.lock().unwrap() =
            Some(SignatureAggregator::new(self.config.tss.quorum));
        *self.last_signature.lock().unwrap() = None;
        let scalar = tss_engine::message_to_scalar(&msg);
        tracing::debug!(scalar = %hex::encode(scalar), "keysign scalar computed");
        *self.pending_message.lock().unwrap() = Some(scalar);
        self.begin_presign().await
    }

    async fn begin_presign(&self) -> Result<()> {
        let key_share: KeyShare = self.key_store.load().await?;
        let local = self.registry.local_descriptor()?;
        let parties = self.registry.sorted_parties()?;
        let participants: Vec<u16> =
            parties.iter().map(|p| p.index as u16 + 1).collect();
        let driver = PreSignDriver::new(
            local.index as u16 + 1,
            participants,
            key_share,
        )
        .map_err(Self::to_core_err)?;
        let mut runner = SessionRunner::new(
            driver,
            local,
            parties,
            Operation::Keysign,
            rounds::keysign::ROUND_PREFIXES,
        );
        let messages = runner.start()?;
        *self.presign_runner.lock().unwrap() = Some(runner);
        *self.presign_round.lock().unwrap() = 1;
        self.broadcast_tss(EnvelopeKind::TssKeysignMsg, messages).await
    }

    async fn start_online_signing(&self, offline: OfflineResult) -> Result<()> {
        let local = self.registry.local_descriptor()?;
        let scalar = self
            .pending_message
            .lock()
            .unwrap()
            .ok_or(Error::NoPendingMessage)?;
        let mut driver =
            SignOnlineDriver::new(local.index as u16 + 1, offline, scalar)
                .map_err(Self::to_core_err)?;
        let (_, outgoing) = driver.proceed().map_err(Self::to_core_err)?;
        let share: Msg<PartialSignature> = outgoing
            .into_iter()
            .next()
            .ok_or(Error::NoPendingMessage)?
            .into();
        let share_bytes = serde_json::to_vec(&share.body)?;
        if let Some(aggregator) = self.aggregator.lock().unwrap().as_ref() {
            aggregator.seed_local_share(local.index, share_bytes.clone());
        }
        *self.online_driver.lock().unwrap() = Some(driver);
        self.broadcast(Envelope {
            kind: EnvelopeKind::TssKeysingOneRound,
            from: self.registry.local_id().clone(),
            pubkey: None,
            peer_addr: None,
            tss_message: None,
            keysign_request: None,
            si: Some(hex::encode(share_bytes)),
            party_id: Some(local.index),
            sent_time: Some(SystemTime::now()),
            communication_error: None,
        })
        .await
    }

    async fn finalize_keysign(&self) -> Result<()> {
        let Some(aggregator) = self.aggregator.lock().unwrap().take() else {
            return Ok(());
        };
        let Some(mut driver) = self.online_driver.lock().unwrap().take()
        else {
            return Ok(());
        };
        let local_index = self.registry.local_descriptor()?.index;
        for (index, bytes) in aggregator.take_shares() {
            if index == local_index {
                continue;
            }
            let body: PartialSignature = serde_json::from_slice(&bytes)?;
            driver
                .handle_incoming(Msg {
                    sender: index as u16 + 1,
                    receiver: None,
                    body,
                })
                .map_err(Self::to_core_err)?;
        }
        let signature = driver.finish().map_err(Self::to_core_err)?;
        *self.last_signature.lock().unwrap() = Some(signature);
        self.pending_message.lock().unwrap().take();
        self.controller.keysign_store().reset();
        self.controller.complete(Operation::Keysign);
        tracing::info!("threshold signature produced");
        Ok(())
    }

    async fn await_signature(&self) -> Result<Vec<u8>> {
        loop {
            if let Some(signature) =
                self.last_signature.lock().unwrap().clone()
            {
                return Ok(serde_json::to_vec(&signature)?);
            }
            let phase = self.controller.phase(Operation::Keysign);
            if matches!(phase, SessionPhase::Failed | SessionPhase::Canceled)
            {
                return Err(Error::KeysignFailed);
            }
            tokio::time::sleep(SIGNATURE_POLL_INTERVAL).await;
        }
    }

    fn reset_session(&self, operation: Operation) {
        match operation {
            Operation::Keygen => {
                self.keygen_runner.lock().unwrap().take();
                *self.keygen_round.lock().unwrap() = 1;
                self.controller.keygen_store().reset();
            }
            Operation::Keysign => {
                self.presign_runner.lock().unwrap().take();
                *self.presign_round.lock().unwrap() = 1;
                self.online_driver.lock().unwrap().take();
                self.aggregator.lock().unwrap().take();
                self.pending_message.lock().unwrap().take();
                self.controller.keysign_store().reset();
            }
        }
    }

    async fn send_handshake(&self, addr: SocketAddr) -> Result<()> {
        let envelope = Envelope {
            kind: EnvelopeKind::TssHandshakeMsg,
            from: self.registry.local_id().clone(),
            pubkey: Some(self.registry.local_id().to_string()),
            peer_addr: Some(self.transport.get_real_address()?.to_string()),
            tss_message: None,
            keysign_request: None,
            si: None,
            party_id: None,
            sent_time: Some(SystemTime::now()),
            communication_error: None,
        };
        self.transport.send(&envelope.to_json()?, addr).await?;
        Ok(())
    }

    async fn broadcast_tss(
        &self,
        kind: EnvelopeKind,
        messages: Vec<tss_protocol::ProtocolMessage>,
    ) -> Result<()> {
        for message in messages {
            self.broadcast(Envelope {
                kind,
                from: self.registry.local_id().clone(),
                pubkey: None,
                peer_addr: None,
                tss_message: Some(message),
                keysign_request: None,
                si: None,
                party_id: None,
                sent_time: Some(SystemTime::now()),
                communication_error: None,
            })
            .await?;
        }
        Ok(())
    }

    async fn broadcast(&self, envelope: Envelope) -> Result<()> {
        let bytes = envelope.to_json()?;
        for peer in self.registry.peer_addresses() {
            self.transport.send(&bytes, peer).await?;
        }
        Ok(())
    }

    /// Broadcast a disconnect notice to every known peer, bounded to
    /// 5 seconds so a hung peer never blocks shutdown.
    ///
    /// Grounded in the coordinator's graceful-shutdown signal handler,
    /// which gives outstanding disconnect broadcasts a fixed grace
    /// period before the process exits regardless.
    pub async fn disconnect(&self) {
        let envelope = Envelope {
            kind: EnvelopeKind::TssDisconnectMsg,
            from: self.registry.local_id().clone(),
            pubkey: None,
            peer_addr: self
                .transport
                .get_real_address()
                .ok()
                .map(|a| a.to_string()),
            tss_message: None,
            keysign_request: None,
            si: None,
            party_id: None,
            sent_time: Some(SystemTime::now()),
            communication_error: None,
        };
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            self.broadcast(envelope),
        )
        .await;
        match result {
            Ok(Ok(())) => tracing::info!("disconnect broadcast to all peers"),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "disconnect broadcast failed")
            }
            Err(_) => {
                tracing::warn!("disconnect broadcast timed out after 5s")
            }
        }
    }

    /// Raise a [`CommunicationError`] for `operation`, cancel it
    /// locally and broadcast the cancellation to every peer.
    pub async fn abort(&self, operation: Operation) -> Result<()> {
        let error = CommunicationError {
            peer_id: self.registry.local_id().clone(),
            operation,
            time: SystemTime::now(),
        };
        if self.controller.cancel(operation, error.clone()).is_err() {
            self.reset_session(operation);
        }
        self.broadcast(self.dispatcher.cancel_envelope(&error)).await
    }

    fn to_core_err(e: tss_engine::Error) -> tss_core::Error {
        tss_core::Error::Engine(e.to_string())
    }
}
