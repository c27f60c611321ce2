//! Per-stream swarm task. One tokio task owns the coordinator; everything else talks
//! to it through channels.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use shoal_core::identity::{self, SWARM_ID_LEN};
use shoal_core::{Action, OutboundAction, PeerId, Playback, Segment, Stream, SwarmCoordinator};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::NodeConfig;
use crate::http::{FetchError, SegmentFetcher};
use crate::storage::SegmentStore;
use crate::transport::{FrameSender, TransportEvent};

enum Command {
    Download {
        segment_id: String,
        reply: oneshot::Sender<Option<Bytes>>,
    },
    IsLoadingOrLoaded {
        segment_id: String,
        reply: oneshot::Sender<bool>,
    },
    ConnectedPeers {
        reply: oneshot::Sender<usize>,
    },
    UpdatePlayback {
        playback: Playback,
        last_requested: String,
    },
    StorageChanged,
    Destroy {
        reply: oneshot::Sender<()>,
    },
}

type HttpResult = (String, Result<Bytes, FetchError>);

/// Handle to a running swarm for one stream. Dropping it tears the swarm down.
pub struct StreamSwarm {
    swarm_id: [u8; SWARM_ID_LEN],
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl StreamSwarm {
    /// Start the owning task. `events` carries the transport's view of this stream's peers;
    /// `manifest_url` scopes the swarm to one rendition of one manifest.
    pub fn spawn<S, F>(
        stream: Stream,
        manifest_url: &str,
        config: &NodeConfig,
        storage: Arc<S>,
        fetcher: Arc<F>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self
    where
        S: SegmentStore + Send + Sync + 'static,
        F: SegmentFetcher,
    {
        let swarm_id = identity::swarm_id(&stream.external_id(manifest_url));
        let coordinator = SwarmCoordinator::new(stream, config.swarm.clone(), Arc::clone(&storage));
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (http_tx, http_rx) = mpsc::unbounded_channel();
        let task = SwarmTask {
            coordinator,
            storage,
            fetcher,
            senders: HashMap::new(),
            waiters: HashMap::new(),
            http_tasks: HashMap::new(),
            http_tx,
        };
        let tick = Duration::from_millis(config.tick_interval_ms.max(1));
        let task = tokio::spawn(task.run(commands_rx, events, http_rx, tick));
        Self {
            swarm_id,
            commands,
            task,
        }
    }

    /// Tracker rendezvous key; peers with the same key share this swarm.
    pub fn swarm_id(&self) -> [u8; SWARM_ID_LEN] {
        self.swarm_id
    }

    /// Fetch a segment from the swarm. `None` when no peer can serve it or the
    /// request failed; the caller then loads it over HTTP.
    pub async fn download_segment(&self, segment_id: &str) -> Option<Bytes> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Download {
                segment_id: segment_id.to_string(),
                reply,
            })
            .ok()?;
        rx.await.ok().flatten()
    }

    pub async fn is_loading_or_loaded_by_someone(&self, segment_id: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        let cmd = Command::IsLoadingOrLoaded {
            segment_id: segment_id.to_string(),
            reply,
        };
        if self.commands.send(cmd).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub async fn connected_peer_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::ConnectedPeers { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// New playback position: rebuild the load queue and start fetches.
    pub fn update_playback(&self, playback: Playback, last_requested: impl Into<String>) {
        let _ = self.commands.send(Command::UpdatePlayback {
            playback,
            last_requested: last_requested.into(),
        });
    }

    /// Local storage changed outside the swarm (e.g. eviction).
    pub fn notify_storage_changed(&self) {
        let _ = self.commands.send(Command::StorageChanged);
    }

    /// Close every peer, cancel HTTP fetches and stop the task. Never fails.
    pub async fn destroy(self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Destroy { reply }).is_ok() {
            let _ = rx.await;
        }
        if let Err(e) = self.task.await {
            warn!("swarm task ended abnormally: {e}");
        }
    }
}

struct SwarmTask<S, F> {
    coordinator: SwarmCoordinator<Arc<S>>,
    storage: Arc<S>,
    fetcher: Arc<F>,
    senders: HashMap<PeerId, FrameSender>,
    waiters: HashMap<String, Vec<oneshot::Sender<Option<Bytes>>>>,
    http_tasks: HashMap<String, CancellationToken>,
    http_tx: mpsc::UnboundedSender<HttpResult>,
}

impl<S, F> SwarmTask<S, F>
where
    S: SegmentStore + Send + Sync + 'static,
    F: SegmentFetcher,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut http_rx: mpsc::UnboundedReceiver<HttpResult>,
        tick_interval: Duration,
    ) {
        let mut tick = tokio::time::interval(tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Destroy { reply }) => {
                        self.destroy();
                        let _ = reply.send(());
                        break;
                    }
                    Some(cmd) => self.on_command(cmd),
                    None => {
                        self.destroy();
                        break;
                    }
                },
                Some(event) = events.recv() => self.on_transport_event(event),
                Some((segment_id, result)) = http_rx.recv() => self.on_http_done(segment_id, result),
                _ = tick.tick() => {
                    let actions = self.coordinator.tick();
                    self.apply(actions);
                    let actions = self.coordinator.process_queue();
                    self.apply(actions);
                }
            }
        }
        debug!(stream = %self.coordinator.stream().local_id, "swarm task stopped");
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Download { segment_id, reply } => {
                match self.coordinator.download_segment(&segment_id) {
                    Action::Request { peer, frame } => {
                        self.waiters.entry(segment_id).or_default().push(reply);
                        self.apply(vec![OutboundAction::SendMessage(peer, frame)]);
                    }
                    Action::Pending { .. } | Action::HttpPending => {
                        self.waiters.entry(segment_id).or_default().push(reply);
                    }
                    Action::Fallback => {
                        let _ = reply.send(None);
                    }
                }
            }
            Command::IsLoadingOrLoaded { segment_id, reply } => {
                let _ = reply.send(self.coordinator.is_loading_or_loaded_by_someone(&segment_id));
            }
            Command::ConnectedPeers { reply } => {
                let _ = reply.send(self.coordinator.connected_peer_count());
            }
            Command::UpdatePlayback {
                playback,
                last_requested,
            } => {
                let actions = self.coordinator.update_queue(playback, &last_requested);
                self.apply(actions);
                let actions = self.coordinator.process_queue();
                self.apply(actions);
            }
            Command::StorageChanged => {
                let actions = self.coordinator.on_storage_changed();
                self.apply(actions);
                let actions = self.coordinator.process_queue();
                self.apply(actions);
            }
            // Handled by the run loop.
            Command::Destroy { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Discovered(peer) => self.coordinator.on_peer_discovered(peer),
            TransportEvent::Connecting(peer) => self.coordinator.on_peer_connecting(peer),
            TransportEvent::Connected { peer, sender } => {
                self.senders.insert(peer, sender);
                let actions = self.coordinator.on_peer_connected(peer);
                self.apply(actions);
            }
            TransportEvent::Message { peer, bytes } => {
                match self.coordinator.on_message_received(peer, &bytes) {
                    Ok(actions) => self.apply(actions),
                    Err(e) => warn!(peer = %peer, "dropping message: {e}"),
                }
            }
            TransportEvent::Closed(peer) => {
                self.senders.remove(&peer);
                let actions = self.coordinator.on_peer_closed(peer);
                self.apply(actions);
            }
            TransportEvent::Warning(msg) => warn!("transport: {msg}"),
            TransportEvent::Error(msg) => error!("transport: {msg}"),
        }
    }

    fn on_http_done(&mut self, segment_id: String, result: Result<Bytes, FetchError>) {
        // Aborted fetches were already released by the coordinator.
        if self.http_tasks.remove(&segment_id).is_none() {
            return;
        }
        match result {
            Ok(bytes) => {
                debug!(segment = %segment_id, len = bytes.len(), "http fetch done");
                let stream_id = self.coordinator.stream().local_id.clone();
                self.storage.store(&stream_id, &segment_id, bytes.clone());
                self.resolve(&segment_id, Some(bytes));
            }
            Err(e) => {
                warn!(segment = %segment_id, "http fetch failed: {e}");
                self.resolve(&segment_id, None);
            }
        }
        let actions = self.coordinator.on_http_finished(&segment_id);
        self.apply(actions);
    }

    /// Perform coordinator actions; actions they trigger are performed too.
    fn apply(&mut self, actions: Vec<OutboundAction>) {
        let mut work: VecDeque<OutboundAction> = actions.into();
        while let Some(action) = work.pop_front() {
            match action {
                OutboundAction::SendMessage(peer, frame) => {
                    let sent = self
                        .senders
                        .get(&peer)
                        .is_some_and(|tx| tx.send(frame).is_ok());
                    if !sent {
                        debug!(peer = %peer, "peer channel gone, closing");
                        self.senders.remove(&peer);
                        work.extend(self.coordinator.on_peer_closed(peer));
                    }
                }
                OutboundAction::FetchHttp(segment) => self.spawn_fetch(segment),
                OutboundAction::AbortHttp(segment_id) => {
                    if let Some(token) = self.http_tasks.remove(&segment_id) {
                        token.cancel();
                    }
                    self.resolve(&segment_id, None);
                }
                OutboundAction::ClosePeer(peer) => {
                    self.senders.remove(&peer);
                }
                OutboundAction::SegmentLoaded {
                    segment_id,
                    peer,
                    payload,
                } => {
                    debug!(peer = %peer, segment = %segment_id, len = payload.len(), "segment loaded from peer");
                    let bytes = Bytes::from(payload);
                    let stream_id = self.coordinator.stream().local_id.clone();
                    self.storage.store(&stream_id, &segment_id, bytes.clone());
                    self.resolve(&segment_id, Some(bytes));
                    work.extend(self.coordinator.on_storage_changed());
                }
                OutboundAction::RequestFailed {
                    segment_id,
                    peer,
                    reason,
                } => {
                    debug!(peer = %peer, segment = %segment_id, ?reason, "peer request failed");
                    self.resolve(&segment_id, None);
                }
            }
        }
    }

    fn spawn_fetch(&mut self, segment: Segment) {
        let token = CancellationToken::new();
        self.http_tasks
            .insert(segment.local_id.clone(), token.clone());
        let fetcher = Arc::clone(&self.fetcher);
        let done = self.http_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => Err(FetchError::Cancelled),
                r = fetcher.fetch(&segment) => r,
            };
            let _ = done.send((segment.local_id, result));
        });
    }

    fn resolve(&mut self, segment_id: &str, bytes: Option<Bytes>) {
        for waiter in self.waiters.remove(segment_id).unwrap_or_default() {
            let _ = waiter.send(bytes.clone());
        }
    }

    fn destroy(&mut self) {
        let actions = self.coordinator.destroy();
        self.apply(actions);
        for (_, token) in self.http_tasks.drain() {
            token.cancel();
        }
        self.senders.clear();
        for (_, waiters) in self.waiters.drain() {
            for waiter in waiters {
                let _ = waiter.send(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use shoal_core::{wire, Announcement, PeerMessage, SegmentStorage, StreamKind, SwarmConfig};
    use tokio::sync::Semaphore;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::storage::MemoryStorage;

    const STREAM: &str = "video-0";
    const MANIFEST: &str = "https://cdn.example/master.m3u8";

    fn stream(count: u32) -> Stream {
        let mut s = Stream::new(STREAM, StreamKind::Video, 0);
        for i in 0..count {
            s.push_segment(Segment {
                local_id: format!("s{i}"),
                external_id: i64::from(i),
                url: format!("https://cdn.example/{i}.ts"),
                byte_range: None,
                start_time: f64::from(i * 2),
                end_time: f64::from(i * 2 + 2),
            });
        }
        s
    }

    #[derive(Default)]
    struct FakeFetcher {
        bodies: HashMap<String, Bytes>,
        calls: AtomicUsize,
        /// When set, each fetch holds until a permit is added.
        gate: Option<Semaphore>,
    }

    impl SegmentFetcher for FakeFetcher {
        async fn fetch(&self, segment: &Segment) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            match self.bodies.get(&segment.url) {
                Some(b) => Ok(b.clone()),
                None => std::future::pending().await,
            }
        }
    }

    struct Harness {
        swarm: StreamSwarm,
        events: mpsc::UnboundedSender<TransportEvent>,
        storage: Arc<MemoryStorage>,
        fetcher: Arc<FakeFetcher>,
    }

    fn harness(config: NodeConfig, fetcher: FakeFetcher) -> Harness {
        crate::logging::init();
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(fetcher);
        let (events, events_rx) = mpsc::unbounded_channel();
        let swarm = StreamSwarm::spawn(
            stream(50),
            MANIFEST,
            &config,
            Arc::clone(&storage),
            Arc::clone(&fetcher),
            events_rx,
        );
        Harness {
            swarm,
            events,
            storage,
            fetcher,
        }
    }

    fn quiet_config() -> NodeConfig {
        NodeConfig {
            tick_interval_ms: 20,
            ..NodeConfig::default()
        }
    }

    async fn eventually(mut cond: impl FnMut() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !cond() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    async fn recv_msg(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> PeerMessage {
        let frame = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no frame in time")
            .expect("peer channel closed");
        wire::decode_frame(&frame).unwrap().0
    }

    async fn connect(h: &Harness) -> (PeerId, mpsc::UnboundedReceiver<Vec<u8>>) {
        let peer = PeerId::generate();
        let (tx, mut rx) = mpsc::unbounded_channel();
        h.events.send(TransportEvent::Connecting(peer)).unwrap();
        h.events
            .send(TransportEvent::Connected { peer, sender: tx })
            .unwrap();
        assert!(matches!(recv_msg(&mut rx).await, PeerMessage::Announcement { .. }));
        (peer, rx)
    }

    fn announce(h: &Harness, peer: PeerId, loaded: &[i64]) {
        let payload = Announcement::new(loaded.iter().copied(), [])
            .encode()
            .unwrap();
        let bytes = wire::encode_frame(&PeerMessage::Announcement { payload }).unwrap();
        h.events
            .send(TransportEvent::Message { peer, bytes })
            .unwrap();
    }

    #[tokio::test]
    async fn no_peers_means_unavailable() {
        let h = harness(quiet_config(), FakeFetcher::default());
        assert_eq!(h.swarm.download_segment("s3").await, None);
        assert_eq!(h.swarm.connected_peer_count().await, 0);
        h.swarm.destroy().await;
    }

    #[tokio::test]
    async fn swarm_id_follows_manifest_rendition() {
        let h = harness(quiet_config(), FakeFetcher::default());
        let expected = shoal_core::swarm_id("https://cdn.example/master.m3u8-video-0");
        assert_eq!(h.swarm.swarm_id(), expected);
        h.swarm.destroy().await;
    }

    #[tokio::test]
    async fn download_waits_for_inflight_http_fetch() {
        let fetcher = FakeFetcher {
            bodies: [("https://cdn.example/0.ts".to_string(), Bytes::from_static(b"zero"))]
                .into_iter()
                .collect(),
            gate: Some(Semaphore::new(0)),
            ..FakeFetcher::default()
        };
        let config = NodeConfig {
            tick_interval_ms: 20,
            swarm: SwarmConfig {
                high_demand_time_window: 2.0,
                http_download_time_window: 2.0,
                p2p_download_time_window: 2.0,
                ..SwarmConfig::default()
            },
            ..NodeConfig::default()
        };
        let h = harness(config, fetcher);
        let (peer, mut rx) = connect(&h).await;
        announce(&h, peer, &[0]);
        for _ in 0..500 {
            if h.swarm.is_loading_or_loaded_by_someone("s0").await {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        // s0 is high-demand, so it goes over HTTP even though the peer has it.
        h.swarm.update_playback(Playback::default(), "s0");
        let fetcher = Arc::clone(&h.fetcher);
        eventually(|| fetcher.calls.load(Ordering::SeqCst) == 1).await;

        let download = h.swarm.download_segment("s0");
        let release = async {
            sleep(Duration::from_millis(50)).await;
            if let Some(gate) = &h.fetcher.gate {
                gate.add_permits(1);
            }
        };
        let (got, ()) = tokio::join!(download, release);
        assert_eq!(got.as_deref(), Some(&b"zero"[..]));

        while let Ok(frame) = rx.try_recv() {
            let msg = wire::decode_frame(&frame).unwrap().0;
            assert!(
                !matches!(msg, PeerMessage::SegmentRequest { .. }),
                "segment already on HTTP was requested from a peer"
            );
        }
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
        h.swarm.destroy().await;
    }

    #[tokio::test]
    async fn downloads_from_announcing_peer() {
        let h = harness(quiet_config(), FakeFetcher::default());
        let (peer, mut rx) = connect(&h).await;
        announce(&h, peer, &[3]);
        for _ in 0..500 {
            if h.swarm.is_loading_or_loaded_by_someone("s3").await {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(h.swarm.connected_peer_count().await, 1);

        let swarm = &h.swarm;
        let download = swarm.download_segment("s3");
        let serve = async {
            assert_eq!(recv_msg(&mut rx).await, PeerMessage::SegmentRequest { id: 3 });
            let bytes = wire::encode_frame(&PeerMessage::SegmentData {
                id: 3,
                payload: b"three".to_vec(),
            })
            .unwrap();
            h.events
                .send(TransportEvent::Message { peer, bytes })
                .unwrap();
        };
        let (got, ()) = tokio::join!(download, serve);
        assert_eq!(got.as_deref(), Some(&b"three"[..]));
        assert!(h.storage.has_segment(STREAM, "s3"));

        // Our new holding is announced back.
        let PeerMessage::Announcement { payload } = recv_msg(&mut rx).await else {
            panic!("expected announcement");
        };
        assert!(Announcement::decode(&payload).unwrap().loaded.contains(&3));
        h.swarm.destroy().await;
    }

    #[tokio::test]
    async fn peer_absence_resolves_to_none() {
        let h = harness(quiet_config(), FakeFetcher::default());
        let (peer, mut rx) = connect(&h).await;
        announce(&h, peer, &[5]);
        for _ in 0..500 {
            if h.swarm.is_loading_or_loaded_by_someone("s5").await {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        let download = h.swarm.download_segment("s5");
        let serve = async {
            assert_eq!(recv_msg(&mut rx).await, PeerMessage::SegmentRequest { id: 5 });
            let bytes = wire::encode_frame(&PeerMessage::SegmentAbsent { id: 5 }).unwrap();
            h.events
                .send(TransportEvent::Message { peer, bytes })
                .unwrap();
        };
        let (got, ()) = tokio::join!(download, serve);
        assert_eq!(got, None);
        h.swarm.destroy().await;
    }

    #[tokio::test]
    async fn serves_stored_segments_to_peers() {
        let h = harness(quiet_config(), FakeFetcher::default());
        h.storage.store(STREAM, "s7", Bytes::from_static(b"seven"));
        let (peer, mut rx) = connect(&h).await;
        let bytes = wire::encode_frame(&PeerMessage::SegmentRequest { id: 7 }).unwrap();
        h.events
            .send(TransportEvent::Message { peer, bytes })
            .unwrap();
        assert_eq!(
            recv_msg(&mut rx).await,
            PeerMessage::SegmentData {
                id: 7,
                payload: b"seven".to_vec()
            }
        );
        h.swarm.destroy().await;
    }

    #[tokio::test]
    async fn playback_update_fetches_high_demand_over_http() {
        let bodies = (0..50)
            .map(|i| (format!("https://cdn.example/{i}.ts"), Bytes::from(format!("body-{i}"))))
            .collect();
        let fetcher = FakeFetcher {
            bodies,
            ..FakeFetcher::default()
        };
        let config = NodeConfig {
            tick_interval_ms: 20,
            swarm: SwarmConfig {
                high_demand_time_window: 4.0,
                http_download_time_window: 4.0,
                p2p_download_time_window: 4.0,
                ..SwarmConfig::default()
            },
            ..NodeConfig::default()
        };
        let h = harness(config, fetcher);
        h.swarm.update_playback(Playback::default(), "s0");
        let storage = Arc::clone(&h.storage);
        eventually(|| storage.has_segment(STREAM, "s0") && storage.has_segment(STREAM, "s1")).await;
        assert_eq!(h.storage.get(STREAM, "s1").unwrap(), Bytes::from("body-1"));
        assert!(!h.storage.has_segment(STREAM, "s2"));
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 2);
        h.swarm.destroy().await;
    }

    #[tokio::test]
    async fn malformed_frames_do_not_stop_the_swarm() {
        let h = harness(quiet_config(), FakeFetcher::default());
        let (peer, _rx) = connect(&h).await;
        h.events
            .send(TransportEvent::Message {
                peer,
                bytes: vec![0xff; 3],
            })
            .unwrap();
        h.events
            .send(TransportEvent::Warning("tracker slow".to_string()))
            .unwrap();
        h.events
            .send(TransportEvent::Error("tracker unreachable".to_string()))
            .unwrap();
        sleep(Duration::from_millis(20)).await;
        assert_eq!(h.swarm.connected_peer_count().await, 1);
        h.swarm.destroy().await;
    }

    #[tokio::test]
    async fn destroy_closes_peer_channels() {
        let h = harness(quiet_config(), FakeFetcher::default());
        let (_a, mut rx_a) = connect(&h).await;
        let (_b, mut rx_b) = connect(&h).await;
        h.swarm.destroy().await;
        assert!(timeout(Duration::from_secs(5), rx_a.recv()).await.unwrap().is_none());
        assert!(timeout(Duration::from_secs(5), rx_b.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closed_peer_is_forgotten() {
        let h = harness(quiet_config(), FakeFetcher::default());
        let (peer, _rx) = connect(&h).await;
        h.events.send(TransportEvent::Closed(peer)).unwrap();
        h.events.send(TransportEvent::Closed(peer)).unwrap();
        for _ in 0..500 {
            if h.swarm.connected_peer_count().await == 0 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(h.swarm.connected_peer_count().await, 0);
        h.swarm.destroy().await;
    }
}
