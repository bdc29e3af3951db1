//! Connection lifecycle and sample ingestion.
//!
//! A [`Monitor`] owns one channel provider, the connection state, and
//! the rolling history of each sample family. Inbound messages are
//! processed by a single pump task per connection, in arrival order.
//!
//! ```text
//!  connect()                 open ok              transport lost
//!  Idle ───────▶ Connecting ─────────▶ Connected ─────────────▶ Disconnected
//!                    │                                              ▲
//!                    │ open failed                                  │ disconnect()
//!                    ▼                                              │ (any state)
//!                Errored(reason) ───────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::data::benchmark::Metric;
use crate::data::evaluation::{evaluate, MetricReport};
use crate::data::history::{HistoryWindow, DEFAULT_HISTORY_SIZE};
use crate::data::sample::{ExperienceSample, InboundMessage, ServiceSample, StreamDescriptor};
use crate::source::{ChannelEvent, ChannelProvider, LISTENER_CAPACITY};

/// Lifecycle state of the metrics connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    /// The last connect attempt failed; carries a user-facing reason.
    Errored(String),
}

impl ConnectionState {
    /// Whether `connect()` may start a new attempt from this state.
    pub fn can_connect(&self) -> bool {
        matches!(
            self,
            ConnectionState::Idle | ConnectionState::Disconnected | ConnectionState::Errored(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Errored(_) => "Error",
        }
    }
}

/// Read-only snapshot of everything the monitor exposes.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorView {
    pub state: ConnectionState,
    /// Description of the channel provider.
    pub source: String,
    /// Experience history, oldest first.
    pub experience: Vec<ExperienceSample>,
    /// Service history, oldest first.
    pub service: Vec<ServiceSample>,
    pub descriptor: Option<StreamDescriptor>,
    /// Latest classification per metric.
    pub reports: BTreeMap<Metric, MetricReport>,
    /// Most recent decode error or remote error notice.
    pub notice: Option<String>,
    /// Local receive time of the newest accepted message, in ms since the Unix epoch.
    pub last_update: Option<u64>,
}

impl MonitorView {
    pub fn latest_experience(&self) -> Option<&ExperienceSample> {
        self.experience.last()
    }

    pub fn latest_service(&self) -> Option<&ServiceSample> {
        self.service.last()
    }

    pub fn report(&self, metric: Metric) -> Option<&MetricReport> {
        self.reports.get(&metric)
    }
}

/// Mutable monitor state, only touched under the core lock.
struct Core<H> {
    state: ConnectionState,
    /// Bumped by every connect attempt and disconnect; stale work compares against it.
    epoch: u64,
    channel: Option<H>,
    pump: Option<JoinHandle<()>>,
    experience: HistoryWindow<ExperienceSample>,
    service: HistoryWindow<ServiceSample>,
    descriptor: Option<StreamDescriptor>,
    reports: BTreeMap<Metric, MetricReport>,
    notice: Option<String>,
    last_update: Option<u64>,
    /// Connected view captured just before the last connection was torn down.
    last_session: Option<MonitorView>,
}

impl<H> Core<H> {
    fn new(history_capacity: usize) -> Self {
        Self {
            state: ConnectionState::Idle,
            epoch: 0,
            channel: None,
            pump: None,
            experience: HistoryWindow::new(history_capacity),
            service: HistoryWindow::new(history_capacity),
            descriptor: None,
            reports: BTreeMap::new(),
            notice: None,
            last_update: None,
            last_session: None,
        }
    }

    fn is_current(&self, epoch: u64, state: &ConnectionState) -> bool {
        self.epoch == epoch && &self.state == state
    }

    fn clear_history(&mut self) {
        self.experience.clear();
        self.service.clear();
        self.descriptor = None;
        self.reports.clear();
        self.last_update = None;
    }

    fn touch(&mut self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_update = Some(now);
    }

    fn record(&mut self, reports: Vec<MetricReport>) {
        for report in reports {
            self.reports.insert(report.metric, report);
        }
    }
}

struct Shared<P: ChannelProvider> {
    provider: P,
    core: Mutex<Core<P::Handle>>,
    updates: watch::Sender<MonitorView>,
}

impl<P: ChannelProvider> Shared<P> {
    fn view(&self, core: &Core<P::Handle>) -> MonitorView {
        MonitorView {
            state: core.state.clone(),
            source: self.provider.description().to_string(),
            experience: core.experience.to_vec(),
            service: core.service.to_vec(),
            descriptor: core.descriptor.clone(),
            reports: core.reports.clone(),
            notice: core.notice.clone(),
            last_update: core.last_update.clone(),
        }
    }

    fn publish(&self, core: &Core<P::Handle>) {
        self.updates.send_replace(self.view(core));
    }

    /// Close the open channel and stop the pump, if any.
    fn release(&self, core: &mut Core<P::Handle>) {
        if let Some(handle) = core.channel.take() {
            self.provider.close(handle);
        }
        if let Some(pump) = core.pump.take() {
            pump.abort();
        }
    }

    async fn establish(self: Arc<Self>, epoch: u64) -> ConnectionState {
        let (tx, rx) = mpsc::channel(LISTENER_CAPACITY);
        let result = self.provider.open(tx).await;

        let mut core = self.core.lock();
        if !core.is_current(epoch, &ConnectionState::Connecting) {
            // Superseded by a disconnect while the open was in flight.
            if let Ok(handle) = result {
                self.provider.close(handle);
            }
            debug!(epoch, state = ?core.state, "discarding stale connect completion");
            return core.state.clone();
        }

        match result {
            Ok(handle) => {
                core.clear_history();
                core.channel = Some(handle);
                core.state = ConnectionState::Connected;
                core.pump = Some(tokio::spawn(self.clone().pump(epoch, rx)));
                info!(source = self.provider.description(), "connected");
            }
            Err(e) => {
                warn!(source = self.provider.description(), error = %e, "connect failed");
                core.state = ConnectionState::Errored(e.user_reason());
            }
        }

        self.publish(&core);
        core.state.clone()
    }

    async fn pump(self: Arc<Self>, epoch: u64, mut rx: mpsc::Receiver<ChannelEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                ChannelEvent::Message(raw) => {
                    if !self.ingest(epoch, &raw) {
                        return;
                    }
                }
                ChannelEvent::Closed(reason) => {
                    self.transport_lost(epoch, reason);
                    return;
                }
            }
        }
        self.transport_lost(epoch, None);
    }

    /// Decode and apply one message. Returns false once the connection is stale.
    fn ingest(&self, epoch: u64, raw: &[u8]) -> bool {
        let decoded = InboundMessage::decode(raw);

        let mut core = self.core.lock();
        if !core.is_current(epoch, &ConnectionState::Connected) {
            return false;
        }

        match decoded {
            Ok(InboundMessage::Qoe(sample)) => {
                core.touch();
                core.experience.push(sample);
                let reports = evaluate(&core.experience);
                core.record(reports);
            }
            Ok(InboundMessage::Qos(sample)) => {
                core.touch();
                core.service.push(sample);
                let reports = evaluate(&core.service);
                core.record(reports);
            }
            Ok(InboundMessage::Metadata(descriptor)) => {
                core.touch();
                core.descriptor = Some(descriptor);
            }
            Ok(InboundMessage::Error(notice)) => {
                warn!(message = %notice.message, "remote error notice");
                core.notice = Some(format!("Remote error: {}", notice.message));
            }
            Err(e) => {
                warn!(error = %e, "dropping undecodable message");
                core.notice = Some(e.to_string());
            }
        }

        self.publish(&core);
        true
    }

    fn transport_lost(&self, epoch: u64, reason: Option<String>) {
        let mut core = self.core.lock();
        if !core.is_current(epoch, &ConnectionState::Connected) {
            return;
        }

        let reason = reason.unwrap_or_else(|| "Channel closed".to_string());
        warn!(source = self.provider.description(), %reason, "transport lost");

        core.epoch += 1;
        self.release(&mut core);
        self.keep_session(&mut core);
        core.clear_history();
        core.state = ConnectionState::Disconnected;
        core.notice = Some(reason);
        self.publish(&core);
    }

    /// Keep the connected view around before history is cleared.
    fn keep_session(&self, core: &mut Core<P::Handle>) {
        if core.state == ConnectionState::Connected {
            core.last_session = Some(self.view(core));
        }
    }

    fn disconnect(&self) {
        let mut core = self.core.lock();
        core.epoch += 1;
        self.release(&mut core);
        self.keep_session(&mut core);
        core.clear_history();
        core.notice = None;
        if core.state != ConnectionState::Disconnected {
            info!(source = self.provider.description(), "disconnected");
            core.state = ConnectionState::Disconnected;
        }
        self.publish(&core);
    }
}

/// Live telemetry monitor over one channel provider.
///
/// Dropping the monitor disconnects it, releasing any open channel.
///
/// # Example
///
/// ```
/// use streamwatch::{ConnectionState, Monitor, ReplayProvider};
///
/// # tokio_test::block_on(async {
/// let message = br#"{"type":"qos","data":{"latency":42,"throughput":9500,
///     "packetLoss":0.05,"jitter":12,"connectionStability":99.95,
///     "timestamp":"2024-05-01T12:00:00Z"}}"#;
/// let monitor = Monitor::new(ReplayProvider::new(vec![message.to_vec()]), 30);
///
/// let attempt = monitor.connect().expect("idle monitor starts an attempt");
/// assert_eq!(attempt.await.unwrap(), ConnectionState::Connected);
/// # });
/// ```
pub struct Monitor<P: ChannelProvider> {
    shared: Arc<Shared<P>>,
}

impl<P: ChannelProvider> Monitor<P> {
    /// Create an idle monitor keeping `history_capacity` samples per family.
    pub fn new(provider: P, history_capacity: usize) -> Self {
        let core = Core::new(history_capacity);
        let initial = MonitorView {
            state: ConnectionState::Idle,
            source: provider.description().to_string(),
            experience: Vec::new(),
            service: Vec::new(),
            descriptor: None,
            reports: BTreeMap::new(),
            notice: None,
            last_update: None,
        };
        let (updates, _) = watch::channel(initial);

        Self {
            shared: Arc::new(Shared {
                provider,
                core: Mutex::new(core),
                updates,
            }),
        }
    }

    /// Create an idle monitor with the default history size.
    pub fn with_provider(provider: P) -> Self {
        Self::new(provider, DEFAULT_HISTORY_SIZE)
    }

    /// Start a connect attempt.
    ///
    /// Returns a handle resolving to the state the attempt settled in, or
    /// `None` when an attempt is already in flight or the monitor is
    /// connected. Must be called within a tokio runtime.
    pub fn connect(&self) -> Option<JoinHandle<ConnectionState>> {
        let epoch = {
            let mut core = self.shared.core.lock();
            if !core.state.can_connect() {
                debug!(state = ?core.state, "connect ignored");
                return None;
            }
            core.epoch += 1;
            core.state = ConnectionState::Connecting;
            core.notice = None;
            info!(source = self.shared.provider.description(), "connecting");
            self.shared.publish(&core);
            core.epoch
        };

        let shared = self.shared.clone();
        Some(tokio::spawn(shared.establish(epoch)))
    }

    /// Disconnect, release the channel and clear history. Safe in any state.
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.core.lock().state.clone()
    }

    /// Snapshot of the current state, samples, history and reports.
    pub fn view(&self) -> MonitorView {
        self.shared.updates.borrow().clone()
    }

    /// The last connected view, as it stood when that connection ended.
    ///
    /// Updates delivered through [`Monitor::subscribe`] coalesce, so a
    /// short-lived connection may never be observed there with samples.
    pub fn last_session(&self) -> Option<MonitorView> {
        self.shared.core.lock().last_session.clone()
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<MonitorView> {
        self.shared.updates.subscribe()
    }

    pub fn provider(&self) -> &P {
        &self.shared.provider
    }
}

impl<P: ChannelProvider> Drop for Monitor<P> {
    fn drop(&mut self) {
        self.shared.disconnect();
    }
}

impl<P: ChannelProvider> std::fmt::Debug for Monitor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("provider", &self.shared.provider)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::classify::{Direction, Status};
    use crate::source::ReplayProvider;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn qos(latency: f64) -> Vec<u8> {
        format!(
            r#"{{"type":"qos","data":{{"latency":{},"throughput":9500,"packetLoss":0.05,
            "jitter":12,"connectionStability":99.95,"timestamp":"t{}"}}}}"#,
            latency, latency
        )
        .into_bytes()
    }

    fn qoe(bitrate: f64) -> Vec<u8> {
        format!(
            r#"{{"type":"qoe","data":{{"bufferRatio":0.3,"averageBitrate":{},"startupTime":900,
            "qualitySwitches":1,"rebufferingFrequency":0.05,"timestamp":"t"}}}}"#,
            bitrate
        )
        .into_bytes()
    }

    fn metadata() -> Vec<u8> {
        br#"{"type":"metadata","data":{"protocol":"HLS","format":"MPEG-TS","codec":"H.264/AAC",
            "resolution":"1080p","frameRate":30,"cdnProvider":"Amazon CloudFront",
            "region":"us-west-1","edgeServer":"SFO53-C1","timestamp":"m"}}"#
            .to_vec()
    }

    async fn wait_until<F>(rx: &mut watch::Receiver<MonitorView>, f: F) -> MonitorView
    where
        F: FnMut(&MonitorView) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(f))
            .await
            .expect("timed out waiting for monitor")
            .expect("monitor dropped")
            .clone()
    }

    #[tokio::test]
    async fn test_connect_ingests_and_classifies() {
        let provider = ReplayProvider::new(vec![qos(50.0), qos(55.0), qoe(3000.0), metadata()]);
        let monitor = Monitor::new(provider, 30);
        let mut rx = monitor.subscribe();

        let state = monitor.connect().unwrap().await.unwrap();
        assert_eq!(state, ConnectionState::Connected);

        let view = wait_until(&mut rx, |v| v.descriptor.is_some()).await;
        assert_eq!(view.state, ConnectionState::Connected);
        assert_eq!(view.service.len(), 2);
        assert_eq!(view.experience.len(), 1);
        assert_eq!(view.latest_service().unwrap().latency, 55.0);
        assert_eq!(view.descriptor.as_ref().unwrap().edge_node, "SFO53-C1");
        assert!(view.last_update.is_some());

        let latency = view.report(Metric::Latency).unwrap();
        assert_eq!(latency.status, Status::Warning);
        let trend = latency.trend.unwrap();
        assert_eq!(trend.direction, Direction::Up);
        assert_eq!(trend.magnitude_label(), "10.0");
        assert!(!trend.is_improving);

        let bitrate = view.report(Metric::AverageBitrate).unwrap();
        assert_eq!(bitrate.status, Status::Critical);
        assert!(bitrate.trend.is_none());
        assert_eq!(view.reports.len(), 10);
    }

    #[tokio::test]
    async fn test_double_connect_opens_once() {
        let gate = Arc::new(Notify::new());
        let monitor = Monitor::new(ReplayProvider::new(vec![]).gated(gate.clone()), 30);

        let attempt = monitor.connect().unwrap();
        assert_eq!(monitor.state(), ConnectionState::Connecting);
        assert!(monitor.connect().is_none());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(monitor.provider().open_count(), 1);

        gate.notify_one();
        assert_eq!(attempt.await.unwrap(), ConnectionState::Connected);
        assert!(monitor.connect().is_none());
        assert_eq!(monitor.provider().open_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_supersedes_inflight_connect() {
        let gate = Arc::new(Notify::new());
        let provider = ReplayProvider::new(vec![qos(40.0), qos(45.0)]).gated(gate.clone());
        let monitor = Monitor::new(provider, 30);

        let attempt = monitor.connect().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        monitor.disconnect();
        assert_eq!(monitor.state(), ConnectionState::Disconnected);

        gate.notify_one();
        assert_eq!(attempt.await.unwrap(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let view = monitor.view();
        assert_eq!(view.state, ConnectionState::Disconnected);
        assert!(view.service.is_empty());
        assert!(view.reports.is_empty());
        // The late channel was released.
        assert_eq!(monitor.provider().close_count(), 1);
    }

    #[tokio::test]
    async fn test_decode_error_keeps_connection_and_history() {
        let provider = ReplayProvider::new(vec![qos(40.0), qos(45.0), b"not json".to_vec()]);
        let monitor = Monitor::new(provider, 30);
        let mut rx = monitor.subscribe();

        monitor.connect().unwrap().await.unwrap();
        let view = wait_until(&mut rx, |v| v.notice.is_some()).await;

        assert_eq!(view.state, ConnectionState::Connected);
        let latencies: Vec<f64> = view.service.iter().map(|s| s.latency).collect();
        assert_eq!(latencies, vec![40.0, 45.0]);
        assert!(view.notice.unwrap().starts_with("Malformed message"));
    }

    #[tokio::test]
    async fn test_remote_error_notice_is_not_fatal() {
        let provider = ReplayProvider::new(vec![
            qos(40.0),
            br#"{"type":"error","data":{"message":"shard rebalancing"}}"#.to_vec(),
        ]);
        let monitor = Monitor::new(provider, 30);
        let mut rx = monitor.subscribe();

        monitor.connect().unwrap().await.unwrap();
        let view = wait_until(&mut rx, |v| v.notice.is_some()).await;

        assert_eq!(view.state, ConnectionState::Connected);
        assert_eq!(view.service.len(), 1);
        assert_eq!(view.notice.as_deref(), Some("Remote error: shard rebalancing"));
    }

    #[tokio::test]
    async fn test_failed_connect_is_retryable() {
        let monitor = Monitor::new(ReplayProvider::new(vec![]).failing("no route"), 30);

        let state = monitor.connect().unwrap().await.unwrap();
        let ConnectionState::Errored(reason) = state else {
            panic!("expected errored state");
        };
        assert!(reason.contains("no route"));
        assert!(monitor.state().can_connect());

        assert!(monitor.connect().is_some());
        assert_eq!(monitor.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_transport_loss_disconnects_and_clears() {
        let provider = ReplayProvider::new(vec![qos(40.0), qos(45.0)]).close_when_done();
        let monitor = Monitor::new(provider, 30);
        let mut rx = monitor.subscribe();

        monitor.connect().unwrap().await.unwrap();
        let view = wait_until(&mut rx, |v| v.state == ConnectionState::Disconnected).await;

        assert!(view.service.is_empty());
        assert!(view.reports.is_empty());
        assert_eq!(view.notice.as_deref(), Some("Replay finished"));

        // No automatic reconnect.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        assert_eq!(monitor.provider().open_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_loss_keeps_last_session() {
        let provider =
            ReplayProvider::new(vec![qos(40.0), qos(45.0), qoe(5000.0)]).close_when_done();
        let monitor = Monitor::new(provider, 30);
        let mut rx = monitor.subscribe();
        assert!(monitor.last_session().is_none());

        monitor.connect().unwrap().await.unwrap();
        wait_until(&mut rx, |v| v.state == ConnectionState::Disconnected).await;

        let session = monitor.last_session().expect("session captured on close");
        assert_eq!(session.state, ConnectionState::Connected);
        assert_eq!(session.service.len(), 2);
        assert_eq!(session.experience.len(), 1);
        assert!(session.report(Metric::Latency).is_some());
        assert!(session.last_update.is_some());
    }

    #[tokio::test]
    async fn test_disconnect_keeps_last_session() {
        let monitor = Monitor::new(ReplayProvider::new(vec![qos(40.0)]), 30);
        let mut rx = monitor.subscribe();

        monitor.connect().unwrap().await.unwrap();
        wait_until(&mut rx, |v| v.service.len() == 1).await;
        monitor.disconnect();

        assert!(monitor.view().service.is_empty());
        let session = monitor.last_session().unwrap();
        assert_eq!(session.service.len(), 1);

        // A second disconnect must not overwrite it with an empty view.
        monitor.disconnect();
        assert_eq!(monitor.last_session().unwrap().service.len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let messages = (1..=35).map(|i| qos(i as f64)).collect();
        let monitor = Monitor::new(ReplayProvider::new(messages), 30);
        let mut rx = monitor.subscribe();

        monitor.connect().unwrap().await.unwrap();
        let view = wait_until(&mut rx, |v| {
            v.latest_service().map(|s| s.latency) == Some(35.0)
        })
        .await;

        let latencies: Vec<f64> = view.service.iter().map(|s| s.latency).collect();
        let expected: Vec<f64> = (6..=35).map(|i| i as f64).collect();
        assert_eq!(latencies, expected);
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_is_safe() {
        let monitor = Monitor::with_provider(ReplayProvider::new(vec![]));
        assert_eq!(monitor.state(), ConnectionState::Idle);

        monitor.disconnect();
        monitor.disconnect();
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        assert_eq!(monitor.provider().close_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_channel() {
        let provider = ReplayProvider::new(vec![qos(40.0)]);
        let closes = provider.close_counter();
        let monitor = Monitor::new(provider, 30);

        monitor.connect().unwrap().await.unwrap();
        drop(monitor);

        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reconnect_starts_with_empty_history() {
        let monitor = Monitor::new(ReplayProvider::new(vec![qos(40.0)]), 30);
        let mut rx = monitor.subscribe();

        monitor.connect().unwrap().await.unwrap();
        wait_until(&mut rx, |v| v.service.len() == 1).await;

        monitor.disconnect();
        assert!(monitor.view().service.is_empty());

        monitor.connect().unwrap().await.unwrap();
        let view = wait_until(&mut rx, |v| v.service.len() == 1).await;
        assert_eq!(view.state, ConnectionState::Connected);
        assert_eq!(monitor.provider().open_count(), 2);
    }
}
