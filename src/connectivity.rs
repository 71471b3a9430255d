//! Connectivity tracking.
//!
//! [`ConnectivityState`] is the single owner of the process-wide online flag.
//! It changes only through probe results ([`ConnectivityMonitor::probe`]) or
//! platform link signals ([`ConnectivityMonitor::handle_signal`]); everyone
//! else reads it or subscribes to its changes.

use reqwest::Client;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// An edge of the online flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CameOnline,
    WentOffline,
}

/// Authoritative link events pushed by the platform (e.g. the OS reporting
/// the network interface went down).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSignal {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct ConnectivityState {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityState {
    /// Starts optimistic: online until a probe says otherwise.
    pub fn new() -> Self {
        Self::with_initial(true)
    }

    pub fn with_initial(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receives every change of the flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Records a reachability result. Returns the edge, if the flag changed.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        let mut transition = None;
        self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            transition = Some(if online {
                Transition::CameOnline
            } else {
                Transition::WentOffline
            });
            true
        });
        transition
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::new()
    }
}

/// One reachability check. Any failure is reported as unreachable.
pub trait Probe: Send + Sync {
    fn check(&self) -> impl Future<Output = bool> + Send;
}

/// `HEAD` request against a health URL; reachable iff it answers 2xx.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    client: Client,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Probe for HttpProbe {
    async fn check(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::debug!("Probe {} answered {}", self.url, response.status());
                false
            }
            Err(e) => {
                tracing::debug!("Probe {} failed: {}", self.url, e);
                false
            }
        }
    }
}

/// Periodic prober feeding [`ConnectivityState`].
///
/// Each tick is independent: no retries inside a tick, and a failed check is
/// just "offline".
pub struct ConnectivityMonitor<P> {
    state: ConnectivityState,
    probe: P,
    interval: Duration,
    link_up: AtomicBool,
}

impl<P: Probe> ConnectivityMonitor<P> {
    pub fn new(state: ConnectivityState, probe: P, interval: Duration) -> Self {
        Self {
            state,
            probe,
            interval,
            link_up: AtomicBool::new(true),
        }
    }

    pub fn state(&self) -> &ConnectivityState {
        &self.state
    }

    /// Runs one check and applies the result.
    ///
    /// While the platform reports the link down the check is skipped and the
    /// result is offline.
    pub async fn probe(&self) -> Option<Transition> {
        let online = self.link_up.load(Ordering::SeqCst) && self.probe.check().await;
        let transition = self.state.set_online(online);
        log_transition(transition);
        transition
    }

    /// Applies a platform link event. `Down` is taken as is; `Up` is
    /// confirmed with an immediate probe.
    pub async fn handle_signal(&self, signal: NetworkSignal) -> Option<Transition> {
        match signal {
            NetworkSignal::Down => {
                self.link_up.store(false, Ordering::SeqCst);
                let transition = self.state.set_online(false);
                log_transition(transition);
                transition
            }
            NetworkSignal::Up => {
                self.link_up.store(true, Ordering::SeqCst);
                self.probe().await
            }
        }
    }

    /// Probes on every interval tick, forever. Meant to be spawned and
    /// aborted on shutdown.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.probe().await;
        }
    }
}

fn log_transition(transition: Option<Transition>) {
    match transition {
        Some(Transition::CameOnline) => tracing::info!("Network online"),
        Some(Transition::WentOffline) => tracing::warn!("Network offline, scans will be queued locally"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedProbe {
        reachable: AtomicBool,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(reachable: bool) -> Self {
            Self {
                reachable: AtomicBool::new(reachable),
                calls: AtomicUsize::new(0),
            }
        }

        fn set(&self, reachable: bool) {
            self.reachable.store(reachable, Ordering::SeqCst);
        }
    }

    impl Probe for ScriptedProbe {
        async fn check(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable.load(Ordering::SeqCst)
        }
    }

    fn monitor(reachable: bool) -> ConnectivityMonitor<ScriptedProbe> {
        ConnectivityMonitor::new(
            ConnectivityState::new(),
            ScriptedProbe::new(reachable),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_state_starts_online() {
        assert!(ConnectivityState::new().is_online());
    }

    #[test]
    fn test_set_online_reports_edges_only() {
        let state = ConnectivityState::new();
        assert_eq!(state.set_online(true), None);
        assert_eq!(state.set_online(false), Some(Transition::WentOffline));
        assert_eq!(state.set_online(false), None);
        assert_eq!(state.set_online(true), Some(Transition::CameOnline));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let state = ConnectivityState::new();
        let mut rx = state.subscribe();

        state.set_online(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_probe_failure_means_offline() {
        let monitor = monitor(false);
        assert_eq!(monitor.probe().await, Some(Transition::WentOffline));
        assert!(!monitor.state().is_online());

        // Ticks are idempotent
        assert_eq!(monitor.probe().await, None);

        monitor.probe.set(true);
        assert_eq!(monitor.probe().await, Some(Transition::CameOnline));
    }

    #[tokio::test]
    async fn test_link_down_skips_probe() {
        let monitor = monitor(true);

        assert_eq!(
            monitor.handle_signal(NetworkSignal::Down).await,
            Some(Transition::WentOffline)
        );
        assert_eq!(monitor.probe().await, None);
        assert_eq!(monitor.probe.calls.load(Ordering::SeqCst), 0);
        assert!(!monitor.state().is_online());

        assert_eq!(
            monitor.handle_signal(NetworkSignal::Up).await,
            Some(Transition::CameOnline)
        );
        assert_eq!(monitor.probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_link_up_still_needs_reachable_server() {
        let monitor = monitor(false);
        monitor.handle_signal(NetworkSignal::Down).await;

        assert_eq!(monitor.handle_signal(NetworkSignal::Up).await, None);
        assert!(!monitor.state().is_online());
    }

    #[tokio::test]
    async fn test_http_probe_against_local_server() {
        use axum::routing::get;
        use axum::Router;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/health", get(|| async { "ok" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let ok = HttpProbe::new(format!("http://{}/health", addr), Duration::from_secs(2)).unwrap();
        assert!(ok.check().await);

        let missing =
            HttpProbe::new(format!("http://{}/nope", addr), Duration::from_secs(2)).unwrap();
        assert!(!missing.check().await);
    }
}
