//! Connection attempt for a selected device
//!
//! An attempt runs four steps: mark the device loading, acquire a transport,
//! ask the device to open the wallet app, then hand off to navigation. Only a
//! missing app is recoverable; it raises the remediation prompt whose retry
//! runs the whole attempt again.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::scan::ScanState;
use super::{Device, LedgerProvider, Navigator, RemediationPrompt};
use crate::error::ConnectError;

/// Drives connection attempts against the devices of one scan session
pub struct ConnectFlow<P: LedgerProvider> {
    provider: Arc<P>,
    state: Arc<watch::Sender<ScanState>>,
    prompt: Arc<dyn RemediationPrompt>,
    navigator: Arc<dyn Navigator>,
    app_name: String,
}

impl<P: LedgerProvider> ConnectFlow<P> {
    pub fn new(
        provider: Arc<P>,
        state: Arc<watch::Sender<ScanState>>,
        prompt: Arc<dyn RemediationPrompt>,
        navigator: Arc<dyn Navigator>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            state,
            prompt,
            navigator,
            app_name: app_name.into(),
        }
    }

    /// App the device is asked to open
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Run one connection attempt
    ///
    /// The outcome is also recorded in the scan state: loading while in flight,
    /// the error afterwards if it failed.
    pub async fn try_to_connect(&self, device: &Device) -> Result<(), ConnectError> {
        let mut started = false;
        self.state.send_if_modified(|s| {
            started = s.begin_attempt(&device.id);
            started
        });
        if !started {
            debug!("Attempt for {} already running", device.id);
            return Err(ConnectError::AttemptInProgress);
        }

        match self.handshake(device).await {
            Ok(()) => {
                self.state.send_modify(|s| s.finish_attempt(&device.id));
                self.prompt.hide_app_missing();
                info!("Connected to {}", device.display_name());
                self.navigator
                    .open_accounts(&device.id, &device.display_name());
                Ok(())
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", device.id, e);
                self.state
                    .send_modify(|s| s.fail_attempt(&device.id, e.clone()));
                Err(e)
            }
        }
    }

    /// Connect to a device picked from the list
    ///
    /// A missing app raises the remediation prompt for the device.
    pub async fn select(&self, device: &Device) -> Result<(), ConnectError> {
        let result = self.try_to_connect(device).await;
        if result == Err(ConnectError::TargetAppNotFound) {
            self.prompt.show_app_missing(device);
        }
        result
    }

    /// Retry from the remediation prompt
    ///
    /// Re-acquires the transport; the device list is not rescanned.
    pub async fn retry(&self, device: &Device) -> Result<(), ConnectError> {
        debug!("Retrying connection to {}", device.id);
        self.select(device).await
    }

    async fn handshake(&self, device: &Device) -> Result<(), ConnectError> {
        let transport = self
            .provider
            .await_for_transport(&device.id)
            .await
            .ok_or(ConnectError::TransportUnavailable)?;

        self.provider
            .suggest_app(&transport, &self.app_name)
            .await
            .map_err(ConnectError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceId, DeviceStatusError, APP_NOT_FOUND, USER_REFUSED};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MockProvider {
        transports: AtomicUsize,
        no_transport: bool,
        replies: Mutex<VecDeque<Result<(), DeviceStatusError>>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockProvider {
        fn replying(replies: Vec<Result<(), DeviceStatusError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl LedgerProvider for MockProvider {
        type Transport = ();

        async fn await_for_transport(&self, _device: &DeviceId) -> Option<()> {
            self.transports.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            (!self.no_transport).then_some(())
        }

        async fn suggest_app(&self, _transport: &(), app_name: &str) -> Result<(), DeviceStatusError> {
            assert_eq!(app_name, "Ethereum");
            self.replies.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    #[derive(Default)]
    struct Screens {
        shown: Mutex<Vec<DeviceId>>,
        hidden: AtomicUsize,
        opened: Mutex<Vec<(DeviceId, String)>>,
    }

    impl RemediationPrompt for Screens {
        fn show_app_missing(&self, device: &Device) {
            self.shown.lock().unwrap().push(device.id.clone());
        }

        fn hide_app_missing(&self) {
            self.hidden.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Navigator for Screens {
        fn open_accounts(&self, device: &DeviceId, device_name: &str) {
            self.opened
                .lock()
                .unwrap()
                .push((device.clone(), device_name.to_string()));
        }
    }

    fn flow(provider: MockProvider) -> (Arc<ConnectFlow<MockProvider>>, Arc<Screens>, watch::Receiver<ScanState>) {
        let (state, rx) = watch::channel(ScanState::default());
        let screens = Arc::new(Screens::default());
        let flow = ConnectFlow::new(
            Arc::new(provider),
            Arc::new(state),
            screens.clone(),
            screens.clone(),
            "Ethereum",
        );
        (Arc::new(flow), screens, rx)
    }

    fn nano() -> Device {
        Device::new("hid-1", "Nano X")
    }

    #[tokio::test]
    async fn test_success_navigates() {
        let (flow, screens, rx) = flow(MockProvider::default());

        flow.select(&nano()).await.unwrap();

        assert_eq!(
            *screens.opened.lock().unwrap(),
            vec![(DeviceId::new("hid-1"), "Ledger Nano X".to_string())]
        );
        assert_eq!(screens.hidden.load(Ordering::SeqCst), 1);
        let state = rx.borrow();
        assert!(!state.is_loading(&nano().id));
        assert!(state.error(&nano().id).is_none());
    }

    #[tokio::test]
    async fn test_app_missing_shows_prompt() {
        let provider = MockProvider::replying(vec![Err(DeviceStatusError::status(APP_NOT_FOUND))]);
        let (flow, screens, rx) = flow(provider);

        let result = flow.select(&nano()).await;

        assert_eq!(result, Err(ConnectError::TargetAppNotFound));
        assert_eq!(*screens.shown.lock().unwrap(), vec![nano().id]);
        let state = rx.borrow();
        assert_eq!(state.error(&nano().id), Some(&ConnectError::TargetAppNotFound));
        assert!(!state.errors.values().any(|e| *e == ConnectError::UserRefused));
        assert!(screens.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_reacquires_transport() {
        let provider = MockProvider::replying(vec![Err(DeviceStatusError::status(APP_NOT_FOUND))]);
        let (flow, screens, rx) = flow(provider);

        assert!(flow.select(&nano()).await.is_err());
        flow.retry(&nano()).await.unwrap();

        assert_eq!(flow.provider.transports.load(Ordering::SeqCst), 2);
        assert_eq!(screens.hidden.load(Ordering::SeqCst), 1);
        assert_eq!(screens.opened.lock().unwrap().len(), 1);
        assert!(rx.borrow().error(&nano().id).is_none());
    }

    #[tokio::test]
    async fn test_refusal_is_terminal() {
        let provider = MockProvider::replying(vec![Err(DeviceStatusError::status(USER_REFUSED))]);
        let (flow, screens, rx) = flow(provider);

        assert_eq!(flow.select(&nano()).await, Err(ConnectError::UserRefused));
        assert!(screens.shown.lock().unwrap().is_empty());
        assert_eq!(rx.borrow().error(&nano().id), Some(&ConnectError::UserRefused));
    }

    #[tokio::test]
    async fn test_missing_transport() {
        let provider = MockProvider {
            no_transport: true,
            ..Default::default()
        };
        let (flow, screens, rx) = flow(provider);

        assert_eq!(
            flow.select(&nano()).await,
            Err(ConnectError::TransportUnavailable)
        );
        assert!(screens.shown.lock().unwrap().is_empty());
        let state = rx.borrow();
        assert!(!state.is_loading(&nano().id));
        assert_eq!(
            state.error(&nano().id),
            Some(&ConnectError::TransportUnavailable)
        );
    }

    #[tokio::test]
    async fn test_second_select_while_loading() {
        let gate = Arc::new(Notify::new());
        let provider = MockProvider {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let (flow, _screens, mut rx) = flow(provider);

        let first = tokio::spawn({
            let flow = flow.clone();
            async move { flow.select(&nano()).await }
        });
        rx.wait_for(|s| s.is_loading(&nano().id)).await.unwrap();

        assert_eq!(
            flow.select(&nano()).await,
            Err(ConnectError::AttemptInProgress)
        );

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert!(!rx.borrow().is_loading(&nano().id));
    }
}
