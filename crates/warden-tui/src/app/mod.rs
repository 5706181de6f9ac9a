//! Application state and event handling

pub mod config;
pub mod events;
mod state;

pub use config::{ConfigError, WardenConfig};
pub use events::{Event, ScreenBridge, TerminalBell};
pub use state::{AppState, Screen};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{Event as CrosstermEvent, EventStream, KeyCode, KeyEventKind};
use futures::StreamExt;
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use warden_core::device::ScanState;
use warden_core::{
    ConnectFlow, Device, DeviceScanSession, GateEvent, Haptics, KeypadInput, LockoutPolicy,
    PinController, PinGate, PinSetup, PinSnapshot, PinStore,
};

use crate::hardware::{Provider, Scanner};
use crate::ui::{self, Theme};

/// Redraw rate for spinners and the lockout countdown
const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

/// Main application struct
pub struct App {
    /// Loaded configuration
    pub config: WardenConfig,
    /// Color palette
    pub theme: Theme,
    /// Screen and selection state
    pub state: AppState,
    /// Whether the app should quit
    pub should_quit: bool,

    store: Arc<Mutex<PinStore>>,
    attempts_remaining: u32,
    pin: PinController,
    setup: Option<Arc<PinSetup>>,

    scan: Option<DeviceScanSession>,
    flow: Option<Arc<ConnectFlow<Provider>>>,

    gate_rx: mpsc::UnboundedReceiver<GateEvent>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
}

impl App {
    /// Create the application, starting on the PIN screen
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: WardenConfig, haptics: Arc<dyn Haptics>) -> anyhow::Result<Self> {
        let pin_path = config.pin_file_path()?;
        let policy = LockoutPolicy::from(config.lockout_preset);
        let store = PinStore::open(&pin_path, policy)
            .with_context(|| format!("Failed to open PIN record at {:?}", pin_path))?;
        let attempts_remaining = store.attempts_remaining();
        let store = Arc::new(Mutex::new(store));

        let (gate_tx, gate_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (pin, setup, screen) =
            pin_screen(&store, &gate_tx, &haptics, config.tick_interval());

        Ok(Self {
            config,
            theme: Theme::default(),
            state: AppState::new(screen),
            should_quit: false,
            store,
            attempts_remaining,
            pin,
            setup,
            scan: None,
            flow: None,
            gate_rx,
            events_tx,
            events_rx,
        })
    }

    /// Run the application main loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut keys = EventStream::new();
        let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

        while !self.should_quit {
            terminal.draw(|frame| ui::render(frame, &*self))?;

            tokio::select! {
                key = keys.next() => match key {
                    Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key.code);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                Some(event) = self.gate_rx.recv() => self.handle_gate_event(event),
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                _ = redraw.tick() => {}
            }
        }

        Ok(())
    }

    /// Current PIN screen state
    pub fn pin_snapshot(&self) -> PinSnapshot {
        self.pin.snapshot()
    }

    /// Whether the setup screen is waiting for the confirmation code
    pub fn is_confirming(&self) -> bool {
        self.setup.as_ref().is_some_and(|s| s.is_confirming())
    }

    /// Attempts left before the next lockout
    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    /// Current device list state, if a scan is open
    pub fn scan_snapshot(&self) -> Option<ScanState> {
        self.scan.as_ref().map(DeviceScanSession::snapshot)
    }

    /// Handle key press events
    pub fn handle_key(&mut self, key: KeyCode) {
        match self.state.current_screen {
            Screen::PinSetup | Screen::PinEntry => self.handle_pin_key(key),
            Screen::LedgerScan => self.handle_scan_key(key),
            Screen::Connected => self.handle_connected_key(key),
        }
    }

    /// Handle a notification from the PIN handlers
    pub fn handle_gate_event(&mut self, event: GateEvent) {
        match event {
            GateEvent::Unlocked | GateEvent::PinCreated => {
                info!("Wallet unlocked");
                self.open_scan();
            }
            GateEvent::Rejected { attempts_remaining } => {
                self.attempts_remaining = attempts_remaining;
            }
            GateEvent::LockedOut { until } => {
                info!("PIN entry locked until {}", until);
                self.attempts_remaining = self
                    .store
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .attempts_remaining();
            }
        }
    }

    /// Handle a callback from the connection flow
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::ShowAppMissing(device) => self.state.app_missing = Some(device),
            Event::HideAppMissing => self.state.app_missing = None,
            Event::OpenAccounts { device, name } => {
                self.state.connected = Some((device, name));
                self.state.app_missing = None;
                self.state.current_screen = Screen::Connected;
                self.close_scan();
            }
        }
    }

    fn handle_pin_key(&mut self, key: KeyCode) {
        let input = match key {
            KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Backspace => KeypadInput::Delete,
            KeyCode::Char(c) => match KeypadInput::from_char(c) {
                Some(input) => input,
                None => return,
            },
            _ => return,
        };

        if let Err(e) = self.pin.press(input) {
            debug!("PIN input not taken: {}", e);
        }
    }

    fn handle_scan_key(&mut self, key: KeyCode) {
        if let Some(device) = self.state.app_missing.clone() {
            match key {
                KeyCode::Char('r') | KeyCode::Enter => self.connect(device, true),
                KeyCode::Esc => self.state.app_missing = None,
                _ => {}
            }
            return;
        }

        let devices = self
            .scan_snapshot()
            .map(|s| s.devices)
            .unwrap_or_default();

        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.state.move_selection(false, devices.len()),
            KeyCode::Down | KeyCode::Char('j') => self.state.move_selection(true, devices.len()),
            KeyCode::Enter => {
                if let Some(device) = devices.get(self.state.device_index) {
                    self.connect(device.clone(), false);
                }
            }
            KeyCode::Char('s') => {
                let restarted = match &mut self.scan {
                    Some(scan) => scan.rescan(),
                    None => {
                        self.open_scan();
                        Ok(())
                    }
                };
                if let Err(e) = restarted {
                    error!("Failed to restart device scan: {}", e);
                    self.state.status = Some(e.to_string());
                }
            }
            _ => {}
        }
    }

    fn handle_connected_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('b') => {
                self.state.connected = None;
                self.open_scan();
            }
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn open_scan(&mut self) {
        self.close_scan();
        self.state.current_screen = Screen::LedgerScan;
        self.state.device_index = 0;
        self.state.app_missing = None;
        self.state.status = None;

        match DeviceScanSession::open(Arc::new(Scanner::new())) {
            Ok(session) => {
                let bridge = Arc::new(ScreenBridge::new(self.events_tx.clone()));
                self.flow = Some(Arc::new(ConnectFlow::new(
                    Arc::new(Provider::new()),
                    session.state_handle(),
                    bridge.clone(),
                    bridge,
                    self.config.ledger_app.clone(),
                )));
                self.scan = Some(session);
            }
            Err(e) => {
                error!("Failed to start device scan: {}", e);
                self.state.status = Some(e.to_string());
            }
        }
    }

    fn close_scan(&mut self) {
        self.flow = None;
        // Dropping the session stops the scanner
        self.scan = None;
    }

    fn connect(&self, device: Device, retry: bool) {
        let Some(flow) = self.flow.clone() else {
            return;
        };

        tokio::spawn(async move {
            let result = if retry {
                flow.retry(&device).await
            } else {
                flow.select(&device).await
            };
            if let Err(e) = result {
                debug!("Connection attempt for {} ended: {}", device.id, e);
            }
        });
    }
}

/// Pick the PIN screen: unlock when a PIN exists, create one otherwise
fn pin_screen(
    store: &Arc<Mutex<PinStore>>,
    gate_tx: &mpsc::UnboundedSender<GateEvent>,
    haptics: &Arc<dyn Haptics>,
    tick_interval: Duration,
) -> (PinController, Option<Arc<PinSetup>>, Screen) {
    let pin_set = store
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_pin_set();

    if pin_set {
        let gate = Arc::new(PinGate::new(store.clone(), gate_tx.clone()));
        let pin = PinController::with_tick_interval(gate.clone(), haptics.clone(), tick_interval);
        gate.restore_lockout(&pin.handle());
        (pin, None, Screen::PinEntry)
    } else {
        let setup = Arc::new(PinSetup::new(store.clone(), gate_tx.clone()));
        let pin = PinController::with_tick_interval(setup.clone(), haptics.clone(), tick_interval);
        (pin, Some(setup), Screen::PinSetup)
    }
}
