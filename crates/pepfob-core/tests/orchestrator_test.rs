#![allow(clippy::unwrap_used)]
// End-to-end orchestrator scenarios against a scripted board. Most run
// on a paused clock so countdowns complete instantly; the boot scenario
// talks to a mock router and keeps real time.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use secrecy::SecretString;
use serde_json::json;
use tokio::sync::watch;
use url::Url;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pepfob_api::paths;
use pepfob_core::orchestrator::Fetch;
use pepfob_core::store::JAR_NAMESPACE;
use pepfob_core::{
    Action, Board, Button, Color, CoreError, CountdownKind, CredentialJar, CredentialStore,
    DeviceConfig, Frame, MemoryStore, RawEdge, RouterConfig, ScanResult, SessionManager,
    SettingsStore, SsidSlot, TaskOrchestrator, WanStatusModel, WifiMode, WifiNetwork, WifiStatus,
};

// ── Scripted board ──────────────────────────────────────────────────

#[derive(Default)]
struct BoardState {
    mode: Mutex<WifiMode>,
    status: Mutex<WifiStatus>,
    stations: Mutex<Vec<String>>,
    beeps: AtomicUsize,
    powered_off: AtomicBool,
    restarted: AtomicBool,
}

#[derive(Clone, Default)]
struct FakeBoard(Arc<BoardState>);

impl FakeBoard {
    fn set_status(&self, status: WifiStatus) {
        *self.0.status.lock().unwrap() = status;
    }

    fn stations(&self) -> Vec<String> {
        self.0.stations.lock().unwrap().clone()
    }
}

impl Board for FakeBoard {
    fn wifi_mode(&self) -> WifiMode {
        *self.0.mode.lock().unwrap()
    }

    fn wifi_status(&self) -> WifiStatus {
        *self.0.status.lock().unwrap()
    }

    fn wifi_ip(&self) -> Option<String> {
        (self.wifi_status() == WifiStatus::Connected).then(|| "192.168.50.20".to_owned())
    }

    fn start_station(&self, ssid: &str, _password: &SecretString) {
        *self.0.mode.lock().unwrap() = WifiMode::Station;
        self.set_status(WifiStatus::Connecting);
        self.0.stations.lock().unwrap().push(ssid.to_owned());
    }

    fn start_access_point(&self, _ssid: &str, _password: &SecretString) {
        *self.0.mode.lock().unwrap() = WifiMode::AccessPoint;
        self.set_status(WifiStatus::Idle);
    }

    fn stop_wifi(&self) {
        *self.0.mode.lock().unwrap() = WifiMode::Off;
    }

    async fn scan(&self) -> Vec<ScanResult> {
        vec![ScanResult {
            ssid: "cafe".into(),
            rssi: -60,
            secured: true,
        }]
    }

    async fn ping(&self, _target: &str) -> bool {
        true
    }

    fn beep(&self) {
        self.0.beeps.fetch_add(1, Ordering::SeqCst);
    }

    fn power_off(&self) {
        self.0.powered_off.store(true, Ordering::SeqCst);
    }

    fn restart(&self) {
        self.0.restarted.store(true, Ordering::SeqCst);
    }

    fn battery_percent(&self) -> Option<u8> {
        Some(80)
    }

    fn hardware_id(&self) -> String {
        "fob-0001".into()
    }
}

#[derive(Default)]
struct FakeSettings {
    remembered: Mutex<Vec<(SsidSlot, String)>>,
    resets: AtomicUsize,
}

impl SettingsStore for FakeSettings {
    fn remember_ssid(&self, slot: SsidSlot, ssid: &str) -> Result<(), CoreError> {
        self.remembered.lock().unwrap().push((slot, ssid.to_owned()));
        Ok(())
    }

    fn factory_reset(&self) -> Result<(), CoreError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn network(ssid: &str) -> WifiNetwork {
    WifiNetwork {
        ssid: ssid.into(),
        password: SecretString::from("password".to_owned()),
    }
}

fn device_config(router: &MockServer, primary: Option<&str>, secondary: Option<&str>) -> DeviceConfig {
    config_at(&router.uri(), primary, secondary)
}

fn config_at(url: &str, primary: Option<&str>, secondary: Option<&str>) -> DeviceConfig {
    let url = Url::parse(url).unwrap();
    let mut router = RouterConfig::new(url, "admin", SecretString::from("pw".to_owned()));
    router.probe_attempts = 1;
    let mut config = DeviceConfig::new(router);
    config.wifi.primary = primary.map(network);
    config.wifi.secondary = secondary.map(network);
    config.wifi.connect_timeout = Duration::from_secs(3);
    config
}

struct Rig {
    board: FakeBoard,
    settings: Arc<FakeSettings>,
    handle: pepfob_core::OrchestratorHandle,
    frames: watch::Receiver<Frame>,
}

fn start(config: DeviceConfig) -> Rig {
    start_with(config, Arc::new(MemoryStore::new()))
}

/// A device that already holds a router cookie and token.
fn start_logged_in(config: DeviceConfig) -> Rig {
    let store = Arc::new(MemoryStore::new());
    let jar = CredentialJar {
        cookie: Some(SecretString::from("bauth=c".to_owned())),
        token: Some(SecretString::from("tok".to_owned())),
    };
    store.save(JAR_NAMESPACE, &jar.encode().unwrap()).unwrap();
    start_with(config, store)
}

fn start_with(config: DeviceConfig, store: Arc<MemoryStore>) -> Rig {
    let board = FakeBoard::default();
    let settings = Arc::new(FakeSettings::default());
    let session = Arc::new(SessionManager::new(&config.router, store).unwrap());
    let wans = Arc::new(WanStatusModel::new(Arc::clone(&session)));
    let handle = TaskOrchestrator::spawn(
        config,
        board.clone(),
        session,
        wans,
        Arc::clone(&settings) as Arc<dyn SettingsStore>,
    );
    let frames = handle.frames();
    Rig {
        board,
        settings,
        handle,
        frames,
    }
}

async fn wait_for(frames: &mut watch::Receiver<Frame>, what: &str, pred: impl Fn(&Frame) -> bool) {
    let found = tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            if pred(&frames.borrow_and_update()) {
                return;
            }
            frames.changed().await.unwrap();
        }
    })
    .await;
    assert!(found.is_ok(), "never saw {what}; last frame: {:?}", *frames.borrow());
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let found = tokio::time::timeout(Duration::from_secs(60), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(found.is_ok(), "condition never held: {what}");
}

async fn press(rig: &Rig, button: Button, held: Duration) {
    let edges = rig.handle.edges();
    let t0 = Instant::now();
    edges
        .send(RawEdge { button, pressed: true, at: t0 })
        .await
        .unwrap();
    edges
        .send(RawEdge { button, pressed: false, at: t0 + held })
        .await
        .unwrap();
}

fn counting_down(kind: CountdownKind) -> impl Fn(&Frame) -> bool {
    move |f| f.countdown.as_ref().is_some_and(|(label, _)| *label == kind.to_string())
}

fn item_texts(frame: &Frame) -> Vec<String> {
    frame.items.iter().map(|i| i.text.clone()).collect()
}

fn highlighted(text: &'static str) -> impl Fn(&Frame) -> bool {
    move |f| f.items.iter().any(|i| i.highlighted && i.text == text)
}

/// An address nothing listens on (until rebound).
fn closed_port() -> SocketAddr {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap()
}

fn ok(response: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "stat": "ok", "response": response }))
}

fn ethernet(name: &str, priority: u32) -> serde_json::Value {
    json!({
        "type": "ethernet", "name": name, "message": "Connected", "statusLed": "green",
        "priority": priority, "ip": format!("10.0.0.{priority}")
    })
}

async fn mount_empty_traffic(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(paths::TRAFFIC))
        .respond_with(ok(json!({ "bandwidth": { "order": [], "unit": "kbps" } })))
        .mount(server)
        .await;
}

/// Boot onto `home` and report the join, leaving the router watchdog
/// released.
async fn join_home(rig: &mut Rig) {
    wait_for(&mut rig.frames, "Wi-Fi countdown", counting_down(CountdownKind::WifiConnect)).await;
    rig.board.set_status(WifiStatus::Connected);
    wait_for(&mut rig.frames, "ping page", |f| f.title == "Ping").await;
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_boot_join_opens_ping_page_and_ends_boot() {
    let router = MockServer::start().await;
    let mut rig = start(device_config(&router, Some("home"), None));

    wait_for(&mut rig.frames, "Wi-Fi countdown", counting_down(CountdownKind::WifiConnect)).await;
    assert_eq!(rig.board.stations(), vec!["home".to_owned()]);

    rig.board.set_status(WifiStatus::Connected);
    wait_for(&mut rig.frames, "ping page", |f| f.title == "Ping").await;
    wait_for(&mut rig.frames, "ping result", |f| {
        f.items.first().and_then(|i| i.aux.as_ref()).is_some_and(|a| a.text == "OK")
    })
    .await;

    let state = Arc::clone(rig.handle.state());
    wait_until("boot ended", move || !state.flags.booting()).await;
    rig.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_primary_expiry_during_boot_falls_back_to_secondary() {
    let router = MockServer::start().await;
    let mut rig = start(device_config(&router, Some("home"), Some("backup")));

    wait_for(&mut rig.frames, "Wi-Fi countdown", counting_down(CountdownKind::WifiConnect)).await;
    let board = rig.board.clone();
    wait_until("secondary joined", move || board.stations().len() == 2).await;

    assert_eq!(rig.board.stations(), vec!["home".to_owned(), "backup".to_owned()]);
    assert!(rig.handle.state().flags.primary_invalid());
    assert!(!rig.handle.state().flags.wifi_timeout());
    rig.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_wifi_expiry_without_fallback_opens_prompt() {
    let router = MockServer::start().await;
    let mut rig = start(device_config(&router, Some("home"), None));

    wait_for(&mut rig.frames, "Wi-Fi prompt", |f| f.title == "Wi-Fi failed").await;
    assert!(rig.handle.state().flags.wifi_timeout());
    assert!(!rig.handle.state().countdowns.is_running());
    rig.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_long_power_press_shuts_down() {
    let router = MockServer::start().await;
    let mut rig = start(device_config(&router, None, None));
    wait_for(&mut rig.frames, "home", |f| f.title == "pepfob").await;

    press(&rig, Button::C, Duration::from_millis(1200)).await;
    wait_for(&mut rig.frames, "shutdown countdown", counting_down(CountdownKind::Shutdown)).await;

    let board = rig.board.clone();
    wait_until("powered off", move || board.0.powered_off.load(Ordering::SeqCst)).await;
    rig.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_medium_power_press_only_moves_cursor_back() {
    let router = MockServer::start().await;
    let mut rig = start(device_config(&router, None, None));
    wait_for(&mut rig.frames, "home", |f| f.title == "pepfob").await;

    // Long enough to be a long press, too short for shutdown.
    press(&rig, Button::C, Duration::from_millis(600)).await;
    press(&rig, Button::A, Duration::from_millis(50)).await;
    wait_for(&mut rig.frames, "cursor on second item", |f| {
        f.items.iter().any(|i| i.highlighted && i.text == "Network Diags")
    })
    .await;
    assert!(!rig.handle.state().countdowns.is_running());
    rig.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_user_cancel_returns_home_without_restart() {
    let router = MockServer::start().await;
    let mut rig = start(device_config(&router, None, None));
    wait_for(&mut rig.frames, "home", |f| f.title == "pepfob").await;

    rig.handle.dispatch(Action::StartCountdown(CountdownKind::Reboot));
    wait_for(&mut rig.frames, "reboot countdown", counting_down(CountdownKind::Reboot)).await;

    press(&rig, Button::B, Duration::from_millis(400)).await;
    wait_for(&mut rig.frames, "home again", |f| f.title == "pepfob" && f.countdown.is_none()).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!rig.board.0.restarted.load(Ordering::SeqCst));
    rig.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_factory_reset_resets_settings_then_restarts() {
    let router = MockServer::start().await;
    let mut rig = start(device_config(&router, None, None));
    wait_for(&mut rig.frames, "home", |f| f.title == "pepfob").await;

    rig.handle.dispatch(Action::FactoryReset);
    wait_for(&mut rig.frames, "reset countdown", counting_down(CountdownKind::FactoryReset)).await;
    assert_eq!(rig.settings.resets.load(Ordering::SeqCst), 1);

    let board = rig.board.clone();
    wait_until("restarted", move || board.0.restarted.load(Ordering::SeqCst)).await;
    rig.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_scan_pick_and_save_as_secondary() {
    let router = MockServer::start().await;
    let mut rig = start(device_config(&router, None, None));
    wait_for(&mut rig.frames, "home", |f| f.title == "pepfob").await;

    rig.handle.dispatch(Action::ScanWifi);
    wait_for(&mut rig.frames, "scan results", |f| f.title == "Networks").await;

    // Activate "cafe", then move to "Secondary" and activate it.
    press(&rig, Button::B, Duration::from_millis(50)).await;
    wait_for(&mut rig.frames, "save page", |f| f.title == "Save SSID as").await;
    press(&rig, Button::A, Duration::from_millis(50)).await;
    press(&rig, Button::B, Duration::from_millis(50)).await;
    wait_for(&mut rig.frames, "Wi-Fi page", |f| f.title == "Wi-Fi").await;

    let remembered = rig.settings.remembered.lock().unwrap().clone();
    assert_eq!(remembered, vec![(SsidSlot::Secondary, "cafe".to_owned())]);
    rig.handle.shutdown().await;
}

// ── Router watchdog ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_unreachable_router_counts_down_once_then_gives_up() {
    let addr = closed_port();
    let mut rig = start(config_at(&format!("http://{addr}"), Some("home"), None));
    join_home(&mut rig).await;

    wait_for(&mut rig.frames, "router countdown", counting_down(CountdownKind::RouterConnect)).await;

    let mut readouts = Vec::new();
    let frames = &mut rig.frames;
    let gave_up = tokio::time::timeout(Duration::from_secs(300), async {
        loop {
            {
                let frame = frames.borrow_and_update();
                if frame.title == "Router unavailable" {
                    return;
                }
                if counting_down(CountdownKind::RouterConnect)(&frame) {
                    readouts.extend(frame.countdown.as_ref().map(|(_, left)| left.clone()));
                }
            }
            frames.changed().await.unwrap();
        }
    })
    .await;
    assert!(gave_up.is_ok(), "router countdown never expired");

    // One countdown: the readout only ever goes down.
    assert!(!readouts.is_empty());
    assert!(readouts.windows(2).all(|w| w[0] >= w[1]), "countdown restarted: {readouts:?}");
    assert!(rig.handle.state().flags.router_dead());

    // Terminal: no further countdown starts.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let frame = rig.frames.borrow().clone();
    assert_eq!(frame.title, "Router unavailable");
    assert!(frame.countdown.is_none());
    assert!(!rig.handle.state().countdowns.is_running());
    rig.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_router_answering_again_returns_to_last_page() {
    let addr = closed_port();
    let mut rig = start(config_at(&format!("http://{addr}"), Some("home"), None));
    join_home(&mut rig).await;

    wait_for(&mut rig.frames, "router countdown", counting_down(CountdownKind::RouterConnect)).await;

    let listener = TcpListener::bind(addr).unwrap();
    let _router = MockServer::builder().listener(listener).start().await;

    wait_for(&mut rig.frames, "ping page again", |f| f.title == "Ping" && f.countdown.is_none()).await;
    assert!(!rig.handle.state().flags.router_dead());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!rig.handle.state().countdowns.is_running());
    assert_eq!(rig.frames.borrow().title, "Ping");
    rig.handle.shutdown().await;
}

// ── WAN and SIM pages ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_wan_list_survives_a_visit_to_wan_info() {
    let router = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .and(query_param("id", "1"))
        .respond_with(ok(json!({ "order": [1], "1": ethernet("WAN-A", 1) })))
        .mount(&router)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .and(query_param_is_missing("id"))
        .respond_with(ok(json!({
            "order": [1, 2, 3],
            "1": ethernet("WAN-A", 1),
            "2": ethernet("WAN-B", 2),
            "3": ethernet("WAN-C", 3)
        })))
        .mount(&router)
        .await;
    mount_empty_traffic(&router).await;

    let mut rig = start_logged_in(device_config(&router, None, None));
    wait_for(&mut rig.frames, "home", |f| f.title == "pepfob").await;

    let full = ["WAN-A", "WAN-B", "WAN-C", "WAN Summary", "SIM Cards", "<--"];
    rig.handle.dispatch(Action::Fetch(Fetch::WanList));
    wait_for(&mut rig.frames, "WAN list", |f| f.title == "WAN Status" && item_texts(f) == full).await;

    press(&rig, Button::B, Duration::from_millis(50)).await;
    wait_for(&mut rig.frames, "WAN-A detail", |f| {
        f.title == "WAN-A" && f.body.iter().any(|l| l.text == "IP: 10.0.0.1")
    })
    .await;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    rig.handle.dispatch(Action::Back);
    wait_for(&mut rig.frames, "WAN list again", |f| f.title == "WAN Status").await;
    let frame = rig.frames.borrow().clone();
    assert_eq!(item_texts(&frame), full);
    assert!(frame.items[0].highlighted, "remembered WAN should stay highlighted");
    rig.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_sim_pages_colour_slots_and_remember_the_cursor() {
    let router = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .respond_with(ok(json!({
            "order": [3],
            "3": {
                "type": "cellular", "name": "Cellular", "message": "Connected",
                "statusLed": "green", "priority": 1, "ip": "100.64.0.7",
                "cellular": {
                    "signalLevel": 4, "network": "LTE",
                    "sim": {
                        "order": [1, 2],
                        "1": { "simCardDetected": true, "active": true, "iccid": "8985200001" },
                        "2": { "simCardDetected": false }
                    }
                }
            }
        })))
        .mount(&router)
        .await;
    mount_empty_traffic(&router).await;

    let mut rig = start_logged_in(device_config(&router, None, None));
    wait_for(&mut rig.frames, "home", |f| f.title == "pepfob").await;

    rig.handle.dispatch(Action::Fetch(Fetch::WanList));
    wait_for(&mut rig.frames, "WAN list", |f| f.title == "WAN Status" && f.items.len() == 4).await;
    press(&rig, Button::A, Duration::from_millis(50)).await;
    press(&rig, Button::A, Duration::from_millis(50)).await;
    wait_for(&mut rig.frames, "SIM Cards item", highlighted("SIM Cards")).await;

    press(&rig, Button::B, Duration::from_millis(50)).await;
    wait_for(&mut rig.frames, "SIM list", |f| f.title == "SIM Cards").await;
    let frame = rig.frames.borrow().clone();
    assert_eq!(item_texts(&frame), ["SIM 1", "SIM 2", "<--"]);
    let swatches: Vec<Color> = frame.items.iter().filter_map(|i| i.aux.as_ref()).map(|a| a.bg).collect();
    assert_eq!(swatches, vec![Color::Green, Color::Grey]);

    press(&rig, Button::A, Duration::from_millis(50)).await;
    wait_for(&mut rig.frames, "SIM 2 item", highlighted("SIM 2")).await;
    press(&rig, Button::B, Duration::from_millis(50)).await;
    wait_for(&mut rig.frames, "SIM 2 detail", |f| {
        f.title == "SIM 2" && f.body.iter().any(|l| l.text == "Not detected")
    })
    .await;

    rig.handle.dispatch(Action::Back);
    wait_for(&mut rig.frames, "SIM list again", |f| f.title == "SIM Cards").await;
    let frame = rig.frames.borrow().clone();
    assert!(highlighted("SIM 2")(&frame));
    rig.handle.shutdown().await;
}
