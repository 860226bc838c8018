// ── Device page set ──
//
// Declarative page construction. Item and page hooks never touch the
// network or the board: they read the shared snapshot and send
// `Action`s to the UI actor.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::board::{WifiMode, WifiStatus};
use crate::countdown::{CountdownKind, format_mm_ss};
use crate::menu::{AuxText, Color, Frame, MenuEngine, MenuItem, MenuPage};
use crate::model::{LedColor, SimSlot, WanKind, WanLink};
use crate::state::SharedState;
use crate::store::SsidSlot;
use crate::wan::WanStatusModel;

use super::action::{Action, DataKind, Fetch, PageId};

type Page = MenuPage<PageId>;

/// What page hooks may capture.
#[derive(Clone)]
pub(crate) struct PageContext {
    pub(crate) actions: mpsc::UnboundedSender<Action>,
    pub(crate) state: Arc<SharedState>,
    pub(crate) wans: Arc<WanStatusModel>,
    pub(crate) ping_targets: Vec<String>,
}

impl PageContext {
    /// Item hook sending `actions` in order.
    fn sends(&self, actions: impl Into<Vec<Action>>) -> impl Fn(&MenuItem) + Send + 'static {
        let tx = self.actions.clone();
        let actions = actions.into();
        move |_| {
            for action in &actions {
                let _ = tx.send(action.clone());
            }
        }
    }

    /// Page hook sending `action`.
    fn emits(&self, action: Action) -> impl FnMut(&mut Page) + Send + 'static {
        let tx = self.actions.clone();
        move |_| {
            let _ = tx.send(action.clone());
        }
    }

    fn back_item(&self) -> MenuItem {
        MenuItem::new("<--").on_activate(self.sends([Action::Back]))
    }
}

/// Build the engine with every device page registered.
pub(crate) fn build(ctx: &PageContext) -> MenuEngine<PageId> {
    let mut engine = MenuEngine::new();
    engine.add_page(PageId::Countdown, countdown(ctx));
    engine.add_page(PageId::Home, home(ctx));
    engine.add_page(PageId::Wifi, wifi(ctx));
    engine.add_page(PageId::WifiPrompt, wifi_prompt(ctx));
    engine.add_page(PageId::ScanResults, scan_results(ctx));
    engine.add_page(PageId::SaveSsid, save_ssid(ctx));
    engine.add_page(PageId::PingTargets, ping_targets(ctx));
    engine.add_page(PageId::Router, router(ctx));
    engine.add_page(PageId::RouterInfo, router_info(ctx));
    engine.add_page(PageId::Location, location(ctx));
    engine.add_page(PageId::WanList, wan_list(ctx));
    engine.add_page(PageId::WanInfo, wan_info(ctx));
    engine.add_page(PageId::WanSummary, wan_summary(ctx));
    engine.add_page(PageId::SimList, sim_list(ctx));
    engine.add_page(PageId::SimInfo, sim_info(ctx));
    engine.add_page(PageId::Time, time(ctx));
    engine.add_page(PageId::FobInfo, fob_info(ctx));
    engine.add_page(PageId::FactoryResetConfirm, factory_reset_confirm(ctx));
    engine.add_page(PageId::RouterUnavailable, router_unavailable());
    engine
}

// ── Colours and formatting ───────────────────────────────────────────

pub(crate) fn led_color(led: LedColor) -> Color {
    match led {
        LedColor::Green => Color::Green,
        LedColor::Yellow => Color::Yellow,
        LedColor::Red => Color::Red,
        LedColor::Gray | LedColor::Unknown => Color::Grey,
    }
}

fn wifi_color(mode: WifiMode, status: WifiStatus) -> Color {
    match (mode, status) {
        (WifiMode::AccessPoint, _) => Color::Blue,
        (WifiMode::Off, _) | (_, WifiStatus::Idle) => Color::Grey,
        (_, WifiStatus::Connected) => Color::Green,
        (_, WifiStatus::Connecting) => Color::Yellow,
        (_, WifiStatus::Disconnected | WifiStatus::Failed) => Color::Red,
    }
}

fn sim_color(sim: &SimSlot) -> Color {
    match (sim.detected, sim.active) {
        (false, _) => Color::Grey,
        (true, true) => Color::Green,
        (true, false) => Color::Red,
    }
}

/// `1d 02:03:04`, dropping the day part when zero.
pub(crate) fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let rest = secs % 86_400;
    let clock = format!("{:02}:{:02}:{:02}", rest / 3600, (rest % 3600) / 60, rest % 60);
    if days > 0 { format!("{days}d {clock}") } else { clock }
}

/// The cellular WAN the SIM pages describe: the remembered one when it
/// is cellular, else the first cellular WAN.
fn sim_owner(links: &[WanLink], selected: u8) -> Option<&WanLink> {
    links
        .iter()
        .find(|l| l.id == selected && l.cellular().is_some())
        .or_else(|| links.iter().find(|l| l.cellular().is_some()))
}

// ── Pages ────────────────────────────────────────────────────────────

fn countdown(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    MenuPage::info("Please wait", None).on_rendered(move |_, frame| {
        let Some((kind, remaining)) = state.snapshot().countdown else {
            return;
        };
        frame.title = kind.to_string();
        frame.countdown = Some((kind.to_string(), format_mm_ss(remaining)));
        let hint = match kind {
            CountdownKind::WifiConnect | CountdownKind::RouterConnect => "Hold B to give up",
            _ => "Hold B to cancel",
        };
        frame.line(hint);
    })
}

fn home(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    MenuPage::new("pepfob")
        .item(
            MenuItem::new("Wi-Fi")
                .on_activate(ctx.sends([Action::GoTo(PageId::Wifi)]))
                .on_highlight(move |item| {
                    let wifi = state.snapshot().wifi;
                    item.aux = Some(AuxText::swatch(wifi_color(wifi.mode, wifi.status)));
                }),
        )
        .item(MenuItem::new("Network Diags").on_activate(ctx.sends([Action::GoTo(PageId::PingTargets)])))
        .item(MenuItem::new("Router").on_activate(ctx.sends([Action::GoTo(PageId::Router)])))
        .item(MenuItem::new("Time").on_activate(ctx.sends([Action::GoTo(PageId::Time)])))
        .item(MenuItem::new("Fob Info").on_activate(ctx.sends([Action::GoTo(PageId::FobInfo)])))
        .item(
            MenuItem::new("Shut Down")
                .on_activate(ctx.sends([Action::StartCountdown(CountdownKind::Shutdown)])),
        )
        .item(MenuItem::new("Reboot").on_activate(ctx.sends([Action::StartCountdown(CountdownKind::Reboot)])))
        .item(
            MenuItem::new("Factory Reset")
                .on_activate(ctx.sends([Action::GoTo(PageId::FactoryResetConfirm)])),
        )
}

fn wifi(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    MenuPage::new("Wi-Fi")
        .back_to(PageId::Home)
        .item(MenuItem::new("Connect STA").on_activate(ctx.sends([Action::ConnectStation])))
        .item(MenuItem::new("Start AP").on_activate(ctx.sends([Action::StartAccessPoint])))
        .item(MenuItem::new("Scan").on_activate(ctx.sends([Action::ScanWifi])))
        .item(ctx.back_item())
        .on_rendered(move |_, frame| {
            let wifi = state.snapshot().wifi;
            frame.line_colored(
                format!("{} / {}", wifi.mode, wifi.status),
                wifi_color(wifi.mode, wifi.status),
            );
            if let Some(ssid) = &wifi.ssid {
                frame.line(format!("SSID: {ssid}"));
            }
            if let Some(ip) = &wifi.ip {
                frame.line(format!("IP: {ip}"));
            }
        })
}

fn wifi_prompt(ctx: &PageContext) -> Page {
    MenuPage::new("Wi-Fi failed")
        .back_to(PageId::Home)
        .item(MenuItem::new("Retry STA").on_activate(ctx.sends([Action::ConnectStation])))
        .item(MenuItem::new("Start AP").on_activate(ctx.sends([Action::StartAccessPoint])))
        .item(MenuItem::new("Cancel").on_activate(ctx.sends([Action::GoTo(PageId::Home)])))
}

fn scan_results(ctx: &PageContext) -> Page {
    let hook_ctx = ctx.clone();
    MenuPage::new("Networks")
        .back_to(PageId::Wifi)
        .dynamic()
        .on_opened(move |page| {
            let results = hook_ctx.state.scan_results();
            if results.is_empty() {
                page.push(MenuItem::new("None found").on_activate(hook_ctx.sends([Action::Back])));
                return;
            }
            for (index, network) in results.iter().enumerate() {
                let signal = AuxText::new(network.rssi.to_string(), Color::Grey);
                page.push(
                    MenuItem::new(network.ssid.clone())
                        .with_aux(signal)
                        .on_activate(hook_ctx.sends([
                            Action::PickScan(index),
                            Action::GoTo(PageId::SaveSsid),
                        ])),
                );
            }
            page.push(hook_ctx.back_item());
        })
}

fn save_ssid(ctx: &PageContext) -> Page {
    MenuPage::new("Save SSID as")
        .back_to(PageId::ScanResults)
        .item(MenuItem::new("Primary").on_activate(ctx.sends([Action::SaveSsid(SsidSlot::Primary)])))
        .item(MenuItem::new("Secondary").on_activate(ctx.sends([Action::SaveSsid(SsidSlot::Secondary)])))
        .item(ctx.back_item())
}

fn ping_targets(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    let mut page = MenuPage::new("Ping")
        .back_to(PageId::Home)
        .on_opened(ctx.emits(Action::StartData(DataKind::Ping)))
        .on_closed(ctx.emits(Action::StopData))
        .on_rendered(move |page, _| {
            let results = state.snapshot().ping;
            for item in page.items_mut() {
                let Some(result) = results.iter().find(|r| r.target == item.text) else {
                    continue;
                };
                item.aux = Some(match result.reachable {
                    Some(true) => AuxText::new("OK", Color::Green),
                    Some(false) => AuxText::new("FAIL", Color::Red),
                    None => AuxText::new("..", Color::Grey),
                });
            }
        });
    for target in &ctx.ping_targets {
        page.push(MenuItem::new(target.clone()));
    }
    page.item(ctx.back_item())
}

fn router(ctx: &PageContext) -> Page {
    MenuPage::new("Router")
        .back_to(PageId::Home)
        .item(MenuItem::new("Info").on_activate(ctx.sends([Action::GoTo(PageId::RouterInfo)])))
        .item(MenuItem::new("Location").on_activate(ctx.sends([Action::GoTo(PageId::Location)])))
        .item(MenuItem::new("WAN Status").on_activate(ctx.sends([Action::Fetch(Fetch::WanList)])))
        .item(ctx.back_item())
}

fn router_info(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    MenuPage::info("Router Info", Some(PageId::Router))
        .on_opened(ctx.emits(Action::Fetch(Fetch::RouterInfo)))
        .on_rendered(move |_, frame| {
            let Some(info) = state.snapshot().router_info else {
                return;
            };
            frame.line(info.name);
            frame.line(format!("Model: {} {}", info.product_code, info.hardware_revision));
            frame.line(format!("S/N: {}", info.serial));
            frame.line(format!("FW: {}", info.firmware));
            frame.line(format!("Up: {}", format_uptime(info.uptime_secs)));
        })
}

fn location(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    MenuPage::info("Location", Some(PageId::Router))
        .on_opened(ctx.emits(Action::Fetch(Fetch::Location)))
        .on_rendered(move |_, frame| match state.snapshot().location {
            Some(fix) if fix.has_fix() => {
                frame.line(format!("Lat: {}", fix.latitude));
                frame.line(format!("Lon: {}", fix.longitude));
                frame.line(format!("Alt: {}", fix.altitude));
            }
            Some(_) => frame.line_colored("No GPS fix", Color::Yellow),
            None => {}
        })
}

fn wan_list(ctx: &PageContext) -> Page {
    let opened = ctx.clone();
    let state = Arc::clone(&ctx.state);
    MenuPage::new("WAN Status")
        .back_to(PageId::Router)
        .dynamic()
        .on_opened(move |page| {
            let links = opened.wans.links();
            opened.state.update(|d| d.unavailable = links.is_empty());
            for link in links.iter() {
                page.push(
                    MenuItem::new(link.name.clone())
                        .with_key(u32::from(link.id))
                        .with_aux(AuxText::swatch(led_color(link.status_led)))
                        .on_activate(opened.sends([Action::GoTo(PageId::WanInfo)])),
                );
            }
            page.push(MenuItem::new("WAN Summary").on_activate(opened.sends([Action::GoTo(PageId::WanSummary)])));
            page.push(MenuItem::new("SIM Cards").on_activate(opened.sends([Action::GoTo(PageId::SimList)])));
            page.push(opened.back_item());
            page.highlight_key(u32::from(opened.state.selected_wan()));
        })
        .on_closed(move |page| {
            if let Some(id) = page.highlighted_item().and_then(|i| i.key) {
                state.select_wan(u8::try_from(id).unwrap_or_default());
            }
        })
}

fn wan_info(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    MenuPage::info("WAN", Some(PageId::WanList))
        .on_opened(ctx.emits(Action::StartData(DataKind::WanInfo)))
        .on_closed(ctx.emits(Action::StopData))
        .on_rendered(move |_, frame| {
            let Some(link) = state.snapshot().wan_info else {
                return;
            };
            frame.title.clone_from(&link.name);
            frame.line_colored(link.status.clone(), led_color(link.status_led));
            if let Some(ip) = &link.ip {
                frame.line(format!("IP: {ip}"));
            }
            if !link.is_disabled() {
                frame.line(format!("Down: {} {}", link.download, link.unit));
                frame.line(format!("Up: {} {}", link.upload, link.unit));
            }
            match &link.kind {
                WanKind::Cellular(cell) => {
                    if let Some(carrier) = &cell.carrier {
                        frame.line(format!("Carrier: {carrier}"));
                    }
                    frame.line(format!("{} signal {}/5", cell.network_type, cell.signal_level));
                }
                WanKind::WiFi(wifi) => {
                    if let Some(ssid) = &wifi.ssid {
                        frame.line(format!("SSID: {ssid}"));
                    }
                    if let Some(strength) = wifi.strength {
                        frame.line(format!("Signal: {strength}"));
                    }
                }
                WanKind::Ethernet => {}
            }
            if link.management_only {
                frame.line("Management only");
            }
        })
}

fn wan_summary(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    MenuPage::info("WAN Summary", Some(PageId::WanList))
        .on_opened(ctx.emits(Action::StartData(DataKind::WanSummary)))
        .on_closed(ctx.emits(Action::StopData))
        .on_rendered(move |_, frame| {
            for link in state.snapshot().wan_summary.iter() {
                frame.line_colored(format!("{}: {}", link.name, link.status), led_color(link.status_led));
            }
        })
}

fn sim_list(ctx: &PageContext) -> Page {
    let opened = ctx.clone();
    let state = Arc::clone(&ctx.state);
    MenuPage::new("SIM Cards")
        .back_to(PageId::WanList)
        .dynamic()
        .on_opened(move |page| {
            let links = opened.wans.links();
            let Some(cell) = sim_owner(&links, opened.state.selected_wan()).and_then(WanLink::cellular) else {
                page.push(MenuItem::new("No cellular WAN").on_activate(opened.sends([Action::Back])));
                return;
            };
            for (slot, sim) in cell.sim_cards.iter().enumerate() {
                let key = u32::try_from(slot).unwrap_or_default();
                page.push(
                    MenuItem::new(format!("SIM {}", slot + 1))
                        .with_key(key)
                        .with_aux(AuxText::swatch(sim_color(sim)))
                        .on_activate(opened.sends([Action::GoTo(PageId::SimInfo)])),
                );
            }
            page.push(opened.back_item());
            page.highlight_key(u32::from(opened.state.selected_sim()));
        })
        .on_closed(move |page| {
            if let Some(slot) = page.highlighted_item().and_then(|i| i.key) {
                state.select_sim(u8::try_from(slot).unwrap_or_default());
            }
        })
}

fn sim_info(ctx: &PageContext) -> Page {
    let ctx = ctx.clone();
    MenuPage::info("SIM", Some(PageId::SimList)).on_rendered(move |_, frame| {
        let links = ctx.wans.links();
        let slot = ctx.state.selected_sim();
        let sim = sim_owner(&links, ctx.state.selected_wan())
            .and_then(WanLink::cellular)
            .and_then(|cell| cell.sim_cards.get(usize::from(slot)));
        let Some(sim) = sim else {
            frame.line("No SIM data");
            return;
        };
        frame.title = format!("SIM {}", u16::from(slot) + 1);
        if !sim.detected {
            frame.line_colored("Not detected", Color::Grey);
            return;
        }
        let (text, color) = if sim.active { ("Active", Color::Green) } else { ("Inactive", Color::Red) };
        frame.line_colored(text, color);
        if let Some(iccid) = &sim.iccid {
            frame.line(format!("ICCID: {iccid}"));
        }
    })
}

fn time(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    MenuPage::info("Time", Some(PageId::Home))
        .on_opened(ctx.emits(Action::StartData(DataKind::Time)))
        .on_closed(ctx.emits(Action::StopData))
        .on_rendered(move |_, frame| {
            if let Some(now) = state.snapshot().now {
                frame.line(now.format("%H:%M:%S").to_string());
                frame.line(now.format("%a %d %b %Y").to_string());
            }
        })
}

fn fob_info(ctx: &PageContext) -> Page {
    let state = Arc::clone(&ctx.state);
    MenuPage::info("Fob Info", Some(PageId::Home))
        .on_opened(ctx.emits(Action::StartData(DataKind::FobInfo)))
        .on_closed(ctx.emits(Action::StopData))
        .on_rendered(move |_, frame| {
            let data = state.snapshot();
            frame.line(format!("ID: {}", data.fob.hardware_id));
            match data.fob.battery_percent {
                Some(pct) => frame.line(format!("Battery: {pct}%")),
                None => frame.line("Battery: n/a"),
            }
            frame.line(format!("Up: {}", format_uptime(data.fob.uptime_secs)));
            if let Some(ip) = &data.wifi.ip {
                frame.line(format!("IP: {ip}"));
            }
        })
}

fn factory_reset_confirm(ctx: &PageContext) -> Page {
    MenuPage::new("Erase all settings?")
        .back_to(PageId::Home)
        .item(MenuItem::new("Factory Reset").on_activate(ctx.sends([Action::FactoryReset])))
        .item(MenuItem::new("Cancel").on_activate(ctx.sends([Action::GoTo(PageId::Home)])))
}

fn router_unavailable() -> Page {
    MenuPage::info("Router unavailable", None).on_rendered(|_, frame: &mut Frame| {
        frame.line_colored("Router not reachable", Color::Red);
        frame.line("Reboot required");
    })
}
