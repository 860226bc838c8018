//! WAN, SIM and traffic command handlers.

use serde::Serialize;
use tabled::Tabled;

use pepfob_core::{WanKind, WanLink};

use crate::cli::{GlobalOpts, TrafficArgs, WanArgs, WanCommand};
use crate::error::CliError;
use crate::output;

use super::{RouterHandle, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct WanRow {
    #[tabled(rename = "ID")]
    id: u8,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn kind_detail(link: &WanLink) -> String {
    match &link.kind {
        WanKind::Ethernet => String::new(),
        WanKind::Cellular(c) => format!(
            "{} {} ({}/5)",
            c.carrier.as_deref().unwrap_or("-"),
            c.network_type,
            c.signal_level
        ),
        WanKind::WiFi(w) => format!(
            "{} {}",
            w.ssid.as_deref().unwrap_or("-"),
            w.strength.map(|s| format!("{s} dBm")).unwrap_or_default()
        ),
    }
}

impl From<&WanLink> for WanRow {
    fn from(l: &WanLink) -> Self {
        Self {
            id: l.id,
            name: l.name.clone(),
            kind: l.kind.to_string(),
            status: output::paint_status(&l.status, l.status_led),
            priority: match l.priority {
                0 => "-".into(),
                p => p.to_string(),
            },
            ip: l.ip.clone().unwrap_or_default(),
            detail: kind_detail(l),
        }
    }
}

#[derive(Serialize)]
struct SimView {
    wan_id: u8,
    wan_name: String,
    slot: usize,
    detected: bool,
    active: bool,
    iccid: Option<String>,
}

#[derive(Tabled)]
struct SimRow {
    #[tabled(rename = "WAN")]
    wan: String,
    #[tabled(rename = "Slot")]
    slot: usize,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "ICCID")]
    iccid: String,
}

impl From<&SimView> for SimRow {
    fn from(s: &SimView) -> Self {
        let state = match (s.detected, s.active) {
            (false, _) => "not detected",
            (true, true) => "active",
            (true, false) => "inactive",
        };
        Self {
            wan: format!("{} ({})", s.wan_name, s.wan_id),
            slot: s.slot,
            state: state.into(),
            iccid: s.iccid.clone().unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct TrafficView {
    id: u8,
    name: String,
    download: u64,
    upload: u64,
    unit: String,
}

#[derive(Tabled)]
struct TrafficRow {
    #[tabled(rename = "ID")]
    id: u8,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Down")]
    download: String,
    #[tabled(rename = "Up")]
    upload: String,
}

impl From<&TrafficView> for TrafficRow {
    fn from(t: &TrafficView) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            download: format!("{} {}", t.download, t.unit),
            upload: format!("{} {}", t.upload, t.unit),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

async fn fetch(router: &RouterHandle, id: Option<u8>) -> Result<Vec<WanLink>, CliError> {
    util::connect(router, router.config.force_recreate_clients).await?;
    let links = util::retry_once(|| router.wans.refresh(id)).await?;
    if let (Some(id), true) = (id, links.is_empty()) {
        return Err(CliError::NotFound {
            resource_type: "WAN".into(),
            identifier: id.to_string(),
            list_command: "wan list".into(),
        });
    }
    Ok(links)
}

pub async fn handle(router: &RouterHandle, args: WanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        WanCommand::List { id } => {
            let links = fetch(router, id).await?;
            let out = output::render_list(&global.output, &links, |l| WanRow::from(l), |l| l.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        WanCommand::Sims => {
            let links = fetch(router, None).await?;
            let sims: Vec<SimView> = links
                .iter()
                .filter_map(|l| l.cellular().map(|c| (l, c)))
                .flat_map(|(l, c)| {
                    c.sim_cards.iter().enumerate().map(move |(i, s)| SimView {
                        wan_id: l.id,
                        wan_name: l.name.clone(),
                        slot: i + 1,
                        detected: s.detected,
                        active: s.detected && s.active,
                        iccid: s.iccid.clone(),
                    })
                })
                .collect();
            let out = output::render_list(&global.output, &sims, |s| SimRow::from(s), |s| {
                s.iccid.clone().unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

pub async fn handle_traffic(router: &RouterHandle, args: TrafficArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let links = fetch(router, args.id).await?;
    let rates: Vec<TrafficView> = links
        .iter()
        .filter(|l| !l.is_disabled())
        .map(|l| TrafficView {
            id: l.id,
            name: l.name.clone(),
            download: l.download,
            upload: l.upload,
            unit: l.unit.clone(),
        })
        .collect();
    let out = output::render_list(&global.output, &rates, |t| TrafficRow::from(t), |t| {
        format!("{} {} {}", t.id, t.download, t.upload)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
