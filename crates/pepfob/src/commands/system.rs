//! Router identity and location.

use pepfob_core::{RouterInfo, RouterLocation};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{RouterHandle, util};

fn info_detail(i: &RouterInfo) -> String {
    [
        format!("Name:      {}", i.name),
        format!("Model:     {} (rev {})", i.product_code, i.hardware_revision),
        format!("Serial:    {}", i.serial),
        format!("Firmware:  {}", i.firmware),
        format!("Uptime:    {}", util::format_uptime(i.uptime_secs)),
    ]
    .join("\n")
}

fn location_detail(l: &RouterLocation) -> String {
    if !l.has_fix() {
        return "No GPS fix".into();
    }
    [
        format!("Latitude:  {}", l.latitude),
        format!("Longitude: {}", l.longitude),
        format!("Altitude:  {}", l.altitude),
    ]
    .join("\n")
}

pub async fn info(router: &RouterHandle, global: &GlobalOpts) -> Result<(), CliError> {
    util::connect(router, router.config.force_recreate_clients).await?;
    let info = util::retry_once(|| router.session.system_info()).await?;
    let out = output::render_single(&global.output, &info, info_detail, |i| i.serial.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn location(router: &RouterHandle, global: &GlobalOpts) -> Result<(), CliError> {
    util::connect(router, router.config.force_recreate_clients).await?;
    let loc = util::retry_once(|| router.session.location()).await?;
    let out = output::render_single(&global.output, &loc, location_detail, |l| {
        format!("{},{}", l.latitude, l.longitude)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
