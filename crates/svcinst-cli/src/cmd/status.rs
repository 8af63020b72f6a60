use crate::context::Context;
use crate::output::{print_json, yes_no};
use anyhow::Context as _;
use serde::Serialize;
use svcinst_core::controller::ServiceController;
use svcinst_core::paths;
use svcinst_core::simple::{ENABLED_KEY, RUNNING_KEY};
use svcinst_core::state::ServiceState;

#[derive(Serialize)]
struct StatusOutput<'a> {
    service: &'a str,
    running: bool,
    enabled: bool,
    configured: bool,
    /// What install observed before it changed anything.
    was_running: Option<bool>,
    was_enabled: Option<bool>,
}

pub fn run(ctx: &Context, service: &str, json: bool) -> anyhow::Result<()> {
    paths::validate_service_name(service)?;
    let store = ctx.open_store()?;
    let manager = ctx.service_manager();

    let ctl = ServiceController::new(service, &manager);
    let state = ServiceState::new(service, &store);

    let status = StatusOutput {
        service,
        running: ctl.is_running(),
        enabled: ctl
            .is_enabled()
            .with_context(|| format!("failed to query boot status of {service}"))?,
        configured: state.is_configured()?,
        was_running: state.restore_bool(RUNNING_KEY)?,
        was_enabled: state.restore_bool(ENABLED_KEY)?,
    };

    if json {
        return print_json(&status);
    }

    println!("Service:    {}", status.service);
    println!("Running:    {}", yes_no(Some(status.running)));
    println!("Enabled:    {}", yes_no(Some(status.enabled)));
    println!("Configured: {}", yes_no(Some(status.configured)));
    if status.configured {
        println!("Before install:");
        println!("  running:  {}", yes_no(status.was_running));
        println!("  enabled:  {}", yes_no(status.was_enabled));
    }
    Ok(())
}
