use crate::context::Context;
use crate::output::{print_json, print_table};
use clap::Subcommand;
use svcinst_core::paths;
use svcinst_core::state::ServiceState;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum StateSubcommand {
    /// Show the values recorded for a service
    Show { service: String },

    /// Forget one recorded value
    Clear { service: String, key: String },
}

pub fn run(ctx: &Context, subcmd: StateSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        StateSubcommand::Show { service } => show(ctx, &service, json),
        StateSubcommand::Clear { service, key } => clear(ctx, &service, &key, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Context, service: &str, json: bool) -> anyhow::Result<()> {
    paths::validate_service_name(service)?;
    let store = ctx.open_store()?;
    let records = store.records(service)?;

    if json {
        let entries: Vec<serde_json::Value> = records
            .iter()
            .map(|(key, r)| {
                serde_json::json!({
                    "key": key,
                    "value": r.value,
                    "captured_at": r.captured_at,
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "service": service,
            "entries": entries,
        }));
    }

    if records.is_empty() {
        println!("No state recorded for {service}.");
        return Ok(());
    }

    let rows = records
        .iter()
        .map(|(key, r)| {
            vec![
                key.clone(),
                r.value.to_string(),
                r.captured_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
        })
        .collect();
    print_table(&["KEY", "VALUE", "CAPTURED"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// clear
// ---------------------------------------------------------------------------

fn clear(ctx: &Context, service: &str, key: &str, json: bool) -> anyhow::Result<()> {
    paths::validate_service_name(service)?;
    let store = ctx.open_store()?;
    let state = ServiceState::new(service, &store);

    let existed = state.restore(key)?.is_some();
    if existed {
        state.clear(key)?;
    }

    if json {
        return print_json(&serde_json::json!({
            "service": service,
            "key": key,
            "cleared": existed,
        }));
    }
    if existed {
        println!("Cleared {service}/{key}.");
    } else {
        println!("No value recorded for {service}/{key}.");
    }
    Ok(())
}
