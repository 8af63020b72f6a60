use crate::context::Context;
use crate::output::print_json;
use anyhow::Context as _;
use svcinst_core::service::Service;
use svcinst_core::simple::SimpleService;

pub fn run(ctx: &Context, service: &str, instance: Option<&str>, json: bool) -> anyhow::Result<()> {
    let identity = ctx.config.identity_for(service)?;
    let store = ctx.open_store()?;
    let manager = ctx.service_manager();

    let mut svc = Service::new(&identity, &store, &manager);
    if json {
        svc = svc.with_output(Box::new(std::io::stderr()));
    }

    let mut installer = SimpleService::new(svc);
    if let Some(instance) = instance {
        installer = installer.with_instance(instance);
    }
    let report = installer
        .uninstall()
        .with_context(|| format!("failed to uninstall {service}"))?;

    if json {
        #[derive(serde::Serialize)]
        struct UninstallOutput<'a> {
            service: &'a str,
            #[serde(flatten)]
            report: svcinst_core::simple::UninstallReport,
        }
        return print_json(&UninstallOutput { service, report });
    }

    if report.is_noop() {
        println!("Nothing to undo for {service}.");
        return Ok(());
    }
    if report.stopped {
        println!("Stopped {service}.");
    }
    if report.disabled {
        println!("Disabled {service} at boot.");
    }
    if report.unregistered {
        println!("Removed {service} from the directory.");
    }
    Ok(())
}
