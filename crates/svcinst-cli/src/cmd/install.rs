use crate::context::Context;
use crate::output::print_json;
use anyhow::Context as _;
use svcinst_core::service::Service;
use svcinst_core::simple::SimpleService;

pub fn run(ctx: &Context, service: &str, instance: Option<&str>, json: bool) -> anyhow::Result<()> {
    let identity = ctx.config.identity_for(service)?;
    let store = ctx.open_store()?;
    let manager = ctx.service_manager();

    // Progress lines would corrupt the JSON document on stdout
    let mut svc = Service::new(&identity, &store, &manager);
    if json {
        svc = svc.with_output(Box::new(std::io::stderr()));
    }

    let mut installer = SimpleService::new(svc);
    if let Some(instance) = instance {
        installer = installer.with_instance(instance);
    }
    installer
        .create_instance()
        .with_context(|| format!("failed to install {service}"))?;

    if json {
        print_json(&serde_json::json!({
            "service": service,
            "instance": instance,
            "installed": true,
        }))?;
    }
    Ok(())
}
