//! Installer for a service that only needs to be started and enabled at boot.
//!
//! Install records whether the service was running and boot-enabled before it
//! touched anything. Uninstall turns off only what install turned on: a
//! service that was already running is left running, one that was already
//! enabled stays enabled, and with no recorded state uninstall does nothing.

use serde::Serialize;

use crate::error::{InstallError, Result};
use crate::service::Service;

pub const RUNNING_KEY: &str = "running";
pub const ENABLED_KEY: &str = "enabled";
pub const REGISTERED_KEY: &str = "registered";

/// What an uninstall actually reversed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UninstallReport {
    pub stopped: bool,
    pub disabled: bool,
    pub unregistered: bool,
}

impl UninstallReport {
    pub fn is_noop(&self) -> bool {
        !(self.stopped || self.disabled || self.unregistered)
    }
}

pub struct SimpleService<'a> {
    service: Service<'a>,
    instance: Option<String>,
}

impl<'a> SimpleService<'a> {
    pub fn new(service: Service<'a>) -> Self {
        Self {
            service,
            instance: None,
        }
    }

    /// Target a named instance (`service <name> restart <instance>`).
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn service(&self) -> &Service<'a> {
        &self.service
    }

    /// Start the service and arrange for it to come up at boot, either through
    /// the local init system or, when the identity names a directory
    /// registration, through the directory.
    pub fn create_instance(&mut self) -> Result<()> {
        let name = self.service.name();
        let state = self.service.state();
        let ctl = self.service.controller();
        let identity = self.service.identity();
        let directory = self.service.directory();
        let instance = self.instance.clone();

        self.service.step(format!("starting {name}"), move || {
            state.backup(RUNNING_KEY, ctl.is_running())?;
            ctl.restart(instance.as_deref())
        });

        self.service
            .step(format!("configuring {name} to start on boot"), move || {
                ctl.register_for_startup()?;
                state.backup(ENABLED_KEY, ctl.is_enabled()?)?;
                match identity.directory_name() {
                    None => ctl.set_enabled(true),
                    Some(registered_as) => {
                        let access = directory.ok_or_else(|| {
                            InstallError::Config(format!(
                                "{name} is registered as {registered_as} but no directory is configured"
                            ))
                        })?;
                        access.enable(ctl, registered_as, identity.fqdn(), identity.suffix())?;
                        state.backup(REGISTERED_KEY, true)
                    }
                }
            });

        self.service.run(&format!("Configuring {name}"), 0)
    }

    /// Reverse what [`create_instance`](Self::create_instance) changed.
    pub fn uninstall(&mut self) -> Result<UninstallReport> {
        let name = self.service.name();
        let state = self.service.state();
        let ctl = self.service.controller();
        let mut report = UninstallReport::default();

        if state.is_configured()? {
            self.service.print_msg(&format!("Unconfiguring {name}"))?;
        }

        let was_running = state.restore_bool(RUNNING_KEY)?;
        let was_enabled = state.restore_bool(ENABLED_KEY)?;
        let registered = state.restore_bool(REGISTERED_KEY)?;

        // Nothing is reversed or forgotten while a recorded registration can't be removed.
        let identity = self.service.identity();
        let deregistration = match registered {
            Some(true) => match (identity.directory_name(), self.service.directory()) {
                (Some(registered_as), Some(access)) => Some((registered_as, access)),
                _ => {
                    return Err(InstallError::Config(format!(
                        "{name} is registered in the directory but no directory connection is configured"
                    )))
                }
            },
            _ => None,
        };

        if was_running == Some(false) {
            ctl.stop(self.instance.as_deref())?;
            report.stopped = true;
        }

        if was_enabled == Some(false) {
            ctl.set_enabled(false)?;
            ctl.unregister_for_startup()?;
            report.disabled = true;
        }

        if let Some((registered_as, access)) = deregistration {
            report.unregistered = access.disable(registered_as, identity.fqdn(), identity.suffix())?;
        }

        for key in [RUNNING_KEY, ENABLED_KEY, REGISTERED_KEY] {
            state.clear(key)?;
        }

        tracing::info!(
            service = %name,
            stopped = report.stopped,
            disabled = report.disabled,
            unregistered = report.unregistered,
            "uninstall finished"
        );
        Ok(report)
    }
}
