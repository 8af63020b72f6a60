//! Fakes shared by unit tests.

use std::cell::{Cell, RefCell};

use crate::controller::{Runlevels, ServiceManager};
use crate::error::{InstallError, Result};

/// Tracks run state and boot enablement in memory and records every call.
#[derive(Default)]
pub(crate) struct RecordingManager {
    pub running: Cell<bool>,
    pub enabled: Cell<bool>,
    pub fail_start: Cell<bool>,
    calls: RefCell<Vec<String>>,
}

impl RecordingManager {
    pub fn with_state(running: bool, enabled: bool) -> Self {
        let m = Self::default();
        m.running.set(running);
        m.enabled.set(enabled);
        m
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls that change the host, ignoring status queries.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("status ") && !c.starts_with("runlevels "))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl ServiceManager for RecordingManager {
    fn start(&self, service: &str, _instance: Option<&str>) -> Result<()> {
        self.record(format!("start {service}"));
        if self.fail_start.get() {
            return Err(InstallError::CommandFailed {
                command: format!("service {service} start"),
                status: 1,
                stderr: "failed".into(),
            });
        }
        self.running.set(true);
        Ok(())
    }

    fn stop(&self, service: &str, _instance: Option<&str>) -> Result<()> {
        self.record(format!("stop {service}"));
        self.running.set(false);
        Ok(())
    }

    fn restart(&self, service: &str, _instance: Option<&str>) -> Result<()> {
        self.record(format!("restart {service}"));
        if self.fail_start.get() {
            return Err(InstallError::CommandFailed {
                command: format!("service {service} restart"),
                status: 1,
                stderr: "failed".into(),
            });
        }
        self.running.set(true);
        Ok(())
    }

    fn status(&self, service: &str) -> Result<()> {
        self.record(format!("status {service}"));
        if self.running.get() {
            Ok(())
        } else {
            Err(InstallError::CommandFailed {
                command: format!("service {service} status"),
                status: 3,
                stderr: String::new(),
            })
        }
    }

    fn runlevels(&self, service: &str) -> Result<Runlevels> {
        self.record(format!("runlevels {service}"));
        let on = self.enabled.get();
        Ok(Runlevels::new([false, false, on, on, on, on, false]))
    }

    fn set_enabled(&self, service: &str, enabled: bool) -> Result<()> {
        self.record(format!("set_enabled {service} {enabled}"));
        self.enabled.set(enabled);
        Ok(())
    }

    fn register(&self, service: &str) -> Result<()> {
        self.record(format!("register {service}"));
        Ok(())
    }

    fn unregister(&self, service: &str) -> Result<()> {
        self.record(format!("unregister {service}"));
        Ok(())
    }
}
