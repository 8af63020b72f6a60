//! Start, stop and boot-time enablement of OS services.
//!
//! [`ServiceManager`] is the backend seam; [`SysvServiceManager`] drives the
//! SysV `service` and `chkconfig` tools. [`ServiceController`] binds one
//! service name to a backend and applies the status rules installers rely on.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::command::{locate, CommandRunner};
use crate::error::Result;
use crate::paths;

// ---------------------------------------------------------------------------
// Runlevels
// ---------------------------------------------------------------------------

/// Per-runlevel boot enablement, runlevels 0 through 6.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Runlevels([bool; 7]);

impl Runlevels {
    pub fn new(levels: [bool; 7]) -> Self {
        Self(levels)
    }

    pub fn is_on(&self, level: usize) -> bool {
        self.0.get(level).copied().unwrap_or(false)
    }

    /// Enabled in all three standard multi-user runlevels (3, 4 and 5).
    pub fn multi_user(&self) -> bool {
        self.is_on(3) && self.is_on(4) && self.is_on(5)
    }
}

static RUNLEVEL_RE: OnceLock<Regex> = OnceLock::new();

fn runlevel_re() -> &'static Regex {
    RUNLEVEL_RE.get_or_init(|| Regex::new(r"^([0-6]):(on|off)$").unwrap())
}

/// Parse `chkconfig --list <service>` output.
///
/// Only the line whose first column is `service` counts. Columns that are not
/// `N:on`/`N:off` are ignored; runlevels not mentioned are off.
pub fn parse_chkconfig_list(stdout: &str, service: &str) -> Runlevels {
    let mut levels = [false; 7];
    for line in stdout.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some(service) {
            continue;
        }
        for col in parts {
            if let Some(caps) = runlevel_re().captures(col) {
                if let Ok(level) = caps[1].parse::<usize>() {
                    levels[level] = &caps[2] == "on";
                }
            }
        }
        break;
    }
    Runlevels(levels)
}

// ---------------------------------------------------------------------------
// ServiceManager
// ---------------------------------------------------------------------------

pub trait ServiceManager {
    fn start(&self, service: &str, instance: Option<&str>) -> Result<()>;
    fn stop(&self, service: &str, instance: Option<&str>) -> Result<()>;
    fn restart(&self, service: &str, instance: Option<&str>) -> Result<()>;

    /// `Ok` when the status query reports the service running.
    fn status(&self, service: &str) -> Result<()>;

    fn runlevels(&self, service: &str) -> Result<Runlevels>;
    fn set_enabled(&self, service: &str, enabled: bool) -> Result<()>;

    /// Make the init system aware of the service (`chkconfig --add`).
    fn register(&self, service: &str) -> Result<()>;
    fn unregister(&self, service: &str) -> Result<()>;
}

/// SysV init backend: `/sbin/service` and `/sbin/chkconfig`.
pub struct SysvServiceManager<R> {
    runner: R,
    service_cmd: PathBuf,
    chkconfig_cmd: PathBuf,
}

impl<R: CommandRunner> SysvServiceManager<R> {
    /// Locate `service` and `chkconfig` on `PATH`, falling back to `/sbin`.
    pub fn new(runner: R) -> Self {
        Self::with_commands(
            runner,
            locate("service", paths::SBIN_DIR),
            locate("chkconfig", paths::SBIN_DIR),
        )
    }

    pub fn with_commands(runner: R, service_cmd: PathBuf, chkconfig_cmd: PathBuf) -> Self {
        Self {
            runner,
            service_cmd,
            chkconfig_cmd,
        }
    }

    fn service(&self, service: &str, verb: &str, instance: Option<&str>) -> Result<()> {
        let mut args = vec![service, verb];
        if let Some(inst) = instance.filter(|i| !i.is_empty()) {
            args.push(inst);
        }
        self.runner.run(&self.service_cmd, &args)?;
        Ok(())
    }

    fn chkconfig(&self, args: &[&str]) -> Result<String> {
        Ok(self.runner.run(&self.chkconfig_cmd, args)?.stdout)
    }

    pub fn service_command(&self) -> &Path {
        &self.service_cmd
    }

    pub fn chkconfig_command(&self) -> &Path {
        &self.chkconfig_cmd
    }
}

impl<R: CommandRunner> ServiceManager for SysvServiceManager<R> {
    fn start(&self, service: &str, instance: Option<&str>) -> Result<()> {
        self.service(service, "start", instance)
    }

    fn stop(&self, service: &str, instance: Option<&str>) -> Result<()> {
        self.service(service, "stop", instance)
    }

    fn restart(&self, service: &str, instance: Option<&str>) -> Result<()> {
        self.service(service, "restart", instance)
    }

    fn status(&self, service: &str) -> Result<()> {
        self.service(service, "status", None)
    }

    fn runlevels(&self, service: &str) -> Result<Runlevels> {
        let out = self.chkconfig(&["--list", service])?;
        Ok(parse_chkconfig_list(&out, service))
    }

    fn set_enabled(&self, service: &str, enabled: bool) -> Result<()> {
        self.chkconfig(&[service, if enabled { "on" } else { "off" }])?;
        Ok(())
    }

    fn register(&self, service: &str) -> Result<()> {
        self.chkconfig(&["--add", service])?;
        Ok(())
    }

    fn unregister(&self, service: &str) -> Result<()> {
        self.chkconfig(&["--del", service])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ServiceController
// ---------------------------------------------------------------------------

/// One named service on top of a [`ServiceManager`].
#[derive(Clone, Copy)]
pub struct ServiceController<'a> {
    name: &'a str,
    manager: &'a dyn ServiceManager,
}

impl<'a> ServiceController<'a> {
    pub fn new(name: &'a str, manager: &'a dyn ServiceManager) -> Self {
        Self { name, manager }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn start(&self, instance: Option<&str>) -> Result<()> {
        self.manager.start(self.name, instance)
    }

    pub fn stop(&self, instance: Option<&str>) -> Result<()> {
        self.manager.stop(self.name, instance)
    }

    pub fn restart(&self, instance: Option<&str>) -> Result<()> {
        self.manager.restart(self.name, instance)
    }

    /// An unknown or failed status query counts as "not running".
    pub fn is_running(&self) -> bool {
        match self.manager.status(self.name) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(service = %self.name, error = %e, "status query failed, treating as stopped");
                false
            }
        }
    }

    pub fn is_enabled(&self) -> Result<bool> {
        Ok(self.manager.runlevels(self.name)?.multi_user())
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.manager.set_enabled(self.name, enabled)
    }

    pub fn register_for_startup(&self) -> Result<()> {
        self.manager.register(self.name)
    }

    pub fn unregister_for_startup(&self) -> Result<()> {
        self.manager.unregister(self.name)
    }
}

impl fmt::Debug for ServiceController<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceController")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
