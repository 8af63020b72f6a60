//! The step queue that drives an install run.
//!
//! Installers register `(description, action)` pairs with [`Service::step`] and
//! execute them with [`Service::run`]. Steps run one at a time in
//! registration order; the first failure stops the run and is returned with
//! the step's position attached. Nothing is rolled back automatically: undoing
//! an install is the job of the installer's uninstall path, driven by the
//! state captured during the run.

use std::io::Write;
use std::time::Instant;

use crate::certificate;
use crate::controller::{ServiceController, ServiceManager};
use crate::directory::Credentials;
use crate::error::{InstallError, Result};
use crate::identity::ServiceIdentity;
use crate::registry::{self, DirectoryTarget};
use crate::relocation::{self, Relocation};
use crate::state::{ServiceState, StateStore, StateValue};

type Action<'a> = Box<dyn FnMut() -> Result<()> + 'a>;

struct Step<'a> {
    description: String,
    action: Action<'a>,
}

/// Directory endpoint plus the identity to bind as.
#[derive(Clone, Copy)]
pub struct DirectoryAccess<'a> {
    pub target: DirectoryTarget<'a>,
    pub credentials: &'a Credentials,
}

impl<'a> DirectoryAccess<'a> {
    pub fn new(target: DirectoryTarget<'a>, credentials: &'a Credentials) -> Self {
        Self {
            target,
            credentials,
        }
    }

    pub fn enable(
        &self,
        controller: ServiceController<'_>,
        name: &str,
        fqdn: &str,
        suffix: &str,
    ) -> Result<()> {
        registry::enable_in_directory(controller, self.target, name, fqdn, self.credentials, suffix)
    }

    pub fn disable(&self, name: &str, fqdn: &str, suffix: &str) -> Result<bool> {
        registry::disable_in_directory(self.target, name, fqdn, self.credentials, suffix)
    }

    pub fn relocate(
        &self,
        fqdn: &str,
        principal: &str,
        realm: &str,
        suffix: &str,
    ) -> Result<Relocation> {
        relocation::relocate(self.target, self.credentials, fqdn, principal, realm, suffix)
    }

    pub fn add_certificate(
        &self,
        fqdn: &str,
        principal: &str,
        suffix: &str,
        cert: &[u8],
    ) -> Result<()> {
        certificate::add_cert_to_service(
            self.target,
            self.credentials,
            fqdn,
            principal,
            suffix,
            cert,
        )
    }
}

/// Human-readable duration estimate: "N minute(s)" from 60 s up, otherwise
/// "N second(s)".
pub fn format_estimate(seconds: u64) -> String {
    let (n, unit) = if seconds >= 60 {
        (seconds / 60, "minute")
    } else {
        (seconds, "second")
    };
    let plural = if n == 1 { "" } else { "s" };
    format!("{n} {unit}{plural}")
}

pub struct Service<'a> {
    identity: &'a ServiceIdentity,
    store: &'a dyn StateStore,
    manager: &'a dyn ServiceManager,
    directory: Option<DirectoryAccess<'a>>,
    output: Box<dyn Write + 'a>,
    steps: Vec<Step<'a>>,
}

impl<'a> Service<'a> {
    pub fn new(
        identity: &'a ServiceIdentity,
        store: &'a dyn StateStore,
        manager: &'a dyn ServiceManager,
    ) -> Self {
        Self {
            identity,
            store,
            manager,
            directory: None,
            output: Box::new(std::io::stdout()),
            steps: Vec::new(),
        }
    }

    pub fn with_directory(mut self, access: DirectoryAccess<'a>) -> Self {
        self.directory = Some(access);
        self
    }

    /// Send progress lines somewhere other than stdout.
    pub fn with_output(mut self, output: Box<dyn Write + 'a>) -> Self {
        self.output = output;
        self
    }

    pub fn identity(&self) -> &'a ServiceIdentity {
        self.identity
    }

    pub fn name(&self) -> &'a str {
        self.identity.name()
    }

    /// State Store view scoped to this service.
    pub fn state(&self) -> ServiceState<'a> {
        ServiceState::new(self.identity.name(), self.store)
    }

    pub fn controller(&self) -> ServiceController<'a> {
        ServiceController::new(self.identity.name(), self.manager)
    }

    pub fn directory(&self) -> Option<DirectoryAccess<'a>> {
        self.directory
    }

    fn require_directory(&self) -> Result<DirectoryAccess<'a>> {
        self.directory.ok_or_else(|| {
            InstallError::Config(format!(
                "{} needs a directory connection but none was configured",
                self.identity.name()
            ))
        })
    }

    pub fn backup_state(&self, key: &str, value: impl Into<StateValue>) -> Result<()> {
        self.state().backup(key, value)
    }

    pub fn restore_state(&self, key: &str) -> Result<Option<StateValue>> {
        self.state().restore(key)
    }

    pub fn is_configured(&self) -> Result<bool> {
        self.state().is_configured()
    }

    /// Write one line to the output and mirror it to the debug log.
    pub fn print_msg(&mut self, message: &str) -> Result<()> {
        tracing::debug!("{message}");
        writeln!(self.output, "{message}")?;
        self.output.flush()?;
        Ok(())
    }

    /// Queue a step. Steps run in the order they were added.
    pub fn step<F>(&mut self, description: impl Into<String>, action: F)
    where
        F: FnMut() -> Result<()> + 'a,
    {
        self.steps.push(Step {
            description: description.into(),
            action: Box::new(action),
        });
    }

    /// Steps waiting for the next [`run`](Self::run).
    pub fn pending(&self) -> usize {
        self.steps.len()
    }

    /// Run every queued step.
    ///
    /// The queue is emptied when the run starts, so a failed run is not
    /// resumed by calling `run` again.
    pub fn run(&mut self, headline: &str, estimated_seconds: u64) -> Result<()> {
        if estimated_seconds > 0 {
            let line = format!(
                "{headline}: Estimated time {}",
                format_estimate(estimated_seconds)
            );
            self.print_msg(&line)?;
        } else {
            self.print_msg(headline)?;
        }

        let steps = std::mem::take(&mut self.steps);
        let total = steps.len();
        for (i, mut step) in steps.into_iter().enumerate() {
            let index = i + 1;
            self.print_msg(&format!("  [{index}/{total}]: {}", step.description))?;

            let started = Instant::now();
            let result = (step.action)();
            tracing::debug!("  duration: {} seconds", started.elapsed().as_secs());

            if let Err(e) = result {
                return Err(InstallError::Step {
                    index,
                    total,
                    description: step.description,
                    source: Box::new(e),
                });
            }
        }

        let done = format!("done configuring {}.", self.identity.name());
        self.print_msg(&done)
    }

    /// Register this service in the directory under `name`.
    pub fn enable_in_directory(&self, name: &str) -> Result<()> {
        self.require_directory()?.enable(
            self.controller(),
            name,
            self.identity.fqdn(),
            self.identity.suffix(),
        )
    }

    /// Relocate `principal` from the Kerberos container to the services
    /// container, using the identity's realm.
    pub fn move_service(&self, principal: &str) -> Result<Relocation> {
        let realm = self.identity.realm().ok_or_else(|| {
            InstallError::Config(format!("no realm configured for {}", self.identity.name()))
        })?;
        self.require_directory()?.relocate(
            self.identity.fqdn(),
            principal,
            realm,
            self.identity.suffix(),
        )
    }

    /// Publish `cert` (DER or PEM) on the entry of `principal`.
    pub fn add_cert_to_service(&self, principal: &str, cert: &[u8]) -> Result<()> {
        self.require_directory()?.add_certificate(
            self.identity.fqdn(),
            principal,
            self.identity.suffix(),
            cert,
        )
    }
}
