//! # Task Runner Set
//!
//! The four runner roles shared by one engine instance, and the host that
//! owns their threads.
//!
//! ```text
//!   ThreadHost("shell")
//!   ├── shell.platform  ── always spawned
//!   ├── shell.ui        ── spawned if requested, else aliases platform
//!   ├── shell.raster    ── spawned if requested, else aliases platform
//!   └── shell.io        ── spawned if requested, else aliases platform
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RuntimeResult;
use crate::message_loop::ShutdownPolicy;
use crate::task_runner::TaskRunner;
use crate::thread::RunnerThread;

/// A named bundle of the Platform, Raster, UI and IO runners.
///
/// Roles may alias the same runner. Cloning the set clones the handles only.
#[derive(Clone, Debug)]
pub struct TaskRunners {
    label: String,
    platform: TaskRunner,
    raster: TaskRunner,
    ui: TaskRunner,
    io: TaskRunner,
}

impl TaskRunners {
    /// Bundles four runners under `label`.
    pub fn new(
        label: impl Into<String>,
        platform: TaskRunner,
        raster: TaskRunner,
        ui: TaskRunner,
        io: TaskRunner,
    ) -> Self {
        Self {
            label: label.into(),
            platform,
            raster,
            ui,
            io,
        }
    }

    /// Returns the set's label.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the platform runner.
    #[inline]
    #[must_use]
    pub fn platform(&self) -> &TaskRunner {
        &self.platform
    }

    /// Returns the raster runner.
    #[inline]
    #[must_use]
    pub fn raster(&self) -> &TaskRunner {
        &self.raster
    }

    /// Returns the UI runner.
    #[inline]
    #[must_use]
    pub fn ui(&self) -> &TaskRunner {
        &self.ui
    }

    /// Returns the IO runner.
    #[inline]
    #[must_use]
    pub fn io(&self) -> &TaskRunner {
        &self.io
    }

    /// Number of distinct runners behind the four roles (1 to 4).
    #[must_use]
    pub fn unique_runner_count(&self) -> usize {
        let roles = [&self.platform, &self.raster, &self.ui, &self.io];
        roles
            .iter()
            .enumerate()
            .filter(|&(i, runner)| !roles[..i].contains(runner))
            .count()
    }
}

/// Which roles get a dedicated thread. Platform always does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadRoles {
    /// Dedicated UI thread.
    pub ui: bool,
    /// Dedicated raster thread.
    pub raster: bool,
    /// Dedicated IO thread.
    pub io: bool,
}

impl ThreadRoles {
    /// One thread per role.
    pub const ALL: Self = Self {
        ui: true,
        raster: true,
        io: true,
    };

    /// Every role runs on the platform thread.
    pub const PLATFORM_ONLY: Self = Self {
        ui: false,
        raster: false,
        io: false,
    };
}

impl Default for ThreadRoles {
    fn default() -> Self {
        Self::ALL
    }
}

/// Owns the runner threads of one engine instance.
///
/// Dropping the host terminates and joins the UI, raster and IO threads
/// first, the platform thread last.
pub struct ThreadHost {
    // Field order is drop order.
    ui: Option<RunnerThread>,
    raster: Option<RunnerThread>,
    io: Option<RunnerThread>,
    platform: RunnerThread,
    runners: TaskRunners,
}

impl ThreadHost {
    /// Spawns `"{label}.platform"` plus one thread per requested role.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RuntimeError::Spawn`] if a thread cannot be created.
    /// Threads spawned before the failure are joined.
    pub fn new(label: &str, roles: ThreadRoles, policy: ShutdownPolicy) -> RuntimeResult<Self> {
        let spawn_if = |wanted: bool, role: &str| -> RuntimeResult<Option<RunnerThread>> {
            if wanted {
                RunnerThread::spawn(format!("{label}.{role}"), policy).map(Some)
            } else {
                Ok(None)
            }
        };

        let platform = RunnerThread::spawn(format!("{label}.platform"), policy)?;
        let ui = spawn_if(roles.ui, "ui")?;
        let raster = spawn_if(roles.raster, "raster")?;
        let io = spawn_if(roles.io, "io")?;

        let pick = |thread: &Option<RunnerThread>| {
            thread
                .as_ref()
                .map_or_else(|| platform.runner().clone(), |t| t.runner().clone())
        };
        let runners = TaskRunners::new(
            label,
            platform.runner().clone(),
            pick(&raster),
            pick(&ui),
            pick(&io),
        );

        tracing::info!(
            label,
            threads = runners.unique_runner_count(),
            "thread host started"
        );

        Ok(Self {
            ui,
            raster,
            io,
            platform,
            runners,
        })
    }

    /// Returns the runner set backed by this host.
    #[inline]
    #[must_use]
    pub fn task_runners(&self) -> &TaskRunners {
        &self.runners
    }
}

impl std::fmt::Debug for ThreadHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadHost")
            .field("platform", &self.platform)
            .field("ui", &self.ui)
            .field("raster", &self.raster)
            .field("io", &self.io)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_only_aliases_every_role() {
        let host = ThreadHost::new("alias", ThreadRoles::PLATFORM_ONLY, ShutdownPolicy::Discard)
            .unwrap();
        let runners = host.task_runners();
        assert_eq!(runners.unique_runner_count(), 1);
        assert_eq!(runners.ui(), runners.platform());
        assert_eq!(runners.raster(), runners.io());
    }

    #[test]
    fn test_all_roles_are_distinct() {
        let host = ThreadHost::new("full", ThreadRoles::ALL, ShutdownPolicy::Discard).unwrap();
        let runners = host.task_runners();
        assert_eq!(runners.unique_runner_count(), 4);
        assert_eq!(runners.label(), "full");
        assert_eq!(runners.ui().label(), "full.ui");
        assert_eq!(runners.raster().label(), "full.raster");
    }

    #[test]
    fn test_roles_default_from_partial_toml() {
        let roles: ThreadRoles = toml::from_str("io = false").unwrap();
        assert_eq!(
            roles,
            ThreadRoles {
                ui: true,
                raster: true,
                io: false
            }
        );
    }
}
