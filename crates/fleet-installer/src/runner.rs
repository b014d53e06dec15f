//! The create-job runner itself: validates machines, renders the config,
//! spawns the installer process, and tails its output into the task's log
//! and progress columns (spec §4.I).

use std::process::Stdio;
use std::sync::Arc;

use chrono::Utc;
use fleet_entities::model::{CreateTask, CreateTaskStatus, EntityId, Machine, MachineRole, MachineStatus};
use fleet_entities::repository::InstallerRepository;
use snafu::{OptionExt, ResultExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::config::{self, CreateRequest};
use crate::error::{self, Result};
use crate::progress;

/// Where rendered config files are written before being handed to the
/// installer binary via `-f`.
pub struct CreateRunner<R> {
    repo: Arc<R>,
    binary_path: String,
    config_dir: std::path::PathBuf,
}

impl<R> CreateRunner<R>
where
    R: InstallerRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, binary_path: String, config_dir: std::path::PathBuf) -> Self {
        Self {
            repo,
            binary_path,
            config_dir,
        }
    }

    /// Validates the request, persists a `pending` [`CreateTask`], and
    /// dispatches the install as a detached task (spec §4.I). Returns the
    /// task id immediately.
    #[instrument(skip(self, request))]
    pub async fn submit(self: &Arc<Self>, request: CreateRequest) -> fleet_entities::Result<EntityId>
    where
        R: 'static,
    {
        let machines = self.validate_machines(&request).await?;
        let config_text = config::render(&request.cluster_name, &machines).map_err(fleet_entities::FleetError::from)?;

        let task_id = Uuid::new_v4();
        let task = CreateTask::new(task_id, request.cluster_name.clone(), request.machine_ids.clone(), config_text.clone());
        self.repo.put_create_task(task).await?;

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = runner.run_install(task_id, &request, &config_text).await {
                warn!(%task_id, %error, "create-job run_install returned an error after task bookkeeping");
            }
        });

        Ok(task_id)
    }

    async fn validate_machines(&self, request: &CreateRequest) -> fleet_entities::Result<Vec<Machine>> {
        let ids: Vec<EntityId> = request.machine_ids.iter().copied().collect();
        let machines = self.repo.list_machines(&ids).await?;

        for id in &ids {
            if !machines.iter().any(|machine| &machine.id == id) {
                return Err(error::Error::MachineNotFound { id: id.to_string() }.into());
            }
        }
        for machine in &machines {
            if machine.status != MachineStatus::Available {
                return Err(error::Error::MachineNotAvailable {
                    id: machine.id.to_string(),
                }
                .into());
            }
        }
        if !machines.iter().any(|machine| machine.roles.contains(&MachineRole::Master)) {
            return Err(error::Error::NoMasterRole.into());
        }

        Ok(machines)
    }

    async fn run_install(&self, task_id: EntityId, request: &CreateRequest, config_text: &str) -> Result<()> {
        let config_path = self.config_dir.join(format!("{task_id}.yaml"));
        tokio::fs::create_dir_all(&self.config_dir)
            .await
            .with_context(|_| error::WriteConfigSnafu {
                path: self.config_dir.display().to_string(),
            })?;
        tokio::fs::write(&config_path, config_text)
            .await
            .with_context(|_| error::WriteConfigSnafu {
                path: config_path.display().to_string(),
            })?;

        self.mark_running(task_id).await?;

        let mut command = Command::new(&self.binary_path);
        command
            .arg("-f")
            .arg(&config_path)
            .env("INSTALLER_ZONE", "cn")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(artifact) = &request.artifact {
            command.arg("-a").arg(artifact);
        }
        if request.with_packages {
            command.arg("--with-packages");
        }
        if request.yes {
            command.arg("--yes");
        }

        let mut child = command.spawn().with_context(|_| error::SpawnSnafu {
            binary: self.binary_path.clone(),
        })?;

        let stdout = child.stdout.take().context(error::MissingPipeSnafu)?;
        let stderr = child.stderr.take().context(error::MissingPipeSnafu)?;

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let stdout_tx = tx.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = stdout_tx.send(line);
            }
        });
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx.send(line);
            }
        });

        let mut last_progress: u8 = 0;
        while let Some(line) = rx.recv().await {
            self.repo
                .append_create_task_log(task_id, format!("[{}] {line}", Utc::now().to_rfc3339()))
                .await
                .context(error::RepositorySnafu)?;

            if let Some((progress, step)) = progress::map_line(&line) {
                last_progress = progress;
                self.set_progress(task_id, progress, step).await?;
            }
        }

        let _ = stdout_task.await;
        let _ = stderr_task.await;
        let status = child.wait().await.context(error::WaitSnafu)?;

        if status.success() {
            self.mark_terminal(task_id, CreateTaskStatus::Success, 100).await?;
        } else {
            self.mark_terminal(task_id, CreateTaskStatus::Failed, last_progress).await?;
        }
        Ok(())
    }

    async fn mark_running(&self, task_id: EntityId) -> Result<()> {
        let mut task = self.load_task(task_id).await?;
        task.status = CreateTaskStatus::Running;
        task.started_at = Some(Utc::now());
        self.repo.put_create_task(task).await.context(error::RepositorySnafu)
    }

    async fn set_progress(&self, task_id: EntityId, progress: u8, step: &str) -> Result<()> {
        let mut task = self.load_task(task_id).await?;
        task.progress = progress;
        task.current_step = step.to_string();
        self.repo.put_create_task(task).await.context(error::RepositorySnafu)
    }

    async fn mark_terminal(&self, task_id: EntityId, status: CreateTaskStatus, progress: u8) -> Result<()> {
        let mut task = self.load_task(task_id).await?;
        task.status = status;
        task.progress = progress;
        task.completed_at = Some(Utc::now());
        self.repo.put_create_task(task).await.context(error::RepositorySnafu)
    }

    async fn load_task(&self, task_id: EntityId) -> Result<CreateTask> {
        self.repo
            .get_create_task(task_id)
            .await
            .context(error::RepositorySnafu)?
            .context(error::TaskNotFoundSnafu {
                id: task_id.to_string(),
            })
    }
}
