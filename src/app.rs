use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyEventKind};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::api::TaskService;
use crate::core::{DropTarget, TaskId};
use crate::render::RenderState;
use crate::tea::{update, Command, Message, Model};
use crate::{tdlog_debug, tdlog_error, Error, Result};

const MAX_BG_MESSAGES: usize = 50;

/// Owns the model and runs its commands against a [`TaskService`].
///
/// Each request command is spawned as its own task and answers with exactly
/// one completion message on the driver's channel. Completions are applied
/// in arrival order, which is not necessarily request order.
pub struct Driver {
    model: Model,
    service: Arc<dyn TaskService>,
    msg_tx: mpsc::UnboundedSender<Message>,
    msg_rx: mpsc::UnboundedReceiver<Message>,
    in_flight: usize,
    failures: Vec<String>,
}

impl Driver {
    pub fn new(model: Model, service: Arc<dyn TaskService>) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        Self {
            model,
            service,
            msg_tx,
            msg_rx,
            in_flight: 0,
            failures: Vec::new(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Requests started but not yet answered.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Run one message through `update` and start its commands.
    ///
    /// Must be called from within a tokio runtime. Returns true when a
    /// command asked to quit.
    pub fn dispatch(&mut self, msg: Message) -> bool {
        if let Some(failure) = msg.failure() {
            self.failures.push(failure);
        }
        let mut quit = false;
        for cmd in update(&mut self.model, msg) {
            quit |= self.execute(cmd);
        }
        quit
    }

    /// Apply completions that have already arrived, up to `max`, without
    /// waiting.
    pub fn pump(&mut self, max: usize) -> bool {
        for _ in 0..max {
            let Ok(msg) = self.msg_rx.try_recv() else {
                break;
            };
            self.in_flight = self.in_flight.saturating_sub(1);
            if self.dispatch(msg) {
                return true;
            }
        }
        false
    }

    /// Wait for the next completion and apply it. Returns false when nothing
    /// is in flight.
    pub async fn step(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.msg_rx.recv().await {
            Some(msg) => {
                self.in_flight -= 1;
                self.dispatch(msg);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no request is in flight, including the
    /// follow-up requests completions start.
    pub async fn settle(&mut self) {
        while self.step().await {}
    }

    /// Drop `active` on `over` and wait until the move is settled.
    ///
    /// Returns false when the drop is a no-op. A failed persist is an error;
    /// by then the board has been reloaded from the service.
    pub async fn move_task(&mut self, active: TaskId, over: DropTarget) -> Result<bool> {
        self.dispatch(Message::Drop { active, over });
        if self.in_flight == 0 {
            return Ok(false);
        }
        self.settle().await;
        let failures = self.take_failures();
        if failures.is_empty() {
            Ok(true)
        } else {
            Err(Error::Validation(failures.join("; ")))
        }
    }

    /// Failed-request descriptions seen since the last call.
    pub fn take_failures(&mut self) -> Vec<String> {
        std::mem::take(&mut self.failures)
    }

    fn execute(&mut self, cmd: Command) -> bool {
        if cmd == Command::Quit {
            tdlog_debug!("Command::Quit");
            return true;
        }
        self.in_flight += 1;
        let service = self.service.clone();
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            if let Some(msg) = execute_command(cmd, service.as_ref()).await {
                let _ = tx.send(msg);
            }
        });
        false
    }
}

/// Perform one request and turn its outcome into a completion message.
async fn execute_command(cmd: Command, service: &dyn TaskService) -> Option<Message> {
    let msg = match cmd {
        Command::LoadBoard { scope } => {
            tdlog_debug!("Command::LoadBoard scope={}", scope);
            match service.list_scope(scope).await {
                Ok(tasks) => Message::BoardLoaded { scope, tasks },
                Err(e) => Message::BoardLoadFailed {
                    scope,
                    error: e.to_string(),
                },
            }
        }

        Command::CreateTask { scope, new_task } => {
            tdlog_debug!("Command::CreateTask scope={} title={}", scope, new_task.title);
            match service.create_task(&new_task).await {
                Ok(task) => Message::TaskCreated { scope, task },
                Err(e) => Message::TaskCreateFailed(e.to_string()),
            }
        }

        Command::DeleteTask { id } => {
            tdlog_debug!("Command::DeleteTask id={}", id);
            match service.delete_task(id).await {
                Ok(()) => Message::TaskDeleted(id),
                Err(e) => Message::TaskDeleteFailed(id, e.to_string()),
            }
        }

        Command::UpdateTask { id, patch } => {
            tdlog_debug!("Command::UpdateTask id={} patch={:?}", id, patch);
            match service.update_task(id, &patch).await {
                Ok(()) => Message::TaskUpdated(id),
                Err(e) => Message::TaskUpdateFailed(id, e.to_string()),
            }
        }

        Command::PersistStatus { id, status } => {
            tdlog_debug!("Command::PersistStatus id={} status={}", id, status);
            match service.update_status(id, status).await {
                Ok(()) => Message::StatusPersisted(id),
                Err(e) => Message::StatusPersistFailed {
                    id,
                    status,
                    error: e.to_string(),
                },
            }
        }

        Command::LoadFolders => {
            tdlog_debug!("Command::LoadFolders");
            match service.list_folders().await {
                Ok(folders) => Message::FoldersLoaded(folders),
                Err(e) => Message::FoldersLoadFailed(e.to_string()),
            }
        }

        Command::CreateFolder { title } => {
            tdlog_debug!("Command::CreateFolder title={}", title);
            match service.create_folder(&title).await {
                Ok(folder) => Message::FolderCreated(folder),
                Err(e) => Message::FolderCreateFailed(e.to_string()),
            }
        }

        Command::LoadProfile => {
            tdlog_debug!("Command::LoadProfile");
            match service.current_user().await {
                Ok(user) => Message::ProfileLoaded(user),
                Err(e) => Message::ProfileLoadFailed(e.to_string()),
            }
        }

        Command::Quit => return None,
    };
    Some(msg)
}

pub struct LogicThread;

impl LogicThread {
    pub fn run(
        model: Model,
        service: Arc<dyn TaskService>,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        Runtime::new()?.block_on(Self::run_async(model, service, state_tx, shutdown))
    }

    async fn run_async(
        model: Model,
        service: Arc<dyn TaskService>,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        tdlog_debug!("LogicThread::run_async scope={}", model.scope);
        let mut driver = Driver::new(model, service);
        driver.dispatch(Message::Init);
        send_state(&state_tx, driver.model_mut());

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Keyboard input (priority)
            while event::poll(Duration::ZERO)? {
                let msg = match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => Message::Key(key),
                    Event::Resize(w, h) => Message::Resize(w, h),
                    _ => continue,
                };
                if driver.dispatch(msg) {
                    shutdown.store(true, Ordering::Relaxed);
                    return Ok(());
                }
                send_state(&state_tx, driver.model_mut());
            }

            // Request completions (bounded)
            if driver.pump(MAX_BG_MESSAGES) {
                shutdown.store(true, Ordering::Relaxed);
                return Ok(());
            }

            send_state(&state_tx, driver.model_mut());

            tokio::time::sleep(Duration::from_micros(500)).await;
        }

        if driver.in_flight() > 0 {
            tdlog_error!(
                "Exiting with {} request(s) still in flight",
                driver.in_flight()
            );
        }
        Ok(())
    }
}

/// Offer a snapshot to the render thread. The model stays dirty while the
/// channel is full, so the change is resent on a later pass.
fn send_state(state_tx: &Sender<RenderState>, model: &mut Model) {
    if model.dirty && state_tx.try_send(model.snapshot()).is_ok() {
        model.dirty = false;
    }
}
