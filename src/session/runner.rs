//! # Session Runner
//!
//! Drives a [`Session`] on its own task.
//!
//! The task multiplexes the frame timer, backend pushes and operator actions
//! with `tokio::select!`. The session is only touched from this task, and the
//! resulting [`SessionView`] is published whole over a `watch` channel.
//! Teardown goes through [`SessionHandle`].

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{OperatorAction, Session, SessionView};
use crate::emitter::CommandEmitter;
use crate::protocol::{Command, InboundMessage};

/// Capacity of the operator action queue.
const ACTION_QUEUE: usize = 16;

/// Owner of a running session task.
///
/// Dropping the handle cancels the task and detaches the push listeners;
/// [`SessionHandle::shutdown`] also waits for the task to finish.
pub struct SessionHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    listeners: Vec<JoinHandle<()>>,
    view: watch::Receiver<SessionView>,
    actions: mpsc::Sender<OperatorAction>,
}

impl SessionHandle {
    /// Subscribes to published views.
    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Sender for operator actions.
    pub fn actions(&self) -> mpsc::Sender<OperatorAction> {
        self.actions.clone()
    }

    /// Ties a push listener task to the session's lifetime.
    pub fn attach_listener(&mut self, listener: JoinHandle<()>) {
        self.listeners.push(listener);
    }

    /// Stops the session and waits for its task to exit.
    pub async fn shutdown(mut self) {
        self.detach();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }
        info!("Session stopped");
    }

    fn detach(&mut self) {
        let _ = self.cancel.send(true);
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Starts `session` on a new task.
pub fn spawn_session(
    session: Session,
    emitter: Box<dyn CommandEmitter>,
    pushes: mpsc::Receiver<InboundMessage>,
) -> SessionHandle {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (view_tx, view_rx) = watch::channel(session.view());
    let (action_tx, action_rx) = mpsc::channel(ACTION_QUEUE);

    let task = tokio::spawn(run(session, emitter, pushes, action_rx, cancel_rx, view_tx));

    SessionHandle {
        cancel: cancel_tx,
        task: Some(task),
        listeners: Vec::new(),
        view: view_rx,
        actions: action_tx,
    }
}

async fn run(
    mut session: Session,
    mut emitter: Box<dyn CommandEmitter>,
    mut pushes: mpsc::Receiver<InboundMessage>,
    mut actions: mpsc::Receiver<OperatorAction>,
    mut cancel: watch::Receiver<bool>,
    view: watch::Sender<SessionView>,
) {
    let mut frames = interval(session.settings().frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Sampling at {:?} per frame, polling detection every {:?}",
        session.settings().frame_interval,
        session.settings().poll_interval
    );

    loop {
        if *cancel.borrow() {
            break;
        }

        let commands = tokio::select! {
            biased;

            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
                Vec::new()
            }

            _ = frames.tick() => session.on_frame(Instant::now()),

            Some(message) = pushes.recv() => {
                session.on_push(message);
                Vec::new()
            }

            Some(action) = actions.recv() => session.on_action(action),
        };

        // A stalled transport must not hold off teardown
        let finished = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => false,
            _ = emit_all(emitter.as_mut(), &commands) => true,
        };
        if !finished {
            debug!("Cancelled while sending commands");
            break;
        }

        publish(&view, session.view());
    }

    debug!("Session task exiting");
}

async fn emit_all(emitter: &mut dyn CommandEmitter, commands: &[Command]) {
    for command in commands {
        if let Err(e) = emitter.emit(command).await {
            warn!("Failed to send {}: {}", command.name(), e);
        }
    }
}

/// Resolves once cancellation is requested or the handle is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

fn publish(view: &watch::Sender<SessionView>, next: SessionView) {
    view.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::source::MockInputSource;
    use crate::emitter::mocks::RecordingEmitter;
    use crate::prefs::mocks::MemoryPreferenceStore;
    use crate::protocol::Axis;
    use crate::session::test_support::{pad, snapshot};
    use crate::session::SessionSettings;
    use crate::settings::mocks::MemorySettingsStore;
    use crate::settings::ScaleAxis;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, Duration};

    fn deflected_source() -> MockInputSource {
        let mut source = MockInputSource::new();
        source.expect_detect().returning(|| Some(pad()));
        source
            .expect_snapshot()
            .returning(|_| Some(snapshot([0.0, 0.0, 1.0, 0.0], false, false)));
        source
    }

    fn session(source: MockInputSource) -> Session {
        Session::new(
            Box::new(source),
            SessionSettings::default(),
            Box::new(MemorySettingsStore::default()),
            Box::new(MemoryPreferenceStore::default()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_emits_and_publishes() {
        let emitter = RecordingEmitter::new();
        let (_push_tx, push_rx) = mpsc::channel(4);
        let handle = spawn_session(session(deflected_source()), Box::new(emitter.clone()), push_rx);
        let view = handle.view();

        sleep(Duration::from_millis(250)).await;

        let sent = emitter.sent();
        assert!(matches!(sent[0], Command::ControllerDiscovered { .. }));
        assert!(sent.contains(&Command::Jog { axis: Axis::X, distance: 10.0, feedrate: 4500 }));

        let current = view.borrow().clone();
        assert!(current.sampling);
        assert_eq!(current.telemetry.x, 10.0);
        assert_eq!(current.status, format!("Connected: {}", pad().id));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_everything() {
        let emitter = RecordingEmitter::new();
        let (push_tx, push_rx) = mpsc::channel(4);
        let handle = spawn_session(session(deflected_source()), Box::new(emitter.clone()), push_rx);
        let view = handle.view();

        sleep(Duration::from_millis(300)).await;
        handle.shutdown().await;

        let sent = emitter.sent().len();
        let last_view = view.borrow().clone();
        assert!(sent > 0);

        // Source keeps producing snapshots and pushes keep coming
        let _ = push_tx
            .send(InboundMessage::ConnectionInfo { source: "backend".to_string(), connected: true })
            .await;
        sleep(Duration::from_secs(2)).await;

        assert_eq!(emitter.sent().len(), sent);
        assert_eq!(*view.borrow(), last_view);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_detaches_listener() {
        let (_push_tx, push_rx) = mpsc::channel(4);
        let mut handle = spawn_session(
            session(deflected_source()),
            Box::new(RecordingEmitter::new()),
            push_rx,
        );

        let (alive_tx, mut alive_rx) = mpsc::channel::<()>(1);
        handle.attach_listener(tokio::spawn(async move {
            let _alive = alive_tx;
            loop {
                sleep(Duration::from_millis(10)).await;
            }
        }));

        drop(handle);

        // The aborted listener drops its sender
        let closed = tokio::time::timeout(Duration::from_secs(1), alive_rx.recv()).await;
        assert_eq!(closed, Ok(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushes_and_actions_are_applied() {
        let mut source = MockInputSource::new();
        source.expect_detect().returning(|| None);
        source.expect_snapshot().never();

        let emitter = RecordingEmitter::new();
        let (push_tx, push_rx) = mpsc::channel(4);
        let handle = spawn_session(session(source), Box::new(emitter.clone()), push_rx);
        let view = handle.view();

        push_tx
            .send(InboundMessage::ConnectionInfo { source: "backend".to_string(), connected: true })
            .await
            .unwrap();
        handle
            .actions()
            .send(OperatorAction::SetScaleFactor { axis: ScaleAxis::E, value: 90 })
            .await
            .unwrap();

        sleep(Duration::from_millis(50)).await;

        let current = view.borrow().clone();
        assert_eq!(current.status, "Connected via remote source");
        assert!(!current.sampling);
        assert_eq!(current.scale.e, 90);
        assert_eq!(
            emitter.sent(),
            vec![Command::UpdateScaleFactor { axis: ScaleAxis::E, value: 90 }]
        );

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_failures_do_not_stop_sampling() {
        let emitter = RecordingEmitter::new();
        emitter.set_failing(true);
        let (_push_tx, push_rx) = mpsc::channel(4);
        let handle = spawn_session(session(deflected_source()), Box::new(emitter.clone()), push_rx);

        sleep(Duration::from_millis(200)).await;
        emitter.set_failing(false);
        sleep(Duration::from_millis(200)).await;

        let sent = emitter.sent();
        assert!(sent.iter().any(|c| matches!(c, Command::Jog { .. })));
        assert!(!sent.iter().any(|c| matches!(c, Command::ControllerDiscovered { .. })));

        handle.shutdown().await;
    }

    /// Emitter whose sends never complete, like a backend that stopped reading.
    struct StalledEmitter {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl CommandEmitter for StalledEmitter {
        async fn emit(&mut self, _command: &Command) -> crate::error::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_with_stalled_emitter() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let (_push_tx, push_rx) = mpsc::channel(4);
        let handle = spawn_session(
            session(deflected_source()),
            Box::new(StalledEmitter { attempts: attempts.clone() }),
            push_rx,
        );

        sleep(Duration::from_millis(100)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        let stopped = tokio::time::timeout(Duration::from_secs(10), handle.shutdown()).await;
        assert!(stopped.is_ok());
    }
}
