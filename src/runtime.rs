//! Wires the workspace, scheduler, control-plane connection, renderer, and
//! persistence writers into the single-threaded event loop described by
//! the concurrency model: one logical task, explicit suspension points
//! only at stdin reads, RPC awaits, persistence flushes, timers, and
//! drain.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;

use crate::cli::{Cli, EnvOverrides};
use crate::controlplane::envelope_stream::EnvelopeStream;
use crate::controlplane::protocol::Scope;
use crate::controlplane::ControlPlaneClient;
use crate::envelope::EnvelopeHandler;
use crate::error::Result;
use crate::input::mouse::{MouseEvent, MouseKind};
use crate::input::{DecodedEvent, InputDecoder, Keystroke};
use crate::lifecycle;
use crate::modal::{command_menu, prompts, ModalKeyOutcome, ModalKind, ModalManager};
use crate::persistence::event_log::EventLog;
use crate::persistence::{files::SessionOrderState, files::UiState, DebouncedUiStateWriter};
use crate::queue::OpsQueue;
use crate::render::recorder::Recorder;
use crate::render::Renderer;
use crate::shortcuts::{self, ActionId, ResolvedBindings};
use crate::shutdown;
use crate::startup;
use crate::workspace::conversation::{AgentType, ConversationLifecycleState};
use crate::workspace::events::{EventKind, ObservedEvent};
use crate::workspace::{NoticeLevel, Workspace};

pub struct Runtime {
    workspace: Workspace,
    queue: OpsQueue,
    client: ControlPlaneClient,
    envelope_stream: EnvelopeStream,
    envelope_handler: EnvelopeHandler,
    modal_manager: ModalManager,
    renderer: Renderer,
    recorder: Recorder,
    ui_state_writer: DebouncedUiStateWriter,
    event_log: EventLog,
    input_decoder: InputDecoder,
    resolved_bindings: ResolvedBindings,
    pending_menu_action: Arc<Mutex<Option<ActionId>>>,
    resumed_conversations: Arc<Mutex<Vec<String>>>,
    activated_conversation: Arc<Mutex<Option<String>>>,
    dirty: bool,
    cols: u16,
    rows: u16,
    should_quit: bool,
    session_order_path: std::path::PathBuf,
}

impl Runtime {
    pub async fn bootstrap(cli: &Cli, env: &EnvOverrides) -> Result<Self> {
        let terminal = startup::enter_terminal()?;
        let scope = Scope {
            tenant_id: "default".to_string(),
            user_id: "default".to_string(),
            workspace_id: "default".to_string(),
        };

        let mut client = if env.control_plane_connect_retry_window_ms > 0 {
            ControlPlaneClient::connect_with_retry(
                &cli.control_plane_host,
                cli.control_plane_port,
                scope.clone(),
                env.control_plane_connect_retry_window_ms,
                env.control_plane_connect_retry_delay_ms,
            )
            .await?
        } else {
            ControlPlaneClient::connect(&cli.control_plane_host, cli.control_plane_port, scope).await?
        };

        let envelope_stream = EnvelopeStream::connect(&cli.control_plane_host, cli.control_plane_port).await?;

        let mut workspace = Workspace::new();
        let baseline_cursor = startup::read_baseline_cursor(&mut client).await?;

        let invoke_cwd = std::env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(str::to_string))
            .unwrap_or_else(|| ".".to_string());
        startup::hydrate_invocation_directory(&mut workspace, &mut client, &invoke_cwd).await?;

        let _subscription = client.stream_subscribe(Some(baseline_cursor)).await?;

        let recorder = match &cli.recording_path {
            Some(path) => Recorder::open(path.clone(), cli.recording_fps)
                .await
                .unwrap_or_else(|_| Recorder::disabled()),
            None => Recorder::disabled(),
        };

        let ui_state_path = crate::persistence::ui_state_path()?;
        let ui_state_writer = DebouncedUiStateWriter::new(ui_state_path);

        let event_log = match crate::persistence::event_log_path() {
            Ok(path) => EventLog::open(path).await.unwrap_or_else(|_| EventLog::disabled()),
            Err(_) => EventLog::disabled(),
        };

        let session_order_path = crate::persistence::session_order_path()?;
        let persisted_order = crate::persistence::files::load_json::<SessionOrderState>(&session_order_path)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        let resumed_conversations = Arc::new(Mutex::new(Vec::new()));
        let activated_conversation = Arc::new(Mutex::new(None));

        let mut runtime = Self {
            workspace,
            queue: OpsQueue::new(),
            client,
            envelope_stream,
            envelope_handler: EnvelopeHandler::new(),
            modal_manager: ModalManager::new(),
            renderer: Renderer::new(),
            recorder,
            ui_state_writer,
            event_log,
            input_decoder: InputDecoder::new(),
            resolved_bindings: ResolvedBindings::defaults(),
            pending_menu_action: Arc::new(Mutex::new(None)),
            resumed_conversations: resumed_conversations.clone(),
            activated_conversation: activated_conversation.clone(),
            dirty: true,
            cols: terminal.cols,
            rows: terminal.rows,
            should_quit: false,
            session_order_path,
        };

        startup::queue_persisted_conversation_activation(
            &mut runtime.queue,
            resumed_conversations,
            activated_conversation,
            persisted_order.session_ids,
            persisted_order.active_session_id,
        );
        startup::wait_for_settle_paint(&mut runtime.renderer, &runtime.workspace, runtime.cols, runtime.rows, &mut runtime.dirty)
            .await;

        Ok(runtime)
    }

    /// Drives the loop until a quit keystroke or a fatal error. Returns
    /// the process exit code for the caller to propagate.
    pub async fn run(mut self) -> i32 {
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; 4096];

        loop {
            if self.should_quit {
                break;
            }

            let queue_has_work = !self.queue.is_idle();

            tokio::select! {
                read = stdin.read(&mut buf) => {
                    match read {
                        Ok(0) | Err(_) => self.should_quit = true,
                        Ok(n) => self.handle_input(&buf[..n]).await,
                    }
                }
                envelope = self.envelope_stream.recv() => {
                    if let Ok(envelope) = envelope {
                        self.envelope_handler.handle(&mut self.workspace, &mut self.event_log, envelope).await;
                        self.dirty = true;
                    }
                }
                () = self.queue.tick(), if queue_has_work => {
                    self.dirty = true;
                }
                () = tokio::time::sleep(Duration::from_millis(16)) => {}
            }

            self.drain_resumed_conversations().await;
            self.drain_activated_conversation();

            self.ui_state_writer.mutate(UiState {
                left_pane_width_percent: 68,
                repositories_collapsed: self.workspace.panes.repositories_collapsed,
                shortcuts_collapsed: self.workspace.panes.shortcuts_collapsed,
                theme_preset: "default".to_string(),
            });
            let _ = self.ui_state_writer.tick().await;

            self.workspace.notices.evict_expired();

            if self.dirty {
                self.dirty = false;

                let session_order = SessionOrderState {
                    session_ids: self.workspace.projection.conversations.ordered_ids().to_vec(),
                    active_session_id: self.workspace.active_conversation_id.clone(),
                };
                let _ = crate::persistence::files::save_json(&self.session_order_path, &session_order).await;

                let active_oracle = crate::render::active_session_for_oracle(&self.workspace)
                    .and_then(|id| self.workspace.projection.conversations.get(id))
                    .map(|c| &c.oracle);
                let frame = self.renderer.build(
                    &self.workspace,
                    &self.modal_manager,
                    active_oracle,
                    self.cols,
                    self.rows,
                    0,
                );
                let (diff, issues) = self.renderer.diff_and_advance(frame);
                for issue in &issues {
                    tracing::warn!(issue = %issue.description, "render integrity issue");
                }
                self.recorder.record(&diff).await;
                let mut stdout = tokio::io::stdout();
                use tokio::io::AsyncWriteExt;
                let _ = stdout.write_all(diff.as_bytes()).await;
                let _ = stdout.flush().await;
            }
        }

        shutdown::shutdown(
            &mut self.queue,
            &mut self.client,
            &mut self.ui_state_writer,
            &mut self.event_log,
            &mut self.recorder,
        )
        .await;

        0
    }

    /// Drains session ids whose background resume op has completed and
    /// attaches each one that is still present in the projection.
    async fn drain_resumed_conversations(&mut self) {
        let drained: Vec<String> = {
            let mut resumed = self.resumed_conversations.lock().unwrap();
            std::mem::take(&mut *resumed)
        };
        for session_id in drained {
            if self.workspace.projection.conversations.contains(&session_id) {
                let _ = lifecycle::attach(&mut self.workspace, &mut self.client, &session_id).await;
                self.dirty = true;
            }
        }
    }

    /// Applies the persisted last-active conversation once its activation
    /// op has completed, restoring focus after a restart.
    fn drain_activated_conversation(&mut self) {
        let activated = self.activated_conversation.lock().unwrap().take();
        if let Some(session_id) = activated {
            if self.workspace.projection.conversations.contains(&session_id) {
                self.workspace.select_conversation(session_id);
                self.dirty = true;
            }
        }
    }

    async fn handle_input(&mut self, chunk: &[u8]) {
        let events = self.input_decoder.feed(chunk);
        for event in events {
            match event {
                DecodedEvent::Key(stroke) => self.handle_keystroke(stroke).await,
                DecodedEvent::Mouse(mouse_event) => self.handle_mouse(mouse_event).await,
            }
            self.dirty = true;
        }
    }

    /// Modal routing wins first; then a bound shortcut; then, for everything
    /// else, the keystroke is forwarded to the active conversation's PTY as
    /// plain input.
    async fn handle_keystroke(&mut self, stroke: Keystroke) {
        if self.modal_manager.is_open() {
            let kind = self.modal_manager.current_kind();
            match self.modal_manager.route_keystroke(&stroke) {
                ModalKeyOutcome::Consumed => return,
                ModalKeyOutcome::Submit => {
                    let text = self.modal_manager.current_text_value().map(str::to_string);
                    self.modal_manager.close();
                    self.handle_modal_submit(kind, text).await;
                    return;
                }
                ModalKeyOutcome::Ignored => {}
            }
        }

        if let Some(action) = shortcuts::detect_shortcut(&self.resolved_bindings, &stroke) {
            self.dispatch_action(action).await;
            return;
        }

        if let Some(session_id) = self.workspace.active_conversation_id.clone() {
            let bytes = crate::input::keystroke::to_legacy_bytes(&stroke);
            let _ = self.client.write_pty_input(session_id, &bytes).await;
        }
    }

    async fn handle_mouse(&mut self, event: MouseEvent) {
        let result = self.modal_manager.route_mouse_press(&event, self.cols, self.rows);
        if result.handled || self.modal_manager.is_open() {
            return;
        }

        let row = event.row.max(0) as u16;
        let col = event.col.max(0) as u16;
        match event.kind {
            MouseKind::Press { .. } => self.workspace.begin_selection_drag(row, col),
            MouseKind::Motion { .. } => self.workspace.update_selection_drag(row, col),
            MouseKind::Release { .. } => self.workspace.end_selection_drag(),
            MouseKind::Wheel { .. } => {}
        }
    }

    /// Builds the full action catalogue as command-menu entries. Each
    /// entry's handler only records which action was picked; the actual
    /// effect runs through `dispatch_action` once the modal closes, so the
    /// command menu never duplicates `dispatch_action`'s logic.
    fn build_menu_actions(&self) -> Vec<command_menu::Action> {
        ActionId::ALL
            .iter()
            .map(|&action_id| {
                let sink = self.pending_menu_action.clone();
                command_menu::Action {
                    id: action_id.dotted().to_string(),
                    title: action_id.title().to_string(),
                    aliases: vec![],
                    keywords: vec![],
                    detail: None,
                    screen_label: None,
                    section_label: None,
                    binding_hint: Some(self.resolved_bindings.catalog_display(action_id)),
                    priority: None,
                    agent_type: None,
                    available: true,
                    run: Arc::new(move || {
                        *sink.lock().unwrap() = Some(action_id);
                    }),
                }
            })
            .collect()
    }

    async fn handle_modal_submit(&mut self, kind: Option<ModalKind>, text: Option<String>) {
        match kind {
            Some(ModalKind::CommandMenu) => {
                let action = self.pending_menu_action.lock().unwrap().take();
                if let Some(action) = action {
                    self.dispatch_action(action).await;
                }
            }
            Some(ModalKind::NewThread) => {
                let directory_id = self.workspace.active_directory_id.clone();
                self.create_conversation(AgentType::Codex, directory_id).await;
            }
            Some(ModalKind::AddDirectory) => {
                if let Some(path) = text.filter(|p| !p.trim().is_empty()) {
                    let directory_id = uuid::Uuid::new_v4().to_string();
                    self.workspace.projection.apply(ObservedEvent {
                        cursor: self.workspace.projection.next_cursor(),
                        kind: EventKind::DirectoryUpsert { directory_id, path },
                    });
                }
            }
            Some(ModalKind::Repository) => {
                if let Some(name) = text.filter(|n| !n.trim().is_empty()) {
                    let repository_id = uuid::Uuid::new_v4().to_string();
                    self.workspace.projection.apply(ObservedEvent {
                        cursor: self.workspace.projection.next_cursor(),
                        kind: EventKind::RepositoryUpsert {
                            repository_id,
                            name: name.clone(),
                            remote_url: name,
                        },
                    });
                }
            }
            Some(ModalKind::TaskEditor) => {
                if let Some(title) = text.filter(|t| !t.trim().is_empty()) {
                    let repository_id = self
                        .workspace
                        .active_directory_id
                        .as_deref()
                        .and_then(|directory_id| self.workspace.projection.repositories.repository_for_directory(directory_id))
                        .cloned();
                    let task_id = uuid::Uuid::new_v4().to_string();
                    self.workspace.projection.apply(ObservedEvent {
                        cursor: self.workspace.projection.next_cursor(),
                        kind: EventKind::TaskUpsert { task_id, repository_id, title },
                    });
                }
            }
            Some(ModalKind::ApiKey) => {
                if text.is_some() {
                    self.workspace
                        .notices
                        .push("API key entry has no persisted secret store yet", NoticeLevel::Info);
                }
            }
            _ => {}
        }
    }

    async fn create_conversation(&mut self, agent_type: AgentType, directory_id: Option<String>) {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.workspace.projection.apply(ObservedEvent {
            cursor: self.workspace.projection.next_cursor(),
            kind: EventKind::ConversationUpsert {
                session_id: session_id.clone(),
                directory_id,
                agent_type,
            },
        });
        let _ = lifecycle::start_conversation(&mut self.workspace, &mut self.client, &session_id, self.rows, self.cols).await;
        self.workspace.select_conversation(session_id);
    }

    fn cycle_active_conversation(&mut self, delta: i32) {
        let ids = self.workspace.projection.conversations.ordered_ids();
        if ids.is_empty() {
            return;
        }
        let current_idx = self
            .workspace
            .active_conversation_id
            .as_ref()
            .and_then(|id| ids.iter().position(|x| x == id));
        let len = ids.len() as i32;
        let next_idx = match current_idx {
            Some(i) => (((i as i32 + delta) % len) + len) % len,
            None => 0,
        };
        let session_id = ids[next_idx as usize].clone();
        lifecycle::enqueue_activate(&mut self.queue, self.activated_conversation.clone(), session_id);
    }

    async fn dispatch_action(&mut self, action: ActionId) {
        match action {
            ActionId::AppQuit => {
                self.should_quit = true;
            }
            ActionId::AppInterruptAll => {
                let live_ids: Vec<String> = self
                    .workspace
                    .projection
                    .conversations
                    .ordered_ids()
                    .iter()
                    .filter(|id| self.workspace.projection.conversations.get(id.as_str()).map(|c| c.live).unwrap_or(false))
                    .cloned()
                    .collect();
                for session_id in live_ids {
                    let _ = self.client.interrupt_session(session_id).await;
                }
            }
            ActionId::CommandMenuToggle => {
                if self.modal_manager.current_kind() == Some(ModalKind::CommandMenu) {
                    self.modal_manager.close();
                } else {
                    let actions = self.build_menu_actions();
                    self.modal_manager
                        .request_open(ModalKind::CommandMenu, Box::new(command_menu::CommandMenuModal::new(actions)));
                }
            }
            ActionId::DebugBarToggle => {
                self.workspace.panes.show_debug_bar = !self.workspace.panes.show_debug_bar;
            }
            ActionId::GatewayProfileToggle => {
                self.workspace.panes.show_gateway_profile = !self.workspace.panes.show_gateway_profile;
            }
            ActionId::GatewayStatusTimelineToggle => {
                self.workspace.panes.show_gateway_status_timeline = !self.workspace.panes.show_gateway_status_timeline;
            }
            ActionId::GatewayRenderTraceToggle => {
                self.workspace.panes.show_gateway_render_trace = !self.workspace.panes.show_gateway_render_trace;
            }
            ActionId::ConversationNew => {
                self.modal_manager
                    .request_open(ModalKind::NewThread, Box::new(prompts::NewThreadPromptState::new()));
            }
            ActionId::ConversationCritiqueOpenOrCreate => {
                let directory_id = self.workspace.active_directory_id.clone();
                let existing = self
                    .workspace
                    .projection
                    .conversations
                    .ordered_ids()
                    .iter()
                    .filter_map(|id| self.workspace.projection.conversations.get(id))
                    .find(|c| c.agent_type == AgentType::Critique && c.directory_id == directory_id)
                    .map(|c| c.session_id.clone());
                match existing {
                    Some(session_id) => lifecycle::enqueue_activate(&mut self.queue, self.activated_conversation.clone(), session_id),
                    None => self.create_conversation(AgentType::Critique, directory_id).await,
                }
            }
            ActionId::ConversationNext => self.cycle_active_conversation(1),
            ActionId::ConversationPrevious => self.cycle_active_conversation(-1),
            ActionId::ConversationInterrupt => {
                if let Some(session_id) = self.workspace.active_conversation_id.clone() {
                    let _ = self.client.interrupt_session(session_id).await;
                }
            }
            ActionId::ConversationArchive => {
                if let Some(session_id) = self.workspace.active_conversation_id.clone() {
                    let _ = lifecycle::detach(&mut self.workspace, &mut self.client, &session_id).await;
                    if let Some(conversation) = self.workspace.projection.conversations.get_mut(&session_id) {
                        conversation.state = ConversationLifecycleState::Archived;
                    }
                    self.workspace.clear_active_conversation();
                }
            }
            ActionId::ConversationTakeover => {
                if let Some(session_id) = self.workspace.active_conversation_id.clone() {
                    let _ = lifecycle::attach(&mut self.workspace, &mut self.client, &session_id).await;
                    if let Some(conversation) = self.workspace.projection.conversations.get_mut(&session_id) {
                        conversation.controller_id = Some("local".to_string());
                    }
                }
            }
            ActionId::ConversationDelete => {
                if let Some(session_id) = self.workspace.active_conversation_id.clone() {
                    let _ = self.client.close_session(session_id.clone()).await;
                    self.workspace.projection.apply(ObservedEvent {
                        cursor: self.workspace.projection.next_cursor(),
                        kind: EventKind::ConversationDelete { session_id },
                    });
                    self.workspace.clear_active_conversation();
                }
            }
            ActionId::ConversationTitlesRefreshAll => {
                let ids: Vec<String> = self.workspace.projection.conversations.ordered_ids().to_vec();
                for session_id in ids {
                    let _ = self.client.refresh_conversation_title(session_id).await;
                }
            }
            ActionId::DirectoryAdd => {
                self.modal_manager
                    .request_open(ModalKind::AddDirectory, Box::new(prompts::AddDirectoryPromptState::new()));
            }
            ActionId::DirectoryClose => {
                if let Some(directory_id) = self.workspace.active_directory_id.clone() {
                    if self.workspace.projection.can_archive_directory(&directory_id) {
                        if let Some(directory) = self.workspace.projection.directories.get_mut(&directory_id) {
                            directory.archived_at = Some(chrono::Utc::now());
                        }
                        self.workspace.active_directory_id = None;
                    } else {
                        self.workspace
                            .notices
                            .push("directory still has live conversations or tasks", NoticeLevel::Warning);
                    }
                }
            }
        }
    }
}
