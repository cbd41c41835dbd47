//! Template repositories screen
//!
//! List view plus a four-field create/edit form (name, URL, priority,
//! enabled). Submitting applies the change to the local collection
//! immediately and pushes it to the backend as a deferred task; the
//! follow-up refresh reconciles whatever the backend actually stored.

use std::sync::Arc;

use cloudtop_core::{
    command, is_key, render_confirm, route_modal_key, Dispatcher, Event, Field, FormKey, FormMode,
    FormState, ModalKey, Outcome, Screen, Selection, Task,
};
use crossterm::event::KeyCode;
use ratatui::{layout::Rect, Frame};
use tracing::debug;

use crate::api::{CloudApi, Repository};
use crate::screens::Dialog;
use crate::ui;

const FIELD_NAME: usize = 0;
const FIELD_URL: usize = 1;
const FIELD_PRIORITY: usize = 2;
const FIELD_ENABLED: usize = 3;

/// Task results delivered back to this screen.
#[derive(Debug, Clone)]
pub enum RepositoriesMsg {
    Loaded(Result<Vec<Repository>, String>),
    Saved(Result<String, String>),
}

pub struct RepositoriesState {
    api: Arc<dyn CloudApi>,
    pub repos: Vec<Repository>,
    pub selection: Selection,
    pub loading: bool,
    pub error: Option<String>,
    pub status: String,
    pub dialog: Option<Dialog>,
    pub form: Option<FormState>,
    tick: usize,
}

pub struct RepositoriesScreen {
    state: RepositoriesState,
    dispatcher: Dispatcher<RepositoriesState, RepositoriesMsg>,
}

fn fetch_task(api: Arc<dyn CloudApi>) -> Task<RepositoriesMsg> {
    Task::new(async move {
        RepositoriesMsg::Loaded(api.list_repositories().await.map_err(|e| e.to_string()))
    })
}

fn save_task(
    api: Arc<dyn CloudApi>,
    repo: Repository,
    mode: FormMode,
) -> Task<RepositoriesMsg> {
    Task::new(async move {
        let name = repo.name.clone();
        let result = match mode {
            FormMode::Create => api.add_repository(repo).await,
            FormMode::Edit => api.update_repository(repo).await,
        };
        RepositoriesMsg::Saved(
            result
                .map(|()| format!("Saved repository {name}"))
                .map_err(|e| e.to_string()),
        )
    })
}

fn delete_task(api: Arc<dyn CloudApi>, name: String) -> Task<RepositoriesMsg> {
    Task::new(async move {
        let result = api.delete_repository(&name).await;
        RepositoriesMsg::Saved(
            result
                .map(|()| format!("Deleted repository {name}"))
                .map_err(|e| e.to_string()),
        )
    })
}

fn sync_task(api: Arc<dyn CloudApi>) -> Task<RepositoriesMsg> {
    Task::new(async move {
        let result = api.sync_repositories().await;
        RepositoriesMsg::Saved(
            result
                .map(|()| "Repository sync started".to_string())
                .map_err(|e| e.to_string()),
        )
    })
}

fn empty_form() -> FormState {
    FormState::new(
        FormMode::Create,
        vec![
            Field::new("Name", "repository name", 64),
            Field::new("URL", "https://...", 128),
            Field::new("Priority", "0-100", 8),
            Field::new("Enabled", "true/false", 8).with_value("true"),
        ],
        None,
    )
}

fn edit_form(repo: &Repository) -> FormState {
    FormState::new(
        FormMode::Edit,
        vec![
            Field::new("Name", "repository name", 64).with_value(repo.name.clone()),
            Field::new("URL", "https://...", 128).with_value(repo.url.clone()),
            Field::new("Priority", "0-100", 8).with_value(repo.priority.to_string()),
            Field::new("Enabled", "true/false", 8).with_value(repo.enabled.to_string()),
        ],
        Some(repo.name.clone()),
    )
}

/// Validate and commit the open form.
///
/// Any parse failure records a field error and leaves the form open with
/// nothing committed. On success the local collection is updated first and
/// the backend write goes out as a task.
fn submit_form(state: &mut RepositoriesState) -> Outcome<RepositoriesMsg> {
    let Some(form) = state.form.as_mut() else {
        return Outcome::none();
    };

    let parsed: Result<(String, String, i64), cloudtop_core::FieldError> = (|| {
        let name = form.required(FIELD_NAME)?;
        let url = form.required(FIELD_URL)?;
        let priority = form.int_value(FIELD_PRIORITY)?;
        Ok((name, url, priority))
    })();
    let (name, url, priority) = match parsed {
        Ok(values) => values,
        Err(err) => {
            form.set_error(err.field, err.message);
            return Outcome::none();
        }
    };
    let enabled = form.bool_value(FIELD_ENABLED);
    let mode = form.mode();
    let target = form.target_id().map(str::to_string);

    let mut repo = Repository {
        name,
        url,
        priority,
        enabled,
        template_count: 0,
    };

    match mode {
        FormMode::Create => {
            state.repos.push(repo.clone());
            state.selection.clamp(state.repos.len());
        }
        FormMode::Edit => {
            if let Some(existing) = state
                .repos
                .iter_mut()
                .find(|r| Some(r.name.as_str()) == target.as_deref())
            {
                repo.template_count = existing.template_count;
                *existing = repo.clone();
            }
        }
    }

    state.form = None;
    state.error = None;
    state.status = format!("Saving repository {}...", repo.name);
    Outcome::task(save_task(state.api.clone(), repo, mode))
}

fn resolve_dialog(state: &mut RepositoriesState, dialog: Dialog) -> Outcome<RepositoriesMsg> {
    match dialog {
        Dialog::DeleteConfirm { target_id } => {
            if !state.repos.iter().any(|r| r.name == target_id) {
                debug!(name = %target_id, "delete target vanished before confirm");
                state.status = format!("Repository {target_id} no longer exists");
                return Outcome::none();
            }
            state.repos.retain(|r| r.name != target_id);
            state.selection.clamp(state.repos.len());
            state.status = format!("Deleting repository {target_id}...");
            Outcome::task(delete_task(state.api.clone(), target_id))
        }
        // Build/access dialogs never open on this screen.
        _ => Outcome::none(),
    }
}

fn apply_msg(state: &mut RepositoriesState, msg: RepositoriesMsg) -> Outcome<RepositoriesMsg> {
    match msg {
        RepositoriesMsg::Loaded(Ok(repos)) => {
            state.loading = false;
            state.error = None;
            state.status = format!("{} repositories", repos.len());
            state.repos = repos;
            state.selection.clamp(state.repos.len());
            Outcome::none()
        }
        RepositoriesMsg::Loaded(Err(err)) => {
            state.loading = false;
            state.error = Some(err);
            Outcome::none()
        }
        RepositoriesMsg::Saved(Ok(status)) => {
            state.status = status;
            state.loading = true;
            Outcome::task(fetch_task(state.api.clone()))
        }
        RepositoriesMsg::Saved(Err(err)) => {
            state.loading = false;
            state.error = Some(err);
            Outcome::none()
        }
    }
}

fn build_dispatcher() -> Dispatcher<RepositoriesState, RepositoriesMsg> {
    let mut dispatcher = Dispatcher::new();

    // Dialog capture: while a dialog is open no key reaches anything else.
    dispatcher.register(command(
        |event, state: &RepositoriesState| event.key().is_some() && state.dialog.is_some(),
        |event, state: &mut RepositoriesState| {
            let Some(key) = event.key() else {
                return Outcome::none();
            };
            match route_modal_key(key) {
                ModalKey::Confirmed => {
                    let dialog = state.dialog.take().unwrap();
                    resolve_dialog(state, dialog)
                }
                ModalKey::Cancelled => {
                    state.dialog = None;
                    Outcome::none()
                }
                ModalKey::Captured => Outcome::none(),
            }
        },
    ));

    // Form capture.
    dispatcher.register(command(
        |event, state: &RepositoriesState| event.key().is_some() && state.form.is_some(),
        |event, state: &mut RepositoriesState| {
            let Some(key) = event.key() else {
                return Outcome::none();
            };
            let routed = state.form.as_mut().map(|f| f.handle_key(key));
            match routed {
                Some(FormKey::Submit) => submit_form(state),
                Some(FormKey::Cancel) => {
                    state.form = None;
                    Outcome::none()
                }
                _ => Outcome::none(),
            }
        },
    ));

    // Refresh, rejected while a fetch is already in flight.
    dispatcher.register(command(
        |event, state: &RepositoriesState| {
            is_key(event, KeyCode::Char('r')) && !state.loading
        },
        |_, state: &mut RepositoriesState| {
            state.loading = true;
            state.error = None;
            Outcome::task(fetch_task(state.api.clone()))
        },
    ));

    dispatcher.register(command(
        |event, _: &RepositoriesState| is_key(event, KeyCode::Char('a')),
        |_, state: &mut RepositoriesState| {
            state.form = Some(empty_form());
            Outcome::none()
        },
    ));

    dispatcher.register(command(
        |event, state: &RepositoriesState| {
            is_key(event, KeyCode::Char('e')) && state.selection.pick(&state.repos).is_some()
        },
        |_, state: &mut RepositoriesState| {
            let repo = state.selection.pick(&state.repos).unwrap();
            state.form = Some(edit_form(repo));
            Outcome::none()
        },
    ));

    dispatcher.register(command(
        |event, state: &RepositoriesState| {
            is_key(event, KeyCode::Char('d')) && state.selection.pick(&state.repos).is_some()
        },
        |_, state: &mut RepositoriesState| {
            let repo = state.selection.pick(&state.repos).unwrap();
            state.dialog = Some(Dialog::DeleteConfirm {
                target_id: repo.name.clone(),
            });
            Outcome::none()
        },
    ));

    // Sync shares the loading guard so repeated presses cannot stack tasks.
    dispatcher.register(command(
        |event, state: &RepositoriesState| {
            is_key(event, KeyCode::Char('s')) && !state.loading
        },
        |_, state: &mut RepositoriesState| {
            state.loading = true;
            state.status = "Syncing repositories...".to_string();
            Outcome::task(sync_task(state.api.clone()))
        },
    ));

    // Catch-all navigation goes last so specific bindings win.
    dispatcher.register(command(
        |event, _: &RepositoriesState| {
            is_key(event, KeyCode::Up)
                || is_key(event, KeyCode::Down)
                || is_key(event, KeyCode::Char('k'))
                || is_key(event, KeyCode::Char('j'))
        },
        |event, state: &mut RepositoriesState| {
            match event.key().map(|k| k.code) {
                Some(KeyCode::Up) | Some(KeyCode::Char('k')) => state.selection.up(),
                _ => state.selection.down(state.repos.len()),
            }
            Outcome::none()
        },
    ));

    dispatcher
}

impl RepositoriesScreen {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self {
            state: RepositoriesState {
                api,
                repos: Vec::new(),
                selection: Selection::new(),
                loading: false,
                error: None,
                status: String::new(),
                dialog: None,
                form: None,
                tick: 0,
            },
            dispatcher: build_dispatcher(),
        }
    }

    pub fn state(&self) -> &RepositoriesState {
        &self.state
    }

    /// Whether an open dialog or form is capturing keyboard input.
    pub fn is_capturing(&self) -> bool {
        self.state.dialog.is_some() || self.state.form.is_some()
    }
}

impl Screen for RepositoriesScreen {
    type Msg = RepositoriesMsg;

    fn init(&mut self) -> Outcome<RepositoriesMsg> {
        self.state.dialog = None;
        self.state.form = None;
        self.state.error = None;
        self.state.loading = true;
        Outcome::task(fetch_task(self.state.api.clone()))
    }

    fn update(&mut self, event: Event<RepositoriesMsg>) -> Outcome<RepositoriesMsg> {
        match event {
            Event::Message(msg) => apply_msg(&mut self.state, msg),
            Event::Tick => {
                self.state.tick = self.state.tick.wrapping_add(1);
                Outcome::none()
            }
            other => self.dispatcher.dispatch(&other, &mut self.state),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let (title, content, status, help) = ui::screen_layout(area);
        ui::render_title(frame, title, "Template Repositories");

        if let Some(form) = &self.state.form {
            let panel_title = match form.mode() {
                FormMode::Create => "Add Repository",
                FormMode::Edit => "Edit Repository",
            };
            ui::render_form(frame, content, panel_title, form);
        } else {
            let rows: Vec<String> = self
                .state
                .repos
                .iter()
                .map(|r| {
                    format!(
                        "{:<20} {:<40} prio {:>3}  {:<8} {} templates",
                        r.name,
                        r.url,
                        r.priority,
                        if r.enabled { "enabled" } else { "disabled" },
                        r.template_count,
                    )
                })
                .collect();
            ui::render_list(
                frame,
                content,
                "Repositories",
                &rows,
                Some(self.state.selection.index()),
                "No repositories. Press 'a' to add one.",
            );
        }

        ui::render_status(
            frame,
            status,
            self.state.loading,
            self.state.tick,
            self.state.error.as_deref(),
            &self.state.status,
        );
        ui::render_help(
            frame,
            help,
            "r: refresh  a: add  e: edit  d: delete  s: sync  q: quit",
        );

        if let Some(Dialog::DeleteConfirm { target_id }) = &self.state.dialog {
            render_confirm(
                frame,
                area,
                "Confirm Delete",
                &[format!("Delete repository {target_id}?")],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;
    use cloudtop_core::testing::{char_key, key};

    fn sample_repos() -> Vec<Repository> {
        vec![
            Repository {
                name: "default".into(),
                url: "https://github.com/cloudtop/templates".into(),
                priority: 0,
                enabled: true,
                template_count: 12,
            },
            Repository {
                name: "research".into(),
                url: "https://github.com/cloudtop/research".into(),
                priority: 10,
                enabled: true,
                template_count: 3,
            },
        ]
    }

    fn loaded_screen() -> RepositoriesScreen {
        let mut screen = RepositoriesScreen::new(Arc::new(MockApi::new()));
        screen.init();
        screen.update(Event::Message(RepositoriesMsg::Loaded(Ok(sample_repos()))));
        screen
    }

    fn press(screen: &mut RepositoriesScreen, k: &str) -> Outcome<RepositoriesMsg> {
        screen.update(Event::Key(key(k)))
    }

    fn type_text(screen: &mut RepositoriesScreen, text: &str) {
        for c in text.chars() {
            screen.update(Event::Key(char_key(c)));
        }
    }

    #[test]
    fn test_init_starts_loading() {
        let mut screen = RepositoriesScreen::new(Arc::new(MockApi::new()));
        let outcome = screen.init();
        assert!(screen.state().loading);
        assert!(outcome.task.is_some());
    }

    #[test]
    fn test_refresh_rejected_while_loading() {
        let mut screen = loaded_screen();
        let outcome = press(&mut screen, "r");
        assert!(outcome.task.is_some());
        assert!(screen.state().loading);

        let outcome = press(&mut screen, "r");
        assert!(outcome.task.is_none());
    }

    #[test]
    fn test_esc_discards_form_edits() {
        let mut screen = loaded_screen();
        press(&mut screen, "e");
        assert!(screen.state().form.is_some());

        type_text(&mut screen, "-renamed");
        press(&mut screen, "esc");

        assert!(screen.state().form.is_none());
        assert_eq!(screen.state().repos, sample_repos());
    }

    #[test]
    fn test_invalid_priority_keeps_form_open() {
        let mut screen = loaded_screen();
        press(&mut screen, "a");
        type_text(&mut screen, "teamA");
        press(&mut screen, "tab");
        type_text(&mut screen, "https://example.com/repo");
        press(&mut screen, "tab");
        type_text(&mut screen, "abc");

        let outcome = press(&mut screen, "enter");

        assert!(outcome.task.is_none());
        let form = screen.state().form.as_ref().expect("form stays open");
        let err = form.error().expect("field error recorded");
        assert_eq!(err.field, FIELD_PRIORITY);
        assert_eq!(screen.state().repos.len(), 2);
    }

    #[test]
    fn test_create_submit_appends_and_closes_form() {
        let mut screen = loaded_screen();
        press(&mut screen, "a");
        type_text(&mut screen, "teamA");
        press(&mut screen, "tab");
        type_text(&mut screen, "https://example.com/x");
        press(&mut screen, "tab");
        type_text(&mut screen, "75");
        press(&mut screen, "tab");
        // clear the prefilled "true" and type "false"
        for _ in 0.."true".len() {
            press(&mut screen, "backspace");
        }
        type_text(&mut screen, "false");

        let outcome = press(&mut screen, "enter");

        assert!(outcome.task.is_some());
        assert!(screen.state().form.is_none());
        assert_eq!(screen.state().repos.len(), 3);
        let added = &screen.state().repos[2];
        assert_eq!(added.name, "teamA");
        assert_eq!(added.url, "https://example.com/x");
        assert_eq!(added.priority, 75);
        assert!(!added.enabled);
    }

    #[test]
    fn test_edit_submit_replaces_in_place() {
        let mut screen = loaded_screen();
        press(&mut screen, "down");
        press(&mut screen, "e");
        // jump to the priority field and change it
        press(&mut screen, "tab");
        press(&mut screen, "tab");
        for _ in 0.."10".len() {
            press(&mut screen, "backspace");
        }
        type_text(&mut screen, "5");
        press(&mut screen, "enter");

        assert_eq!(screen.state().repos.len(), 2);
        assert_eq!(screen.state().repos[1].priority, 5);
        // template count survives the edit
        assert_eq!(screen.state().repos[1].template_count, 3);
    }

    #[test]
    fn test_dialog_captures_all_keys() {
        let mut screen = loaded_screen();
        press(&mut screen, "d");
        assert!(screen.state().dialog.is_some());

        for k in ["r", "a", "x", "down"] {
            let outcome = press(&mut screen, k);
            assert!(outcome.task.is_none());
            assert!(screen.state().dialog.is_some());
            assert!(screen.state().form.is_none());
        }

        press(&mut screen, "esc");
        assert!(screen.state().dialog.is_none());
        assert_eq!(screen.state().repos.len(), 2);
    }

    #[test]
    fn test_delete_confirm_removes_and_tasks() {
        let mut screen = loaded_screen();
        press(&mut screen, "d");
        let outcome = press(&mut screen, "enter");

        assert!(outcome.task.is_some());
        assert_eq!(screen.state().repos.len(), 1);
        assert_eq!(screen.state().repos[0].name, "research");
    }

    #[test]
    fn test_delete_confirm_with_vanished_target_is_noop() {
        let mut screen = loaded_screen();
        press(&mut screen, "d");

        // A refresh completes while the dialog is up and drops the target.
        screen.update(Event::Message(RepositoriesMsg::Loaded(Ok(vec![
            sample_repos()[1].clone(),
        ]))));

        let outcome = press(&mut screen, "enter");
        assert!(outcome.task.is_none());
        assert_eq!(screen.state().repos.len(), 1);
        assert!(screen.state().status.contains("no longer exists"));
    }

    #[test]
    fn test_load_failure_surfaces_error() {
        let mut screen = RepositoriesScreen::new(Arc::new(MockApi::new()));
        screen.init();
        screen.update(Event::Message(RepositoriesMsg::Loaded(Err(
            "cannot reach backend: connection refused".into(),
        ))));

        assert!(!screen.state().loading);
        assert!(screen.state().error.as_deref().unwrap().contains("refused"));
    }

    #[test]
    fn test_repeated_sync_spawns_one_task() {
        let mut screen = loaded_screen();
        let outcome = press(&mut screen, "s");
        assert!(outcome.task.is_some());
        assert!(screen.state().loading);

        let outcome = press(&mut screen, "s");
        assert!(outcome.task.is_none());

        // A failed sync releases the guard so the user can retry.
        screen.update(Event::Message(RepositoriesMsg::Saved(Err(
            "backend error (500): sync worker down".into(),
        ))));
        assert!(!screen.state().loading);
        let outcome = press(&mut screen, "s");
        assert!(outcome.task.is_some());
    }

    #[test]
    fn test_saved_triggers_refresh() {
        let mut screen = loaded_screen();
        let outcome = screen.update(Event::Message(RepositoriesMsg::Saved(Ok(
            "Saved repository teamA".into(),
        ))));
        assert!(outcome.task.is_some());
        assert!(screen.state().loading);
    }

    #[test]
    fn test_selection_clamped_after_shrinking_refresh() {
        let mut screen = loaded_screen();
        press(&mut screen, "down");
        assert_eq!(screen.state().selection.index(), 1);

        screen.update(Event::Message(RepositoriesMsg::Loaded(Ok(vec![
            sample_repos()[0].clone(),
        ]))));
        assert_eq!(screen.state().selection.index(), 0);
    }

    #[test]
    fn test_render_list_and_dialog() {
        let screen = loaded_screen();
        let mut harness = cloudtop_core::testing::RenderHarness::new(100, 24);
        let out = harness.render_to_string(|frame| screen.render(frame, frame.area()));
        assert!(out.contains("Template Repositories"));
        assert!(out.contains("default"));

        let mut screen = loaded_screen();
        press(&mut screen, "d");
        let out = harness.render_to_string(|frame| screen.render(frame, frame.area()));
        assert!(out.contains("Delete repository default?"));
    }
}
