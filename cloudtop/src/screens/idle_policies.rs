//! Idle shutdown policies screen
//!
//! Policies cap spend on forgotten machines: after `idle_minutes` without
//! activity an instance is stopped, hibernated or terminated. Create/edit
//! goes through the shared form machinery; the action field is free text
//! parsed at submit.

use std::sync::Arc;

use cloudtop_core::{
    command, is_key, render_confirm, route_modal_key, Dispatcher, Event, Field, FormKey, FormMode,
    FormState, ModalKey, Outcome, Screen, Selection, Task,
};
use crossterm::event::KeyCode;
use ratatui::{layout::Rect, Frame};
use tracing::debug;

use crate::api::{CloudApi, IdleAction, IdlePolicy};
use crate::screens::Dialog;
use crate::ui;

const FIELD_NAME: usize = 0;
const FIELD_MINUTES: usize = 1;
const FIELD_ACTION: usize = 2;
const FIELD_ENABLED: usize = 3;

#[derive(Debug, Clone)]
pub enum IdlePoliciesMsg {
    Loaded(Result<Vec<IdlePolicy>, String>),
    Saved(Result<String, String>),
}

pub struct IdlePoliciesState {
    api: Arc<dyn CloudApi>,
    pub policies: Vec<IdlePolicy>,
    pub selection: Selection,
    pub loading: bool,
    pub error: Option<String>,
    pub status: String,
    pub dialog: Option<Dialog>,
    pub form: Option<FormState>,
    tick: usize,
}

pub struct IdlePoliciesScreen {
    state: IdlePoliciesState,
    dispatcher: Dispatcher<IdlePoliciesState, IdlePoliciesMsg>,
}

fn parse_action(text: &str) -> Result<IdleAction, String> {
    match text.trim().to_ascii_lowercase().as_str() {
        "stop" => Ok(IdleAction::Stop),
        "hibernate" => Ok(IdleAction::Hibernate),
        "terminate" => Ok(IdleAction::Terminate),
        other => Err(format!(
            "Action must be stop, hibernate or terminate (got {other:?})"
        )),
    }
}

fn fetch_task(api: Arc<dyn CloudApi>) -> Task<IdlePoliciesMsg> {
    Task::new(async move {
        IdlePoliciesMsg::Loaded(api.list_idle_policies().await.map_err(|e| e.to_string()))
    })
}

fn save_task(api: Arc<dyn CloudApi>, policy: IdlePolicy) -> Task<IdlePoliciesMsg> {
    Task::new(async move {
        let name = policy.name.clone();
        IdlePoliciesMsg::Saved(
            api.put_idle_policy(policy)
                .await
                .map(|()| format!("Saved policy {name}"))
                .map_err(|e| e.to_string()),
        )
    })
}

fn delete_task(api: Arc<dyn CloudApi>, id: String) -> Task<IdlePoliciesMsg> {
    Task::new(async move {
        IdlePoliciesMsg::Saved(
            api.delete_idle_policy(&id)
                .await
                .map(|()| format!("Deleted policy {id}"))
                .map_err(|e| e.to_string()),
        )
    })
}

fn empty_form() -> FormState {
    FormState::new(
        FormMode::Create,
        vec![
            Field::new("Name", "policy name", 64),
            Field::new("Idle minutes", "e.g. 60", 8),
            Field::new("Action", "stop/hibernate/terminate", 12).with_value("stop"),
            Field::new("Enabled", "true/false", 8).with_value("true"),
        ],
        None,
    )
}

fn edit_form(policy: &IdlePolicy) -> FormState {
    FormState::new(
        FormMode::Edit,
        vec![
            Field::new("Name", "policy name", 64).with_value(policy.name.clone()),
            Field::new("Idle minutes", "e.g. 60", 8).with_value(policy.idle_minutes.to_string()),
            Field::new("Action", "stop/hibernate/terminate", 12)
                .with_value(policy.action.to_string()),
            Field::new("Enabled", "true/false", 8).with_value(policy.enabled.to_string()),
        ],
        Some(policy.id.clone()),
    )
}

fn submit_form(state: &mut IdlePoliciesState) -> Outcome<IdlePoliciesMsg> {
    let Some(form) = state.form.as_mut() else {
        return Outcome::none();
    };

    let name = match form.required(FIELD_NAME) {
        Ok(name) => name,
        Err(err) => {
            form.set_error(err.field, err.message);
            return Outcome::none();
        }
    };
    let idle_minutes = match form.int_value(FIELD_MINUTES) {
        Ok(minutes) => minutes,
        Err(err) => {
            form.set_error(err.field, err.message);
            return Outcome::none();
        }
    };
    let action = match parse_action(form.value(FIELD_ACTION)) {
        Ok(action) => action,
        Err(message) => {
            form.set_error(FIELD_ACTION, message);
            return Outcome::none();
        }
    };
    let enabled = form.bool_value(FIELD_ENABLED);
    let mode = form.mode();
    let target = form.target_id().map(str::to_string);

    let id = match &target {
        Some(id) => id.clone(),
        None => format!("pol-{}", name.to_ascii_lowercase().replace(' ', "-")),
    };
    let policy = IdlePolicy {
        id: id.clone(),
        name,
        idle_minutes,
        action,
        enabled,
    };

    match mode {
        FormMode::Create => {
            state.policies.push(policy.clone());
            state.selection.clamp(state.policies.len());
        }
        FormMode::Edit => {
            if let Some(existing) = state.policies.iter_mut().find(|p| p.id == id) {
                *existing = policy.clone();
            }
        }
    }

    state.form = None;
    state.error = None;
    state.status = format!("Saving policy {}...", policy.name);
    Outcome::task(save_task(state.api.clone(), policy))
}

fn resolve_dialog(state: &mut IdlePoliciesState, dialog: Dialog) -> Outcome<IdlePoliciesMsg> {
    match dialog {
        Dialog::DeleteConfirm { target_id } => {
            if !state.policies.iter().any(|p| p.id == target_id) {
                debug!(id = %target_id, "delete target vanished before confirm");
                state.status = format!("Policy {target_id} no longer exists");
                return Outcome::none();
            }
            state.policies.retain(|p| p.id != target_id);
            state.selection.clamp(state.policies.len());
            state.status = format!("Deleting policy {target_id}...");
            Outcome::task(delete_task(state.api.clone(), target_id))
        }
        _ => Outcome::none(),
    }
}

fn apply_msg(state: &mut IdlePoliciesState, msg: IdlePoliciesMsg) -> Outcome<IdlePoliciesMsg> {
    match msg {
        IdlePoliciesMsg::Loaded(Ok(policies)) => {
            state.loading = false;
            state.error = None;
            state.status = format!("{} policies", policies.len());
            state.policies = policies;
            state.selection.clamp(state.policies.len());
            Outcome::none()
        }
        IdlePoliciesMsg::Loaded(Err(err)) => {
            state.loading = false;
            state.error = Some(err);
            Outcome::none()
        }
        IdlePoliciesMsg::Saved(Ok(status)) => {
            state.status = status;
            state.loading = true;
            Outcome::task(fetch_task(state.api.clone()))
        }
        IdlePoliciesMsg::Saved(Err(err)) => {
            state.error = Some(err);
            Outcome::none()
        }
    }
}

fn build_dispatcher() -> Dispatcher<IdlePoliciesState, IdlePoliciesMsg> {
    let mut dispatcher = Dispatcher::new();

    dispatcher.register(command(
        |event, state: &IdlePoliciesState| event.key().is_some() && state.dialog.is_some(),
        |event, state: &mut IdlePoliciesState| {
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

    dispatcher.register(command(
        |event, state: &IdlePoliciesState| event.key().is_some() && state.form.is_some(),
        |event, state: &mut IdlePoliciesState| {
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

    dispatcher.register(command(
        |event, state: &IdlePoliciesState| is_key(event, KeyCode::Char('r')) && !state.loading,
        |_, state: &mut IdlePoliciesState| {
            state.loading = true;
            state.error = None;
            Outcome::task(fetch_task(state.api.clone()))
        },
    ));

    dispatcher.register(command(
        |event, _: &IdlePoliciesState| is_key(event, KeyCode::Char('a')),
        |_, state: &mut IdlePoliciesState| {
            state.form = Some(empty_form());
            Outcome::none()
        },
    ));

    dispatcher.register(command(
        |event, state: &IdlePoliciesState| {
            is_key(event, KeyCode::Char('e')) && state.selection.pick(&state.policies).is_some()
        },
        |_, state: &mut IdlePoliciesState| {
            let policy = state.selection.pick(&state.policies).unwrap();
            state.form = Some(edit_form(policy));
            Outcome::none()
        },
    ));

    dispatcher.register(command(
        |event, state: &IdlePoliciesState| {
            is_key(event, KeyCode::Char('d')) && state.selection.pick(&state.policies).is_some()
        },
        |_, state: &mut IdlePoliciesState| {
            let policy = state.selection.pick(&state.policies).unwrap();
            state.dialog = Some(Dialog::DeleteConfirm {
                target_id: policy.id.clone(),
            });
            Outcome::none()
        },
    ));

    dispatcher.register(command(
        |event, _: &IdlePoliciesState| {
            is_key(event, KeyCode::Up)
                || is_key(event, KeyCode::Down)
                || is_key(event, KeyCode::Char('k'))
                || is_key(event, KeyCode::Char('j'))
        },
        |event, state: &mut IdlePoliciesState| {
            match event.key().map(|k| k.code) {
                Some(KeyCode::Up) | Some(KeyCode::Char('k')) => state.selection.up(),
                _ => state.selection.down(state.policies.len()),
            }
            Outcome::none()
        },
    ));

    dispatcher
}

impl IdlePoliciesScreen {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self {
            state: IdlePoliciesState {
                api,
                policies: Vec::new(),
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

    pub fn state(&self) -> &IdlePoliciesState {
        &self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state.dialog.is_some() || self.state.form.is_some()
    }
}

impl Screen for IdlePoliciesScreen {
    type Msg = IdlePoliciesMsg;

    fn init(&mut self) -> Outcome<IdlePoliciesMsg> {
        self.state.dialog = None;
        self.state.form = None;
        self.state.error = None;
        self.state.loading = true;
        Outcome::task(fetch_task(self.state.api.clone()))
    }

    fn update(&mut self, event: Event<IdlePoliciesMsg>) -> Outcome<IdlePoliciesMsg> {
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
        ui::render_title(frame, title, "Idle Policies");

        if let Some(form) = &self.state.form {
            let panel_title = match form.mode() {
                FormMode::Create => "Add Policy",
                FormMode::Edit => "Edit Policy",
            };
            ui::render_form(frame, content, panel_title, form);
        } else {
            let rows: Vec<String> = self
                .state
                .policies
                .iter()
                .map(|p| {
                    format!(
                        "{:<20} after {:>4} min -> {:<10} {}",
                        p.name,
                        p.idle_minutes,
                        p.action,
                        if p.enabled { "enabled" } else { "disabled" },
                    )
                })
                .collect();
            ui::render_list(
                frame,
                content,
                "Policies",
                &rows,
                Some(self.state.selection.index()),
                "No idle policies. Press 'a' to add one.",
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
        ui::render_help(frame, help, "r: refresh  a: add  e: edit  d: delete  q: quit");

        if let Some(Dialog::DeleteConfirm { target_id }) = &self.state.dialog {
            render_confirm(
                frame,
                area,
                "Confirm Delete",
                &[format!("Delete policy {target_id}?")],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;
    use cloudtop_core::testing::{char_key, key};

    fn sample_policies() -> Vec<IdlePolicy> {
        vec![IdlePolicy {
            id: "pol-1".into(),
            name: "nightly-stop".into(),
            idle_minutes: 60,
            action: IdleAction::Stop,
            enabled: true,
        }]
    }

    fn loaded_screen() -> IdlePoliciesScreen {
        let mut screen = IdlePoliciesScreen::new(Arc::new(MockApi::new()));
        screen.init();
        screen.update(Event::Message(IdlePoliciesMsg::Loaded(Ok(
            sample_policies(),
        ))));
        screen
    }

    fn press(screen: &mut IdlePoliciesScreen, k: &str) -> Outcome<IdlePoliciesMsg> {
        screen.update(Event::Key(key(k)))
    }

    fn type_text(screen: &mut IdlePoliciesScreen, text: &str) {
        for c in text.chars() {
            screen.update(Event::Key(char_key(c)));
        }
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(parse_action("stop"), Ok(IdleAction::Stop));
        assert_eq!(parse_action(" Hibernate "), Ok(IdleAction::Hibernate));
        assert_eq!(parse_action("TERMINATE"), Ok(IdleAction::Terminate));
        assert!(parse_action("pause").is_err());
        assert!(parse_action("").is_err());
    }

    #[test]
    fn test_create_generates_id_from_name() {
        let mut screen = loaded_screen();
        press(&mut screen, "a");
        type_text(&mut screen, "Weekend Stop");
        press(&mut screen, "tab");
        type_text(&mut screen, "120");
        let outcome = press(&mut screen, "enter");

        assert!(outcome.task.is_some());
        assert_eq!(screen.state().policies.len(), 2);
        let added = &screen.state().policies[1];
        assert_eq!(added.id, "pol-weekend-stop");
        assert_eq!(added.idle_minutes, 120);
        assert_eq!(added.action, IdleAction::Stop);
        assert!(added.enabled);
    }

    #[test]
    fn test_bad_action_keeps_form_open() {
        let mut screen = loaded_screen();
        press(&mut screen, "a");
        type_text(&mut screen, "x");
        press(&mut screen, "tab");
        type_text(&mut screen, "30");
        press(&mut screen, "tab");
        for _ in 0.."stop".len() {
            press(&mut screen, "backspace");
        }
        type_text(&mut screen, "pause");

        let outcome = press(&mut screen, "enter");
        assert!(outcome.task.is_none());
        let form = screen.state().form.as_ref().expect("form stays open");
        assert_eq!(form.error().unwrap().field, FIELD_ACTION);
        assert_eq!(screen.state().policies.len(), 1);
    }

    #[test]
    fn test_edit_keeps_id() {
        let mut screen = loaded_screen();
        press(&mut screen, "e");
        // rename the policy; the id must not change
        type_text(&mut screen, "-v2");
        press(&mut screen, "enter");

        assert_eq!(screen.state().policies.len(), 1);
        assert_eq!(screen.state().policies[0].id, "pol-1");
        assert_eq!(screen.state().policies[0].name, "nightly-stop-v2");
    }

    #[test]
    fn test_non_numeric_minutes_rejected() {
        let mut screen = loaded_screen();
        press(&mut screen, "a");
        type_text(&mut screen, "x");
        press(&mut screen, "tab");
        type_text(&mut screen, "soon");

        let outcome = press(&mut screen, "enter");
        assert!(outcome.task.is_none());
        assert_eq!(
            screen.state().form.as_ref().unwrap().error().unwrap().field,
            FIELD_MINUTES
        );
    }

    #[test]
    fn test_delete_confirm() {
        let mut screen = loaded_screen();
        press(&mut screen, "d");
        let outcome = press(&mut screen, "enter");
        assert!(outcome.task.is_some());
        assert!(screen.state().policies.is_empty());
    }
}
