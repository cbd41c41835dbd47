//! Workstation instances screen
//!
//! The landing view: running and stopped instances with start/stop/delete
//! actions and a connection hint for the selected machine.

use std::sync::Arc;

use cloudtop_core::{
    command, is_key, render_confirm, route_modal_key, Dispatcher, Event, ModalKey, Outcome,
    Screen, Selection, Task,
};
use crossterm::event::KeyCode;
use ratatui::{layout::Rect, Frame};
use tracing::debug;

use crate::api::{CloudApi, Instance, InstanceState};
use crate::screens::Dialog;
use crate::ui;

#[derive(Debug, Clone)]
pub enum InstancesMsg {
    Loaded(Result<Vec<Instance>, String>),
    ActionDone(Result<String, String>),
}

pub struct InstancesState {
    api: Arc<dyn CloudApi>,
    pub instances: Vec<Instance>,
    pub selection: Selection,
    pub loading: bool,
    pub error: Option<String>,
    pub status: String,
    pub dialog: Option<Dialog>,
    tick: usize,
}

pub struct InstancesScreen {
    state: InstancesState,
    dispatcher: Dispatcher<InstancesState, InstancesMsg>,
}

fn fetch_task(api: Arc<dyn CloudApi>) -> Task<InstancesMsg> {
    Task::new(async move {
        InstancesMsg::Loaded(api.list_instances().await.map_err(|e| e.to_string()))
    })
}

fn start_task(api: Arc<dyn CloudApi>, id: String) -> Task<InstancesMsg> {
    Task::new(async move {
        InstancesMsg::ActionDone(
            api.start_instance(&id)
                .await
                .map(|()| format!("Starting {id}"))
                .map_err(|e| e.to_string()),
        )
    })
}

fn stop_task(api: Arc<dyn CloudApi>, id: String) -> Task<InstancesMsg> {
    Task::new(async move {
        InstancesMsg::ActionDone(
            api.stop_instance(&id)
                .await
                .map(|()| format!("Stopping {id}"))
                .map_err(|e| e.to_string()),
        )
    })
}

fn delete_task(api: Arc<dyn CloudApi>, id: String) -> Task<InstancesMsg> {
    Task::new(async move {
        InstancesMsg::ActionDone(
            api.delete_instance(&id)
                .await
                .map(|()| format!("Deleted {id}"))
                .map_err(|e| e.to_string()),
        )
    })
}

fn resolve_dialog(state: &mut InstancesState, dialog: Dialog) -> Outcome<InstancesMsg> {
    match dialog {
        Dialog::DeleteConfirm { target_id } => {
            if !state.instances.iter().any(|i| i.id == target_id) {
                debug!(id = %target_id, "delete target vanished before confirm");
                state.status = format!("Instance {target_id} no longer exists");
                return Outcome::none();
            }
            state.instances.retain(|i| i.id != target_id);
            state.selection.clamp(state.instances.len());
            state.status = format!("Deleting {target_id}...");
            Outcome::task(delete_task(state.api.clone(), target_id))
        }
        _ => Outcome::none(),
    }
}

fn apply_msg(state: &mut InstancesState, msg: InstancesMsg) -> Outcome<InstancesMsg> {
    match msg {
        InstancesMsg::Loaded(Ok(instances)) => {
            state.loading = false;
            state.error = None;
            let running = instances
                .iter()
                .filter(|i| i.state == InstanceState::Running)
                .count();
            state.status = format!("{} instances, {} running", instances.len(), running);
            state.instances = instances;
            state.selection.clamp(state.instances.len());
            Outcome::none()
        }
        InstancesMsg::Loaded(Err(err)) => {
            state.loading = false;
            state.error = Some(err);
            Outcome::none()
        }
        InstancesMsg::ActionDone(Ok(status)) => {
            state.status = status;
            state.loading = true;
            Outcome::task(fetch_task(state.api.clone()))
        }
        InstancesMsg::ActionDone(Err(err)) => {
            state.error = Some(err);
            Outcome::none()
        }
    }
}

fn build_dispatcher() -> Dispatcher<InstancesState, InstancesMsg> {
    let mut dispatcher = Dispatcher::new();

    dispatcher.register(command(
        |event, state: &InstancesState| event.key().is_some() && state.dialog.is_some(),
        |event, state: &mut InstancesState| {
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
        |event, state: &InstancesState| is_key(event, KeyCode::Char('r')) && !state.loading,
        |_, state: &mut InstancesState| {
            state.loading = true;
            state.error = None;
            Outcome::task(fetch_task(state.api.clone()))
        },
    ));

    // Start only applies to a stopped instance.
    dispatcher.register(command(
        |event, state: &InstancesState| {
            is_key(event, KeyCode::Char('s'))
                && matches!(
                    state.selection.pick(&state.instances),
                    Some(i) if i.state == InstanceState::Stopped
                )
        },
        |_, state: &mut InstancesState| {
            let instance = state.selection.pick(&state.instances).unwrap();
            let id = instance.id.clone();
            state.status = format!("Starting {}...", instance.name);
            Outcome::task(start_task(state.api.clone(), id))
        },
    ));

    dispatcher.register(command(
        |event, state: &InstancesState| {
            is_key(event, KeyCode::Char('p'))
                && matches!(
                    state.selection.pick(&state.instances),
                    Some(i) if i.state == InstanceState::Running
                )
        },
        |_, state: &mut InstancesState| {
            let instance = state.selection.pick(&state.instances).unwrap();
            let id = instance.id.clone();
            state.status = format!("Stopping {}...", instance.name);
            Outcome::task(stop_task(state.api.clone(), id))
        },
    ));

    dispatcher.register(command(
        |event, state: &InstancesState| {
            is_key(event, KeyCode::Char('d')) && state.selection.pick(&state.instances).is_some()
        },
        |_, state: &mut InstancesState| {
            let instance = state.selection.pick(&state.instances).unwrap();
            state.dialog = Some(Dialog::DeleteConfirm {
                target_id: instance.id.clone(),
            });
            Outcome::none()
        },
    ));

    // Connection hint for the selected machine.
    dispatcher.register(command(
        |event, state: &InstancesState| {
            is_key(event, KeyCode::Char('c')) && state.selection.pick(&state.instances).is_some()
        },
        |_, state: &mut InstancesState| {
            let instance = state.selection.pick(&state.instances).unwrap();
            state.status = match &instance.public_ip {
                Some(ip) => format!("ssh ubuntu@{ip}"),
                None => format!("{} has no public address", instance.name),
            };
            Outcome::none()
        },
    ));

    dispatcher.register(command(
        |event, _: &InstancesState| {
            is_key(event, KeyCode::Up)
                || is_key(event, KeyCode::Down)
                || is_key(event, KeyCode::Char('k'))
                || is_key(event, KeyCode::Char('j'))
        },
        |event, state: &mut InstancesState| {
            match event.key().map(|k| k.code) {
                Some(KeyCode::Up) | Some(KeyCode::Char('k')) => state.selection.up(),
                _ => state.selection.down(state.instances.len()),
            }
            Outcome::none()
        },
    ));

    dispatcher
}

impl InstancesScreen {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self {
            state: InstancesState {
                api,
                instances: Vec::new(),
                selection: Selection::new(),
                loading: false,
                error: None,
                status: String::new(),
                dialog: None,
                tick: 0,
            },
            dispatcher: build_dispatcher(),
        }
    }

    pub fn state(&self) -> &InstancesState {
        &self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state.dialog.is_some()
    }
}

impl Screen for InstancesScreen {
    type Msg = InstancesMsg;

    fn init(&mut self) -> Outcome<InstancesMsg> {
        self.state.dialog = None;
        self.state.error = None;
        self.state.loading = true;
        Outcome::task(fetch_task(self.state.api.clone()))
    }

    fn update(&mut self, event: Event<InstancesMsg>) -> Outcome<InstancesMsg> {
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
        ui::render_title(frame, title, "Workstation Instances");

        let rows: Vec<String> = self
            .state
            .instances
            .iter()
            .map(|i| {
                format!(
                    "{:<16} {:<14} {:<10} {:<14} {:<16} ${:>6.2}/day",
                    i.name,
                    i.template,
                    i.state,
                    i.instance_type,
                    i.public_ip.as_deref().unwrap_or("-"),
                    i.estimated_daily_cost,
                )
            })
            .collect();
        ui::render_list(
            frame,
            content,
            "Instances",
            &rows,
            Some(self.state.selection.index()),
            "No instances.",
        );

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
            "r: refresh  s: start  p: stop  d: delete  c: connect  q: quit",
        );

        if let Some(Dialog::DeleteConfirm { target_id }) = &self.state.dialog {
            render_confirm(
                frame,
                area,
                "Confirm Delete",
                &[format!("Delete instance {target_id}?")],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;
    use cloudtop_core::testing::key;

    fn sample_instances() -> Vec<Instance> {
        vec![
            Instance {
                id: "i-0a1b2c3d".into(),
                name: "research-box".into(),
                template: "r-studio".into(),
                state: InstanceState::Running,
                public_ip: Some("203.0.113.10".into()),
                instance_type: "m6i.xlarge".into(),
                estimated_daily_cost: 4.61,
            },
            Instance {
                id: "i-0e4f5a6b".into(),
                name: "gpu-train".into(),
                template: "pytorch".into(),
                state: InstanceState::Stopped,
                public_ip: None,
                instance_type: "g5.2xlarge".into(),
                estimated_daily_cost: 29.09,
            },
        ]
    }

    fn loaded_screen() -> InstancesScreen {
        let mut screen = InstancesScreen::new(Arc::new(MockApi::new()));
        screen.init();
        screen.update(Event::Message(InstancesMsg::Loaded(Ok(sample_instances()))));
        screen
    }

    fn press(screen: &mut InstancesScreen, k: &str) -> Outcome<InstancesMsg> {
        screen.update(Event::Key(key(k)))
    }

    #[test]
    fn test_start_requires_stopped_instance() {
        let mut screen = loaded_screen();
        // selected instance is running; start does nothing
        let outcome = press(&mut screen, "s");
        assert!(outcome.task.is_none());

        press(&mut screen, "down");
        let outcome = press(&mut screen, "s");
        assert!(outcome.task.is_some());
    }

    #[test]
    fn test_stop_requires_running_instance() {
        let mut screen = loaded_screen();
        let outcome = press(&mut screen, "p");
        assert!(outcome.task.is_some());

        press(&mut screen, "down");
        let outcome = press(&mut screen, "p");
        assert!(outcome.task.is_none());
    }

    #[test]
    fn test_connect_hint() {
        let mut screen = loaded_screen();
        press(&mut screen, "c");
        assert_eq!(screen.state().status, "ssh ubuntu@203.0.113.10");

        press(&mut screen, "down");
        press(&mut screen, "c");
        assert!(screen.state().status.contains("no public address"));
    }

    #[test]
    fn test_delete_roundtrip() {
        let mut screen = loaded_screen();
        press(&mut screen, "d");
        assert!(screen.state().dialog.is_some());

        let outcome = press(&mut screen, "enter");
        assert!(outcome.task.is_some());
        assert_eq!(screen.state().instances.len(), 1);
        assert_eq!(screen.state().instances[0].id, "i-0e4f5a6b");
    }

    #[test]
    fn test_action_done_refreshes() {
        let mut screen = loaded_screen();
        let outcome = screen.update(Event::Message(InstancesMsg::ActionDone(Ok(
            "Starting i-0e4f5a6b".into(),
        ))));
        assert!(outcome.task.is_some());
        assert!(screen.state().loading);
    }

    #[test]
    fn test_navigation_clamps() {
        let mut screen = loaded_screen();
        for _ in 0..5 {
            press(&mut screen, "j");
        }
        assert_eq!(screen.state().selection.index(), 1);
        for _ in 0..5 {
            press(&mut screen, "k");
        }
        assert_eq!(screen.state().selection.index(), 0);
    }

    #[test]
    fn test_render_shows_columns() {
        let screen = loaded_screen();
        let mut harness = cloudtop_core::testing::RenderHarness::new(110, 24);
        let out = harness.render_to_string(|frame| screen.render(frame, frame.area()));
        assert!(out.contains("research-box"));
        assert!(out.contains("running"));
        assert!(out.contains("203.0.113.10"));
    }
}
