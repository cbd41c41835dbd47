//! Machine images screen
//!
//! Lists built images with any in-flight builds below, and drives the two
//! dialog workflows that go through the backend: queueing a build for the
//! selected image's template and probing template access.

use std::sync::Arc;

use cloudtop_core::{
    command, is_key, render_confirm, route_modal_key, Dispatcher, Event, ModalKey, Outcome,
    Screen, Selection, Task,
};
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    Frame,
};
use tracing::debug;

use crate::api::{AccessReport, CloudApi, ImageBuild, MachineImage};
use crate::screens::Dialog;
use crate::ui;

#[derive(Debug, Clone)]
pub enum ImagesMsg {
    Loaded(Result<(Vec<MachineImage>, Vec<ImageBuild>), String>),
    BuildQueued(Result<ImageBuild, String>),
    Deleted(Result<String, String>),
    AccessChecked(Result<AccessReport, String>),
}

pub struct ImagesState {
    api: Arc<dyn CloudApi>,
    pub images: Vec<MachineImage>,
    pub builds: Vec<ImageBuild>,
    pub selection: Selection,
    pub loading: bool,
    pub error: Option<String>,
    pub status: String,
    pub dialog: Option<Dialog>,
    tick: usize,
}

pub struct ImagesScreen {
    state: ImagesState,
    dispatcher: Dispatcher<ImagesState, ImagesMsg>,
}

fn fetch_task(api: Arc<dyn CloudApi>) -> Task<ImagesMsg> {
    Task::new(async move { ImagesMsg::Loaded(api.list_images().await.map_err(|e| e.to_string())) })
}

fn build_task(api: Arc<dyn CloudApi>, template: String) -> Task<ImagesMsg> {
    Task::new(async move {
        ImagesMsg::BuildQueued(api.build_image(&template).await.map_err(|e| e.to_string()))
    })
}

fn delete_task(api: Arc<dyn CloudApi>, id: String) -> Task<ImagesMsg> {
    Task::new(async move {
        ImagesMsg::Deleted(
            api.delete_image(&id)
                .await
                .map(|()| format!("Deleted image {id}"))
                .map_err(|e| e.to_string()),
        )
    })
}

fn access_task(api: Arc<dyn CloudApi>, template: String) -> Task<ImagesMsg> {
    Task::new(async move {
        ImagesMsg::AccessChecked(
            api.check_template_access(&template)
                .await
                .map_err(|e| e.to_string()),
        )
    })
}

fn resolve_dialog(state: &mut ImagesState, dialog: Dialog) -> Outcome<ImagesMsg> {
    match dialog {
        Dialog::BuildConfirm { template } => {
            state.status = format!("Queueing build for {template}...");
            Outcome::task(build_task(state.api.clone(), template))
        }
        Dialog::DeleteConfirm { target_id } => {
            if !state.images.iter().any(|i| i.id == target_id) {
                debug!(id = %target_id, "delete target vanished before confirm");
                state.status = format!("Image {target_id} no longer exists");
                return Outcome::none();
            }
            state.images.retain(|i| i.id != target_id);
            state.selection.clamp(state.images.len());
            state.status = format!("Deleting image {target_id}...");
            Outcome::task(delete_task(state.api.clone(), target_id))
        }
        Dialog::AccessCheck { template } => {
            state.status = format!("Checking access to {template}...");
            Outcome::task(access_task(state.api.clone(), template))
        }
    }
}

fn apply_msg(state: &mut ImagesState, msg: ImagesMsg) -> Outcome<ImagesMsg> {
    match msg {
        ImagesMsg::Loaded(Ok((images, builds))) => {
            state.loading = false;
            state.error = None;
            state.status = format!("{} images, {} builds", images.len(), builds.len());
            state.images = images;
            state.builds = builds;
            state.selection.clamp(state.images.len());
            Outcome::none()
        }
        ImagesMsg::Loaded(Err(err)) => {
            state.loading = false;
            state.error = Some(err);
            Outcome::none()
        }
        ImagesMsg::BuildQueued(Ok(build)) => {
            state.status = format!("Build {} queued for {}", build.id, build.template);
            state.builds.push(build);
            Outcome::none()
        }
        ImagesMsg::BuildQueued(Err(err)) => {
            state.error = Some(err);
            Outcome::none()
        }
        ImagesMsg::Deleted(Ok(status)) => {
            state.status = status;
            state.loading = true;
            Outcome::task(fetch_task(state.api.clone()))
        }
        ImagesMsg::Deleted(Err(err)) => {
            state.error = Some(err);
            Outcome::none()
        }
        ImagesMsg::AccessChecked(Ok(report)) => {
            state.status = if report.allowed {
                format!("Access to {} allowed", report.template)
            } else {
                format!(
                    "Access to {} denied: {}",
                    report.template,
                    report.reason.as_deref().unwrap_or("no reason given"),
                )
            };
            Outcome::none()
        }
        ImagesMsg::AccessChecked(Err(err)) => {
            state.error = Some(err);
            Outcome::none()
        }
    }
}

fn build_dispatcher() -> Dispatcher<ImagesState, ImagesMsg> {
    let mut dispatcher = Dispatcher::new();

    dispatcher.register(command(
        |event, state: &ImagesState| event.key().is_some() && state.dialog.is_some(),
        |event, state: &mut ImagesState| {
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
        |event, state: &ImagesState| is_key(event, KeyCode::Char('r')) && !state.loading,
        |_, state: &mut ImagesState| {
            state.loading = true;
            state.error = None;
            Outcome::task(fetch_task(state.api.clone()))
        },
    ));

    dispatcher.register(command(
        |event, state: &ImagesState| {
            is_key(event, KeyCode::Char('b')) && state.selection.pick(&state.images).is_some()
        },
        |_, state: &mut ImagesState| {
            let image = state.selection.pick(&state.images).unwrap();
            state.dialog = Some(Dialog::BuildConfirm {
                template: image.template.clone(),
            });
            Outcome::none()
        },
    ));

    dispatcher.register(command(
        |event, state: &ImagesState| {
            is_key(event, KeyCode::Char('c')) && state.selection.pick(&state.images).is_some()
        },
        |_, state: &mut ImagesState| {
            let image = state.selection.pick(&state.images).unwrap();
            state.dialog = Some(Dialog::AccessCheck {
                template: image.template.clone(),
            });
            Outcome::none()
        },
    ));

    dispatcher.register(command(
        |event, state: &ImagesState| {
            is_key(event, KeyCode::Char('d')) && state.selection.pick(&state.images).is_some()
        },
        |_, state: &mut ImagesState| {
            let image = state.selection.pick(&state.images).unwrap();
            state.dialog = Some(Dialog::DeleteConfirm {
                target_id: image.id.clone(),
            });
            Outcome::none()
        },
    ));

    dispatcher.register(command(
        |event, _: &ImagesState| {
            is_key(event, KeyCode::Up)
                || is_key(event, KeyCode::Down)
                || is_key(event, KeyCode::Char('k'))
                || is_key(event, KeyCode::Char('j'))
        },
        |event, state: &mut ImagesState| {
            match event.key().map(|k| k.code) {
                Some(KeyCode::Up) | Some(KeyCode::Char('k')) => state.selection.up(),
                _ => state.selection.down(state.images.len()),
            }
            Outcome::none()
        },
    ));

    dispatcher
}

impl ImagesScreen {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self {
            state: ImagesState {
                api,
                images: Vec::new(),
                builds: Vec::new(),
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

    pub fn state(&self) -> &ImagesState {
        &self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state.dialog.is_some()
    }
}

impl Screen for ImagesScreen {
    type Msg = ImagesMsg;

    fn init(&mut self) -> Outcome<ImagesMsg> {
        self.state.dialog = None;
        self.state.error = None;
        self.state.loading = true;
        Outcome::task(fetch_task(self.state.api.clone()))
    }

    fn update(&mut self, event: Event<ImagesMsg>) -> Outcome<ImagesMsg> {
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
        ui::render_title(frame, title, "Machine Images");

        let (image_area, build_area) = if self.state.builds.is_empty() {
            (content, None)
        } else {
            let parts = Layout::vertical([Constraint::Min(3), Constraint::Length(
                (self.state.builds.len() as u16).saturating_add(2).min(8),
            )])
            .split(content);
            (parts[0], Some(parts[1]))
        };

        let rows: Vec<String> = self
            .state
            .images
            .iter()
            .map(|i| {
                format!(
                    "{:<24} {:<14} {:<12} {:<10} {}",
                    i.name, i.template, i.region, i.state, i.created_at,
                )
            })
            .collect();
        ui::render_list(
            frame,
            image_area,
            "Images",
            &rows,
            Some(self.state.selection.index()),
            "No images. Press 'b' on a template to build one.",
        );

        if let Some(build_area) = build_area {
            let rows: Vec<String> = self
                .state
                .builds
                .iter()
                .map(|b| format!("{:<16} {:<14} {}", b.id, b.template, b.status))
                .collect();
            ui::render_list(frame, build_area, "Builds", &rows, None, "");
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
            "r: refresh  b: build  c: check access  d: delete  q: quit",
        );

        match &self.state.dialog {
            Some(Dialog::BuildConfirm { template }) => render_confirm(
                frame,
                area,
                "Confirm Build",
                &[format!("Queue an image build for {template}?")],
            ),
            Some(Dialog::DeleteConfirm { target_id }) => render_confirm(
                frame,
                area,
                "Confirm Delete",
                &[format!("Delete image {target_id}?")],
            ),
            Some(Dialog::AccessCheck { template }) => render_confirm(
                frame,
                area,
                "Check Access",
                &[format!("Probe launch access for {template}?")],
            ),
            None => {}
        }
    }
}
