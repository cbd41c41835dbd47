//! App router
//!
//! One enum-tagged message sum and one active-screen tag tie the four
//! screens together. Global keys are checked before anything is delegated:
//! ctrl+c always quits, while `q` and the screen-switch digits only apply
//! when no dialog or form is capturing input.

use std::sync::Arc;

use cloudtop_core::{Event, Outcome, Screen};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tracing::info;

use crate::api::CloudApi;
use crate::screens::{
    idle_policies::IdlePoliciesMsg, images::ImagesMsg, instances::InstancesMsg,
    repositories::RepositoriesMsg, IdlePoliciesScreen, ImagesScreen, InstancesScreen,
    RepositoriesScreen,
};

/// Result messages from any screen, tagged with their owner.
///
/// Tasks outlive screen switches; the tag routes a late result back to the
/// screen that issued it instead of the one currently displayed.
#[derive(Debug, Clone)]
pub enum AppMsg {
    Instances(InstancesMsg),
    Images(ImagesMsg),
    Repositories(RepositoriesMsg),
    IdlePolicies(IdlePoliciesMsg),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveScreen {
    Instances,
    Images,
    Repositories,
    IdlePolicies,
}

impl ActiveScreen {
    fn title(&self) -> &'static str {
        match self {
            ActiveScreen::Instances => "Instances",
            ActiveScreen::Images => "Images",
            ActiveScreen::Repositories => "Repositories",
            ActiveScreen::IdlePolicies => "Policies",
        }
    }
}

const TABS: [ActiveScreen; 4] = [
    ActiveScreen::Instances,
    ActiveScreen::Images,
    ActiveScreen::Repositories,
    ActiveScreen::IdlePolicies,
];

pub struct App {
    active: ActiveScreen,
    instances: InstancesScreen,
    images: ImagesScreen,
    repositories: RepositoriesScreen,
    idle_policies: IdlePoliciesScreen,
}

impl App {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self {
            active: ActiveScreen::Instances,
            instances: InstancesScreen::new(api.clone()),
            images: ImagesScreen::new(api.clone()),
            repositories: RepositoriesScreen::new(api.clone()),
            idle_policies: IdlePoliciesScreen::new(api),
        }
    }

    pub fn active(&self) -> ActiveScreen {
        self.active
    }

    /// Whether the active screen's dialog or form owns the keyboard.
    fn is_capturing(&self) -> bool {
        match self.active {
            ActiveScreen::Instances => self.instances.is_capturing(),
            ActiveScreen::Images => self.images.is_capturing(),
            ActiveScreen::Repositories => self.repositories.is_capturing(),
            ActiveScreen::IdlePolicies => self.idle_policies.is_capturing(),
        }
    }

    fn switch_to(&mut self, target: ActiveScreen) -> Outcome<AppMsg> {
        if target == self.active {
            return Outcome::none();
        }
        info!(from = self.active.title(), to = target.title(), "switching screen");
        self.active = target;
        match target {
            ActiveScreen::Instances => self.instances.init().map(AppMsg::Instances),
            ActiveScreen::Images => self.images.init().map(AppMsg::Images),
            ActiveScreen::Repositories => self.repositories.init().map(AppMsg::Repositories),
            ActiveScreen::IdlePolicies => self.idle_policies.init().map(AppMsg::IdlePolicies),
        }
    }

    /// Forward a non-message event to the active screen.
    fn delegate(&mut self, event: Event<AppMsg>) -> Outcome<AppMsg> {
        match self.active {
            ActiveScreen::Instances => self
                .instances
                .update(relay(event))
                .map(AppMsg::Instances),
            ActiveScreen::Images => self.images.update(relay(event)).map(AppMsg::Images),
            ActiveScreen::Repositories => self
                .repositories
                .update(relay(event))
                .map(AppMsg::Repositories),
            ActiveScreen::IdlePolicies => self
                .idle_policies
                .update(relay(event))
                .map(AppMsg::IdlePolicies),
        }
    }
}

/// Re-type a key/resize/tick event for a screen's message type.
///
/// Only called for non-message events; a message that reached here would
/// indicate a routing bug, so it is dropped as a tick.
fn relay<M>(event: Event<AppMsg>) -> Event<M> {
    match event {
        Event::Key(key) => Event::Key(key),
        Event::Resize(w, h) => Event::Resize(w, h),
        Event::Tick => Event::Tick,
        Event::Message(_) => Event::Tick,
    }
}

impl Screen for App {
    type Msg = AppMsg;

    fn init(&mut self) -> Outcome<AppMsg> {
        self.instances.init().map(AppMsg::Instances)
    }

    fn update(&mut self, event: Event<AppMsg>) -> Outcome<AppMsg> {
        if let Event::Key(key) = &event {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Outcome::quit();
            }
            if !self.is_capturing() && key.modifiers == KeyModifiers::NONE {
                match key.code {
                    KeyCode::Char('q') => return Outcome::quit(),
                    KeyCode::Char('1') => return self.switch_to(ActiveScreen::Instances),
                    KeyCode::Char('2') => return self.switch_to(ActiveScreen::Images),
                    KeyCode::Char('3') => return self.switch_to(ActiveScreen::Repositories),
                    KeyCode::Char('4') => return self.switch_to(ActiveScreen::IdlePolicies),
                    _ => {}
                }
            }
        }

        // Task results go to the screen that issued them, active or not.
        match event {
            Event::Message(AppMsg::Instances(msg)) => self
                .instances
                .update(Event::Message(msg))
                .map(AppMsg::Instances),
            Event::Message(AppMsg::Images(msg)) => {
                self.images.update(Event::Message(msg)).map(AppMsg::Images)
            }
            Event::Message(AppMsg::Repositories(msg)) => self
                .repositories
                .update(Event::Message(msg))
                .map(AppMsg::Repositories),
            Event::Message(AppMsg::IdlePolicies(msg)) => self
                .idle_policies
                .update(Event::Message(msg))
                .map(AppMsg::IdlePolicies),
            other => self.delegate(other),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::vertical([Constraint::Length(1), Constraint::Min(5)]).split(area);
        self.render_tabs(frame, rows[0]);
        match self.active {
            ActiveScreen::Instances => self.instances.render(frame, rows[1]),
            ActiveScreen::Images => self.images.render(frame, rows[1]),
            ActiveScreen::Repositories => self.repositories.render(frame, rows[1]),
            ActiveScreen::IdlePolicies => self.idle_policies.render(frame, rows[1]),
        }
    }
}

impl App {
    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let mut spans: Vec<Span> = vec![Span::styled(
            " cloudtop ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )];
        for (i, tab) in TABS.iter().enumerate() {
            spans.push(Span::raw("  "));
            let label = format!("{} {}", i + 1, tab.title());
            let style = if *tab == self.active {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(label, style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockApi, Repository};
    use cloudtop_core::testing::{ctrl_key, key};

    fn app() -> App {
        let mut app = App::new(Arc::new(MockApi::new()));
        app.init();
        app
    }

    fn press(app: &mut App, k: &str) -> Outcome<AppMsg> {
        app.update(Event::Key(key(k)))
    }

    #[test]
    fn test_q_quits_when_not_capturing() {
        let mut app = app();
        let outcome = press(&mut app, "q");
        assert!(outcome.quit);
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let mut app = app();
        press(&mut app, "3");
        press(&mut app, "a"); // open the repository form
        let outcome = app.update(Event::Key(ctrl_key('c')));
        assert!(outcome.quit);
    }

    #[test]
    fn test_digits_switch_screens_and_refetch() {
        let mut app = app();
        let outcome = press(&mut app, "2");
        assert_eq!(app.active(), ActiveScreen::Images);
        assert!(outcome.task.is_some());

        // Switching to the same screen does not refetch.
        let outcome = press(&mut app, "2");
        assert!(outcome.task.is_none());
    }

    #[test]
    fn test_form_captures_q_and_digits() {
        let mut app = app();
        press(&mut app, "3");
        press(&mut app, "a");

        let outcome = press(&mut app, "q");
        assert!(!outcome.quit);
        assert_eq!(app.active(), ActiveScreen::Repositories);

        press(&mut app, "1");
        assert_eq!(app.active(), ActiveScreen::Repositories);
        // both keystrokes landed in the name field
        let form = app.repositories.state().form.as_ref().unwrap();
        assert_eq!(form.value(0), "q1");
    }

    #[test]
    fn test_late_result_routes_to_owner_screen() {
        let mut app = app();
        press(&mut app, "2"); // leave instances

        app.update(Event::Message(AppMsg::Repositories(
            RepositoriesMsg::Loaded(Ok(vec![Repository {
                name: "late".into(),
                url: "https://example.com".into(),
                priority: 1,
                enabled: true,
                template_count: 0,
            }])),
        )));

        assert_eq!(app.active(), ActiveScreen::Images);
        assert_eq!(app.repositories.state().repos.len(), 1);
    }

    #[test]
    fn test_render_tabs_and_active_screen() {
        let app = app();
        let mut harness = cloudtop_core::testing::RenderHarness::new(100, 24);
        let out = harness.render_to_string(|frame| app.render(frame, frame.area()));
        assert!(out.contains("cloudtop"));
        assert!(out.contains("1 Instances"));
        assert!(out.contains("Workstation Instances"));
    }
}
