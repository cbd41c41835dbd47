//! Terminal console for managing cloud workstations
//!
//! Four screens over one backend trait: instances, machine images, template
//! repositories and idle shutdown policies. All interaction flows through the
//! single-threaded event loop of `cloudtop-core`; backend calls leave the
//! loop as deferred tasks and come back as messages.

pub mod api;
pub mod app;
pub mod screens;
pub mod ui;

pub use api::{CloudApi, HttpApi, MockApi};
pub use app::{ActiveScreen, App, AppMsg};
