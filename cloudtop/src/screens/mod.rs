//! Console screens
//!
//! Each screen owns its entity collection, selection, loading/error flags and
//! an ordered command list. Screens never talk to each other; the app router
//! in [`crate::app`] owns activation and message routing.

pub mod idle_policies;
pub mod images;
pub mod instances;
pub mod repositories;

pub use idle_policies::IdlePoliciesScreen;
pub use images::ImagesScreen;
pub use instances::InstancesScreen;
pub use repositories::RepositoriesScreen;

/// A confirm dialog open over a screen.
///
/// Each variant carries only what the prompt and the confirm action need,
/// captured when the dialog opened. Confirm actions re-check that the target
/// still exists: a refresh may have completed while the dialog was up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    /// Queue an image build for a template.
    BuildConfirm { template: String },
    /// Delete the entity identified by `target_id`.
    DeleteConfirm { target_id: String },
    /// Probe whether the caller may launch from a template.
    AccessCheck { template: String },
}
