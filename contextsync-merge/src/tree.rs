//! The seam between the helpers and whatever owns the components.

use contextsync_container::{ComponentRef, ContextContainer};
use contextsync_types::ComponentKey;

/// A set of the seven named components.
///
/// `container_mut` must return `None` for frozen components; the helpers
/// rely on that to leave `schema`, `constants` and `manifest` untouched.
pub trait ComponentTree {
    /// Read access to a component.
    fn component(&self, key: ComponentKey) -> ComponentRef<'_>;

    /// Write access to a mutable container component.
    fn container_mut(&mut self, key: ComponentKey) -> Option<&mut ContextContainer>;

    /// Short label used in log lines.
    fn label(&self) -> String {
        "context".to_string()
    }
}
