//! World configuration.
//!
//! ```ignore
//! let world = World::with_config(
//!     WorldConfig::default()
//!         .label("sim")
//!         .flush_pass_warning(16),
//! );
//! ```

/// Settings fixed when a [`World`](crate::ecs::World) is created.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Prefix for this world's log lines.
    pub label: String,
    /// Number of passes after which a single flush logs a warning. Hooks that
    /// keep re-dirtying entities make the flush loop spin; the warning points at
    /// that without changing behavior. `0` disables it.
    pub flush_pass_warning: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            label: "world".to_string(),
            flush_pass_warning: 64,
        }
    }
}

impl WorldConfig {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn flush_pass_warning(mut self, passes: usize) -> Self {
        self.flush_pass_warning = passes;
        self
    }
}
