//! Leveled log sink handed to the registry and the executor.

/// Receives the messages the migration engine emits.
///
/// Purely observational: nothing a logger does feeds back into the engine.
pub trait MigrationLogger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards engine messages to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl MigrationLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "devflow::migration", "[Migration] {}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "devflow::migration", "[Migration] {}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "devflow::migration", "[Migration] {}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "devflow::migration", "[Migration] {}", message);
    }
}
