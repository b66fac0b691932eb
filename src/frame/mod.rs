//! Caller attribution.
//!
//! Provides:
//! - [`CallerFrame`], the function and source location a record is attributed to
//! - [`AttributionStrategy`], the pluggable resolver seam
//! - [`StackAttribution`], which walks the live stack past logging internals
//! - [`NoAttribution`], for builds where stack introspection is unwanted

mod package;
mod stack;

pub use package::{function_name, package_from_symbol};
pub use stack::{
    StackAttribution, KNOWN_INTERNAL_FRAMES, MAXIMUM_CALLER_DEPTH, WRAPPED_LIBRARY_PACKAGES,
};

/// Snapshot of one stack level at the moment of a log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerFrame {
    /// Fully qualified, demangled symbol name.
    pub function: String,
    /// Source file, when debug info is available.
    pub file: Option<String>,
    /// Source line, when debug info is available.
    pub line: Option<u32>,
}

impl CallerFrame {
    /// Bare function name, without module path or closure markers.
    pub fn function_name(&self) -> &str {
        function_name(&self.function)
    }

    /// `"<file>:<line>"`, or `None` when the file is unknown.
    pub fn location(&self) -> Option<String> {
        let file = self.file.as_deref()?;
        Some(format!("{file}:{}", self.line.unwrap_or(0)))
    }
}

/// Strategy used to attribute a record to application code.
///
/// `None` means "unknown caller"; it is never an error.
pub trait AttributionStrategy: Send + Sync {
    fn resolve(&self) -> Option<CallerFrame>;
}

/// Strategy that never attributes records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAttribution;

impl AttributionStrategy for NoAttribution {
    fn resolve(&self) -> Option<CallerFrame> {
        None
    }
}
