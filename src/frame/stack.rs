//! Stack-walking attribution.
//!
//! The walk starts a few frames in (the stack walker's own frames), is
//! bounded to [`MAXIMUM_CALLER_DEPTH`] physical frames, and returns the first
//! logical frame whose package is neither this crate nor one of the
//! [`WRAPPED_LIBRARY_PACKAGES`].

use std::sync::OnceLock;

use backtrace::Frame;

use super::package::package_from_symbol;
use super::{AttributionStrategy, CallerFrame};

/// Upper bound on physical frames inspected per resolution.
pub const MAXIMUM_CALLER_DEPTH: usize = 64;

/// Frames belonging to the stack walker itself, skipped before the search.
pub const KNOWN_INTERNAL_FRAMES: usize = 3;

/// Packages that sit between application code and the formatter.
///
/// Unmangled runtime symbols have no package and are listed whole.
pub const WRAPPED_LIBRARY_PACKAGES: [&str; 10] = [
    "tracing",
    "tracing_core",
    "tracing_subscriber",
    "tracing_opentelemetry",
    "backtrace",
    "std",
    "core",
    "alloc",
    "rust_begin_unwind",
    "__rustc",
];

/// Symbol searched for when discovering this crate's own package.
const ENTRY_POINT: &str = "resolve_attribution_frame";

/// Computed once per process on the first resolution.
#[derive(Debug)]
struct ResolverCache {
    self_package: String,
    minimum_depth: usize,
}

static RESOLVER_CACHE: OnceLock<ResolverCache> = OnceLock::new();

fn resolver_cache() -> &'static ResolverCache {
    RESOLVER_CACHE.get_or_init(|| {
        let self_package = capture_frames(0, MAXIMUM_CALLER_DEPTH)
            .iter()
            .flat_map(logical_frames)
            .find(|frame| frame.function.contains(ENTRY_POINT))
            .map(|frame| package_from_symbol(&frame.function).to_string())
            // Stripped binaries carry no symbol names.
            .unwrap_or_else(|| package_from_symbol(module_path!()).to_string());

        ResolverCache {
            self_package,
            minimum_depth: KNOWN_INTERNAL_FRAMES,
        }
    })
}

/// Attribution by walking the calling thread's stack.
#[derive(Debug, Clone)]
pub struct StackAttribution {
    max_depth: usize,
    skipped_packages: Vec<String>,
}

impl Default for StackAttribution {
    fn default() -> Self {
        Self::new()
    }
}

impl StackAttribution {
    /// Create a resolver with the default depth bound.
    pub fn new() -> Self {
        Self {
            max_depth: MAXIMUM_CALLER_DEPTH,
            skipped_packages: Vec::new(),
        }
    }

    /// Bound the walk to `max_depth` physical frames.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Treat frames of `package` as non-attributable too.
    ///
    /// Useful for application-side logging helpers.
    #[must_use]
    pub fn skip_package(mut self, package: impl Into<String>) -> Self {
        self.skipped_packages.push(package.into());
        self
    }

    /// Package this crate's symbols live in, as discovered on first use.
    pub fn self_package() -> &'static str {
        &resolver_cache().self_package
    }

    /// Find the nearest frame outside the logging machinery.
    ///
    /// Returns `None` if no such frame lies within the depth bound.
    #[inline(never)]
    pub fn resolve_attribution_frame(&self) -> Option<CallerFrame> {
        let cache = resolver_cache();

        capture_frames(cache.minimum_depth, self.max_depth)
            .iter()
            .flat_map(logical_frames)
            .find(|frame| !self.is_internal(package_from_symbol(&frame.function), cache))
    }

    fn is_internal(&self, package: &str, cache: &ResolverCache) -> bool {
        package == cache.self_package
            || WRAPPED_LIBRARY_PACKAGES.contains(&package)
            || self.skipped_packages.iter().any(|p| p == package)
    }
}

impl AttributionStrategy for StackAttribution {
    fn resolve(&self) -> Option<CallerFrame> {
        self.resolve_attribution_frame()
    }
}

/// Capture up to `limit` unresolved frames, skipping the innermost `skip`.
fn capture_frames(skip: usize, limit: usize) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(limit);
    let mut index = 0;

    backtrace::trace(|frame| {
        if index >= skip {
            frames.push(frame.clone());
        }
        index += 1;
        frames.len() < limit
    });

    frames
}

/// Resolve a physical frame into its logical frames, innermost inline first.
fn logical_frames(frame: &Frame) -> Vec<CallerFrame> {
    let mut symbols = Vec::new();

    backtrace::resolve_frame(frame, |symbol| {
        if let Some(name) = symbol.name() {
            symbols.push(CallerFrame {
                function: format!("{name:#}"),
                file: symbol.filename().map(|path| path.display().to_string()),
                line: symbol.lineno(),
            });
        }
    });

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_package_is_this_crate() {
        assert_eq!(StackAttribution::self_package(), "apmlog");
    }

    #[test]
    fn test_zero_depth_yields_no_attribution() {
        let resolver = StackAttribution::new().with_max_depth(0);
        assert_eq!(resolver.resolve_attribution_frame(), None);
    }

    #[test]
    fn test_never_attributes_to_internal_packages() {
        // Unit tests live inside this crate, so the first attributable frame
        // is the test harness (or nothing at all).
        if let Some(frame) = StackAttribution::new().resolve_attribution_frame() {
            let package = package_from_symbol(&frame.function);
            assert_ne!(package, "apmlog");
            assert!(!WRAPPED_LIBRARY_PACKAGES.contains(&package));
        }
    }

    #[test]
    fn test_concurrent_first_use_agrees_on_cache() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(StackAttribution::self_package))
            .collect();

        let packages: Vec<&'static str> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(packages.windows(2).all(|w| std::ptr::eq(w[0], w[1])));
    }
}
