//! Caller attribution from outside the crate.
//!
//! Frames of this test binary are application frames, so the resolver must
//! land on them and never on the logger or `tracing` internals.

mod common;

use std::hint::black_box;

use apmlog::frame::{package_from_symbol, WRAPPED_LIBRARY_PACKAGES};
use apmlog::{AttributionStrategy, CallerFrame, StackAttribution};
use common::{capture_logger, test_config};

#[inline(never)]
fn resolve_here(resolver: &StackAttribution) -> (Option<CallerFrame>, u32) {
    let line = line!() + 1;
    let frame = resolver.resolve();
    (frame, line)
}

#[inline(never)]
fn descend(depth: usize, resolver: &StackAttribution) -> Option<CallerFrame> {
    if depth == 0 {
        return resolver.resolve();
    }
    black_box(descend(black_box(depth - 1), resolver))
}

#[inline(never)]
fn checkout_handler(logger: &apmlog::Logger) {
    logger.warn("inventory low");
}

#[test]
fn test_direct_resolution_names_the_caller() {
    let (frame, line) = resolve_here(&StackAttribution::new());
    let frame = frame.expect("caller should be resolved");

    assert_eq!(frame.function_name(), "resolve_here");
    assert_eq!(package_from_symbol(&frame.function), "attribution_test");
    let location = frame.location().expect("debug info should be present");
    assert!(location.ends_with(&format!("attribution_test.rs:{line}")), "{location}");
}

#[test]
fn test_resolved_frame_is_never_internal() {
    let (frame, _) = resolve_here(&StackAttribution::new());
    let frame = frame.expect("caller should be resolved");
    let package = package_from_symbol(&frame.function);

    assert_ne!(package, StackAttribution::self_package());
    assert!(!WRAPPED_LIBRARY_PACKAGES.contains(&package));
}

#[test]
fn test_deep_stack_beyond_bound_yields_none() {
    // Every frame within the bound belongs to a skipped package.
    let resolver = StackAttribution::new().skip_package("attribution_test");
    assert_eq!(descend(200, &resolver), None);

    let resolver = StackAttribution::new();
    let frame = descend(200, &resolver).expect("recursion frame should be resolved");
    assert_eq!(frame.function_name(), "descend");
}

#[test]
fn test_depth_bound_is_respected() {
    let resolver = StackAttribution::new().with_max_depth(1);
    assert_eq!(descend(10, &resolver), None);
}

#[test]
fn test_logger_records_attribute_past_the_facade() {
    let (logger, capture) = capture_logger(test_config());

    checkout_handler(&logger);

    let record = capture.only_record();
    assert_eq!(record["func"], "checkout_handler");
    assert!(record["file"]
        .as_str()
        .is_some_and(|file| file.contains("attribution_test.rs:")));
}

#[test]
fn test_concurrent_resolution_is_consistent() {
    let frames: Vec<Option<CallerFrame>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| resolve_here(&StackAttribution::new()).0))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for frame in frames {
        assert_eq!(frame.expect("caller should be resolved").function_name(), "resolve_here");
    }
    assert_eq!(StackAttribution::self_package(), "apmlog");
}
