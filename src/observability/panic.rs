//! Panic reporting.

use std::any::Any;

use crate::logger::{is_emitting, Logger};

/// Route panics through `logger` as error records before the previous hook runs.
///
/// Error records reach the APM backend through the logger's hook, so a panic
/// shows up there as an error event attributed to the panicking frame.
///
/// Panics raised while the thread is already emitting a record (a failing
/// `Display` or layer) go to the previous hook only.
pub fn install_panic_hook(logger: &'static Logger) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if is_emitting() {
            previous(info);
            return;
        }

        let message = payload_message(info.payload());
        match info.location() {
            Some(location) => logger.error(format_args!("panic: {message} at {location}")),
            None => logger.error(format_args!("panic: {message}")),
        }

        previous(info);
    }));
}

fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "Box<dyn Any>"
    }
}
