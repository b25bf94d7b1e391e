//! External payment provider adapters.

pub mod button;
pub mod widget;

/// Reference prefix for orders handed to the embedded button provider.
pub const BUTTON_REFERENCE_PREFIX: &str = "ORD";

/// Reference prefix for orders handed to the modal widget provider.
pub const WIDGET_REFERENCE_PREFIX: &str = "ADF";
