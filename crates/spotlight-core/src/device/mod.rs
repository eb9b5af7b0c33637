//! Supported device classes and how to recognise them.

pub mod buttons;
pub mod model;
pub mod signature;
