pub mod logging;
pub mod overlay;
