pub mod api;
pub mod clock;
pub mod composite;
pub mod error;
#[cfg(windows)]
pub mod layered;
pub mod metrics;
pub mod model;
pub mod payload;
pub mod present;
pub mod render;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod settings_store;
pub mod strokes;
pub mod surface;

pub use api::{Outcome, OverlayHost, Rejection};
pub use error::{OverlayError, OverlayResult};
pub use model::{OverlayBounds, PenStyle, Point, Rgb};
pub use present::{HeadlessBackend, OverlayBackend, PresentationSurface, UnsupportedBackend};
pub use runtime::{HostCall, OverlayRuntime};
pub use session::{OverlaySession, StartParams};
pub use settings::OverlaySettings;
