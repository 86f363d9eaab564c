use std::sync::{Arc, Mutex};

use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::model::OverlayBounds;
use crate::overlay::surface::PixelSurface;

/// Where finished frames go. Implementations are created and driven on the overlay thread.
pub trait PresentationSurface {
    /// Makes the target cover `bounds`, creating or resizing it as needed.
    fn ensure(&mut self, bounds: OverlayBounds) -> OverlayResult<()>;
    /// Shows `surface` using its per-pixel alpha.
    fn present(&mut self, surface: &PixelSurface) -> OverlayResult<()>;
    fn release(&mut self);
}

/// Platform entry point: capability probe plus presenter factory.
pub trait OverlayBackend {
    fn is_supported(&self) -> bool;
    fn virtual_screen_bounds(&self) -> OverlayBounds;
    fn create_presenter(&mut self) -> OverlayResult<Box<dyn PresentationSurface>>;

    /// Drains pending window messages; a no-op where there are none.
    fn pump_messages(&mut self) {}
}

#[cfg(windows)]
pub fn default_backend() -> Box<dyn OverlayBackend> {
    Box::new(crate::overlay::layered::LayeredWindowBackend::new())
}

#[cfg(not(windows))]
pub fn default_backend() -> Box<dyn OverlayBackend> {
    Box::new(UnsupportedBackend)
}

/// Backend for platforms without a layered-window implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBackend;

impl OverlayBackend for UnsupportedBackend {
    fn is_supported(&self) -> bool {
        false
    }

    fn virtual_screen_bounds(&self) -> OverlayBounds {
        OverlayBounds::default()
    }

    fn create_presenter(&mut self) -> OverlayResult<Box<dyn PresentationSurface>> {
        Err(OverlayError::Unsupported)
    }
}

/// What a headless presenter has seen. Shared between the backend, its presenters and tests.
#[derive(Debug, Default, Clone)]
pub struct HeadlessLog {
    pub presenters_created: usize,
    pub frames_presented: usize,
    pub releases: usize,
    pub bounds: Option<OverlayBounds>,
    pub last_frame: Option<Vec<u8>>,
    pub last_frame_size: (u32, u32),
    pub fail_ensure: bool,
    pub fail_present: bool,
}

#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    screen: OverlayBounds,
    capture_frames: bool,
    log: Arc<Mutex<HeadlessLog>>,
}

impl HeadlessBackend {
    pub fn new(screen: OverlayBounds) -> Self {
        Self {
            screen,
            capture_frames: true,
            log: Arc::new(Mutex::new(HeadlessLog::default())),
        }
    }

    /// Skips copying every frame; used by benchmarks.
    pub fn without_capture(mut self) -> Self {
        self.capture_frames = false;
        self
    }

    pub fn log(&self) -> Arc<Mutex<HeadlessLog>> {
        Arc::clone(&self.log)
    }

    pub fn snapshot(&self) -> HeadlessLog {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl OverlayBackend for HeadlessBackend {
    fn is_supported(&self) -> bool {
        true
    }

    fn virtual_screen_bounds(&self) -> OverlayBounds {
        self.screen
    }

    fn create_presenter(&mut self) -> OverlayResult<Box<dyn PresentationSurface>> {
        if let Ok(mut log) = self.log.lock() {
            log.presenters_created += 1;
        }
        Ok(Box::new(HeadlessPresenter {
            capture_frames: self.capture_frames,
            log: Arc::clone(&self.log),
        }))
    }
}

#[derive(Debug)]
pub struct HeadlessPresenter {
    capture_frames: bool,
    log: Arc<Mutex<HeadlessLog>>,
}

impl PresentationSurface for HeadlessPresenter {
    fn ensure(&mut self, bounds: OverlayBounds) -> OverlayResult<()> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| OverlayError::Presentation("headless log poisoned".into()))?;
        if log.fail_ensure {
            return Err(OverlayError::Presentation("headless window refused".into()));
        }
        log.bounds = Some(bounds);
        Ok(())
    }

    fn present(&mut self, surface: &PixelSurface) -> OverlayResult<()> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| OverlayError::Presentation("headless log poisoned".into()))?;
        if log.fail_present {
            return Err(OverlayError::Presentation("headless present failed".into()));
        }
        log.frames_presented += 1;
        log.last_frame_size = surface.size();
        if self.capture_frames {
            log.last_frame = Some(surface.pixels().to_vec());
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.releases += 1;
            log.bounds = None;
            log.last_frame = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_backend_refuses_presenters() {
        let mut backend = UnsupportedBackend;
        assert!(!backend.is_supported());
        assert_eq!(
            backend.create_presenter().err(),
            Some(OverlayError::Unsupported)
        );
    }

    #[test]
    fn headless_presenter_records_frames() {
        let mut backend = HeadlessBackend::new(OverlayBounds::new(0, 0, 8, 8));
        let mut presenter = backend.create_presenter().expect("presenter");
        presenter
            .ensure(OverlayBounds::new(0, 0, 2, 2))
            .expect("ensure");

        let mut surface = PixelSurface::new();
        surface.ensure(2, 2).expect("surface");
        surface.pixels_mut()[3] = 255;
        presenter.present(&surface).expect("present");

        let log = backend.snapshot();
        assert_eq!(log.presenters_created, 1);
        assert_eq!(log.frames_presented, 1);
        assert_eq!(log.last_frame_size, (2, 2));
        assert_eq!(log.last_frame.as_ref().map(|f| f[3]), Some(255));

        presenter.release();
        let log = backend.snapshot();
        assert_eq!(log.releases, 1);
        assert!(log.bounds.is_none());
    }

    #[test]
    fn headless_failures_are_reported() {
        let mut backend = HeadlessBackend::new(OverlayBounds::new(0, 0, 8, 8));
        let mut presenter = backend.create_presenter().expect("presenter");
        backend.log().lock().expect("log").fail_present = true;
        let surface = PixelSurface::new();
        assert!(matches!(
            presenter.present(&surface),
            Err(OverlayError::Presentation(_))
        ));
    }
}
