use image::RgbImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Latest composite handed from the compositor to the viewer thread.
pub type SharedComposite = Arc<Mutex<Option<RgbImage>>>;

/// Seam between the compositor loop and whatever shows the composite.
///
/// `present` must return quickly — well under one compositor interval — so
/// implementations hand the frame off rather than render in place.
pub trait DisplaySurface: Send + Sync {
    fn present(&self, composite: RgbImage) -> Result<(), PresentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("failed to present composite: {0}")]
    PresentFailed(String),
}

/// Presents by publishing into the viewer's shared slot and waking the egui
/// event loop. Overwrites any composite the viewer has not picked up yet:
/// only the newest frame matters.
pub struct WindowSurface {
    slot: SharedComposite,
    ctx: egui::Context,
}

impl WindowSurface {
    pub fn new(slot: SharedComposite, ctx: egui::Context) -> Self {
        Self { slot, ctx }
    }
}

impl DisplaySurface for WindowSurface {
    fn present(&self, composite: RgbImage) -> Result<(), PresentError> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| PresentError::PresentFailed("viewer state poisoned".into()))?;
        *guard = Some(composite);
        drop(guard);
        self.ctx.request_repaint();
        Ok(())
    }
}

/// Counts presentations and drops the pixels. Used for headless runs and by
/// the compositor tests.
#[derive(Default)]
pub struct HeadlessSurface {
    presented: AtomicU64,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }
}

impl DisplaySurface for HeadlessSurface {
    fn present(&self, _composite: RgbImage) -> Result<(), PresentError> {
        self.presented.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_surface_counts_presentations() {
        let surface = HeadlessSurface::new();
        assert_eq!(surface.presented(), 0);
        surface.present(RgbImage::new(4, 4)).unwrap();
        surface.present(RgbImage::new(4, 4)).unwrap();
        assert_eq!(surface.presented(), 2);
    }
}
