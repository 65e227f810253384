use egui::{ColorImage, TextureHandle, TextureOptions};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::display::SharedComposite;

/// The local viewer window. Pulls the newest composite out of the shared
/// slot each repaint and shows it as a texture; ESC or closing the window
/// cancels the shutdown token so the backend winds down with it.
pub struct ViewerApp {
    composite: SharedComposite,
    texture: Option<TextureHandle>,
    cancel: CancellationToken,
}

impl ViewerApp {
    pub fn new(composite: SharedComposite, cancel: CancellationToken) -> Self {
        Self {
            composite,
            texture: None,
            cancel,
        }
    }

    /// True once shutdown has been requested from either side (ESC/close in
    /// the window, or Ctrl-C in the backend). The window never outlives a
    /// cancelled backend.
    pub fn backend_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            info!("ESC pressed, shutting down");
            self.cancel.cancel();
        }
        if ctx.input(|i| i.viewport().close_requested()) {
            self.cancel.cancel();
        }
        // Covers ESC and window close above, and a Ctrl-C that cancelled the
        // token from the backend side (which wakes us with a repaint once
        // its shutdown finishes).
        if self.backend_stopped() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        // Take the latest composite, if the compositor published one since
        // the last repaint.
        let latest = self.composite.lock().ok().and_then(|mut slot| slot.take());
        if let Some(img) = latest {
            let size = [img.width() as usize, img.height() as usize];
            let color = ColorImage::from_rgb(size, img.as_raw());
            match &mut self.texture {
                Some(texture) => texture.set(color, TextureOptions::LINEAR),
                None => {
                    self.texture = Some(ctx.load_texture("composite", color, TextureOptions::LINEAR))
                }
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.centered_and_justified(|ui| match &self.texture {
                Some(texture) => {
                    ui.image((texture.id(), texture.size_vec2()));
                }
                None => {
                    ui.label("Waiting for client feeds…");
                }
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn viewer_follows_backend_cancellation() {
        let cancel = CancellationToken::new();
        let app = ViewerApp::new(Arc::new(Mutex::new(None)), cancel.clone());
        assert!(!app.backend_stopped());
        cancel.cancel();
        assert!(app.backend_stopped());
    }
}
