use cam_grid_common::config::CompositorConfig;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::display::DisplaySurface;
use crate::store::FrameStore;

/// Grid dimensions (rows, columns) for `count` tiles.
///
/// Columns are capped (at 2 by default) so feeds stack vertically rather
/// than shrinking into a wide strip; the cap is a layout decision, not a
/// limit on client count.
pub fn grid_shape(count: usize, max_columns: u32) -> (u32, u32) {
    let count = (count as u32).max(1);
    let columns = max_columns.max(1).min(count);
    let rows = count.div_ceil(columns);
    (rows, columns)
}

/// Tile every frame into a row-major grid of fixed-size cells.
///
/// Each source image is resized to the tile size unconditionally, whatever
/// its native dimensions. Cells past the last frame stay black, so the
/// output is always exactly `columns*tile_width x rows*tile_height`.
/// Returns `None` when there is nothing usable to compose.
pub fn compose_grid(
    frames: &[Arc<RgbImage>],
    tile_width: u32,
    tile_height: u32,
    max_columns: u32,
) -> Option<RgbImage> {
    if tile_width == 0 || tile_height == 0 {
        return None;
    }
    let tiles: Vec<&RgbImage> = frames
        .iter()
        .map(Arc::as_ref)
        .filter(|f| f.width() > 0 && f.height() > 0)
        .collect();
    if tiles.is_empty() {
        return None;
    }

    let (rows, columns) = grid_shape(tiles.len(), max_columns);
    // Zeroed buffer doubles as the black padding tiles.
    let mut canvas = RgbImage::new(columns * tile_width, rows * tile_height);

    for (i, tile) in tiles.iter().enumerate() {
        let resized = imageops::resize(*tile, tile_width, tile_height, FilterType::Triangle);
        let col = i as u32 % columns;
        let row = i as u32 / columns;
        imageops::replace(
            &mut canvas,
            &resized,
            (col * tile_width) as i64,
            (row * tile_height) as i64,
        );
    }

    Some(canvas)
}

/// Long-lived compositor task: snapshot, compose, present, at a bounded
/// cadence independent of producer frame rates. Exits only when `cancel`
/// fires; nothing inside the loop is fatal.
pub async fn run(
    store: Arc<FrameStore>,
    surface: Arc<dyn DisplaySurface>,
    config: CompositorConfig,
    cancel: CancellationToken,
) {
    let interval = Duration::from_secs_f64(1.0 / config.fps.max(0.1));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(
        fps = config.fps,
        tile_width = config.tile_width,
        tile_height = config.tile_height,
        max_columns = config.max_columns,
        "compositor loop started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let snapshot = store.snapshot();
        if snapshot.is_empty() {
            // No feeds yet; nothing to do this cycle.
            continue;
        }

        let frames: Vec<Arc<RgbImage>> = snapshot.into_iter().map(|(_, f)| f).collect();
        let (tile_w, tile_h, max_cols) =
            (config.tile_width, config.tile_height, config.max_columns);

        // Resizing is CPU-bound; keep it off the runtime's async workers.
        let composite = match tokio::task::spawn_blocking(move || {
            compose_grid(&frames, tile_w, tile_h, max_cols)
        })
        .await
        {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "composition task failed, skipping cycle");
                continue;
            }
        };

        if let Err(e) = surface.present(composite) {
            warn!(error = %e, "failed to present composite");
        } else {
            debug!(clients = store.len(), "presented composite");
        }
    }

    info!("compositor loop stopped");
}
