//! Pure dimension planning for size classes.

/// Fit `original` inside `max` preserving aspect ratio, never upscaling.
///
/// ```
/// # use upload_variants::image::plan;
/// assert_eq!(plan(2000, 1000, 300, 200), (300, 150));
/// assert_eq!(plan(200, 100, 600, 400), (200, 100));
/// ```
pub fn plan(original_w: u32, original_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if original_w == 0 || original_h == 0 {
        return (1, 1);
    }

    let ratio = (max_w as f64 / original_w as f64)
        .min(max_h as f64 / original_h as f64)
        .min(1.0);

    let target_w = ((original_w as f64 * ratio).round() as u32).max(1);
    let target_h = ((original_h as f64 * ratio).round() as u32).max(1);
    (target_w, target_h)
}
