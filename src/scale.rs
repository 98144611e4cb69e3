//! Proportional scaling of a natural image size into a display size

use crate::{DeviceClass, DisplaySize, NaturalSize};

/// Maximum display width for compact (mobile) devices
pub const COMPACT_MAX_WIDTH: u32 = 350;

/// Maximum display width for standard devices
pub const STANDARD_MAX_WIDTH: u32 = 600;

/// Scale `natural` so its width does not exceed the threshold of `device`.
///
/// Images at or below the threshold keep their natural size. Wider images are
/// scaled to exactly the threshold width with the height following the aspect
/// ratio. No rounding is applied.
pub fn scale_to_fit(natural: NaturalSize, device: DeviceClass) -> DisplaySize {
    let max_width = device.max_width();
    let width = f64::from(natural.width);
    let height = f64::from(natural.height);

    if natural.width > max_width {
        let max_width = f64::from(max_width);
        DisplaySize {
            width: max_width,
            height: (max_width * height) / width,
        }
    } else {
        DisplaySize { width, height }
    }
}
