//! Local vector averaging of a direction field.

use ndarray::Zip;

use super::DirectionField;

/// Half the side of the 5x5 averaging window.
pub const SMOOTHING_RADIUS: usize = 2;

/// Average each vector with its 5x5 neighborhood and renormalize.
///
/// Vectors are orientations: a neighbor pointing against the center
/// vector (negative dot product) is negated before it is summed, so
/// angles `t` and `t + pi` reinforce each other. The window is truncated
/// at the image border. Where the neighborhood sum is exactly zero the
/// input vector is kept unchanged, so those pixels are the only ones that
/// may end up with a non-unit length. With a non-zero center vector the
/// aligned sum is never zero.
pub fn smooth_field(field: &DirectionField) -> DirectionField {
    let (height, width) = field.dim();
    let r = SMOOTHING_RADIUS;
    let mut out = DirectionField::zeros(width, height);

    Zip::indexed(&mut out.x)
        .and(&mut out.y)
        .par_for_each(|(y, x), ox, oy| {
            let (cx, cy) = field.at(x, y);
            let mut sx = 0.0f32;
            let mut sy = 0.0f32;
            for ny in y.saturating_sub(r)..(y + r + 1).min(height) {
                for nx in x.saturating_sub(r)..(x + r + 1).min(width) {
                    let (vx, vy) = field.at(nx, ny);
                    if vx * cx + vy * cy < 0.0 {
                        sx -= vx;
                        sy -= vy;
                    } else {
                        sx += vx;
                        sy += vy;
                    }
                }
            }

            let len = (sx * sx + sy * sy).sqrt();
            if len > 0.0 {
                *ox = sx / len;
                *oy = sy / len;
            } else {
                *ox = cx;
                *oy = cy;
            }
        });

    out
}
