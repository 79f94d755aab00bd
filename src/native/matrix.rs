use super::ffi::cairo_matrix_t;

/// Affine transformation in cairo's `cairo_matrix_t` layout.
///
/// A point `(x, y)` maps to `(xx * x + xy * y + x0, yx * x + yy * y + y0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub const fn new(xx: f64, yx: f64, xy: f64, yy: f64, x0: f64, y0: f64) -> Self {
        Self { xx, yx, xy, yy, x0, y0 }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }
}

impl From<Matrix> for cairo_matrix_t {
    fn from(m: Matrix) -> Self {
        cairo_matrix_t {
            xx: m.xx,
            yx: m.yx,
            xy: m.xy,
            yy: m.yy,
            x0: m.x0,
            y0: m.y0,
        }
    }
}

impl From<cairo_matrix_t> for Matrix {
    fn from(m: cairo_matrix_t) -> Self {
        Matrix::new(m.xx, m.yx, m.xy, m.yy, m.x0, m.y0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_cairo() {
        let raw: cairo_matrix_t = Matrix::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0).into();
        assert_eq!(
            (raw.xx, raw.yx, raw.xy, raw.yy, raw.x0, raw.y0),
            (1.0, 2.0, 3.0, 4.0, 5.0, 6.0)
        );
        assert_eq!(Matrix::from(raw), Matrix::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        assert_eq!(Matrix::default(), Matrix::translation(0.0, 0.0));
    }
}
