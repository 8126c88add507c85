use super::geometry::*;

use serde::{Deserialize, Serialize};

///
/// A column-major 4x4 transformation matrix
///
/// Points map as column vectors (`p' = M * p`), so composing with
/// `multiply` appends the new transform in local space, the way canvas
/// transforms stack up during a tree traversal.
///
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Matrix4 {
    pub data: [f32; 16],
}

impl Default for Matrix4 {
    fn default() -> Matrix4 {
        Matrix4::identity()
    }
}

impl Matrix4 {
    ///
    /// The identity transform
    ///
    pub fn identity() -> Matrix4 {
        let mut data = [0.0; 16];
        data[0]  = 1.0;
        data[5]  = 1.0;
        data[10] = 1.0;
        data[15] = 1.0;

        Matrix4 { data }
    }

    ///
    /// A pure translation
    ///
    pub fn translation(dx: f32, dy: f32, dz: f32) -> Matrix4 {
        let mut m   = Matrix4::identity();
        m.data[12]  = dx;
        m.data[13]  = dy;
        m.data[14]  = dz;
        m
    }

    ///
    /// A scale about the origin
    ///
    pub fn scaling(sx: f32, sy: f32) -> Matrix4 {
        let mut m   = Matrix4::identity();
        m.data[0]   = sx;
        m.data[5]   = sy;
        m
    }

    ///
    /// Replaces this matrix with a pure translation
    ///
    pub fn load_translate(&mut self, dx: f32, dy: f32, dz: f32) {
        *self = Matrix4::translation(dx, dy, dz);
    }

    ///
    /// Appends `rhs` in local space: `self = self * rhs`
    ///
    pub fn multiply(&mut self, rhs: &Matrix4) {
        let a       = self.data;
        let b       = &rhs.data;
        let mut out = [0.0; 16];

        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[k * 4 + row] * b[col * 4 + k];
                }
                out[col * 4 + row] = sum;
            }
        }

        self.data = out;
    }

    ///
    /// Appends a translation in local space
    ///
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.multiply(&Matrix4::translation(dx, dy, 0.0));
    }

    ///
    /// Appends a scale in local space
    ///
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.multiply(&Matrix4::scaling(sx, sy));
    }

    #[inline]
    pub fn translation_x(&self) -> f32 {
        self.data[12]
    }

    #[inline]
    pub fn translation_y(&self) -> f32 {
        self.data[13]
    }

    ///
    /// Maps a 2D point, applying the perspective divide when present
    ///
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        let m   = &self.data;
        let mx  = m[0] * x + m[4] * y + m[12];
        let my  = m[1] * x + m[5] * y + m[13];
        let w   = m[3] * x + m[7] * y + m[15];

        if w != 1.0 && w != 0.0 {
            (mx / w, my / w)
        } else {
            (mx, my)
        }
    }

    ///
    /// Maps a 3D point
    ///
    pub fn map_point3d(&self, p: Vector3) -> Vector3 {
        let m   = &self.data;
        let mx  = m[0] * p.x + m[4] * p.y + m[8] * p.z + m[12];
        let my  = m[1] * p.x + m[5] * p.y + m[9] * p.z + m[13];
        let mz  = m[2] * p.x + m[6] * p.y + m[10] * p.z + m[14];
        let w   = m[3] * p.x + m[7] * p.y + m[11] * p.z + m[15];

        if w != 1.0 && w != 0.0 {
            Vector3::new(mx / w, my / w, mz / w)
        } else {
            Vector3::new(mx, my, mz)
        }
    }

    ///
    /// Maps a rect to the axis-aligned bounding box of its four mapped corners
    ///
    /// An empty input stays empty; a NaN produced anywhere during the mapping
    /// also yields an empty rect.
    ///
    pub fn map_rect(&self, r: &Rect) -> Rect {
        if r.is_empty() {
            return Rect::empty();
        }

        let (x1, y1) = self.map_point(r.left, r.top);
        let (x2, y2) = self.map_point(r.right, r.top);
        let (x3, y3) = self.map_point(r.left, r.bottom);
        let (x4, y4) = self.map_point(r.right, r.bottom);

        Rect::new(
            f32::min(f32::min(x1, x2), f32::min(x3, x4)),
            f32::min(f32::min(y1, y2), f32::min(y3, y4)),
            f32::max(f32::max(x1, x2), f32::max(x3, x4)),
            f32::max(f32::max(y1, y2), f32::max(y3, y4)),
        )
    }

    ///
    /// True if this matrix only translates and scales (no rotation, skew,
    /// z mixing or perspective)
    ///
    pub fn is_simple(&self) -> bool {
        let m = &self.data;
        m[1] == 0.0 && m[2] == 0.0 && m[3] == 0.0
            && m[4] == 0.0 && m[6] == 0.0 && m[7] == 0.0
            && m[8] == 0.0 && m[9] == 0.0 && m[11] == 0.0
            && m[15] == 1.0
    }

    ///
    /// True if this matrix is a translation only
    ///
    pub fn is_pure_translate(&self) -> bool {
        self.is_simple() && self.data[0] == 1.0 && self.data[5] == 1.0
    }

    ///
    /// True if the x and y scale factors are both positive
    ///
    pub fn positive_scale(&self) -> bool {
        self.data[0] > 0.0 && self.data[5] > 0.0
    }

    ///
    /// Computes the inverse, or None if the matrix is singular
    ///
    pub fn invert(&self) -> Option<Matrix4> {
        let m = &self.data;

        // 2x2 sub-determinants of the lower half, reused across the cofactors
        let s0 = m[0] * m[5] - m[4] * m[1];
        let s1 = m[0] * m[9] - m[8] * m[1];
        let s2 = m[0] * m[13] - m[12] * m[1];
        let s3 = m[4] * m[9] - m[8] * m[5];
        let s4 = m[4] * m[13] - m[12] * m[5];
        let s5 = m[8] * m[13] - m[12] * m[9];

        let c5 = m[10] * m[15] - m[14] * m[11];
        let c4 = m[6] * m[15] - m[14] * m[7];
        let c3 = m[6] * m[11] - m[10] * m[7];
        let c2 = m[2] * m[15] - m[14] * m[3];
        let c1 = m[2] * m[11] - m[10] * m[3];
        let c0 = m[2] * m[7] - m[6] * m[3];

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;

        let mut out = [0.0; 16];
        out[0]  = (m[5] * c5 - m[9] * c4 + m[13] * c3) * inv_det;
        out[4]  = (-m[4] * c5 + m[8] * c4 - m[12] * c3) * inv_det;
        out[8]  = (m[7] * s5 - m[11] * s4 + m[15] * s3) * inv_det;
        out[12] = (-m[6] * s5 + m[10] * s4 - m[14] * s3) * inv_det;

        out[1]  = (-m[1] * c5 + m[9] * c2 - m[13] * c1) * inv_det;
        out[5]  = (m[0] * c5 - m[8] * c2 + m[12] * c1) * inv_det;
        out[9]  = (-m[3] * s5 + m[11] * s2 - m[15] * s1) * inv_det;
        out[13] = (m[2] * s5 - m[10] * s2 + m[14] * s1) * inv_det;

        out[2]  = (m[1] * c4 - m[5] * c2 + m[13] * c0) * inv_det;
        out[6]  = (-m[0] * c4 + m[4] * c2 - m[12] * c0) * inv_det;
        out[10] = (m[3] * s4 - m[7] * s2 + m[15] * s0) * inv_det;
        out[14] = (-m[2] * s4 + m[6] * s2 - m[14] * s0) * inv_det;

        out[3]  = (-m[1] * c3 + m[5] * c1 - m[9] * c0) * inv_det;
        out[7]  = (m[0] * c3 - m[4] * c1 + m[8] * c0) * inv_det;
        out[11] = (-m[3] * s3 + m[7] * s1 - m[11] * s0) * inv_det;
        out[15] = (m[2] * s3 - m[6] * s1 + m[10] * s0) * inv_det;

        Some(Matrix4 { data: out })
    }
}
