//! Minimal 2-D affine transform
//!
//! Covers the subset the scene core actually needs (identity, multiply,
//! point mapping, inversion) without pulling in a full linear-algebra crate.
//! Coefficient layout follows the usual `[a b tx; c d ty]` convention with a
//! column point vector: `x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`.

/// A 2x2 linear part plus translation (6 degrees of freedom)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Affine {
    /// The identity transform
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Create from the six coefficients
    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Pure translation
    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Non-uniform scale
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation (radians, counter-clockwise)
    pub fn rotation(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Map a point through this transform
    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Compose: `self` applied after `other`
    pub fn mul(&self, other: &Affine) -> Affine {
        Affine {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            tx: self.a * other.tx + self.c * other.ty + self.tx,
            ty: self.b * other.tx + self.d * other.ty + self.ty,
        }
    }

    /// Determinant of the linear part
    #[inline]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse transform, or `None` when singular
    pub fn inverse(&self) -> Option<Affine> {
        let det = self.determinant();
        if det.abs() <= f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            tx: (self.c * self.ty - self.d * self.tx) * inv,
            ty: (self.b * self.tx - self.a * self.ty) * inv,
        })
    }

    /// Is every coefficient finite?
    pub fn is_finite(&self) -> bool {
        self.a.is_finite()
            && self.b.is_finite()
            && self.c.is_finite()
            && self.d.is_finite()
            && self.tx.is_finite()
            && self.ty.is_finite()
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_identity_apply() {
        let (x, y) = Affine::IDENTITY.apply(3.0, -7.0);
        assert_eq!((x, y), (3.0, -7.0));
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = Affine::rotation(0.7)
            .mul(&Affine::scale(2.0, 3.0))
            .mul(&Affine::translation(5.0, -4.0));
        let inv = m.inverse().unwrap();
        let (x, y) = m.apply(11.0, 13.0);
        let (rx, ry) = inv.apply(x, y);
        assert!(close(rx, 11.0) && close(ry, 13.0), "got ({rx}, {ry})");
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let m = Affine::scale(0.0, 1.0);
        assert!(m.inverse().is_none());
    }

    #[test]
    fn test_translation_inverse() {
        let inv = Affine::translation(10.0, 20.0).inverse().unwrap();
        assert_eq!(inv.apply(10.0, 20.0), (0.0, 0.0));
    }
}
