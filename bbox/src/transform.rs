use super::{Rect, XYWH};
use crate::{common::*, RectNum};
use std::ops::Neg;

/// Axis-aligned affine transform `p' = s * p + t` applied per axis.
///
/// A negative scale mirrors the axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sx: T,
    pub sy: T,
    pub tx: T,
    pub ty: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn identity() -> Self {
        Self {
            sx: T::one(),
            sy: T::one(),
            tx: T::zero(),
            ty: T::zero(),
        }
    }

    pub fn translate(tx: T, ty: T) -> Self {
        Self {
            tx,
            ty,
            ..Self::identity()
        }
    }

    pub fn scale(sx: T, sy: T) -> Self {
        Self {
            sx,
            sy,
            ..Self::identity()
        }
    }

    /// Build the transform that maps `src` onto `tgt`.
    pub fn from_rects<R>(src: &R, tgt: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let sx = tgt.w() / src.w();
        let sy = tgt.h() / src.h();
        let tx = tgt.x() - src.x() * sx;
        let ty = tgt.y() - src.y() * sy;

        Self { sx, sy, tx, ty }
    }

    /// Map a `width` x `height` frame onto the unit square.
    pub fn normalize(width: T, height: T) -> Self {
        let src = XYWH::from_xywh([T::zero(), T::zero(), width, height]);
        let tgt = XYWH::from_xywh([T::zero(), T::zero(), T::one(), T::one()]);
        Self::from_rects(&src, &tgt)
    }
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd + Neg<Output = T>,
{
    /// Horizontal flip within a frame of the given width.
    pub fn mirror_x(width: T) -> Self {
        Self {
            sx: -T::one(),
            tx: width,
            ..Self::identity()
        }
    }
}

impl<T> Mul<&XYWH<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = XYWH<T>;

    fn mul(self, rhs: &XYWH<T>) -> Self::Output {
        rhs.transform(self)
    }
}

/// `lhs * rhs` applies `rhs` first, then `lhs`.
impl<T> Mul<&Transform<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = Transform<T>;

    fn mul(self, rhs: &Transform<T>) -> Self::Output {
        Transform {
            sx: self.sx * rhs.sx,
            sy: self.sy * rhs.sy,
            tx: rhs.tx * self.sx + self.tx,
            ty: rhs.ty * self.sy + self.ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn transform_mirror_then_normalize() {
        let transform = &Transform::normalize(8.0, 4.0) * &Transform::mirror_x(8.0);
        let rect = XYWH::from_xywh([0.0, 0.0, 2.0, 4.0]);
        assert_eq!((&transform * &rect).xywh(), [0.75, 0.0, 0.25, 1.0]);
    }

    #[test]
    fn transform_compose() {
        // crop at (10, 20), then normalize a 40x80 window
        let crop = Transform::translate(-10.0, -20.0);
        let norm = Transform::normalize(40.0, 80.0);
        let transform = &norm * &crop;

        let rect = XYWH::from_xywh([20.0, 40.0, 20.0, 40.0]);
        let [x, y, w, h] = (&transform * &rect).xywh();
        assert_abs_diff_eq!(x, 0.25);
        assert_abs_diff_eq!(y, 0.25);
        assert_abs_diff_eq!(w, 0.5);
        assert_abs_diff_eq!(h, 0.5);
    }
}
