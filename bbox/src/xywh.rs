use super::{CxCyWH, Rect, RectNum};
use crate::{common::*, Transform};

/// Bounding box anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XYWH<T> {
    pub(crate) x: T,
    pub(crate) y: T,
    pub(crate) w: T,
    pub(crate) h: T,
}

impl<T> XYWH<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Apply the transform on both corners and rebuild the box, so that
    /// mirroring transforms keep a non-negative width and height.
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        let [l, t, r, b] = self.ltrb();
        let [l, r] = order(l * transform.sx + transform.tx, r * transform.sx + transform.tx);
        let [t, b] = order(t * transform.sy + transform.ty, b * transform.sy + transform.ty);
        XYWH {
            x: l,
            y: t,
            w: r - l,
            h: b - t,
        }
    }
}

impl<T> Rect for XYWH<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn x(&self) -> Self::Type {
        self.x
    }

    fn y(&self) -> Self::Type {
        self.y
    }

    fn w(&self) -> Self::Type {
        self.w
    }

    fn h(&self) -> Self::Type {
        self.h
    }

    fn cx(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.x + self.w / two
    }

    fn cy(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.y + self.h / two
    }

    fn try_from_xywh(xywh: [Self::Type; 4]) -> Result<Self> {
        let [x, y, w, h] = xywh;
        let zero = T::zero();
        ensure!(w >= zero && h >= zero, "w and h must be non-negative");
        Ok(Self { x, y, w, h })
    }

    fn try_from_cxcywh(cxcywh: [Self::Type; 4]) -> Result<Self> {
        let [cx, cy, w, h] = cxcywh;
        let zero = T::zero();
        ensure!(w >= zero && h >= zero, "w and h must be non-negative");

        let two = T::one() + T::one();
        Ok(Self {
            x: cx - w / two,
            y: cy - h / two,
            w,
            h,
        })
    }
}

impl<T> From<CxCyWH<T>> for XYWH<T>
where
    T: Copy + Num,
{
    fn from(from: CxCyWH<T>) -> Self {
        Self::from(&from)
    }
}

impl<T> From<&CxCyWH<T>> for XYWH<T>
where
    T: Copy + Num,
{
    fn from(from: &CxCyWH<T>) -> Self {
        let two = T::one() + T::one();
        let CxCyWH { cx, cy, w, h } = *from;
        Self {
            x: cx - w / two,
            y: cy - h / two,
            w,
            h,
        }
    }
}

fn order<T>(lhs: T, rhs: T) -> [T; 2]
where
    T: PartialOrd,
{
    if lhs <= rhs {
        [lhs, rhs]
    } else {
        [rhs, lhs]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xywh_center() {
        let rect = XYWH::from_xywh([2.0, 3.0, 4.0, 6.0]);
        assert_eq!(rect.cxcywh(), [4.0, 6.0, 4.0, 6.0]);
        assert_eq!(XYWH::from(rect.to_cxcywh()), rect);
    }

    #[test]
    fn xywh_reject_negative_size() {
        assert!(XYWH::try_from_xywh([0.0, 0.0, -1.0, 1.0]).is_err());
        assert!(XYWH::try_from_cxcywh([0.0, 0.0, 1.0, -1.0]).is_err());
    }

    #[test]
    fn xywh_mirror() {
        let rect = XYWH::from_xywh([1.0, 2.0, 3.0, 4.0]);
        let mirrored = rect.transform(&Transform::mirror_x(10.0));
        assert_eq!(mirrored.xywh(), [6.0, 2.0, 3.0, 4.0]);
    }
}
