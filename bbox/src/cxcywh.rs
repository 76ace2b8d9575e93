use super::Rect;
use crate::common::*;

/// Bounding box anchored at its center.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CxCyWH<T> {
    pub(crate) cx: T,
    pub(crate) cy: T,
    pub(crate) w: T,
    pub(crate) h: T,
}

impl<T> Rect for CxCyWH<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn x(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cx - self.w / two
    }

    fn y(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cy - self.h / two
    }

    fn w(&self) -> Self::Type {
        self.w
    }

    fn h(&self) -> Self::Type {
        self.h
    }

    fn cx(&self) -> Self::Type {
        self.cx
    }

    fn cy(&self) -> Self::Type {
        self.cy
    }

    fn try_from_xywh(xywh: [Self::Type; 4]) -> Result<Self> {
        let [x, y, w, h] = xywh;
        let zero = T::zero();
        ensure!(w >= zero && h >= zero, "w and h must be non-negative");

        let two = T::one() + T::one();
        Ok(Self {
            cx: x + w / two,
            cy: y + h / two,
            w,
            h,
        })
    }

    fn try_from_cxcywh(cxcywh: [Self::Type; 4]) -> Result<Self> {
        let [cx, cy, w, h] = cxcywh;
        let zero = T::zero();
        ensure!(w >= zero && h >= zero, "w and h must be non-negative");
        Ok(Self { cx, cy, w, h })
    }
}
