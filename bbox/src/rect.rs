use super::{CxCyWH, XYWH};
use crate::common::*;

/// The generic rectangle in image coordinates, where x grows rightwards
/// and y grows downwards.
pub trait Rect {
    type Type;

    fn x(&self) -> Self::Type;
    fn y(&self) -> Self::Type;
    fn w(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;

    fn try_from_xywh(xywh: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_cxcywh(cxcywh: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd + Copy,
{
    fn from_xywh(xywh: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_xywh(xywh).unwrap()
    }

    fn from_cxcywh(cxcywh: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_cxcywh(cxcywh).unwrap()
    }

    fn r(&self) -> Self::Type {
        self.x() + self.w()
    }

    fn b(&self) -> Self::Type {
        self.y() + self.h()
    }

    fn xywh(&self) -> [Self::Type; 4] {
        [self.x(), self.y(), self.w(), self.h()]
    }

    fn cxcywh(&self) -> [Self::Type; 4] {
        [self.cx(), self.cy(), self.w(), self.h()]
    }

    fn ltrb(&self) -> [Self::Type; 4] {
        [self.x(), self.y(), self.r(), self.b()]
    }

    fn to_xywh(&self) -> XYWH<Self::Type> {
        XYWH {
            x: self.x(),
            y: self.y(),
            w: self.w(),
            h: self.h(),
        }
    }

    fn to_cxcywh(&self) -> CxCyWH<Self::Type> {
        CxCyWH {
            cx: self.cx(),
            cy: self.cy(),
            w: self.w(),
            h: self.h(),
        }
    }

    fn area(&self) -> Self::Type {
        self.w() * self.h()
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    /// Compute the overlapping region, or `None` if the rectangles are disjoint.
    fn intersect_with<R>(&self, other: &R) -> Option<XYWH<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let l = self.x().max(other.x());
        let t = self.y().max(other.y());
        let r = self.r().min(other.x() + other.w());
        let b = self.b().min(other.y() + other.h());
        (r > l && b > t).then(|| XYWH {
            x: l,
            y: t,
            w: r - l,
            h: b - t,
        })
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd + Copy,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_intersection() {
        let lhs = XYWH::from_xywh([0.0, 0.0, 4.0, 4.0]);
        let rhs = XYWH::from_xywh([2.0, 1.0, 4.0, 4.0]);
        let inter = lhs.intersect_with(&rhs).unwrap();
        assert_eq!(inter.xywh(), [2.0, 1.0, 2.0, 3.0]);
        assert_eq!(inter.area(), 6.0);
    }

    #[test]
    fn rect_disjoint() {
        let lhs = XYWH::from_xywh([0.0, 0.0, 1.0, 1.0]);
        let rhs = XYWH::from_xywh([1.0, 0.0, 1.0, 1.0]);
        assert!(lhs.intersect_with(&rhs).is_none());

        // touching at the corner only
        let rhs = XYWH::from_xywh([1.0, 1.0, 1.0, 1.0]);
        assert!(lhs.intersect_with(&rhs).is_none());
    }
}
