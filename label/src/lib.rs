use bbox::{prelude::*, Transform, XYWH};
use num_traits::{Float, Num};
use std::ops::Mul;

/// A rectangle tagged with a class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

impl<R, C> Label<R, C>
where
    R: Rect,
    C: Copy,
{
    /// Replace the rectangle while keeping the class.
    pub fn with_rect<S>(&self, rect: S) -> Label<S, C>
    where
        S: Rect,
    {
        Label {
            rect,
            class: self.class,
        }
    }
}

impl<T, C> Label<XYWH<T>, C>
where
    T: Float,
    C: Copy,
{
    /// Clip the label to `window`, or `None` if nothing of it is visible.
    pub fn clip(&self, window: &XYWH<T>) -> Option<Self> {
        let rect = self.rect.intersect_with(window)?;
        Some(self.with_rect(rect))
    }
}

impl<'a, T, C> Mul<&'a Label<XYWH<T>, C>> for &'a Transform<T>
where
    T: Copy + Num + PartialOrd,
    C: Copy,
{
    type Output = Label<XYWH<T>, C>;

    fn mul(self, rhs: &'a Label<XYWH<T>, C>) -> Self::Output {
        Label {
            rect: self * &rhs.rect,
            class: rhs.class,
        }
    }
}
