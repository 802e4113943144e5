use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-width-height format, contains left top corner and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// Integer pixel box. Serialized as a bare `[i32; 4]`.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BBox<F: BBoxFormat>([i32; 4], #[serde(skip)] PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [i32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[i32; 4] {
        &self.0
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(left: i32, top: i32, width: i32, height: i32) -> Self {
        BBox([left, top, width, height], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> i32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> i32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> i32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> i32 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        BBox([x1, y1, x2, y2], PhantomData)
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> i32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> i32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> i32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> i32 {
        self.0[3]
    }

    /// Same box with corners ordered so that `left <= right` and `top <= bottom`.
    #[inline]
    pub fn normalized(&self) -> Self {
        let [x1, y1, x2, y2] = self.0;

        Self::ltrb(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
    }

    #[inline]
    pub fn width(&self) -> i64 {
        (i64::from(self.0[2]) - i64::from(self.0[0])).abs()
    }

    #[inline]
    pub fn height(&self) -> i64 {
        (i64::from(self.0[3]) - i64::from(self.0[1])).abs()
    }

    /// Area in pixels², independent of corner ordering.
    #[inline]
    pub fn area(&self) -> i64 {
        self.width().saturating_mul(self.height())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Area of the overlapping region, 0 when the boxes do not overlap.
    pub fn intersection(&self, other: &BBox<Ltrb>) -> i64 {
        let a = self.normalized();
        let b = other.normalized();

        let w = i64::from(a.right().min(b.right())) - i64::from(a.left().max(b.left()));
        let h = i64::from(a.bottom().min(b.bottom())) - i64::from(a.top().max(b.top()));

        if w <= 0 || h <= 0 {
            return 0;
        }

        w.saturating_mul(h)
    }

    /// Intersection over union, in `[0, 1]`.
    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let intersection = self.intersection(other);
        if intersection == 0 {
            return 0.0;
        }

        let union = self.area().saturating_add(other.area()) - intersection;
        if union <= 0 {
            return 0.0;
        }

        (intersection as f64 / union as f64) as f32
    }

    /// Normalizes the box and clips it to a `width` x `height` image.
    pub fn clipped(&self, width: usize, height: usize) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        let b = self.normalized();

        Self::ltrb(
            b.left().clamp(0, w),
            b.top().clamp(0, h),
            b.right().clamp(0, w),
            b.bottom().clamp(0, h),
        )
    }
}

impl From<[i32; 4]> for BBox<Ltrb> {
    #[inline]
    fn from(v: [i32; 4]) -> Self {
        BBox(v, PhantomData)
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [
                v.0[0],
                v.0[1],
                v.0[0].saturating_add(v.0[2]),
                v.0[1].saturating_add(v.0[3]),
            ],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        let n = v.normalized();

        Self(
            [
                n.0[0],
                n.0[1],
                n.0[2].saturating_sub(n.0[0]),
                n.0[3].saturating_sub(n.0[1]),
            ],
            PhantomData,
        )
    }
}
