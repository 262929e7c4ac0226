//! Abstract layout space: points, rectangles, and the split tree that places
//! windows inside a tab.
//!
//! All rectangles produced here have finite, non-negative extents, whatever
//! area they are computed from.

use serde::{Deserialize, Serialize};

use crate::window_manager::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }
}

fn finite(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top_left: Vec2,
    pub bottom_right: Vec2,
}

impl Rect {
    /// Builds a rectangle, replacing non-finite coordinates with zero and
    /// collapsing inverted corners onto the top-left.
    pub fn new(top_left: Vec2, bottom_right: Vec2) -> Self {
        let tl = Vec2::new(finite(top_left.x), finite(top_left.y));
        let br = Vec2::new(
            finite(bottom_right.x).max(tl.x),
            finite(bottom_right.y).max(tl.y),
        );
        Self {
            top_left: tl,
            bottom_right: br,
        }
    }

    pub fn from_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(x + width, y + height))
    }

    pub fn width(&self) -> f32 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> f32 {
        self.bottom_right.y - self.top_left.y
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.top_left.x
            && p.x < self.bottom_right.x
            && p.y >= self.top_left.y
            && p.y < self.bottom_right.y
    }

    /// Splits off a band of `height` from the top (clamped to this rect).
    pub fn split_top(&self, height: f32) -> (Rect, Rect) {
        let h = finite(height).clamp(0.0, self.height());
        let y = self.top_left.y + h;
        (
            Rect::new(self.top_left, Vec2::new(self.bottom_right.x, y)),
            Rect::new(Vec2::new(self.top_left.x, y), self.bottom_right),
        )
    }

    /// Splits off a band of `height` from the bottom; returns (rest, band).
    pub fn split_bottom(&self, height: f32) -> (Rect, Rect) {
        let h = finite(height).clamp(0.0, self.height());
        let y = self.bottom_right.y - h;
        (
            Rect::new(self.top_left, Vec2::new(self.bottom_right.x, y)),
            Rect::new(Vec2::new(self.top_left.x, y), self.bottom_right),
        )
    }

    /// Splits at `ratio` of the width; returns (left, right).
    pub fn split_left(&self, ratio: f32) -> (Rect, Rect) {
        let x = self.top_left.x + self.width() * clamp_ratio(ratio);
        (
            Rect::new(self.top_left, Vec2::new(x, self.bottom_right.y)),
            Rect::new(Vec2::new(x, self.top_left.y), self.bottom_right),
        )
    }

    /// Splits into `count` equal-width columns.
    pub fn columns(&self, count: usize) -> Vec<Rect> {
        if count == 0 {
            return Vec::new();
        }
        let w = self.width() / count as f32;
        (0..count)
            .map(|i| {
                let x0 = self.top_left.x + w * i as f32;
                let x1 = if i + 1 == count {
                    self.bottom_right.x
                } else {
                    x0 + w
                };
                Rect::new(Vec2::new(x0, self.top_left.y), Vec2::new(x1, self.bottom_right.y))
            })
            .collect()
    }
}

fn clamp_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Orientation of a split. `Horizontal` stacks its children top/bottom,
/// `Vertical` places them left/right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Split {
    Horizontal { top: Box<Split>, bottom: Box<Split>, ratio: f32 },
    Vertical { left: Box<Split>, right: Box<Split>, ratio: f32 },
    Leaf { window: WindowId },
}

impl Split {
    pub fn leaf(window: WindowId) -> Self {
        Split::Leaf { window }
    }

    fn is_leaf_of(&self, target: WindowId) -> bool {
        matches!(self, Split::Leaf { window } if *window == target)
    }

    pub fn contains(&self, target: WindowId) -> bool {
        match self {
            Split::Leaf { window } => *window == target,
            Split::Horizontal { top: a, bottom: b, .. } | Split::Vertical { left: a, right: b, .. } => {
                a.contains(target) || b.contains(target)
            }
        }
    }

    /// Leaves in reading order (top before bottom, left before right).
    pub fn window_ids(&self) -> Vec<WindowId> {
        match self {
            Split::Leaf { window } => vec![*window],
            Split::Horizontal { top: a, bottom: b, .. } | Split::Vertical { left: a, right: b, .. } => {
                let mut ids = a.window_ids();
                ids.extend(b.window_ids());
                ids
            }
        }
    }

    /// Replaces the leaf `target` with a split holding `target` first and
    /// `new_window` second.
    pub fn split_window(
        &mut self,
        target: WindowId,
        new_window: WindowId,
        direction: SplitDirection,
        ratio: f32,
    ) -> bool {
        match self {
            Split::Leaf { window } if *window == target => {
                let old = Box::new(Split::leaf(target));
                let new = Box::new(Split::leaf(new_window));
                let ratio = clamp_ratio(ratio);
                *self = match direction {
                    SplitDirection::Horizontal => Split::Horizontal {
                        top: old,
                        bottom: new,
                        ratio,
                    },
                    SplitDirection::Vertical => Split::Vertical {
                        left: old,
                        right: new,
                        ratio,
                    },
                };
                true
            }
            Split::Leaf { .. } => false,
            Split::Horizontal { top: a, bottom: b, .. } | Split::Vertical { left: a, right: b, .. } => {
                a.split_window(target, new_window, direction, ratio)
                    || b.split_window(target, new_window, direction, ratio)
            }
        }
    }

    /// Removes the leaf `target`, collapsing its parent into the sibling.
    /// A lone root leaf cannot be removed here.
    pub fn remove_window(&mut self, target: WindowId) -> bool {
        let sibling = match self {
            Split::Leaf { .. } => return false,
            Split::Horizontal { top: a, bottom: b, .. } | Split::Vertical { left: a, right: b, .. } => {
                if a.is_leaf_of(target) {
                    std::mem::replace(b.as_mut(), Split::leaf(target))
                } else if b.is_leaf_of(target) {
                    std::mem::replace(a.as_mut(), Split::leaf(target))
                } else {
                    return a.remove_window(target) || b.remove_window(target);
                }
            }
        };
        *self = sibling;
        true
    }

    /// Computes the rectangle of every leaf inside `area`.
    pub fn layout(&self, area: Rect) -> Vec<(WindowId, Rect)> {
        let mut out = Vec::new();
        self.layout_into(Rect::new(area.top_left, area.bottom_right), &mut out);
        out
    }

    fn layout_into(&self, area: Rect, out: &mut Vec<(WindowId, Rect)>) {
        match self {
            Split::Leaf { window } => out.push((*window, area)),
            Split::Horizontal { top, bottom, ratio } => {
                let (upper, lower) = area.split_top(area.height() * clamp_ratio(*ratio));
                top.layout_into(upper, out);
                bottom.layout_into(lower, out);
            }
            Split::Vertical { left, right, ratio } => {
                let (l, r) = area.split_left(*ratio);
                left.layout_into(l, out);
                right.layout_into(r, out);
            }
        }
    }
}
