//! Drag-to-select boxes and placement of the selection context menu.

use crate::geometry::rect_from_corners;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// A selection rectangle in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionBox {
    /// Zero-size box at a point.
    pub fn at(point: Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
            width: 0.0,
            height: 0.0,
        }
    }

    /// Box spanned by the drag start and the current point, in any direction.
    pub fn from_corners(start: Point, current: Point) -> Self {
        Self::from_rect(rect_from_corners(start, current))
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self {
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
        }
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// True when either side is below `min_size`, i.e. an accidental click.
    pub fn is_too_small(&self, min_size: f64) -> bool {
        self.width < min_size || self.height < min_size
    }
}

/// Menu placement relative to the visible viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MenuPosition {
    pub top: f64,
    pub left: f64,
}

/// Keep a measured menu inside the viewport.
///
/// Overflowing the right edge shifts the menu left, but never past the left
/// padding. Overflowing the bottom flips the menu above the anchor, clamped to
/// the top padding.
pub fn fit_menu(anchor: Point, menu: Size, viewport: Size, padding: f64, gap: f64) -> MenuPosition {
    let mut left = anchor.x;
    let right_limit = viewport.width - padding;
    if left + menu.width > right_limit {
        left -= left + menu.width - right_limit;
    }
    left = left.max(padding);

    let mut top = anchor.y + gap;
    let bottom_limit = viewport.height - padding;
    if top + menu.height > bottom_limit {
        top = anchor.y - gap - menu.height;
    }
    top = top.max(padding);

    MenuPosition { top, left }
}

/// Two-pass menu placement: place at the anchor, then correct once the menu
/// has been rendered and measured. Once a size is known, moving the anchor
/// refits immediately.
#[derive(Debug, Clone, Default)]
pub struct MenuPositioner {
    anchor: Option<Point>,
    measured: Option<Size>,
    padding: f64,
    gap: f64,
}

impl MenuPositioner {
    pub fn new(padding: f64, gap: f64) -> Self {
        Self {
            anchor: None,
            measured: None,
            padding,
            gap,
        }
    }

    /// Current anchor relative to the viewport, if a menu is requested.
    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }

    /// Move the anchor. Until the menu has been measured it sits right at
    /// the anchor.
    pub fn place(&mut self, anchor: Point, viewport: Size) -> MenuPosition {
        self.anchor = Some(anchor);
        match self.measured {
            Some(menu) => fit_menu(anchor, menu, viewport, self.padding, self.gap),
            None => MenuPosition {
                top: anchor.y + self.gap,
                left: anchor.x,
            },
        }
    }

    /// Second pass: correct against the viewport with the measured size.
    ///
    /// Returns `None` when no menu is anchored or the size didn't change.
    pub fn measure(&mut self, menu: Size, viewport: Size) -> Option<MenuPosition> {
        let anchor = self.anchor?;
        if self.measured == Some(menu) {
            return None;
        }
        self.measured = Some(menu);
        Some(fit_menu(anchor, menu, viewport, self.padding, self.gap))
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.measured = None;
    }
}
