//! Guillotine rectangle packer with a linear growth loop.

use crate::MeshError;

const FIT_EPS: f32 = 1e-4;

/// Placement in atlas units. `width`/`height` include packer padding.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when the interiors intersect; touching edges do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right() - FIT_EPS
            && other.x < self.right() - FIT_EPS
            && self.y < other.bottom() - FIT_EPS
            && other.y < self.bottom() - FIT_EPS
    }
}

#[derive(Clone, Debug, Default)]
pub struct RectPacker {
    sizes: Vec<(f32, f32)>,
    placed: Vec<Rect>,
    padding: f32,
}

impl RectPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `padding` to both dimensions of every registered rectangle.
    pub fn with_padding(padding: f32) -> Self {
        Self {
            padding: padding.max(0.0),
            ..Self::default()
        }
    }

    #[inline]
    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Registers a rectangle; returns its index for [`RectPacker::rect`].
    pub fn add(&mut self, width: f32, height: f32) -> usize {
        self.sizes
            .push((width.max(0.0) + self.padding, height.max(0.0) + self.padding));
        self.sizes.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Placement of the `i`-th registered rectangle after a successful `place`.
    #[inline]
    pub fn rect(&self, i: usize) -> Rect {
        self.placed[i]
    }

    #[inline]
    pub fn rects(&self) -> &[Rect] {
        &self.placed
    }

    /// Tries to place every rectangle inside `atlas_w` x `atlas_h`.
    /// On failure the previous placement is cleared.
    pub fn place(&mut self, atlas_w: f32, atlas_h: f32) -> bool {
        let mut order: Vec<usize> = (0..self.sizes.len()).collect();
        // Stable: equal keys keep registration order.
        order.sort_by(|&a, &b| {
            let ka = self.sizes[a].0.max(self.sizes[a].1);
            let kb = self.sizes[b].0.max(self.sizes[b].1);
            kb.total_cmp(&ka)
        });

        let mut free = vec![Rect {
            x: 0.0,
            y: 0.0,
            width: atlas_w,
            height: atlas_h,
        }];
        let mut placed = vec![Rect::default(); self.sizes.len()];

        for idx in order {
            let (w, h) = self.sizes[idx];
            let Some(slot) = free
                .iter()
                .position(|r| r.width >= w - FIT_EPS && r.height >= h - FIT_EPS)
            else {
                self.placed.clear();
                return false;
            };
            let region = free.remove(slot);
            placed[idx] = Rect {
                x: region.x,
                y: region.y,
                width: w,
                height: h,
            };
            split(&mut free, &region, w, h);
        }

        self.placed = placed;
        true
    }

    /// Grows the atlas from 1x1, alternating width then height by one unit,
    /// until every rectangle fits. Returns the atlas size.
    pub fn pack(&mut self, max_size: u32) -> Result<(u32, u32), MeshError> {
        let (mut w, mut h) = (1u32, 1u32);
        let mut grow_width = true;
        loop {
            if self.place(w as f32, h as f32) {
                log::debug!("packed {} rects into {}x{}", self.sizes.len(), w, h);
                return Ok((w, h));
            }
            if grow_width {
                w += 1;
            } else {
                h += 1;
            }
            grow_width = !grow_width;
            if w > max_size || h > max_size {
                return Err(MeshError::SizingFailure {
                    width: w,
                    height: h,
                    max: max_size,
                });
            }
        }
    }
}

fn split(free: &mut Vec<Rect>, region: &Rect, w: f32, h: f32) {
    let right_w = region.width - w;
    let below_h = region.height - h;
    if right_w > FIT_EPS {
        free.push(Rect {
            x: region.x + w,
            y: region.y,
            width: right_w,
            height: h,
        });
    }
    if below_h > FIT_EPS {
        free.push(Rect {
            x: region.x,
            y: region.y + h,
            width: region.width,
            height: below_h,
        });
    }
}
