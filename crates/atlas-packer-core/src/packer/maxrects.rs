use super::Packer;
use crate::model::Rect;

/// Free-rectangle packer for one page, best-short-side-fit.
///
/// Every entry reserves a slot of `(w + 2 * padding) x (h + 2 * padding)` anywhere in the
/// page; the entry itself sits `padding` pixels inside its slot. Slots never overlap, so
/// neighbours are at least `2 * padding` apart and every entry keeps `padding` pixels to
/// the page edges.
#[derive(Debug, Clone)]
pub struct MaxRectsPacker {
    padding: u32,
    bounds: Rect,
    free: Vec<Rect>,
    used: Vec<Rect>,
}

impl MaxRectsPacker {
    pub fn new(width: u32, height: u32, padding: u32) -> Self {
        let bounds = Rect::new(0, 0, width, height);
        Self {
            padding,
            bounds,
            free: vec![bounds],
            used: Vec::new(),
        }
    }

    /// Reserved slots (padding included), in placement order.
    pub fn used_slots(&self) -> &[Rect] {
        &self.used
    }

    pub fn free_list_len(&self) -> usize {
        self.free.len()
    }

    fn slot_size(&self, w: u32, h: u32) -> Option<(u32, u32)> {
        let pad2 = self.padding.checked_mul(2)?;
        Some((w.checked_add(pad2)?, h.checked_add(pad2)?))
    }

    fn place_rect(&mut self, node: &Rect) {
        // split all free rectangles that intersect with node
        let mut new_free: Vec<Rect> = Vec::new();
        for fr in self.free.iter() {
            if !fr.intersects(node) {
                new_free.push(*fr);
                continue;
            }
            let ix1 = fr.x.max(node.x);
            let iy1 = fr.y.max(node.y);
            let ix2 = fr.right().min(node.right());
            let iy2 = fr.bottom().min(node.bottom());

            // above
            if iy1 > fr.y {
                new_free.push(Rect::new(fr.x, fr.y, fr.w, iy1 - fr.y));
            }
            // below
            if iy2 < fr.bottom() {
                new_free.push(Rect::new(fr.x, iy2, fr.w, fr.bottom() - iy2));
            }
            // left
            if ix1 > fr.x {
                new_free.push(Rect::new(fr.x, fr.y, ix1 - fr.x, fr.h));
            }
            // right
            if ix2 < fr.right() {
                new_free.push(Rect::new(ix2, fr.y, fr.right() - ix2, fr.h));
            }
        }

        self.free = new_free;
        self.prune_free_list();
        self.used.push(*node);
    }

    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let a = self.free[i];
            let mut remove_i = false;
            let mut j = i + 1;
            while j < self.free.len() {
                let b = self.free[j];
                if b.contains(&a) {
                    remove_i = true;
                    break;
                }
                if a.contains(&b) {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn score(fr: &Rect, w: u32, h: u32) -> (u32, u32) {
        let leftover_h = fr.w - w;
        let leftover_v = fr.h - h;
        (leftover_h.min(leftover_v), leftover_h.max(leftover_v))
    }

    /// Best slot of size `w x h`, or `None` when no free rectangle holds it.
    fn find_position(&self, w: u32, h: u32) -> Option<Rect> {
        let mut best: Option<((u32, u32, u32, u32), Rect)> = None;
        for fr in &self.free {
            if fr.w < w || fr.h < h {
                continue;
            }
            if fr.w == w && fr.h == h {
                return Some(Rect::new(fr.x, fr.y, w, h));
            }
            let (short_fit, long_fit) = Self::score(fr, w, h);
            // tie-break: smaller top side, then smaller x
            let key = (short_fit, long_fit, fr.y + h, fr.x);
            if best.is_none_or(|(k, _)| key < k) {
                best = Some((key, Rect::new(fr.x, fr.y, w, h)));
            }
        }
        best.map(|(_, r)| r)
    }
}

impl Packer for MaxRectsPacker {
    fn fits_empty(&self, w: u32, h: u32) -> bool {
        self.slot_size(w, h)
            .is_some_and(|(sw, sh)| sw <= self.bounds.w && sh <= self.bounds.h)
    }

    fn can_pack(&self, w: u32, h: u32) -> bool {
        self.slot_size(w, h)
            .and_then(|(sw, sh)| self.find_position(sw, sh))
            .is_some()
    }

    fn pack(&mut self, w: u32, h: u32) -> Option<Rect> {
        let (sw, sh) = self.slot_size(w, h)?;
        let slot = self.find_position(sw, sh)?;
        self.place_rect(&slot);
        Some(Rect::new(slot.x + self.padding, slot.y + self.padding, w, h))
    }
}

