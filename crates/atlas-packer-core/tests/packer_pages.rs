use atlas_packer_core::model::Rect;
use atlas_packer_core::packer::maxrects::MaxRectsPacker;
use atlas_packer_core::packer::{PageSet, Packer};

fn disjoint(rects: &[Rect], pad: u32) -> bool {
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if rects[i].expanded(pad).intersects(&rects[j].expanded(pad)) {
                return false;
            }
        }
    }
    true
}

#[test]
fn maxrects_disjoint_on_small_set() {
    let mut p = MaxRectsPacker::new(256, 256, 0);
    let sizes = [
        (64, 64),
        (32, 64),
        (64, 32),
        (48, 48),
        (16, 80),
        (80, 16),
        (40, 40),
        (30, 50),
        (50, 30),
    ];
    let mut placed = Vec::new();
    for (w, h) in sizes {
        placed.push(p.pack(w, h).expect("fits"));
    }
    assert!(disjoint(&placed, 0));
    assert!(placed.iter().all(|r| r.right() <= 256 && r.bottom() <= 256));
}

#[test]
fn padded_slots_stay_inside_page() {
    let mut p = MaxRectsPacker::new(32, 32, 2);
    let a = p.pack(10, 10).unwrap();
    assert_eq!((a.x, a.y), (2, 2));
    let b = p.pack(10, 10).unwrap();
    assert!(b.x >= a.right() + 4 || b.y >= a.bottom() + 4);
    assert!(!p.can_pack(29, 1));
    assert!(p.fits_empty(28, 28));
    assert!(!p.fits_empty(29, 28));
    assert_eq!(p.used_slots().len(), 2);
}

#[test]
fn exact_fill_without_padding() {
    let mut p = MaxRectsPacker::new(16, 16, 0);
    for _ in 0..4 {
        assert!(p.pack(8, 8).is_some());
    }
    assert!(p.pack(1, 1).is_none());
    assert_eq!(p.free_list_len(), 0);
}

#[test]
fn page_set_opens_pages_in_order() {
    let mut pages = PageSet::new(64, 64, 0);
    let a = pages.place(64, 64).unwrap();
    let b = pages.place(32, 32).unwrap();
    let c = pages.place(32, 32).unwrap();
    assert_eq!(a.page_index, 0);
    assert_eq!(b.page_index, 1);
    assert_eq!(c.page_index, 1);
    assert_eq!(pages.page_count(), 2);
    // small entries still go to the first page with room
    let mut pages = PageSet::new(64, 64, 0);
    pages.place(64, 32).unwrap();
    pages.place(64, 64).unwrap();
    assert_eq!(pages.place(64, 32).unwrap().page_index, 0);
}

#[test]
fn page_set_rejects_oversized_without_opening_pages() {
    let mut pages = PageSet::new(64, 64, 4);
    assert!(!pages.fits(57, 10));
    assert!(pages.place(57, 10).is_none());
    assert_eq!(pages.page_count(), 0);
    assert!(pages.place(56, 56).is_some());
}
