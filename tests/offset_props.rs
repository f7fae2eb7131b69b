use proptest::prelude::*;
use sketch_import::{ElementRect, Offset, PointerPosition, offset_within};

fn rect(left: i32, top: i32) -> ElementRect {
    ElementRect::new(f64::from(left), f64::from(top), 320.0, 240.0)
}

proptest! {
    #[test]
    fn pointer_at_corner_is_origin(left in -10_000i32..10_000, top in -10_000i32..10_000) {
        let reference = rect(left, top);
        let pointer = PointerPosition::new(f64::from(left), f64::from(top));

        prop_assert_eq!(offset_within(pointer, &reference), Offset::new(0.0, 0.0));
    }

    #[test]
    fn scrolling_does_not_change_offset(
        px in -10_000i32..10_000,
        py in -10_000i32..10_000,
        left in -10_000i32..10_000,
        top in -10_000i32..10_000,
        dx in -5_000i32..5_000,
        dy in -5_000i32..5_000,
    ) {
        let before = offset_within(
            PointerPosition::new(f64::from(px), f64::from(py)),
            &rect(left, top),
        );
        let after = offset_within(
            PointerPosition::new(f64::from(px + dx), f64::from(py + dy)),
            &rect(left + dx, top + dy),
        );

        prop_assert_eq!(before, after);
    }

    #[test]
    fn placement_keeps_grab_point_under_pointer(
        grab_x in 0i32..500,
        grab_y in 0i32..500,
        px in -2_000i32..2_000,
        py in -2_000i32..2_000,
        left in -2_000i32..2_000,
        top in -2_000i32..2_000,
    ) {
        let grab = Offset::new(f64::from(grab_x), f64::from(grab_y));
        let target = rect(left, top);
        let placed = offset_within(PointerPosition::new(f64::from(px), f64::from(py)), &target) - grab;

        // 图片左上角 + 抓取偏移 = 放下时的指针位置
        prop_assert_eq!(target.left + placed.x + grab.x, f64::from(px));
        prop_assert_eq!(target.top + placed.y + grab.y, f64::from(py));
    }
}
