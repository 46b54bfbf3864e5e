use super::*;
use proptest::prelude::*;

fn sel(start: usize, end: usize) -> Selection {
    Selection::range(start, end)
}

#[test]
fn insert_before_caret_shifts_it() {
    // length-10 document, caret at 3, two characters inserted at 1
    let moved = transform_insert(&sel(3, 3), 1, 2);
    assert_eq!((moved.start, moved.end), (5, 5));
}

#[test]
fn insert_inside_selection_extends_end() {
    let moved = transform_insert(&sel(2, 6), 4, 3);
    assert_eq!((moved.start, moved.end), (2, 9));
}

#[test]
fn insert_at_or_after_end_is_ignored() {
    assert_eq!(transform_insert(&sel(2, 6), 6, 3), sel(2, 6));
    assert_eq!(transform_insert(&sel(2, 6), 9, 3), sel(2, 6));
    assert_eq!(transform_insert(&sel(4, 4), 4, 3), sel(4, 4));
}

#[test]
fn insert_at_start_of_range_is_ignored() {
    assert_eq!(transform_insert(&sel(2, 6), 2, 3), sel(2, 6));
}

#[test]
fn delete_cases_follow_their_formulas() {
    let s = sel(10, 20);
    let cases = [
        ((2, 5), DeleteOverlap::Before, (7, 17)),
        ((5, 10), DeleteOverlap::Touch(Boundary::Start), (5, 15)),
        ((20, 25), DeleteOverlap::Touch(Boundary::End), (10, 20)),
        ((22, 30), DeleteOverlap::After, (10, 20)),
        ((8, 22), DeleteOverlap::Covers, (8, 8)),
        ((10, 20), DeleteOverlap::Covers, (10, 10)),
        ((5, 15), DeleteOverlap::Head, (5, 10)),
        ((15, 25), DeleteOverlap::Tail, (10, 15)),
        ((12, 16), DeleteOverlap::Within, (10, 16)),
        ((10, 14), DeleteOverlap::Within, (10, 16)),
        ((16, 20), DeleteOverlap::Within, (10, 16)),
        ((7, 7), DeleteOverlap::Empty, (10, 20)),
    ];
    for ((ds, de), overlap, (es, ee)) in cases {
        assert_eq!(classify_delete(&s, ds, de), overlap, "delete [{ds},{de})");
        let moved = transform_delete(&s, ds, de);
        assert_eq!((moved.start, moved.end), (es, ee), "delete [{ds},{de})");
    }
}

#[test]
fn caret_cases() {
    let caret = sel(5, 5);
    assert_eq!(transform_delete(&caret, 4, 5), sel(4, 4));
    assert_eq!(transform_delete(&caret, 5, 6), sel(5, 5));
    assert_eq!(transform_delete(&caret, 3, 8), sel(3, 3));
    assert_eq!(transform_delete(&caret, 0, 2), sel(3, 3));
}

#[test]
fn transform_keeps_bol_and_color() {
    let mut s = sel(4, 8);
    s.bol = true;
    s.color = Some("#ff0000".to_string());
    let moved = transform_delete(&s, 0, 2);
    assert!(moved.bol);
    assert_eq!(moved.color.as_deref(), Some("#ff0000"));
}

fn expected_delete(s: usize, e: usize, ds: usize, de: usize) -> (usize, usize) {
    let len = de - ds;
    let map = |p: usize| {
        if p <= ds {
            p
        } else if p >= de {
            p - len
        } else {
            ds
        }
    };
    (map(s), map(e))
}

proptest! {
    #[test]
    fn delete_matches_pointwise_mapping(
        s in 0usize..40, extra in 0usize..20, ds in 0usize..60, dlen in 0usize..20
    ) {
        let e = s + extra;
        let de = ds + dlen;
        let moved = transform_delete(&sel(s, e), ds, de);
        prop_assert_eq!((moved.start, moved.end), expected_delete(s, e, ds, de));
        prop_assert!(moved.start <= moved.end);
    }

    #[test]
    fn insert_keeps_ordering_and_length_bounds(
        s in 0usize..40, extra in 0usize..20, at in 0usize..60, len in 0usize..10
    ) {
        let e = s + extra;
        let moved = transform_insert(&sel(s, e), at, len);
        prop_assert!(moved.start <= moved.end);
        prop_assert!(moved.end - moved.start <= extra + len);
        if at < s {
            prop_assert_eq!((moved.start, moved.end), (s + len, e + len));
        } else if s < at && at < e {
            prop_assert_eq!((moved.start, moved.end), (s, e + len));
        } else {
            prop_assert_eq!((moved.start, moved.end), (s, e));
        }
    }
}
