use approx::assert_abs_diff_eq;
use std::collections::HashMap;

use geoyolo::conversion::{corners_to_yolo, yolo_to_corners};
use geoyolo::types::RawRecord;
use geoyolo::{
    AnnotationParser, Capabilities, Capability, Dimension, Error, GridWindower, Rect,
    RemainderPolicy, WindowSpec, Windower,
};

fn records(lines: &[(&str, &str)]) -> Vec<geoyolo::Result<RawRecord>> {
    lines
        .iter()
        .map(|(id, line)| {
            Ok((
                id.to_string(),
                line.split_whitespace().map(str::to_string).collect(),
            ))
        })
        .collect()
}

#[test]
fn test_grouping_keeps_every_record() {
    let input = records(&[
        ("b", "0 0.5 0.5 0.1 0.1"),
        ("a", "1 0.2 0.2 0.1 0.1"),
        ("b", "2 0.7 0.7 0.1 0.1"),
        ("c", "3 0.3 0.3 0.1 0.1"),
        ("a", "4 0.6 0.6 0.1 0.1"),
        ("b", "5 0.9 0.9 0.1 0.1"),
    ]);
    let parser = AnnotationParser::new(input.into_iter(), &Capabilities::detect()).unwrap();
    let tables: Vec<_> = parser.collect::<geoyolo::Result<_>>().unwrap();

    // One table per distinct id, in first-appearance order
    let files: Vec<_> = tables.iter().map(|t| t.file.as_str()).collect();
    assert_eq!(files, ["b", "a", "c"]);

    // No record lost or duplicated, order within a table preserved
    let classes: HashMap<_, Vec<u32>> = tables
        .iter()
        .map(|t| (t.file.as_str(), t.rows.iter().map(|r| r.c).collect()))
        .collect();
    assert_eq!(classes["b"], [0, 2, 5]);
    assert_eq!(classes["a"], [1, 4]);
    assert_eq!(classes["c"], [3]);
    assert_eq!(tables.iter().map(|t| t.len()).sum::<usize>(), 6);
}

#[test]
fn test_parser_reports_bad_record_then_stops() {
    let input = records(&[("a", "0 0.5 0.5 0.1"), ("b", "0 0.5 0.5 0.1 0.1")]);
    let mut parser = AnnotationParser::new(input.into_iter(), &Capabilities::detect()).unwrap();
    assert!(matches!(
        parser.next(),
        Some(Err(Error::InvalidRecord { .. }))
    ));
    assert!(parser.next().is_none());
}

#[test]
fn test_parser_requires_tabular_capability() {
    let caps = Capabilities::detect().without(Capability::Tabular);
    let result = AnnotationParser::new(records(&[]).into_iter(), &caps);
    assert!(matches!(
        result,
        Err(Error::MissingCapability {
            capability: Capability::Tabular,
            ..
        })
    ));
}

#[test]
fn test_yolo_round_trip_inside_image() {
    let cases = [
        (0.5, 0.5, 0.2, 0.2, 1024.0, 1024.0),
        (0.25, 0.75, 0.1, 0.3, 640.0, 480.0),
        (0.05, 0.95, 0.1, 0.1, 333.0, 777.0),
    ];
    for (cx, cy, w, h, width, height) in cases {
        let rect = yolo_to_corners(cx, cy, w, h, width, height);
        let (cx2, cy2, w2, h2) = corners_to_yolo(&rect, width, height);
        assert_abs_diff_eq!(cx, cx2, epsilon = 1e-12);
        assert_abs_diff_eq!(cy, cy2, epsilon = 1e-12);
        assert_abs_diff_eq!(w, w2, epsilon = 1e-12);
        assert_abs_diff_eq!(h, h2, epsilon = 1e-12);
    }
}

#[test]
fn test_yolo_to_corners_uses_both_dimensions() {
    let rect = yolo_to_corners(0.5, 0.5, 0.5, 0.5, 200.0, 100.0);
    assert_eq!(rect, Rect::new(50.0, 25.0, 150.0, 75.0));
}

#[test]
fn test_grid_covers_image_without_gaps() {
    let windower = GridWindower::new(0, RemainderPolicy::Keep);
    let windows = windower
        .windows(1000, 700, &WindowSpec::new(256, 256))
        .unwrap();
    let area: usize = windows.iter().map(|w| w.width * w.height).sum();
    assert_eq!(area, 1000 * 700);

    let dropped = GridWindower::default()
        .windows(1000, 700, &WindowSpec::new(256, 256))
        .unwrap();
    assert_eq!(dropped.len(), 3 * 2);
    assert!(dropped.iter().all(|w| w.width == 256 && w.height == 256));
}

#[test]
fn test_grid_with_overlap_and_row_major_order() {
    let spec = WindowSpec::from_pairs([(Dimension::Y, 4), (Dimension::X, 4)]).unwrap();
    let windows = GridWindower::new(2, RemainderPolicy::Drop)
        .windows(8, 6, &spec)
        .unwrap();
    let offsets: Vec<_> = windows.iter().map(|w| (w.col_off, w.row_off)).collect();
    assert_eq!(offsets, [(0, 0), (2, 0), (4, 0), (0, 2), (2, 2), (4, 2)]);
}

#[test]
fn test_window_spec_rejects_zero_size() {
    assert!(matches!(
        WindowSpec::from_pairs([(Dimension::X, 0)]),
        Err(Error::InvalidWindow(_))
    ));
}
