#![cfg(feature = "image")]

use approx::assert_abs_diff_eq;
use ndarray::Array3;
use std::fs;
use std::path::Path;

use geoyolo::types::RawRecord;
use geoyolo::{
    label_ids, load_rasters, read_label_dir, start_pipe, AnnotationParser, Capabilities,
    ChipOrigin, GeoTransform, PersistConfig, PipeExt, Raster, Result, WindowSpec,
};

fn record(id: &str, line: &str) -> RawRecord {
    (
        id.to_string(),
        line.split_whitespace().map(str::to_string).collect(),
    )
}

fn scene(name: &str, transform: GeoTransform) -> Raster<u8> {
    Raster::new(Array3::zeros((3, 1024, 1024)), transform).with_name(name)
}

fn read_labels(path: &Path) -> Vec<(u32, [f64; 4])> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let fields: Vec<&str> = line.split(' ').collect();
            assert_eq!(fields.len(), 5, "bad label line {:?}", line);
            let mut values = [0.0; 4];
            for (value, field) in values.iter_mut().zip(&fields[1..]) {
                *value = field.parse().unwrap();
            }
            (fields[0].parse().unwrap(), values)
        })
        .collect()
}

/// Run the four stages over in-memory inputs and return the origin of every
/// written chip, in sequence order.
fn chip_to(
    records: Vec<RawRecord>,
    rasters: Vec<Raster<u8>>,
    config: PersistConfig,
) -> Vec<ChipOrigin> {
    start_pipe(records)
        .parse_yolo()
        .unwrap()
        .yolobox_to_geo(start_pipe(rasters))
        .unwrap()
        .chip_image_and_label(WindowSpec::new(512, 512))
        .unwrap()
        .save_image_and_label(config)
        .unwrap()
        .map(|item| item.map(|(chip, _)| chip.origin.unwrap()))
        .collect::<Result<_>>()
        .unwrap()
}

fn assert_quartered_box(out: &Path, origins: &[ChipOrigin]) {
    assert_eq!(origins.len(), 4);
    for (seq, origin) in origins.iter().enumerate() {
        let image = out.join(format!("images/{:07}.png", seq));
        assert!(image.is_file(), "missing {}", image.display());
        assert_eq!(image::image_dimensions(&image).unwrap(), (512, 512));

        let labels = read_labels(&out.join(format!("labels/{:07}.txt", seq)));
        assert_eq!(labels.len(), 1);
        let (class_id, [cx, cy, w, h]) = labels[0];
        assert_eq!(class_id, 3);

        // The 409.6..614.4 box straddles the 512 boundary in both axes.
        let expected_cx = if origin.col_off == 0 { 0.9 } else { 0.1 };
        let expected_cy = if origin.row_off == 0 { 0.9 } else { 0.1 };
        assert_abs_diff_eq!(cx, expected_cx, epsilon = 1e-9);
        assert_abs_diff_eq!(cy, expected_cy, epsilon = 1e-9);
        assert_abs_diff_eq!(w, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(h, 0.2, epsilon = 1e-9);
    }
}

#[test]
fn test_centered_box_is_split_across_four_chips() {
    let temp_dir = tempfile::tempdir().unwrap();
    let out = temp_dir.path();

    let origins = chip_to(
        vec![record("scene", "3 0.5 0.5 0.2 0.2")],
        vec![scene("scene", GeoTransform::identity())],
        PersistConfig::new(out),
    );

    let offsets: Vec<_> = origins.iter().map(|o| (o.col_off, o.row_off)).collect();
    assert_eq!(offsets, [(0, 0), (0, 512), (512, 0), (512, 512)]);
    assert_quartered_box(out, &origins);
}

#[test]
fn test_georeferenced_raster_gives_same_labels() {
    let temp_dir = tempfile::tempdir().unwrap();
    let out = temp_dir.path();

    let north_up = GeoTransform::new(0.5, 350_000.0, -0.5, 5_600_000.0);
    let origins = chip_to(
        vec![record("scene", "3 0.5 0.5 0.2 0.2")],
        vec![scene("scene", north_up)],
        PersistConfig::new(out).manifest(true),
    );

    assert_quartered_box(out, &origins);
    assert_abs_diff_eq!(origins[3].x_off, 350_256.0, epsilon = 1e-9);
    assert_abs_diff_eq!(origins[3].y_off, 5_599_744.0, epsilon = 1e-9);

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest.as_array().unwrap().len(), 4);
}

#[test]
fn test_skipped_chips_leave_no_gaps() {
    let temp_dir = tempfile::tempdir().unwrap();
    let out = temp_dir.path();

    // One box in the top-left chip of the first scene, one in the
    // bottom-right chip of the second.
    let origins = chip_to(
        vec![
            record("first", "0 0.1 0.1 0.05 0.05"),
            record("second", "1 0.9 0.9 0.05 0.05"),
        ],
        vec![
            scene("first", GeoTransform::identity()),
            scene("second", GeoTransform::identity()),
        ],
        PersistConfig::new(out),
    );

    assert_eq!(origins.len(), 2);
    assert_eq!((origins[0].source_index, origins[0].window_index), (0, 0));
    assert_eq!((origins[1].source_index, origins[1].window_index), (1, 3));

    let mut labels: Vec<_> = fs::read_dir(out.join("labels"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    labels.sort();
    assert_eq!(labels, ["0000000.txt", "0000001.txt"]);
    assert_eq!(read_labels(&out.join("labels/0000001.txt"))[0].0, 1);
}

#[test]
fn test_keep_empty_writes_every_chip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let out = temp_dir.path();

    let origins = chip_to(
        vec![record("first", "0 0.1 0.1 0.05 0.05")],
        vec![scene("first", GeoTransform::identity())],
        PersistConfig::new(out).skip_empty(false),
    );

    assert_eq!(origins.len(), 4);
    let empty = fs::read_to_string(out.join("labels/0000003.txt")).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_chipping_from_directories() {
    let temp_dir = tempfile::tempdir().unwrap();
    let labels_dir = temp_dir.path().join("labels_in");
    let images_dir = temp_dir.path().join("images_in");
    let out = temp_dir.path().join("out");
    fs::create_dir_all(&labels_dir).unwrap();
    fs::create_dir_all(&images_dir).unwrap();

    fs::write(labels_dir.join("tile.txt"), "2 0.25 0.25 0.25 0.25\n").unwrap();
    image::RgbImage::new(64, 32)
        .save(images_dir.join("tile.png"))
        .unwrap();

    let records = read_label_dir(&labels_dir).unwrap();
    let saved: Vec<_> = start_pipe(records)
        .parse_yolo()
        .unwrap()
        .yolobox_to_geo(load_rasters(&images_dir, vec!["tile".to_string()]))
        .unwrap()
        .chip_image_and_label(WindowSpec::new(32, 32))
        .unwrap()
        .save_image_and_label(PersistConfig::new(&out))
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    // The box spans pixels 8..24 horizontally and 4..12 vertically.
    assert_eq!(saved.len(), 1);
    let (class_id, [cx, cy, w, h]) = read_labels(&out.join("labels/0000000.txt"))[0];
    assert_eq!(class_id, 2);
    assert_abs_diff_eq!(cx, 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(cy, 0.25, epsilon = 1e-9);
    assert_abs_diff_eq!(w, 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(h, 0.25, epsilon = 1e-9);
}

#[test]
fn test_empty_label_file_is_chipped_with_keep_empty() {
    let temp_dir = tempfile::tempdir().unwrap();
    let labels_dir = temp_dir.path().join("labels_in");
    let images_dir = temp_dir.path().join("images_in");
    let out = temp_dir.path().join("out");
    fs::create_dir_all(&labels_dir).unwrap();
    fs::create_dir_all(&images_dir).unwrap();

    fs::write(labels_dir.join("background.txt"), "").unwrap();
    fs::write(labels_dir.join("tile.txt"), "2 0.25 0.25 0.25 0.25\n").unwrap();
    for name in ["background", "tile"] {
        image::RgbImage::new(32, 32)
            .save(images_dir.join(format!("{}.png", name)))
            .unwrap();
    }

    let image_ids = label_ids(&labels_dir).unwrap();
    let records = read_label_dir(&labels_dir).unwrap();
    let tables = AnnotationParser::new(start_pipe(records), &Capabilities::detect())
        .unwrap()
        .with_image_ids(image_ids.clone());
    let origins: Vec<ChipOrigin> = tables
        .yolobox_to_geo(load_rasters(&images_dir, image_ids))
        .unwrap()
        .chip_image_and_label(WindowSpec::new(32, 32))
        .unwrap()
        .save_image_and_label(PersistConfig::new(&out).skip_empty(false))
        .unwrap()
        .map(|item| item.map(|(chip, _)| chip.origin.unwrap()))
        .collect::<Result<_>>()
        .unwrap();

    let sources: Vec<_> = origins.iter().map(|o| o.source_index).collect();
    assert_eq!(sources, [0, 1]);
    assert!(fs::read_to_string(out.join("labels/0000000.txt"))
        .unwrap()
        .is_empty());
    assert_eq!(read_labels(&out.join("labels/0000001.txt"))[0].0, 2);
}
