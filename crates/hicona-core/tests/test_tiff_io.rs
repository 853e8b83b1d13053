mod common;

use hicona_core::hyperstack::Hyperstack;
use hicona_core::io::{
    build_image_description, load_pages, load_plane, read_image_description, save_hyperstack,
    save_plane, save_substack,
};
use ndarray::{Array2, Array3, IxDyn};
use tempfile::TempDir;

fn plane(h: usize, w: usize, value: u16) -> Array2<u16> {
    Array2::from_elem((h, w), value)
}

// ---------------------------------------------------------------------------
// ImageDescription tag
// ---------------------------------------------------------------------------

#[test]
fn test_build_image_description_full() {
    let desc = build_image_description(12, Some(2), Some(3), Some(2));
    assert_eq!(
        desc,
        "ImageJ=1.54f\nimages=12\nchannels=2\nslices=3\nframes=2\nhyperstack=true\nmode=grayscale"
    );
}

#[test]
fn test_build_image_description_omits_absent_axes() {
    let desc = build_image_description(2, Some(2), None, None);
    assert!(desc.contains("channels=2"));
    assert!(!desc.contains("slices"));
    assert!(!desc.contains("frames"));
}

// ---------------------------------------------------------------------------
// Hyperstack round trips
// ---------------------------------------------------------------------------

#[test]
fn test_save_and_reload_zcyx_stack() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stack.tiff");

    // p01-ch1, p01-ch2, p02-ch1, p02-ch2
    let planes = vec![
        plane(3, 4, 11),
        plane(3, 4, 12),
        plane(3, 4, 21),
        plane(3, 4, 22),
    ];
    let stack = Hyperstack::from_planes(planes, 2, 2).unwrap();
    save_hyperstack(&path, &stack).unwrap();

    // Pages come back channel-fastest, matching the in-memory layout.
    let pages = load_pages(&path).unwrap();
    assert_eq!(pages.len(), 4);
    assert_eq!(pages[0][[0, 0]], 11);
    assert_eq!(pages[1][[0, 0]], 12);
    assert_eq!(pages[2][[0, 0]], 21);
    assert_eq!(pages[3][[2, 3]], 22);

    let desc = read_image_description(&path).unwrap().unwrap();
    assert!(desc.contains("images=4"));
    assert!(desc.contains("channels=2"));
    assert!(desc.contains("slices=2"));
    assert!(!desc.contains("frames"));
    assert!(desc.contains("hyperstack=true"));
}

#[test]
fn test_save_8bit_stack_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stack8.tiff");

    let stack = Hyperstack::from_planes(vec![plane(2, 2, 200)], 1, 1)
        .unwrap()
        .to_8bit()
        .unwrap();
    save_hyperstack(&path, &stack).unwrap();

    // 8-bit pages widen to u16 on load.
    let pages = load_pages(&path).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0][[0, 0]], 255);
}

#[test]
fn test_save_plane_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tile.tif");

    let mut p = plane(5, 7, 0);
    p[[2, 3]] = 4321;
    save_plane(&path, &Hyperstack::from_plane(p).unwrap()).unwrap();

    let loaded = load_plane(&path).unwrap();
    assert_eq!(loaded.dim(), (5, 7));
    assert_eq!(loaded[[2, 3]], 4321);
    assert_eq!(loaded[[0, 0]], 0);
}

#[test]
fn test_load_plane_reads_first_page_only() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("multi.tiff");

    let stack = Hyperstack::from_planes(vec![plane(2, 2, 1), plane(2, 2, 2)], 1, 2).unwrap();
    save_hyperstack(&path, &stack).unwrap();

    let first = load_plane(&path).unwrap();
    assert_eq!(first[[0, 0]], 1);
}

#[test]
fn test_save_substack_pages_in_z_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("substack.tiff");

    let mut sub = Array3::<u16>::zeros((3, 2, 2)).into_dyn();
    sub[IxDyn(&[0, 0, 0])] = 1;
    sub[IxDyn(&[1, 0, 0])] = 2;
    sub[IxDyn(&[2, 0, 0])] = 3;
    save_substack(&path, &sub).unwrap();

    let pages = load_pages(&path).unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0][[0, 0]], 1);
    assert_eq!(pages[2][[0, 0]], 3);

    let desc = read_image_description(&path).unwrap().unwrap();
    assert!(desc.contains("slices=3"));
}

#[test]
fn test_load_plane_widens_u8_samples() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mask.tif");
    let mask = image::GrayImage::from_pixel(4, 4, image::Luma([9u8]));
    mask.save(&path).unwrap();

    let loaded = load_plane(&path).unwrap();
    assert_eq!(loaded[[0, 0]], 9);
}

#[test]
fn test_load_plane_reads_externally_written_u16() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tile.tiff");
    common::write_tile(&path, 6, 4, 1234);

    let loaded = load_plane(&path).unwrap();
    assert_eq!(loaded.dim(), (4, 6));
    assert_eq!(loaded[[3, 5]], 1234);
}
