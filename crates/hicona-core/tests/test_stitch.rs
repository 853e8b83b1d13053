use hicona_core::hyperstack::Hyperstack;
use hicona_core::io::{load_pages, read_image_description, save_plane};
use hicona_core::plate::WellId;
use hicona_core::stitch::{merge_mosaics, reference_macro, registered_macro};
use ndarray::Array2;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Macro text
// ---------------------------------------------------------------------------

#[test]
fn test_reference_macro_computes_overlap_from_layout() {
    let text = reference_macro(WellId::new(4, 5));
    assert!(text.contains("#@ String orgDir"));
    assert!(text.contains("layout_file=TileConfiguration_r04c05.txt"));
    assert!(text.contains("compute_overlap"));
    assert!(text.contains("regression_threshold=0.30"));
    assert!(text.contains("max/avg_displacement_threshold=2.50"));
    assert!(text.contains("absolute_displacement_threshold=3.50"));
    assert!(text.contains("saveAs(\"Tiff\", saveDir + File.separator + mosaicName);"));
}

#[test]
fn test_registered_macro_reuses_registered_layout() {
    let text = registered_macro(WellId::new(4, 5));
    assert!(text.contains("layout_file=TileConfiguration_r04c05.registered.txt"));
    assert!(text.contains("subpixel_accuracy"));
    assert!(!text.contains("compute_overlap"));
}

// ---------------------------------------------------------------------------
// Native mosaic merge
// ---------------------------------------------------------------------------

#[test]
fn test_merge_mosaics_crops_to_common_extent() {
    let dir = TempDir::new().unwrap();
    let well = WellId::new(1, 1);

    // Registered mosaics drift by a few pixels per channel.
    let ch1 = Array2::<u16>::from_elem((10, 12), 100);
    let ch2 = Array2::<u16>::from_elem((9, 13), 200);
    save_plane(
        &dir.path().join("r01c01_ch1.tif"),
        &Hyperstack::from_plane(ch1).unwrap(),
    )
    .unwrap();
    save_plane(
        &dir.path().join("r01c01_ch2.tif"),
        &Hyperstack::from_plane(ch2).unwrap(),
    )
    .unwrap();

    merge_mosaics(dir.path(), well, &[1, 2]).unwrap();

    let merged = dir.path().join("r01c01.tif");
    let pages = load_pages(&merged).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].dim(), (9, 12));
    assert_eq!(pages[1].dim(), (9, 12));
    assert_eq!(pages[0][[0, 0]], 100);
    assert_eq!(pages[1][[8, 11]], 200);

    let desc = read_image_description(&merged).unwrap().unwrap();
    assert!(desc.contains("channels=2"));
}

#[test]
fn test_merge_mosaics_missing_channel_is_an_error() {
    let dir = TempDir::new().unwrap();
    let well = WellId::new(1, 1);
    save_plane(
        &dir.path().join("r01c01_ch1.tif"),
        &Hyperstack::from_plane(Array2::<u16>::zeros((4, 4))).unwrap(),
    )
    .unwrap();
    assert!(merge_mosaics(dir.path(), well, &[1, 2]).is_err());
}
