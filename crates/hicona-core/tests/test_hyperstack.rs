use hicona_core::error::HiconaError;
use hicona_core::hyperstack::{Axes, Axis, Hyperstack, PixelData};
use ndarray::{Array2, IxDyn};

fn plane(h: usize, w: usize, value: u16) -> Array2<u16> {
    Array2::from_elem((h, w), value)
}

fn u16_at(stack: &Hyperstack, index: &[usize]) -> u16 {
    match stack.data() {
        PixelData::U16(a) => a[IxDyn(index)],
        PixelData::U8(_) => panic!("expected u16 data"),
    }
}

fn u8_at(stack: &Hyperstack, index: &[usize]) -> u8 {
    match stack.data() {
        PixelData::U8(a) => a[IxDyn(index)],
        PixelData::U16(_) => panic!("expected u8 data"),
    }
}

// ---------------------------------------------------------------------------
// Axes
// ---------------------------------------------------------------------------

#[test]
fn test_axes_label() {
    let axes = Axes::new(vec![Axis::Z, Axis::C, Axis::Y, Axis::X]).unwrap();
    assert_eq!(axes.label(), "ZCYX");
}

#[test]
fn test_axes_must_end_in_yx() {
    assert!(Axes::new(vec![Axis::C, Axis::Y]).is_err());
    assert!(Axes::new(vec![Axis::Y, Axis::X, Axis::C]).is_err());
}

#[test]
fn test_axes_must_be_canonically_ordered() {
    assert!(Axes::new(vec![Axis::C, Axis::Z, Axis::Y, Axis::X]).is_err());
    assert!(Axes::new(vec![Axis::Z, Axis::T, Axis::Y, Axis::X]).is_err());
}

#[test]
fn test_label_length_must_match_dimensionality() {
    let axes = Axes::new(vec![Axis::Z, Axis::C, Axis::Y, Axis::X]).unwrap();
    let data = PixelData::U16(plane(2, 2, 0).into_dyn());
    match Hyperstack::new(data, axes) {
        Err(HiconaError::AxesMismatch { label, ndim }) => {
            assert_eq!(label, "ZCYX");
            assert_eq!(ndim, 2);
        }
        other => panic!("expected AxesMismatch, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// from_planes: plane-major, channel-fastest ordering
// ---------------------------------------------------------------------------

#[test]
fn test_from_planes_orders_z_then_c() {
    // File enumeration order: p01-ch1, p01-ch2, p02-ch1, p02-ch2
    let planes = vec![
        plane(2, 3, 11),
        plane(2, 3, 12),
        plane(2, 3, 21),
        plane(2, 3, 22),
    ];
    let stack = Hyperstack::from_planes(planes, 2, 2).unwrap();
    assert_eq!(stack.axes().label(), "ZCYX");
    assert_eq!(stack.shape(), &[2, 2, 2, 3]);
    assert_eq!(u16_at(&stack, &[0, 0, 0, 0]), 11);
    assert_eq!(u16_at(&stack, &[0, 1, 0, 0]), 12);
    assert_eq!(u16_at(&stack, &[1, 0, 1, 2]), 21);
    assert_eq!(u16_at(&stack, &[1, 1, 1, 2]), 22);
}

#[test]
fn test_single_plane_squeezes_z() {
    let stack = Hyperstack::from_planes(vec![plane(2, 2, 1), plane(2, 2, 2)], 1, 2).unwrap();
    assert_eq!(stack.axes().label(), "CYX");
    assert_eq!(stack.shape(), &[2, 2, 2]);
}

#[test]
fn test_from_planes_count_mismatch() {
    let planes = vec![plane(2, 2, 0); 3];
    match Hyperstack::from_planes(planes, 2, 2) {
        Err(HiconaError::PlaneCountMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 4);
            assert_eq!(actual, 3);
        }
        other => panic!("expected PlaneCountMismatch, got {other:?}"),
    }
}

#[test]
fn test_from_planes_rejects_unequal_tiles() {
    let planes = vec![plane(2, 2, 0), plane(3, 2, 0)];
    assert!(Hyperstack::from_planes(planes, 1, 2).is_err());
}

#[test]
fn test_from_plane_is_yx() {
    let stack = Hyperstack::from_plane(plane(4, 5, 7)).unwrap();
    assert_eq!(stack.axes().label(), "YX");
    assert_eq!(stack.shape(), &[4, 5]);
}

// ---------------------------------------------------------------------------
// Timepoint stacking
// ---------------------------------------------------------------------------

#[test]
fn test_stack_timepoints_prepends_t() {
    let t1 = Hyperstack::from_planes(vec![plane(2, 2, 1), plane(2, 2, 2)], 1, 2).unwrap();
    let t2 = Hyperstack::from_planes(vec![plane(2, 2, 3), plane(2, 2, 4)], 1, 2).unwrap();
    let stacked = Hyperstack::stack_timepoints(vec![t1, t2]).unwrap();
    assert_eq!(stacked.axes().label(), "TCYX");
    assert_eq!(stacked.shape(), &[2, 2, 2, 2]);
    assert_eq!(u16_at(&stacked, &[0, 0, 0, 0]), 1);
    assert_eq!(u16_at(&stacked, &[1, 1, 0, 0]), 4);
}

#[test]
fn test_stack_timepoints_shape_mismatch() {
    let t1 = Hyperstack::from_planes(vec![plane(2, 2, 1)], 1, 1).unwrap();
    let t2 = Hyperstack::from_planes(vec![plane(3, 3, 1)], 1, 1).unwrap();
    assert!(Hyperstack::stack_timepoints(vec![t1, t2]).is_err());
}

#[test]
fn test_stack_timepoints_empty_is_an_error() {
    assert!(Hyperstack::stack_timepoints(Vec::new()).is_err());
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

#[test]
fn test_project_max_collapses_z() {
    let planes = vec![plane(2, 2, 10), plane(2, 2, 30), plane(2, 2, 20)];
    let stack = Hyperstack::from_planes(planes, 3, 1).unwrap();
    let projected = stack.project_max().unwrap();
    assert_eq!(projected.axes().label(), "CYX");
    assert_eq!(projected.shape(), &[1, 2, 2]);
    assert_eq!(u16_at(&projected, &[0, 0, 0]), 30);
}

#[test]
fn test_project_min() {
    let planes = vec![plane(2, 2, 10), plane(2, 2, 30)];
    let stack = Hyperstack::from_planes(planes, 2, 1).unwrap();
    let projected = stack.project_min().unwrap();
    assert_eq!(u16_at(&projected, &[0, 0, 0]), 10);
}

#[test]
fn test_project_without_z_is_an_error() {
    let stack = Hyperstack::from_planes(vec![plane(2, 2, 1)], 1, 1).unwrap();
    match stack.project_max() {
        Err(HiconaError::MissingAxis { axis }) => assert_eq!(axis, 'Z'),
        other => panic!("expected MissingAxis, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// 8-bit conversion: each [Y, X] image scaled by its own maximum
// ---------------------------------------------------------------------------

#[test]
fn test_to_8bit_scales_each_image_independently() {
    let mut dim = plane(2, 2, 0);
    dim[[0, 0]] = 100;
    let mut bright = plane(2, 2, 0);
    bright[[0, 0]] = 40_000;
    bright[[1, 1]] = 20_000;
    let stack = Hyperstack::from_planes(vec![dim, bright], 1, 2).unwrap();

    let converted = stack.to_8bit().unwrap();
    assert_eq!(converted.data().bit_depth(), 8);
    assert_eq!(converted.axes().label(), "CYX");
    // Both maxima land on 255 even though the raw values differ by 400x.
    assert_eq!(u8_at(&converted, &[0, 0, 0]), 255);
    assert_eq!(u8_at(&converted, &[1, 0, 0]), 255);
    // Half the image max maps to half scale.
    assert_eq!(u8_at(&converted, &[1, 1, 1]), 127);
}

#[test]
fn test_to_8bit_zero_image_stays_zero() {
    let stack = Hyperstack::from_planes(vec![plane(3, 3, 0)], 1, 1).unwrap();
    let converted = stack.to_8bit().unwrap();
    assert_eq!(u8_at(&converted, &[0, 1, 1]), 0);
}

#[test]
fn test_to_8bit_is_idempotent() {
    let stack = Hyperstack::from_planes(vec![plane(2, 2, 500)], 1, 1).unwrap();
    let once = stack.to_8bit().unwrap();
    let twice = once.to_8bit().unwrap();
    assert_eq!(once, twice);
}

// ---------------------------------------------------------------------------
// Channel access
// ---------------------------------------------------------------------------

#[test]
fn test_split_channels_yields_yx_planes() {
    let stack = Hyperstack::from_planes(vec![plane(2, 2, 1), plane(2, 2, 2)], 1, 2).unwrap();
    let channels = stack.split_channels().unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0].axes().label(), "YX");
    assert_eq!(u16_at(&channels[0], &[0, 0]), 1);
    assert_eq!(u16_at(&channels[1], &[0, 0]), 2);
}

#[test]
fn test_split_channels_requires_projected_stack() {
    let planes = vec![plane(2, 2, 0); 4];
    let stack = Hyperstack::from_planes(planes, 2, 2).unwrap();
    assert!(stack.split_channels().is_err());
}

#[test]
fn test_channel_substack_extracts_zyx() {
    let planes = vec![
        plane(2, 2, 11),
        plane(2, 2, 12),
        plane(2, 2, 21),
        plane(2, 2, 22),
    ];
    let stack = Hyperstack::from_planes(planes, 2, 2).unwrap();
    let sub = stack.channel_substack(1).unwrap();
    assert_eq!(sub.shape(), &[2, 2, 2]);
    assert_eq!(sub[IxDyn(&[0, 0, 0])], 12);
    assert_eq!(sub[IxDyn(&[1, 0, 0])], 22);
}

#[test]
fn test_channel_substack_out_of_range() {
    let stack = Hyperstack::from_planes(vec![plane(2, 2, 0)], 1, 1).unwrap();
    assert!(stack.channel_substack(3).is_err());
}

#[test]
fn test_axis_len() {
    let planes = vec![plane(4, 5, 0); 6];
    let stack = Hyperstack::from_planes(planes, 3, 2).unwrap();
    assert_eq!(stack.axis_len(Axis::Z), Some(3));
    assert_eq!(stack.axis_len(Axis::C), Some(2));
    assert_eq!(stack.axis_len(Axis::Y), Some(4));
    assert_eq!(stack.axis_len(Axis::X), Some(5));
    assert_eq!(stack.axis_len(Axis::T), None);
}
