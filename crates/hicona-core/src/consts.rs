/// Number of header lines preceding the JSON body of a `*.kw.txt` file.
pub const KW_HEADER_LINES: usize = 1;

/// Number of footer lines following the JSON body of a `*.kw.txt` file.
pub const KW_FOOTER_LINES: usize = 2;

/// Empirical correction factor applied to the objective magnification when
/// deriving the effective pixel size from the index XML.
pub const OBJECTIVE_CORRECTION_FACTOR: f64 = 1.87;

/// Grid/Collection stitching regression threshold.
pub const STITCH_REGRESSION_THRESHOLD: f64 = 0.30;

/// Grid/Collection stitching max/avg displacement threshold.
pub const STITCH_MAX_AVG_DISPLACEMENT: f64 = 2.50;

/// Grid/Collection stitching absolute displacement threshold.
pub const STITCH_ABSOLUTE_DISPLACEMENT: f64 = 3.50;

/// ImageJ version line written into the hyperstack ImageDescription tag.
pub const IMAGEJ_VERSION_TAG: &str = "1.54f";

/// Side length (pixels) of the foreground square in a fallback dummy mask.
pub const DUMMY_MASK_SIZE: u32 = 10;

/// Offset (pixels) of the dummy mask foreground square from the origin.
pub const DUMMY_MASK_OFFSET: u32 = 5;

/// Directory name excluded when listing measurements under a source root.
pub const CONFIGDATA_DIR: &str = "_configdata";

/// Subdirectory of a well output directory that receives stitched mosaics.
pub const STITCHED_DIR: &str = "Stitched";

/// Minimum pixel count (h*w) to use per-image Rayon parallelism during
/// 8-bit conversion.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;
