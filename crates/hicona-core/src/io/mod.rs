pub mod tiff;

pub use self::tiff::{
    build_image_description, load_pages, load_plane, read_image_description, save_hyperstack,
    save_plane, save_substack,
};
