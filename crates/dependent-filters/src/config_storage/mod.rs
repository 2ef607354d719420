//! Config storage for gather views.

mod yaml;

pub use yaml::{
    LoadedViews, load_view, load_views, read_view_file, save_view, validate_view,
    validate_view_id, view_filename,
};
