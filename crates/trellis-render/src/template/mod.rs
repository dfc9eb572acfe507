//! Template loading, compilation and layout composition.
//!
//! - [`loader`]: walks the root directory and names template files
//! - [`store`]: compiles files into a [`Namespace`] and caches it
//! - [`layout`]: renders a view inside a layout with per-render placeholders

pub mod layout;
pub mod loader;
pub mod store;

pub use layout::{LayoutRenderer, SECTION_SEPARATOR};
pub use loader::{normalize_name, walk_template_dir, TemplateFile};
pub use store::{Namespace, TemplateStore};
