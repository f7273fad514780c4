mod plugin;
mod snippet_tag;
mod templatize;

pub use plugin::*;
pub use snippet_tag::*;
pub use templatize::*;
