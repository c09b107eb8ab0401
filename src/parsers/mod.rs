pub mod html;
pub mod record;
pub mod text;


pub use html::RenderedDocument;
pub use record::{RecordExtractor, build_source_url, extract_edition_and_title};
