//! XML helpers shared by the part serializers.

mod escape;

pub use escape::{escape_xml, push_text_event, unescape_xml};
