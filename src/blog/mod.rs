pub mod pagination;
pub mod validation;

pub use pagination::{parse_page_param, Navigation, Page, PageMeta, PageWindow};
pub use validation::{map_messages_to_fields, FieldError, ValidationErrors};
