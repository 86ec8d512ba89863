pub mod field_type;
pub mod value;
