pub mod query;

#[doc(hidden)]
pub mod __private {
    pub use model::core::value::Value;
}
