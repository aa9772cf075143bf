pub mod json;
#[cfg(feature = "umya")]
pub mod umya;

pub use json::JsonAdapter;
#[cfg(feature = "umya")]
pub use umya::UmyaAdapter;
