pub mod define_domain;
pub mod info;

pub use define_domain::define_domain;
pub use info::info;
