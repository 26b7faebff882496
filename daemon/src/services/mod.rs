mod callbacks;
mod info;

pub use callbacks::CallbacksService;
pub use info::InfoService;
