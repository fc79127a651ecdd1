pub mod buffer;
pub mod workers;

pub use buffer::PrefetchBuffer;
