pub mod bootstrap;
pub mod pool;

pub use pool::create_pool;
