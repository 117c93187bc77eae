pub mod oracle;
pub mod pool;
pub mod position;
pub mod tick;
pub mod tick_bitmap;
