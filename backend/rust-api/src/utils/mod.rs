pub mod time;
pub mod title;
