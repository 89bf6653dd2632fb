pub mod filter;
pub mod folder;
pub mod item;
pub mod today;
