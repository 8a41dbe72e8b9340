pub mod convert;
pub mod download;
pub mod listing;
pub mod page;
