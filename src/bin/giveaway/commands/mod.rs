pub mod draw;
pub mod history;
