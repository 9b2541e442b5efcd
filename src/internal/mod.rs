pub mod accumulator;
pub mod cache;
pub mod categories;
pub mod chapter_session;
pub mod engine;
pub mod favorites;
pub mod keybindings;
pub mod models;
pub mod notification;
pub mod scroll_trigger;
pub mod search;
