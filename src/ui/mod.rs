pub mod app;
pub mod history;
pub mod overlay;
pub mod projector;
pub mod ui_types;
pub mod wizard;

pub use self::ui_types::*;
