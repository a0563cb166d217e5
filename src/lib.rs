pub mod annotation_store;
pub mod controller;
pub mod highlights;
pub mod notes;
pub mod offset_mapper;
pub mod overlay;
pub mod panic_handler;
pub mod reader;
pub mod segments;
pub mod session;
pub mod settings;
pub mod surface;
pub mod theme;
pub mod tokenizer;
pub mod tutor;
pub mod tutor_worker;
pub mod word_panel;

pub use controller::{SelectionController, SelectionState};
pub use reader::Reader;
