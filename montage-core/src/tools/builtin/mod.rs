pub mod document;

pub use document::DocumentEntryTool;
