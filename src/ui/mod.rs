pub mod components;
pub mod drafts;
pub mod editor;
