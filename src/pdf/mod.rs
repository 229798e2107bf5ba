pub mod image_xobject;
pub mod reader;
pub mod workflow;
