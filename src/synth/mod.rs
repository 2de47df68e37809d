pub mod audio;
pub mod script;
