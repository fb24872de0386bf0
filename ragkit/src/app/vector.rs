/// Vector store persisted as JSON files on the local file system.
pub mod fs;
