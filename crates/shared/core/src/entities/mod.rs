mod depth_entry;

pub use depth_entry::DepthEntry;
