pub mod locks;
pub mod maintenance;
