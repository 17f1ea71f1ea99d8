pub mod batch;
pub mod config;
pub mod error;
pub mod events;
pub mod item;
pub mod scan;
pub mod tasks {
    pub mod console;
    pub mod files;
    pub mod player;
    pub mod surface;
}
