pub mod grid;
pub mod history;
pub mod layout;
pub mod models;
pub mod task_store;
pub mod time;
pub mod zones;
