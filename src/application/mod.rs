pub mod persistence;
pub mod task_store;
pub mod views;
