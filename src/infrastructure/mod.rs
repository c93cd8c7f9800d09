pub mod config;
pub mod error;
pub mod ics_export;
pub mod pet_bridge;
pub mod state_repository;
pub mod storage;
