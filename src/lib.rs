pub mod catalog;
pub mod commands;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod manager;
pub mod paths;
pub mod profiles;
pub mod settings;
pub mod sync;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
