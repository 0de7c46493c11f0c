pub mod actions;
pub mod autocomplete;
pub mod config;
pub mod confirm;
pub mod connections;
pub mod conversations;
pub mod execution;
pub mod favorites;
pub mod gateway;
pub mod health;
pub mod history;
pub mod insights;
pub mod optimistic;
pub mod results;
pub mod schema;
pub mod settings;
pub mod tabs;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;
