mod config;
mod document;
mod error;
mod exchange;
mod protocol;
