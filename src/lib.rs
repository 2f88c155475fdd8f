pub mod assembler;
pub mod export;
pub mod gateway;
pub mod logging;
pub mod settings;
pub mod storage;
pub mod web;
