pub mod app;
pub mod assembler;
pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod domain;
pub mod ebi;
pub mod error;
pub mod glygen;
pub mod go;
pub mod http;
pub mod output;
pub mod ranges;
pub mod record;
pub mod reducing_end;
pub mod retry;
pub mod scheduler;
pub mod sites;
pub mod table;
