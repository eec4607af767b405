pub mod allergen_validator;
pub mod api_connection;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod ocr;
pub mod pantry_import;
pub mod pantry_merger;
pub mod prompt_builder;
pub mod receipt_extractor;
pub mod recipe_generator;
pub mod response_parser;
pub mod server;
pub mod storage;
