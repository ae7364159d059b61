//! different utility modules used throughout the project
/// tiny module to save solution into file
pub mod logger;
/// logger initialization and summary tables
pub mod logging;
/// tiny module to plot solutions
pub mod plots;
/// typed run configuration from a task document
pub mod task_config;
/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" into HashMap
pub mod task_parser;
