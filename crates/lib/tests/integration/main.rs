mod common;
mod incremental_tests;
mod pipeline_tests;
