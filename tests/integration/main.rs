//! Integration tests against an in-process fake of the library API

mod api_tests;
mod scenario_tests;
mod support;
