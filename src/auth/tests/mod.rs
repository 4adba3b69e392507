//! Tests for the auth module

mod support;
mod tokens_tests;
