// ABOUTME: Test helper module organization
// ABOUTME: Exposes the axum request helper to integration tests

pub mod axum_test;
