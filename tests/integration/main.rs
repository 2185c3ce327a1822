//! Integration tests for the miner
//!
//! These tests use wiremock to stand in for the hosting service and run
//! complete mining cycles against temporary save directories.

mod mine_tests;
