
/// CRUD and constraint tests for the measure entity
pub mod measure_tests;
