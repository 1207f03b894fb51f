pub mod setup_test;

mod executor_test;
