pub mod support;

mod db_tests;
