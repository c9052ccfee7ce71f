pub mod multi_function;
pub mod table_builder;
