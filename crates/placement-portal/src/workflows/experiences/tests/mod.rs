mod common;

mod queries;
