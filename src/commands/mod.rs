pub mod help;
pub mod run;
