pub mod bootstrap;
pub mod generate;
pub mod repl;
