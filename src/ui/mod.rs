pub mod repl;
pub mod typewriter;
