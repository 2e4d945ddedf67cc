pub mod script;

pub use script::{Command, ScriptError, ScriptLine, parse_duration, parse_script};
