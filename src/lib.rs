pub mod focus_stack;
pub mod logger;
