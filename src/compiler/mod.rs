pub mod core;
pub mod validator;
pub mod injector;
pub mod binder;

pub use self::core::Compiler;
