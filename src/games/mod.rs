pub mod rails;
