pub mod check;
pub mod lex;
pub mod render;
