mod common;
mod rules;
mod tiering;
