mod common;
mod surface;
