mod common;
mod wallet;
