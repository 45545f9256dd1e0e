pub mod messenger;
pub mod test_setup;
