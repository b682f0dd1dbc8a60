pub mod image_io;
pub mod recorder;
pub mod ser;
pub mod ser_writer;
