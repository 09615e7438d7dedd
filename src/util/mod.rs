//! Small byte helpers shared by the codec.

pub mod bytes;
