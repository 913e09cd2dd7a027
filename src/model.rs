pub mod cloudinary;
pub mod fs;
