pub mod compile;
pub mod landing;
