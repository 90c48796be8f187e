//! The cat breed catalog: records, endpoint fetchers and their queries.

pub mod fetch;
pub mod model;
pub mod queries;

pub use fetch::{BreedApi, DEFAULT_GALLERY_LIMIT, PAGE_SIZE};
pub use model::{Breed, BreedPage, Image, Pagination, ReferenceImage};
pub use queries::{
    GALLERY_PREVIEW, ReferenceGate, breed_images_query, breed_query, breeds_query,
    reference_image_query,
};
