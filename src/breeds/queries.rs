//! Cache keys and [`Query`] builders for the breed endpoints.
//!
//! The builders encode the dependencies between queries: the reference image
//! needs the breed detail (for its `reference_image_id`) and the gallery needs
//! the reference image (to leave it out). A query whose input is not known yet
//! is built disabled, and is rebuilt enabled once the input arrives.

use std::sync::Arc;

use futures::FutureExt;

use crate::subscription::query::{Query, QueryClient, QueryError, QueryKey, QueryState, StaleTime};

use super::fetch::{BreedApi, without_image};
use super::model::{Breed, BreedPage, Image, ReferenceImage};

/// Gallery pictures shown on the detail view.
pub const GALLERY_PREVIEW: usize = 4;

#[must_use]
pub fn breeds_key(page: u32) -> QueryKey {
    QueryKey::new("breeds").with(page)
}

#[must_use]
pub fn breed_key(breed_id: &str) -> QueryKey {
    QueryKey::new("breed").with(breed_id)
}

#[must_use]
pub fn breed_images_key(breed_id: &str, limit: u32) -> QueryKey {
    QueryKey::new("breedImages").with(breed_id).with(limit)
}

#[must_use]
pub fn reference_image_key(breed_id: &str) -> QueryKey {
    QueryKey::new("breedRefImg").with(breed_id)
}

/// Writes every breed of `page` into the detail and reference-image slots,
/// so opening one of them needs no request.
pub fn seed_breed_page(client: &QueryClient, page: &BreedPage) {
    for breed in &page.breeds {
        client.set_query_data(breed_key(&breed.id), Some(breed.clone()));
        if let Some(image) = &breed.image {
            client.set_query_data(
                reference_image_key(&breed.id),
                ReferenceImage::new(image.clone(), Some(breed.name.clone())),
            );
        }
    }
}

/// One catalog page. A successful fetch seeds the page's breeds.
#[must_use]
pub fn breeds_query(api: &BreedApi, client: &Arc<QueryClient>, page: u32) -> Query<BreedPage> {
    let api = api.clone();
    let seed = Arc::clone(client);
    Query::new(
        breeds_key(page),
        move || fetch_page(api.clone(), Arc::clone(&seed), page).boxed(),
        Arc::clone(client),
    )
}

async fn fetch_page(
    api: BreedApi,
    client: Arc<QueryClient>,
    page: u32,
) -> Result<BreedPage, QueryError> {
    let breeds = api.breeds(page).await?;
    seed_breed_page(&client, &breeds);
    Ok(breeds)
}

/// Breed detail. Usually answered from the slot seeded by the list.
#[must_use]
pub fn breed_query(api: &BreedApi, client: &Arc<QueryClient>, breed_id: &str) -> Query<Option<Breed>> {
    let api = api.clone();
    let id = breed_id.to_owned();
    Query::new(
        breed_key(breed_id),
        move || fetch_breed(api.clone(), id.clone()).boxed(),
        Arc::clone(client),
    )
}

async fn fetch_breed(api: BreedApi, breed_id: String) -> Result<Option<Breed>, QueryError> {
    Ok(api.breed(&breed_id).await?)
}

/// The breed's canonical picture. Enabled only once `breed` is known and
/// names a reference image; never refetched once cached.
#[must_use]
pub fn reference_image_query(
    api: &BreedApi,
    client: &Arc<QueryClient>,
    breed_id: &str,
    breed: Option<&Breed>,
) -> Query<ReferenceImage> {
    let key = reference_image_key(breed_id);
    let image_id = breed.and_then(|breed| breed.reference_image_id.clone());

    let query = match image_id {
        Some(image_id) => {
            let api = api.clone();
            Query::new(
                key,
                move || fetch_reference_image(api.clone(), image_id.clone()).boxed(),
                Arc::clone(client),
            )
        }
        None => Query::disabled(key, Arc::clone(client)),
    };
    query.stale_time(StaleTime::Never)
}

async fn fetch_reference_image(api: BreedApi, image_id: String) -> Result<ReferenceImage, QueryError> {
    Ok(api.reference_image(&image_id).await?)
}

/// Whether the gallery knows which picture to leave out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReferenceGate {
    /// The breed or its reference image is still loading.
    #[default]
    Pending,
    /// Settled, with the id to exclude if there is one.
    Settled(Option<String>),
}

impl ReferenceGate {
    /// Derives the gate from the breed detail and reference image states.
    ///
    /// A failed reference lookup still settles the gate, falling back to the
    /// breed's `reference_image_id`.
    #[must_use]
    pub fn new(breed: &QueryState<Option<Breed>>, reference: &QueryState<ReferenceImage>) -> Self {
        if let Some(image) = reference.data() {
            return Self::Settled(Some(image.id.clone()));
        }
        match breed.data() {
            Some(None) => Self::Settled(None),
            Some(Some(breed)) => match (&breed.reference_image_id, reference) {
                (None, _) => Self::Settled(None),
                (Some(id), QueryState::Error(_)) => Self::Settled(Some(id.clone())),
                (Some(_), _) => Self::Pending,
            },
            None => Self::Pending,
        }
    }

    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Settled(_))
    }

    /// Id of the picture the gallery must not show.
    #[must_use]
    pub fn exclude(&self) -> Option<&str> {
        match self {
            Self::Settled(Some(id)) => Some(id),
            _ => None,
        }
    }
}

/// Up to `limit` pictures of the breed, minus its reference image. Disabled
/// until `gate` is settled.
#[must_use]
pub fn breed_images_query(
    api: &BreedApi,
    client: &Arc<QueryClient>,
    breed_id: &str,
    limit: u32,
    gate: &ReferenceGate,
) -> Query<Vec<Image>> {
    let key = breed_images_key(breed_id, limit);
    let ReferenceGate::Settled(exclude) = gate else {
        return Query::disabled(key, Arc::clone(client));
    };

    let api = api.clone();
    let id = breed_id.to_owned();
    let exclude = exclude.clone();
    Query::new(
        key,
        move || fetch_gallery(api.clone(), id.clone(), limit, exclude.clone()).boxed(),
        Arc::clone(client),
    )
}

async fn fetch_gallery(
    api: BreedApi,
    breed_id: String,
    limit: u32,
    exclude: Option<String>,
) -> Result<Vec<Image>, QueryError> {
    let images = api.breed_images(&breed_id, limit).await?;
    Ok(without_image(images, exclude.as_deref()))
}

/// The part of a gallery the detail view shows.
#[must_use]
pub fn preview(images: &[Image]) -> &[Image] {
    &images[..images.len().min(GALLERY_PREVIEW)]
}
