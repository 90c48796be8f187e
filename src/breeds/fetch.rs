use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::api::{ApiError, ApiResponse, Transport};

use super::model::{Breed, BreedPage, Image, Pagination, ReferenceImage};

/// Breeds per catalog page.
pub const PAGE_SIZE: u32 = 7;

/// Gallery size when none is configured.
pub const DEFAULT_GALLERY_LIMIT: u32 = 10;

const COUNT_HEADER: &str = "pagination-count";
const PAGE_HEADER: &str = "pagination-page";
const LIMIT_HEADER: &str = "pagination-limit";

/// Typed access to the breed endpoints.
///
/// Cheap to clone; every clone shares the same [`Transport`].
#[derive(Clone)]
pub struct BreedApi {
    transport: Arc<dyn Transport>,
}

impl BreedApi {
    pub fn new(transport: impl Transport) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    #[must_use]
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// `GET /breeds?limit=7&page=N`, with pagination read from the headers.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, an undecodable body or missing or invalid
    /// pagination headers.
    pub async fn breeds(&self, page: u32) -> Result<BreedPage, ApiError> {
        let response = self
            .transport
            .get(
                "/breeds",
                vec![
                    ("limit".into(), PAGE_SIZE.to_string()),
                    ("page".into(), page.to_string()),
                ],
            )
            .await?;

        let pagination = pagination(&response)?;
        let breeds: Vec<Breed> = serde_json::from_value(response.data)?;
        debug!(page, count = pagination.count, breeds = breeds.len(), "fetched breed page");

        Ok(BreedPage { breeds, pagination })
    }

    /// Looks a breed up through one of its pictures: the first breed
    /// embedded in the first search result.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or when the embedded breed is malformed.
    /// An empty search is `Ok(None)`.
    pub async fn breed(&self, breed_id: &str) -> Result<Option<Breed>, ApiError> {
        let response = self
            .transport
            .get("/images/search", vec![("breed_id".into(), breed_id.to_owned())])
            .await?;

        let embedded = response
            .data
            .get(0)
            .and_then(|image| image.get("breeds"))
            .and_then(|breeds| breeds.get(0))
            .cloned();

        match embedded {
            Some(breed) => Ok(Some(serde_json::from_value(breed)?)),
            None => {
                debug!(breed_id, "image search found no breed");
                Ok(None)
            }
        }
    }

    /// Up to `limit` pictures of a breed. A null or empty body is no images.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or an undecodable body.
    pub async fn breed_images(&self, breed_id: &str, limit: u32) -> Result<Vec<Image>, ApiError> {
        let response = self
            .transport
            .get(
                "/images/search",
                vec![
                    ("breed_id".into(), breed_id.to_owned()),
                    ("limit".into(), limit.to_string()),
                ],
            )
            .await?;

        let images: Option<Vec<Image>> = serde_json::from_value(response.data)?;
        Ok(images.unwrap_or_default())
    }

    /// `GET /images/{id}`, labelled with the first embedded breed's name.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or an undecodable body.
    pub async fn reference_image(&self, image_id: &str) -> Result<ReferenceImage, ApiError> {
        let response = self
            .transport
            .get(&format!("/images/{image_id}"), vec![])
            .await?;

        let labelled: LabelledImage = serde_json::from_value(response.data)?;
        let name = labelled
            .breeds
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|breed| breed.name);
        Ok(ReferenceImage::new(labelled.image, name))
    }
}

impl fmt::Debug for BreedApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreedApi")
            .field("transport", &self.transport)
            .finish()
    }
}

#[derive(Deserialize)]
struct LabelledImage {
    #[serde(flatten)]
    image: Image,
    #[serde(default)]
    breeds: Option<Vec<BreedName>>,
}

#[derive(Deserialize)]
struct BreedName {
    name: String,
}

fn pagination(response: &ApiResponse) -> Result<Pagination, ApiError> {
    let count = header_number(response, COUNT_HEADER)?;
    let page = header_number(response, PAGE_HEADER)?;
    let limit = header_number(response, LIMIT_HEADER)?;

    Pagination::new(count, page, limit).ok_or_else(|| ApiError::InvalidHeader {
        name: LIMIT_HEADER,
        value: limit.to_string(),
    })
}

fn header_number(response: &ApiResponse, name: &'static str) -> Result<u32, ApiError> {
    let value = response.header(name).ok_or(ApiError::MissingHeader(name))?;
    value.trim().parse().map_err(|_| ApiError::InvalidHeader {
        name,
        value: value.to_owned(),
    })
}

/// Drops the picture with id `exclude` from `images`.
#[must_use]
pub fn without_image(images: Vec<Image>, exclude: Option<&str>) -> Vec<Image> {
    match exclude {
        Some(id) => images.into_iter().filter(|image| image.id != id).collect(),
        None => images,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeTransport;
    use serde_json::{Value, json};

    fn abyssinian() -> Value {
        json!({
            "id": "abys",
            "name": "Abyssinian",
            "description": "The Abyssinian is easy to care for.",
            "reference_image_id": "0XYvRd7oD",
            "image": {
                "id": "0XYvRd7oD",
                "url": "https://cdn2.thecatapi.com/images/0XYvRd7oD.jpg",
                "width": 1204,
                "height": 1445
            }
        })
    }

    fn page_response(page: u32) -> ApiResponse {
        ApiResponse::new(json!([abyssinian()]))
            .with_header("Pagination-Count", 70)
            .with_header("Pagination-Page", page)
            .with_header("Pagination-Limit", 7)
    }

    #[tokio::test]
    async fn test_breeds_reads_pagination_headers() {
        let fake = FakeTransport::new();
        fake.respond_to("/breeds", &[("limit", "7"), ("page", "0")], page_response(0));
        let api = BreedApi::new(fake.clone());

        let page = api.breeds(0).await.expect("page");
        assert_eq!(page.breeds.len(), 1);
        assert_eq!(page.breeds[0].name, "Abyssinian");
        assert_eq!(page.pagination.total_pages, 10);
        assert!(page.pagination.is_first());
        assert!(!page.pagination.is_last());
    }

    #[tokio::test]
    async fn test_breeds_last_page() {
        let fake = FakeTransport::new();
        fake.respond("/breeds", page_response(10));
        let api = BreedApi::new(fake);

        let page = api.breeds(10).await.expect("page");
        assert!(page.pagination.is_last());
        assert!(!page.pagination.is_first());
    }

    #[tokio::test]
    async fn test_breeds_missing_header_is_an_error() {
        let fake = FakeTransport::new();
        fake.respond(
            "/breeds",
            ApiResponse::new(json!([])).with_header("pagination-count", 70),
        );
        let api = BreedApi::new(fake);

        let err = api.breeds(0).await.expect_err("missing headers");
        assert!(matches!(err, ApiError::MissingHeader("pagination-page")));
    }

    #[tokio::test]
    async fn test_breeds_zero_limit_is_an_error() {
        let fake = FakeTransport::new();
        fake.respond(
            "/breeds",
            ApiResponse::new(json!([]))
                .with_header("pagination-count", 70)
                .with_header("pagination-page", 0)
                .with_header("pagination-limit", 0),
        );
        let api = BreedApi::new(fake);

        let err = api.breeds(0).await.expect_err("zero limit");
        assert!(matches!(err, ApiError::InvalidHeader { name: "pagination-limit", .. }));
    }

    #[tokio::test]
    async fn test_breed_from_image_search() {
        let fake = FakeTransport::new();
        fake.respond_to(
            "/images/search",
            &[("breed_id", "abys")],
            ApiResponse::new(json!([{ "id": "0XYvRd7oD", "url": "u", "breeds": [abyssinian()] }])),
        );
        let api = BreedApi::new(fake);

        let breed = api.breed("abys").await.expect("breed").expect("found");
        assert_eq!(breed.id, "abys");
        assert_eq!(breed.reference_image_id.as_deref(), Some("0XYvRd7oD"));
    }

    #[tokio::test]
    async fn test_empty_search_is_no_breed() {
        let fake = FakeTransport::new();
        fake.respond("/images/search", ApiResponse::new(json!([])));
        let api = BreedApi::new(fake.clone());

        assert_eq!(api.breed("zzzz").await.expect("not an error"), None);

        fake.respond(
            "/images/search",
            ApiResponse::new(json!([{ "id": "x", "url": "u", "breeds": [] }])),
        );
        assert_eq!(api.breed("zzzz").await.expect("not an error"), None);
    }

    #[tokio::test]
    async fn test_breed_images_null_body_is_empty() {
        let fake = FakeTransport::new();
        fake.respond("/images/search", ApiResponse::new(Value::Null));
        let api = BreedApi::new(fake);

        assert_eq!(api.breed_images("abys", 10).await.expect("images"), vec![]);
    }

    #[tokio::test]
    async fn test_breed_images_keeps_only_image_fields() {
        let fake = FakeTransport::new();
        fake.respond_to(
            "/images/search",
            &[("breed_id", "abys"), ("limit", "10")],
            ApiResponse::new(json!([
                { "id": "a1", "url": "https://x/a1.jpg", "width": 10, "height": 20, "breeds": [abyssinian()] },
                { "id": "a2", "url": "https://x/a2.jpg", "width": 30, "height": 40 }
            ])),
        );
        let api = BreedApi::new(fake);

        let images = api.breed_images("abys", 10).await.expect("images");
        assert_eq!(
            images,
            vec![
                Image { id: "a1".into(), url: "https://x/a1.jpg".into(), width: 10, height: 20 },
                Image { id: "a2".into(), url: "https://x/a2.jpg".into(), width: 30, height: 40 },
            ]
        );
    }

    #[tokio::test]
    async fn test_reference_image_takes_first_breed_name() {
        let fake = FakeTransport::new();
        fake.respond(
            "/images/0XYvRd7oD",
            ApiResponse::new(json!({
                "id": "0XYvRd7oD",
                "url": "https://cdn2.thecatapi.com/images/0XYvRd7oD.jpg",
                "width": 1204,
                "height": 1445,
                "breeds": [abyssinian()]
            })),
        );
        let api = BreedApi::new(fake);

        let image = api.reference_image("0XYvRd7oD").await.expect("image");
        assert_eq!(image.name.as_deref(), Some("Abyssinian"));
        assert_eq!(image.width, 1204);
    }

    #[tokio::test]
    async fn test_reference_image_without_breeds_is_unnamed() {
        let fake = FakeTransport::new();
        fake.respond("/images/x", ApiResponse::new(json!({ "id": "x", "url": "u" })));
        let api = BreedApi::new(fake);

        let image = api.reference_image("x").await.expect("image");
        assert_eq!(image.name, None);
    }

    #[tokio::test]
    async fn test_status_errors_propagate() {
        let fake = FakeTransport::new();
        fake.fail("/images/search", 500);
        let api = BreedApi::new(fake);

        let err = api.breed("abys").await.expect_err("server error");
        assert_eq!(err.to_string(), "Request failed with status code 500");
    }

    #[test]
    fn test_without_image() {
        let image = |id: &str| Image {
            id: id.into(),
            url: String::new(),
            width: 0,
            height: 0,
        };
        let images = vec![image("0XYvRd7oD"), image("b"), image("c")];

        let ids: Vec<_> = without_image(images.clone(), Some("0XYvRd7oD"))
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(without_image(images.clone(), None), images);
    }
}
