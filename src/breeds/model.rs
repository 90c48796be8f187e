use serde::{Deserialize, Serialize};

/// A cat breed as listed by the catalog. Unknown upstream fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Id of the breed's canonical picture. Some breeds have none.
    #[serde(default)]
    pub reference_image_id: Option<String>,
    /// The reference image, embedded by the list endpoint.
    #[serde(default)]
    pub image: Option<Image>,
}

/// A picture of a cat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// A breed's canonical picture, labelled with the breed's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub id: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub name: Option<String>,
}

impl ReferenceImage {
    #[must_use]
    pub fn new(image: Image, name: Option<String>) -> Self {
        Self {
            id: image.id,
            url: image.url,
            width: image.width,
            height: image.height,
            name,
        }
    }
}

/// Page bookkeeping derived from the `pagination-*` response headers.
///
/// Pages are zero-based and `total_pages` is `count / limit` rounded down, so
/// the last page index equals `total_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub count: u32,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl Pagination {
    /// `None` when `limit` is zero.
    #[must_use]
    pub const fn new(count: u32, page: u32, limit: u32) -> Option<Self> {
        match count.checked_div(limit) {
            Some(total_pages) => Some(Self {
                count,
                page,
                limit,
                total_pages,
            }),
            None => None,
        }
    }

    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.page == 0
    }

    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.page == self.total_pages
    }

    /// Number of selectable pages.
    #[must_use]
    pub const fn page_count(&self) -> u32 {
        self.total_pages + 1
    }
}

/// One page of the breed catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreedPage {
    pub breeds: Vec<Breed>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pagination_bounds() {
        let total = Pagination::new(70, 0, 7).expect("non-zero limit").total_pages;
        assert_eq!(total, 10);

        for page in 0..=total {
            let p = Pagination::new(70, page, 7).expect("non-zero limit");
            assert_eq!(p.is_first(), page == 0, "page {page}");
            assert_eq!(p.is_last(), page == total, "page {page}");
        }
    }

    #[test]
    fn test_pagination_rounds_down() {
        let p = Pagination::new(67, 0, 7).expect("non-zero limit");
        assert_eq!(p.total_pages, 9);
        assert_eq!(p.page_count(), 10);
    }

    #[test]
    fn test_pagination_rejects_zero_limit() {
        assert_eq!(Pagination::new(70, 0, 0), None);
    }

    #[test]
    fn test_breed_tolerates_missing_optional_fields() {
        let breed: Breed = serde_json::from_value(json!({
            "id": "mala",
            "name": "Malayan",
            "temperament": "Affectionate, Interactive, Playful",
        }))
        .expect("valid breed");

        assert_eq!(breed.description, "");
        assert_eq!(breed.reference_image_id, None);
        assert_eq!(breed.image, None);
    }

    #[test]
    fn test_breed_with_embedded_image() {
        let breed: Breed = serde_json::from_value(json!({
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
        }))
        .expect("valid breed");

        let image = breed.image.expect("embedded image");
        assert_eq!(image.id, "0XYvRd7oD");
        assert_eq!(image.width, 1204);

        let reference = ReferenceImage::new(image, Some(breed.name));
        assert_eq!(reference.name.as_deref(), Some("Abyssinian"));
        assert_eq!(reference.height, 1445);
    }
}
