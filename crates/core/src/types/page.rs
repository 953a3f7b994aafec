//! Normalized list responses.

use serde::{Deserialize, Deserializer};

/// One page of a list endpoint.
///
/// List endpoints answer in three shapes: a bare JSON array, a Spring-style
/// page (`{content, totalPages, totalElements, number}`), or a wrapper
/// (`{data: [...]}`). All three deserialize into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of pages; at least 1.
    pub total_pages: u32,
    /// Total number of items across all pages.
    pub total_items: u64,
}

impl<T> Page<T> {
    /// A single page holding `items`.
    #[must_use]
    pub fn single(items: Vec<T>) -> Self {
        let total_items = items.len() as u64;
        Self {
            items,
            total_pages: 1,
            total_items,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::single(Vec::new())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Bare(Vec<T>),
    #[serde(rename_all = "camelCase")]
    Paged {
        content: Vec<T>,
        #[serde(default)]
        total_pages: Option<u32>,
        #[serde(default)]
        total_elements: Option<u64>,
    },
    Wrapped {
        #[serde(alias = "items", alias = "cartItems")]
        data: Vec<T>,
    },
}

impl<'de, T> Deserialize<'de> for Page<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Envelope::<T>::deserialize(deserializer)? {
            Envelope::Bare(items) | Envelope::Wrapped { data: items } => Self::single(items),
            Envelope::Paged {
                content,
                total_pages,
                total_elements,
            } => {
                let total_items = total_elements.unwrap_or(content.len() as u64);
                Self {
                    items: content,
                    total_pages: total_pages.unwrap_or(1).max(1),
                    total_items,
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_array() {
        let page: Page<u32> = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_items, 3);
    }

    #[test]
    fn test_spring_page() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"content":[1],"totalPages":4,"totalElements":40,"number":0}"#)
                .unwrap();
        assert_eq!(page.items, vec![1]);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.total_items, 40);
    }

    #[test]
    fn test_data_wrapper() {
        let page: Page<u32> = serde_json::from_str(r#"{"success":true,"data":[5]}"#).unwrap();
        assert_eq!(page.items, vec![5]);
    }

    #[test]
    fn test_zero_total_pages_is_one() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"content":[],"totalPages":0,"totalElements":0}"#).unwrap();
        assert_eq!(page.total_pages, 1);
    }
}
