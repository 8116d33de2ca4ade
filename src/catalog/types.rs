//! Catalog records and page shapes returned by the listing endpoint.

use serde::{Deserialize, Deserializer, Serialize};

/// Read-only snapshot of one catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: i64,
    pub file_path: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Recognized people; `null` and absent both mean none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub people: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl PhotoRecord {
    /// Both coordinates, when the record is geotagged.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Either response shape of the listing endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListingBody {
    Bare(Vec<PhotoRecord>),
    Envelope {
        items: Vec<PhotoRecord>,
        #[serde(default)]
        has_more: bool,
        #[serde(default)]
        limit: Option<u64>,
    },
}

/// One page of geotagged records.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPage {
    pub items: Vec<PhotoRecord>,
    pub has_more: bool,
    /// Page size the server actually applied, if it said so.
    pub limit: Option<u64>,
}

impl From<ListingBody> for GeoPage {
    fn from(body: ListingBody) -> Self {
        match body {
            // A bare list is always the last page
            ListingBody::Bare(items) => GeoPage {
                items,
                has_more: false,
                limit: None,
            },
            ListingBody::Envelope { items, has_more, limit } => GeoPage { items, has_more, limit },
        }
    }
}

impl ListingBody {
    pub(crate) fn into_items(self) -> Vec<PhotoRecord> {
        match self {
            ListingBody::Bare(items) => items,
            ListingBody::Envelope { items, .. } => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_sequence_is_terminal_page() {
        let body: ListingBody = serde_json::from_str(
            r#"[{"id":1,"file_path":"a.jpg","latitude":1.5,"longitude":2.5,"description":null,"people":[]}]"#,
        )
        .unwrap();
        let page = GeoPage::from(body);
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_more);
        assert_eq!(page.items[0].coordinates(), Some((1.5, 2.5)));
    }

    #[test]
    fn test_envelope() {
        let body: ListingBody = serde_json::from_str(
            r#"{"items":[{"id":2,"file_path":"b.jpg","latitude":null,"longitude":3.0}],"has_more":true,"limit":500}"#,
        )
        .unwrap();
        let page = GeoPage::from(body);
        assert!(page.has_more);
        assert_eq!(page.limit, Some(500));
        assert_eq!(page.items[0].coordinates(), None);
    }

    #[test]
    fn test_record_without_optional_fields() {
        let record: PhotoRecord = serde_json::from_str(r#"{"id":3,"file_path":"c.jpg"}"#).unwrap();
        assert_eq!(record.latitude, None);
        assert_eq!(record.url, None);
        assert_eq!(record.description, None);
        assert!(record.people.is_empty());
    }

    #[test]
    fn test_description_and_people() {
        let record: PhotoRecord = serde_json::from_str(
            r#"{"id":4,"file_path":"d.jpg","description":"Harbour at dusk","people":["Ana","Ben"]}"#,
        )
        .unwrap();
        assert_eq!(record.description.as_deref(), Some("Harbour at dusk"));
        assert_eq!(record.people, vec!["Ana", "Ben"]);

        let record: PhotoRecord =
            serde_json::from_str(r#"{"id":5,"file_path":"e.jpg","description":null,"people":null}"#).unwrap();
        assert!(record.people.is_empty());
    }
}
