//! Search targets and the listing APIs they page through

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

use crate::config::TargetSettings;
use crate::{Error, Result};

/// `origPageContext` sent by the search page with every SRP request
const SRP_PAGE_CONTEXT: &str = r#"{"searchScope":"","locationId":""}"#;

/// Which search the target runs; selects API path, page name and listing keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    #[default]
    Rent,
    Resale,
    Projects,
}

impl ListingKind {
    pub fn api_path(self) -> &'static str {
        match self {
            Self::Rent | Self::Resale => "/api-aggregator/srp/search",
            Self::Projects => "/api-aggregator/project/search",
        }
    }

    /// Value of the `pageName` query parameter and `pagename` header
    pub fn page_name(self) -> &'static str {
        match self {
            Self::Rent | Self::Resale => "SRP",
            Self::Projects => "NPSRP",
        }
    }

    /// Response keys holding listing arrays
    pub fn listing_keys(self) -> &'static [&'static str] {
        match self {
            Self::Rent | Self::Resale => &["properties"],
            Self::Projects => &["newProjects", "secondaryNewProjects"],
        }
    }

    /// Path segment that precedes the city slug in search URLs
    fn city_marker(self) -> Option<&'static str> {
        match self {
            Self::Rent => Some("rent"),
            Self::Resale => Some("buy"),
            Self::Projects => None,
        }
    }

    /// Collect the listing records of one API page.
    ///
    /// At least one listing key must hold an array; absent keys count as empty.
    pub fn extract_records(self, body: &Value) -> Result<Vec<Value>> {
        let mut found = false;
        let mut records = Vec::new();

        for key in self.listing_keys() {
            match body.get(key) {
                Some(Value::Array(items)) => {
                    found = true;
                    records.extend(items.iter().cloned());
                }
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(Error::decode(format!(
                        "`{}` is not an array (found {})",
                        key,
                        json_kind(other)
                    )));
                }
            }
        }

        if !found {
            return Err(Error::decode(format!(
                "response has none of {:?}",
                self.listing_keys()
            )));
        }
        Ok(records)
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rent => "rent",
            Self::Resale => "resale",
            Self::Projects => "projects",
        };
        f.write_str(name)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Total listing count advertised by an API page (`count` or `resultCount`).
pub fn advertised_total(body: &Value) -> Option<u64> {
    ["count", "resultCount"].iter().find_map(|key| match body.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Stable identity of a listing record, used to drop duplicates.
pub fn record_id(record: &Value) -> Option<String> {
    ["PROP_ID", "id", "projectId"]
        .iter()
        .find_map(|key| match record.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// One search to scrape: the page rendered for bootstrap plus its API shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    name: String,
    page_url: Url,
    kind: ListingKind,
    city_id: Option<String>,
    builder_id: Option<String>,
}

impl SearchTarget {
    /// Parse a search page URL; the name defaults to the city slug.
    pub fn new(page_url: &str, kind: ListingKind) -> Result<Self> {
        let url = Url::parse(page_url)
            .map_err(|e| Error::config(format!("Invalid target url {:?}: {}", page_url, e)))?;

        let query_value = |name: &str| {
            url.query_pairs()
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        };
        let city_id = query_value("city");
        let builder_id = query_value("builderid");

        if kind == ListingKind::Projects && city_id.is_none() {
            return Err(Error::config(format!(
                "project search {} needs a `city` query parameter",
                page_url
            )));
        }

        let name = derive_name(&url, kind);
        Ok(Self {
            name,
            page_url: url,
            kind,
            city_id,
            builder_id,
        })
    }

    pub fn from_settings(settings: &TargetSettings) -> Result<Self> {
        let target = Self::new(&settings.url, settings.kind)?;
        Ok(match &settings.name {
            Some(name) if !name.trim().is_empty() => target.with_name(name.trim()),
            _ => target,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_url(&self) -> &str {
        self.page_url.as_str()
    }

    pub fn kind(&self) -> ListingKind {
        self.kind
    }

    pub fn city_id(&self) -> Option<&str> {
        self.city_id.as_deref()
    }

    /// API URL for `page` on `base`'s origin.
    pub fn api_url(
        &self,
        base: &Url,
        page: u32,
        page_size: u32,
        encrypted_input: &str,
    ) -> Result<String> {
        let mut url = base.join(self.kind.api_path())?;
        let page = page.to_string();
        let page_size = page_size.to_string();

        {
            let mut query = url.query_pairs_mut();
            match self.kind {
                ListingKind::Rent | ListingKind::Resale => {
                    query
                        .append_pair("page", &page)
                        .append_pair("page_size", &page_size)
                        .append_pair("platform", "DESKTOP")
                        .append_pair("encrypted_input", encrypted_input)
                        .append_pair("recomGroupType", "VSP")
                        .append_pair("pageName", self.kind.page_name())
                        .append_pair("search_type", "QS")
                        .append_pair("groupByConfigurations", "true")
                        .append_pair("origPageContext", SRP_PAGE_CONTEXT)
                        .append_pair("lazy", "true")
                        .append_pair("isBottomNavFlow", "false");
                }
                ListingKind::Projects => {
                    let city = self.city_id.as_deref().unwrap_or_default();
                    if let Some(builder) = &self.builder_id {
                        query
                            .append_pair("builderid", builder)
                            .append_pair("builder", builder);
                    }
                    query
                        .append_pair("res_com", "R")
                        .append_pair("sortby", "sab_default")
                        .append_pair("cityID", city)
                        .append_pair("page", &page)
                        .append_pair("page_size", &page_size)
                        .append_pair("noxid", "Y")
                        .append_pair("isAjax", "true")
                        .append_pair("city", city)
                        .append_pair("platform", "DESKTOP")
                        .append_pair("encrypted_input", encrypted_input)
                        .append_pair("recomGroupType", "VSP")
                        .append_pair("pageName", self.kind.page_name())
                        .append_pair("groupByConfigurations", "true")
                        .append_pair("lazy", "true");
                }
            }
        }

        Ok(url.into())
    }
}

impl fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// City slug following `/rent/` or `/buy/`, else the last path segment.
fn derive_name(url: &Url, kind: ListingKind) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let after_marker = kind.city_marker().and_then(|marker| {
        segments
            .iter()
            .position(|s| *s == marker)
            .and_then(|i| segments.get(i + 1))
    });

    after_marker
        .or_else(|| segments.last())
        .map(|s| s.to_string())
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "target".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(
        "https://www.example.com/search/property/rent/raipur?city=75&preference=S",
        ListingKind::Rent,
        "raipur"
    )]
    #[case(
        "https://www.example.com/search/property/buy/zirakpur-chandigarh?city=73",
        ListingKind::Resale,
        "zirakpur-chandigarh"
    )]
    #[case(
        "https://www.example.com/new-projects-in-pune-ffid?city=19",
        ListingKind::Projects,
        "new-projects-in-pune-ffid"
    )]
    #[case("https://www.example.com/?city=1", ListingKind::Rent, "www.example.com")]
    fn test_derived_name(#[case] url: &str, #[case] kind: ListingKind, #[case] expected: &str) {
        assert_eq!(SearchTarget::new(url, kind).unwrap().name(), expected);
    }

    #[test]
    fn test_configured_name_wins() {
        let settings = TargetSettings {
            name: Some("pune-rentals".to_string()),
            url: "https://www.example.com/search/property/rent/pune?city=19".to_string(),
            kind: ListingKind::Rent,
        };
        let target = SearchTarget::from_settings(&settings).unwrap();
        assert_eq!(target.name(), "pune-rentals");
        assert_eq!(target.city_id(), Some("19"));
    }

    #[test]
    fn test_projects_require_city() {
        let err = SearchTarget::new("https://www.example.com/new-projects", ListingKind::Projects)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_srp_api_url() {
        let target = SearchTarget::new(
            "https://www.example.com/search/property/rent/pune?city=19",
            ListingKind::Rent,
        )
        .unwrap();
        let base = Url::parse("https://api.example.com").unwrap();
        let url = target.api_url(&base, 3, 25, "abc+/=").unwrap();

        assert!(url.starts_with("https://api.example.com/api-aggregator/srp/search?page=3&page_size=25"));
        assert!(url.contains("encrypted_input=abc%2B%2F%3D"));
        assert!(url.contains("pageName=SRP"));

        let parsed = Url::parse(&url).unwrap();
        let keys: Vec<String> = parsed.query_pairs().map(|(k, _)| k.into_owned()).collect();
        let context = keys.iter().position(|k| k == "origPageContext").unwrap();
        assert_eq!(keys[context - 1], "groupByConfigurations");
        assert_eq!(keys[context + 1], "lazy");
        let value = parsed
            .query_pairs()
            .find(|(k, _)| k == "origPageContext")
            .map(|(_, v)| v.into_owned());
        assert_eq!(value.as_deref(), Some(r#"{"searchScope":"","locationId":""}"#));
    }

    #[test]
    fn test_projects_api_url() {
        let target = SearchTarget::new(
            "https://www.example.com/new-projects-in-pune-ffid?city=19&builderid=77",
            ListingKind::Projects,
        )
        .unwrap();
        let base = Url::parse("https://www.example.com").unwrap();
        let url = target.api_url(&base, 1, 25, "enc").unwrap();

        assert!(url.starts_with("https://www.example.com/api-aggregator/project/search?builderid=77&builder=77"));
        assert!(url.contains("cityID=19"));
        assert!(url.contains("pageName=NPSRP"));
    }

    #[test]
    fn test_extract_records() {
        let srp = json!({"count": 2, "properties": [{"PROP_ID": "a"}, {"PROP_ID": "b"}]});
        assert_eq!(ListingKind::Rent.extract_records(&srp).unwrap().len(), 2);

        let projects = json!({"newProjects": [{"projectId": 1}], "secondaryNewProjects": [{"projectId": 2}]});
        assert_eq!(ListingKind::Projects.extract_records(&projects).unwrap().len(), 2);

        let partial = json!({"newProjects": []});
        assert!(ListingKind::Projects.extract_records(&partial).unwrap().is_empty());

        assert!(ListingKind::Resale.extract_records(&json!({"error": "x"})).is_err());
        assert!(ListingKind::Rent.extract_records(&json!({"properties": "x"})).is_err());
    }

    #[rstest]
    #[case(json!({"count": 120}), Some(120))]
    #[case(json!({"resultCount": "45"}), Some(45))]
    #[case(json!({"count": null, "resultCount": 7}), Some(7))]
    #[case(json!({"properties": []}), None)]
    fn test_advertised_total(#[case] body: Value, #[case] expected: Option<u64>) {
        assert_eq!(advertised_total(&body), expected);
    }

    #[rstest]
    #[case(json!({"PROP_ID": "R123", "id": "x"}), Some("R123"))]
    #[case(json!({"id": 42}), Some("42"))]
    #[case(json!({"projectId": "P9"}), Some("P9"))]
    #[case(json!({"PROP_ID": ""}), None)]
    #[case(json!({"title": "flat"}), None)]
    fn test_record_id(#[case] record: Value, #[case] expected: Option<&str>) {
        assert_eq!(record_id(&record).as_deref(), expected);
    }
}
