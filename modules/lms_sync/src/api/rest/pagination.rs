//! `page` / `per_page` query parameters for member listings.

pub const DEFAULT_PAGE: u32 = 0;
pub const DEFAULT_PER_PAGE: u32 = 60;
pub const MAX_PER_PAGE: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageParams {
    /// Reads the first `page` and `per_page` values of a raw query string.
    /// Unparseable or out-of-range values fall back to the defaults and
    /// `per_page` is capped at [`MAX_PER_PAGE`].
    pub fn from_query(query: Option<&str>) -> Self {
        let mut page = None;
        let mut per_page = None;
        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "page" if page.is_none() => page = Some(value.into_owned()),
                "per_page" if per_page.is_none() => per_page = Some(value.into_owned()),
                _ => {}
            }
        }

        let page = page
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v >= 0)
            .map_or(DEFAULT_PAGE, |v| u32::try_from(v).unwrap_or(u32::MAX));
        let per_page = per_page
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .map_or(DEFAULT_PER_PAGE, |v| {
                u32::try_from(v.min(i64::from(MAX_PER_PAGE))).unwrap_or(MAX_PER_PAGE)
            });

        Self { page, per_page }
    }
}
