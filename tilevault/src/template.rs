//! Tile provider URL templates.
//!
//! A template turns a (zoom, x, y) tile index into the URL used as the
//! tile's cache key. Subdomain selection is deterministic per tile so the
//! same tile always produces the same key, which the store and the
//! tileset membership tables rely on.

/// Default raster tile endpoint (CartoDB Voyager).
pub const DEFAULT_TEMPLATE: &str =
    "https://cartodb-basemaps-{s}.global.ssl.fastly.net/rastertiles/voyager/{z}/{x}/{y}.png";

/// URL template with `{s}`, `{z}`, `{x}` and `{y}` placeholders.
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    template: String,
    subdomains: Vec<String>,
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE, &["a", "b", "c", "d"])
    }
}

impl UrlTemplate {
    /// Create a template from a pattern and its subdomain rotation set.
    ///
    /// An empty subdomain list is valid for templates without `{s}`.
    pub fn new(template: impl Into<String>, subdomains: &[&str]) -> Self {
        Self {
            template: template.into(),
            subdomains: subdomains.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Render the URL for one tile.
    ///
    /// The subdomain is chosen by `(x + y) % count`, never randomly, so
    /// repeated calls for the same tile yield an identical key.
    pub fn tile_url(&self, zoom: u8, x: u32, y: u32) -> String {
        let mut url = self
            .template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string());

        if url.contains("{s}") {
            let sub = if self.subdomains.is_empty() {
                ""
            } else {
                let idx = (x as u64 + y as u64) % self.subdomains.len() as u64;
                self.subdomains[idx as usize].as_str()
            };
            url = url.replace("{s}", sub);
        }

        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_substitution() {
        let template = UrlTemplate::new("https://tiles.example/{z}/{x}/{y}.png", &[]);
        assert_eq!(
            template.tile_url(12, 2391, 1193),
            "https://tiles.example/12/2391/1193.png"
        );
    }

    #[test]
    fn test_subdomain_is_deterministic() {
        let template = UrlTemplate::default();
        let a = template.tile_url(12, 2391, 1193);
        let b = template.tile_url(12, 2391, 1193);
        assert_eq!(a, b, "same tile must always produce the same key");
    }

    #[test]
    fn test_subdomain_rotation() {
        let template = UrlTemplate::new("https://{s}.tiles.example/{z}/{x}/{y}.png", &["a", "b"]);
        assert_eq!(
            template.tile_url(1, 0, 0),
            "https://a.tiles.example/1/0/0.png"
        );
        assert_eq!(
            template.tile_url(1, 0, 1),
            "https://b.tiles.example/1/0/1.png"
        );
    }

    #[test]
    fn test_missing_subdomains_render_empty() {
        let template = UrlTemplate::new("https://{s}.tiles.example/{z}/{x}/{y}.png", &[]);
        assert_eq!(
            template.tile_url(1, 0, 0),
            "https://.tiles.example/1/0/0.png"
        );
    }
}
