//! Image proxy query parameters.

use heritrail_config::MediaConfig;
use serde::Deserialize;

pub const MIN_WIDTH: u32 = 16;
pub const MIN_QUALITY: u8 = 30;
pub const MAX_QUALITY: u8 = 95;

/// `?url=&w=&q=` as sent by the browser. Numbers are read wide so that any
/// integer clamps instead of failing to parse.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyParams {
    pub url: String,
    #[serde(default)]
    pub w: Option<i64>,
    #[serde(default)]
    pub q: Option<i64>,
}

/// Parameters after clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    pub url: String,
    pub width: u32,
    pub quality: u8,
}

impl ProxyParams {
    /// Clamp width to `[16, max_width]` (missing means `max_width`) and quality
    /// to `[30, 95]` (missing means the configured default).
    pub fn resolve(&self, cfg: &MediaConfig) -> ResizeRequest {
        let max_width = cfg.max_width.max(MIN_WIDTH);
        let width = self
            .w
            .map_or(max_width, |w| w.clamp(i64::from(MIN_WIDTH), i64::from(max_width)) as u32);
        let quality = self
            .q
            .map_or(cfg.default_quality, |q| q.clamp(i64::from(MIN_QUALITY), i64::from(MAX_QUALITY)) as u8)
            .clamp(MIN_QUALITY, MAX_QUALITY);
        ResizeRequest { url: self.url.trim().to_string(), width, quality }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(w: Option<i64>, q: Option<i64>) -> ProxyParams {
        ProxyParams { url: " https://example.org/a.png ".into(), w, q }
    }

    #[test]
    fn test_defaults() {
        let r = params(None, None).resolve(&MediaConfig::default());
        assert_eq!(r, ResizeRequest { url: "https://example.org/a.png".into(), width: 2048, quality: 75 });
    }

    #[test]
    fn test_clamping() {
        let cfg = MediaConfig::default();
        assert_eq!(params(Some(4), Some(5)).resolve(&cfg).width, 16);
        assert_eq!(params(Some(4), Some(5)).resolve(&cfg).quality, 30);
        assert_eq!(params(Some(10_000), Some(100)).resolve(&cfg).width, 2048);
        assert_eq!(params(Some(10_000), Some(100)).resolve(&cfg).quality, 95);
        assert_eq!(params(Some(640), Some(60)).resolve(&cfg), ResizeRequest {
            url: "https://example.org/a.png".into(),
            width: 640,
            quality: 60,
        });
    }

    #[test]
    fn test_out_of_range_numbers_clamp() {
        let cfg = MediaConfig::default();
        let parsed: ProxyParams =
            serde_json::from_str(r#"{"url":"https://example.org/a.png","w":99999999999,"q":300}"#).unwrap();
        assert_eq!(parsed.resolve(&cfg).width, 2048);
        assert_eq!(parsed.resolve(&cfg).quality, 95);

        assert_eq!(params(Some(0), Some(-5)).resolve(&cfg).width, 16);
        assert_eq!(params(Some(0), Some(-5)).resolve(&cfg).quality, 30);
        assert_eq!(params(Some(-1), None).resolve(&cfg).width, 16);
    }
}
